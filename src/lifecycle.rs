use std::time::{Duration, Instant};

use crate::bind::BindPoller;
use crate::input::{Buttons, InputPoller, InputReducer};
use crate::menu::{DispatchSignal, MenuContext, ModeRequest};
use crate::render::MenuRenderer;
use crate::session::{GameSession, SessionStep};
use crate::settings::Profile;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    Quit,
    /// The frontend should be torn down and started again.
    Restart,
}

/// Major phase of the frontend. Transitions are explicit; exactly one phase
/// is active at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    LoadGame,
    Game,
    Menu,
    Shutdown(ExitStatus),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadFailureAction {
    BackToMenu,
    Exit,
}

/// Static policy table: where a failed load lands, keyed by profile.
/// Desktop machines return to the menu; consoles exit so the platform shell
/// can take over.
pub fn load_failure_policy(profile: Profile) -> LoadFailureAction {
    match profile {
        Profile::Desktop => LoadFailureAction::BackToMenu,
        Profile::Console => LoadFailureAction::Exit,
    }
}

/// Soft frame throttle: sleep out the rest of the tick interval, never
/// blocking when the tick already ran long.
fn throttle(frame_rate: f32, tick_start: Instant) {
    let target = Duration::from_secs_f32(1.0 / frame_rate.max(1.0));
    if let Some(remaining) = target.checked_sub(tick_start.elapsed()) {
        std::thread::sleep(remaining);
    }
}

/// The outer loop: owns the menu context, the session and the frontends,
/// and sequences load/game/menu/shutdown.
pub struct Frontend {
    menu: MenuContext,
    session: Box<dyn GameSession>,
    input: Box<dyn InputPoller>,
    renderer: Box<dyn MenuRenderer>,
    binds: Box<dyn BindPoller>,
    reducer: InputReducer,
}

impl Frontend {
    pub fn new(
        menu: MenuContext,
        session: Box<dyn GameSession>,
        input: Box<dyn InputPoller>,
        renderer: Box<dyn MenuRenderer>,
        binds: Box<dyn BindPoller>,
    ) -> Frontend {
        Frontend {
            menu,
            session,
            input,
            renderer,
            binds,
            reducer: InputReducer::new(),
        }
    }

    pub fn run(&mut self) -> ExitStatus {
        self.menu.populate_root(self.session.is_loaded());

        // Content staged from the command line goes straight to loading.
        let mut phase = match self.menu.take_mode_request() {
            Some(ModeRequest::LoadGame) => Phase::LoadGame,
            _ => Phase::Menu,
        };

        loop {
            phase = match phase {
                Phase::LoadGame => self.load_game_phase(),
                Phase::Game => self.game_phase(),
                Phase::Menu => self.menu_phase(),
                Phase::Shutdown(status) => {
                    self.shutdown();
                    return status;
                }
            };
        }
    }

    fn load_game_phase(&mut self) -> Phase {
        let Some(pending) = self.menu.take_pending_load() else {
            log::warn!("load phase entered with nothing staged");
            return Phase::Menu;
        };

        if let Some(rom) = &pending.rom {
            let name = rom
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.menu.post_message(format!("Loading {} ...", name));
            self.renderer.render(&self.menu.screen());
        }

        match self.session.load(pending.rom.as_deref(), &pending.core) {
            Ok(()) => {
                log::info!("content loaded with {}", pending.core.display());
                Phase::Game
            }
            Err(e) => {
                log::error!("failed to load content: {}", e);
                self.menu.post_message(format!("Failed to load content: {}", e));
                match load_failure_policy(self.menu.settings.profile) {
                    LoadFailureAction::BackToMenu => Phase::Menu,
                    LoadFailureAction::Exit => Phase::Shutdown(ExitStatus::Quit),
                }
            }
        }
    }

    fn game_phase(&mut self) -> Phase {
        log::info!("entering game mode");
        loop {
            match self.session.step() {
                SessionStep::Running => {}
                SessionStep::MenuRequested => return Phase::Menu,
                SessionStep::Finished => {
                    self.session.unload();
                    return Phase::Menu;
                }
            }
        }
    }

    fn menu_phase(&mut self) -> Phase {
        log::info!("entering menu mode");
        // Keep a held menu-toggle from instantly firing inside the menu.
        self.reducer.prime(Buttons::MENU_TOGGLE);
        self.menu.mark_refresh();

        loop {
            let tick_start = Instant::now();
            let raw = self.input.poll();
            if raw.contains(Buttons::QUIT) {
                return Phase::Shutdown(ExitStatus::Quit);
            }
            if let Some(query) = self.input.take_search() {
                self.menu.search(&query);
            }

            let action = self.reducer.reduce(raw);
            if self.reducer.menu_toggle_pressed() && self.session.is_loaded() {
                self.menu.flush_to_root();
                return Phase::Game;
            }

            let signal = self.menu.dispatch(
                action,
                self.reducer.scroll_accel(),
                self.session.as_mut(),
                self.binds.as_mut(),
            );
            if let Some(mask) = self.menu.take_input_prime() {
                self.reducer.prime(mask);
            }

            self.renderer.render(&self.menu.screen());
            throttle(self.menu.settings.frame_rate, tick_start);

            if signal == DispatchSignal::LeaveMenu {
                break;
            }
        }

        match self.menu.take_mode_request() {
            Some(ModeRequest::LoadGame) => Phase::LoadGame,
            Some(ModeRequest::ResumeGame) => Phase::Game,
            Some(ModeRequest::Quit) => Phase::Shutdown(ExitStatus::Quit),
            Some(ModeRequest::RestartFrontend) => Phase::Shutdown(ExitStatus::Restart),
            None => {
                if self.session.is_loaded() {
                    Phase::Game
                } else {
                    Phase::Shutdown(ExitStatus::Quit)
                }
            }
        }
    }

    fn shutdown(&mut self) {
        if self.menu.settings.config_save_on_exit {
            if let Err(e) = self.menu.settings.save() {
                log::warn!("failed to save config on exit: {}", e);
            }
        }
        self.session.unload();
        self.menu.teardown();
        self.renderer.teardown();
        log::info!("frontend shut down");
    }
}
