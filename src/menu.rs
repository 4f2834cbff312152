use std::path::PathBuf;

use crate::bind::{BindPoller, BindProgress, BindSession};
use crate::core_info::{core_file_extension, CoreRegistry};
use crate::input::{Action, Buttons};
use crate::list::{EntryKind, EntryList};
use crate::nav::{NavStack, ScreenKind};
use crate::render::Screen;
use crate::scan::{sort_items, DirBrowser, ExtFilter};
use crate::session::GameSession;
use crate::settings::{MenuAction, PathSetting, SettingId, Settings};

/// What the dispatcher tells the lifecycle driver after one action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchSignal {
    /// Stay in the menu loop.
    Continue,
    /// Leave the menu; the driver reads the recorded mode request.
    LeaveMenu,
}

/// Phase transition requested by a terminal menu action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeRequest {
    LoadGame,
    ResumeGame,
    Quit,
    RestartFrontend,
}

/// Content staged for the load phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingLoad {
    pub rom: Option<PathBuf>,
    pub core: PathBuf,
}

/// All menu state: the navigation stack, the visible entry list, cursor,
/// refresh bookkeeping and the deferred-core context. Owned explicitly and
/// passed to every dispatch call; there are no ambient globals.
pub struct MenuContext {
    pub settings: Settings,
    registry: CoreRegistry,
    browser: Box<dyn DirBrowser>,
    stack: NavStack,
    list: EntryList,
    cursor: usize,
    need_refresh: bool,
    msg_force: bool,
    message: Option<String>,
    defer_core: bool,
    deferred_path: PathBuf,
    pending: Option<PendingLoad>,
    mode_request: Option<ModeRequest>,
    bind_session: Option<BindSession>,
    input_prime: Option<Buttons>,
}

impl MenuContext {
    pub fn new(settings: Settings, browser: Box<dyn DirBrowser>) -> MenuContext {
        let registry = CoreRegistry::from_entries(&settings.cores);
        MenuContext {
            settings,
            registry,
            browser,
            stack: NavStack::new(),
            list: EntryList::new(),
            cursor: 0,
            need_refresh: true,
            msg_force: false,
            message: None,
            defer_core: false,
            deferred_path: PathBuf::new(),
            pending: None,
            mode_request: None,
            bind_session: None,
            input_prime: None,
        }
    }

    /// Populate the root screen. Called at startup before the first tick.
    pub fn populate_root(&mut self, game_loaded: bool) {
        self.need_refresh = true;
        self.resolve_if_needed(game_loaded);
    }

    /// Force repopulation on the next tick (menu re-entry, external change).
    pub fn mark_refresh(&mut self) {
        self.need_refresh = true;
    }

    /// Stage a load picked outside the menu (command line content).
    pub fn stage_load(&mut self, rom: Option<PathBuf>, core: PathBuf) {
        self.settings.current_core = Some(core.clone());
        self.pending = Some(PendingLoad { rom, core });
        self.mode_request = Some(ModeRequest::LoadGame);
    }

    /// Resolve a core for `rom` by extension. Used for command-line content
    /// given without an explicit core.
    pub fn resolve_core_for(&self, rom: &std::path::Path) -> Option<PathBuf> {
        let candidates = self.registry.supported_cores(rom);
        match candidates.len() {
            1 => Some(candidates[0].path.clone()),
            _ => None,
        }
    }

    pub fn take_pending_load(&mut self) -> Option<PendingLoad> {
        self.pending.take()
    }

    pub fn take_mode_request(&mut self) -> Option<ModeRequest> {
        self.mode_request.take()
    }

    /// Buttons the reducer should treat as already held (bind capture,
    /// search submission).
    pub fn take_input_prime(&mut self) -> Option<Buttons> {
        self.input_prime.take()
    }

    pub fn post_message(&mut self, msg: impl Into<String>) {
        self.message = Some(msg.into());
        self.msg_force = true;
    }

    /// Jump the cursor to the first entry matching `query`.
    pub fn search(&mut self, query: &str) {
        if let Some(i) = self.list.search(query) {
            self.cursor = i;
        }
        // avoid triggering actions on the return that submitted the line
        self.input_prime = Some(Buttons::ALL);
    }

    /// Unwind to the root settings screen.
    pub fn flush_to_root(&mut self) {
        if let Some(cursor) = self.stack.flush_to(&ScreenKind::SettingsRoot) {
            self.cursor = cursor;
        }
        self.need_refresh = true;
    }

    pub fn teardown(&mut self) {
        self.list.clear();
        self.flush_to_root();
    }

    /// Apply one action to the current screen. Exactly one call per tick.
    pub fn dispatch(
        &mut self,
        action: Action,
        accel: u32,
        session: &mut dyn GameSession,
        binds: &mut dyn BindPoller,
    ) -> DispatchSignal {
        self.msg_force = false;
        let kind = self.stack.top().kind.clone();
        let signal = if kind == ScreenKind::CustomBind {
            self.custom_bind_iterate(binds)
        } else if kind.is_settings() {
            self.settings_iterate(action, session, binds)
        } else {
            self.browse_iterate(action, accel, session)
        };
        self.resolve_if_needed(session.is_loaded());
        signal
    }

    fn push_screen(&mut self, path: impl Into<PathBuf>, kind: ScreenKind) {
        self.stack.push(path, kind, self.cursor);
        self.cursor = 0;
        self.need_refresh = true;
        self.message = None;
    }

    fn pop_screen(&mut self) {
        self.cursor = self.stack.pop();
        self.need_refresh = true;
        self.message = None;
    }

    fn leave_for(&mut self, request: ModeRequest) -> DispatchSignal {
        self.mode_request = Some(request);
        self.msg_force = true;
        self.flush_to_root();
        DispatchSignal::LeaveMenu
    }

    // --- settings screens -------------------------------------------------

    fn settings_iterate(
        &mut self,
        action: Action,
        session: &mut dyn GameSession,
        binds: &mut dyn BindPoller,
    ) -> DispatchSignal {
        let action = if self.need_refresh && action != Action::Message {
            Action::Noop
        } else {
            action
        };
        let size = self.list.len();

        match action {
            Action::Up => {
                if size > 0 {
                    self.cursor = if self.cursor > 0 { self.cursor - 1 } else { size - 1 };
                }
            }
            Action::Down => {
                if size > 0 {
                    self.cursor = if self.cursor + 1 < size { self.cursor + 1 } else { 0 };
                }
            }
            Action::Cancel => {
                if self.stack.depth() > 1 {
                    self.pop_screen();
                }
            }
            Action::Left | Action::Right | Action::Ok | Action::Start => {
                return self.settings_select(action, session, binds);
            }
            Action::Refresh => {
                self.cursor = 0;
                self.need_refresh = true;
            }
            Action::Message => self.msg_force = true,
            _ => {}
        }
        DispatchSignal::Continue
    }

    fn settings_select(
        &mut self,
        action: Action,
        session: &mut dyn GameSession,
        binds: &mut dyn BindPoller,
    ) -> DispatchSignal {
        let Some(entry) = self.list.get(self.cursor) else {
            return DispatchSignal::Continue;
        };
        let kind = entry.kind.clone();
        match kind {
            EntryKind::Setting(id) => {
                self.settings.toggle(id, action);
                DispatchSignal::Continue
            }
            EntryKind::Path(ps) if action == Action::Ok => {
                let current = ps.get(&self.settings);
                let start = if current.as_os_str().is_empty() {
                    PathBuf::from("/")
                } else {
                    current.to_path_buf()
                };
                self.push_screen(start, ScreenKind::DirectoryPick(ps));
                DispatchSignal::Continue
            }
            EntryKind::Action(a) if action == Action::Ok => self.menu_action(a, session, binds),
            _ => DispatchSignal::Continue,
        }
    }

    fn menu_action(
        &mut self,
        action: MenuAction,
        session: &mut dyn GameSession,
        binds: &mut dyn BindPoller,
    ) -> DispatchSignal {
        match action {
            MenuAction::OpenCoreList => {
                let dir = self.settings.cores_dir.clone();
                self.push_screen(dir, ScreenKind::CoreList);
            }
            MenuAction::LoadContentDetect => {
                self.defer_core = true;
                let dir = self.settings.browser_dir.clone();
                self.push_screen(dir, ScreenKind::Browse);
            }
            MenuAction::LoadContent => {
                self.defer_core = false;
                let dir = self.settings.browser_dir.clone();
                self.push_screen(dir, ScreenKind::Browse);
            }
            MenuAction::PathOptions => self.push_screen("", ScreenKind::PathOptions),
            MenuAction::DiskOptions => self.push_screen("", ScreenKind::DiskOptions),
            MenuAction::DiskIndex => match session.next_disk_index() {
                Ok(i) => self.post_message(format!("Disk index {}", i)),
                Err(e) => self.post_message(e.to_string()),
            },
            MenuAction::DiskAppend => {
                let dir = self.settings.browser_dir.clone();
                self.push_screen(dir, ScreenKind::DiskAppend);
            }
            MenuAction::RebindControls => {
                self.bind_session = Some(BindSession::new(binds.poll()));
                self.push_screen("", ScreenKind::CustomBind);
            }
            MenuAction::SaveState => match session.save_state() {
                Ok(()) => return self.leave_for(ModeRequest::ResumeGame),
                Err(e) => self.post_message(e.to_string()),
            },
            MenuAction::LoadState => match session.load_state() {
                Ok(()) => return self.leave_for(ModeRequest::ResumeGame),
                Err(e) => self.post_message(e.to_string()),
            },
            MenuAction::Screenshot => match session.screenshot() {
                Ok(()) => return self.leave_for(ModeRequest::ResumeGame),
                Err(e) => self.post_message(e.to_string()),
            },
            MenuAction::Resume => {
                if session.is_loaded() {
                    return self.leave_for(ModeRequest::ResumeGame);
                }
            }
            MenuAction::Restart => match session.reset() {
                Ok(()) => return self.leave_for(ModeRequest::ResumeGame),
                Err(e) => self.post_message(e.to_string()),
            },
            MenuAction::RestartFrontend => return self.leave_for(ModeRequest::RestartFrontend),
            MenuAction::SaveNewConfig => match self.settings.save_new_config() {
                Ok(p) => self.post_message(format!("Saved new config to {}", p.display())),
                Err(e) => self.post_message(format!("Save failed: {}", e)),
            },
            MenuAction::Quit => return self.leave_for(ModeRequest::Quit),
        }
        DispatchSignal::Continue
    }

    // --- file listing screens ---------------------------------------------

    fn browse_iterate(
        &mut self,
        action: Action,
        accel: u32,
        session: &mut dyn GameSession,
    ) -> DispatchSignal {
        let action = if self.need_refresh && action != Action::Message {
            Action::Noop
        } else {
            action
        };

        let scroll_speed = ((accel.max(2) - 2) / 4 + 1) as usize;
        let fast_scroll = 4 + 4 * scroll_speed;
        let size = self.list.len();

        match action {
            Action::Up if size > 0 => {
                self.cursor = if self.cursor >= scroll_speed {
                    self.cursor - scroll_speed
                } else {
                    size - 1
                };
            }
            Action::Down if size > 0 => {
                self.cursor = if self.cursor + scroll_speed < size {
                    self.cursor + scroll_speed
                } else {
                    0
                };
            }
            Action::Left if size > 0 => {
                self.cursor = if self.cursor > fast_scroll {
                    self.cursor - fast_scroll
                } else {
                    0
                };
            }
            Action::Right if size > 0 => {
                self.cursor = if self.cursor + fast_scroll < size {
                    self.cursor + fast_scroll
                } else {
                    size - 1
                };
            }
            Action::ScrollUp => self.cursor = self.list.descend_jump(self.cursor),
            Action::ScrollDown => self.cursor = self.list.ascend_jump(self.cursor),
            Action::Cancel => {
                if self.stack.depth() > 1 {
                    self.pop_screen();
                }
            }
            Action::Ok => return self.browse_select(session),
            Action::Refresh => {
                self.cursor = 0;
                self.need_refresh = true;
            }
            Action::Message => self.msg_force = true,
            _ => {}
        }
        DispatchSignal::Continue
    }

    fn browse_select(&mut self, session: &mut dyn GameSession) -> DispatchSignal {
        if self.list.is_empty() {
            return DispatchSignal::Continue;
        }
        let entry = self.list.get(self.cursor).expect("cursor is clamped").clone();
        let top_kind = self.stack.top().kind.clone();
        let top_path = self.stack.top().path.clone();

        match entry.kind {
            EntryKind::Directory => {
                let path = if top_path.as_os_str().is_empty() {
                    PathBuf::from(&entry.label)
                } else {
                    top_path.join(&entry.label)
                };
                self.push_screen(path, top_kind);
                DispatchSignal::Continue
            }
            EntryKind::UseDirectory => {
                if let ScreenKind::DirectoryPick(ps) = top_kind {
                    ps.apply(&mut self.settings, &top_path);
                    log::info!("{} set to {}", ps.label(), top_path.display());
                    if let Some(cursor) = self.stack.flush_to(&ScreenKind::PathOptions) {
                        self.cursor = cursor;
                    }
                    self.need_refresh = true;
                }
                DispatchSignal::Continue
            }
            EntryKind::Core => match top_kind {
                ScreenKind::CoreList => {
                    let core_path = top_path.join(&entry.label);
                    self.settings.current_core = Some(core_path.clone());
                    let load_no_rom = self
                        .registry
                        .by_path(&core_path)
                        .map(|c| c.load_no_rom)
                        .unwrap_or(false);
                    if load_no_rom {
                        // No content needed for this core, start right away.
                        self.pending = Some(PendingLoad { rom: None, core: core_path });
                        return self.leave_for(ModeRequest::LoadGame);
                    }
                    self.flush_to_root();
                    DispatchSignal::Continue
                }
                ScreenKind::DeferredCoreList => {
                    self.pending = Some(PendingLoad {
                        rom: Some(self.deferred_path.clone()),
                        core: PathBuf::from(&entry.label),
                    });
                    self.settings.current_core = Some(PathBuf::from(&entry.label));
                    self.leave_for(ModeRequest::LoadGame)
                }
                _ => DispatchSignal::Continue,
            },
            EntryKind::File => {
                let full = top_path.join(&entry.label);
                match top_kind {
                    ScreenKind::DiskAppend => match session.append_disk(&full) {
                        Ok(()) => self.leave_for(ModeRequest::ResumeGame),
                        Err(e) => {
                            self.post_message(e.to_string());
                            DispatchSignal::Continue
                        }
                    },
                    ScreenKind::Browse if self.defer_core => {
                        self.deferred_path = full;
                        let candidates = self.registry.supported_cores(&self.deferred_path);
                        match candidates.len() {
                            0 => {
                                // Surface it instead of silently doing nothing.
                                self.post_message("No cores support this file");
                                DispatchSignal::Continue
                            }
                            1 => {
                                let core = candidates[0].path.clone();
                                self.settings.current_core = Some(core.clone());
                                self.pending = Some(PendingLoad {
                                    rom: Some(self.deferred_path.clone()),
                                    core,
                                });
                                self.leave_for(ModeRequest::LoadGame)
                            }
                            _ => {
                                self.push_screen("", ScreenKind::DeferredCoreList);
                                DispatchSignal::Continue
                            }
                        }
                    }
                    _ => match self.settings.current_core.clone() {
                        Some(core) => {
                            self.pending = Some(PendingLoad { rom: Some(full), core });
                            self.leave_for(ModeRequest::LoadGame)
                        }
                        None => {
                            self.post_message("No core selected");
                            DispatchSignal::Continue
                        }
                    },
                }
            }
            _ => DispatchSignal::Continue,
        }
    }

    // --- custom bind screen -----------------------------------------------

    fn custom_bind_iterate(&mut self, binds: &mut dyn BindPoller) -> DispatchSignal {
        let bind = self
            .bind_session
            .as_mut()
            .expect("custom bind screen without an active bind session");

        match bind.iterate(binds.poll()) {
            BindProgress::Waiting => {}
            BindProgress::Advanced => {
                self.need_refresh = true;
                // avoid the fresh bind triggering menu actions right away
                self.input_prime = Some(Buttons::ALL);
            }
            BindProgress::Done => {
                let done = self.bind_session.take().expect("bind session present");
                for (button, spec) in done.into_binds() {
                    self.settings.joypad_binds.insert(button, spec);
                }
                self.pop_screen();
                self.input_prime = Some(Buttons::ALL);
            }
        }
        DispatchSignal::Continue
    }

    // --- screen resolver --------------------------------------------------

    fn resolve_if_needed(&mut self, game_loaded: bool) {
        if !self.need_refresh {
            return;
        }
        let kind = self.stack.top().kind.clone();
        match kind {
            ScreenKind::SettingsRoot | ScreenKind::PathOptions | ScreenKind::DiskOptions => {
                self.populate_static(&kind, game_loaded)
            }
            ScreenKind::DeferredCoreList => self.populate_deferred(),
            ScreenKind::CustomBind => self.list.clear(),
            _ => self.parse_and_resolve(&kind),
        }
        self.need_refresh = false;
        self.list.rebuild_jump_indices();

        // A refresh can shrink the list under the cursor. Clamp, never dangle.
        if self.list.is_empty() {
            self.cursor = 0;
        } else if self.cursor >= self.list.len() {
            self.cursor = self.list.len() - 1;
        }
    }

    fn current_core_label(&self) -> Option<String> {
        let core = self.settings.current_core.as_ref()?;
        if let Some(name) = self.registry.display_name_for(core) {
            return Some(name.to_string());
        }
        core.file_stem().map(|s| s.to_string_lossy().into_owned())
    }

    fn populate_static(&mut self, kind: &ScreenKind, game_loaded: bool) {
        self.list.clear();
        match kind {
            ScreenKind::SettingsRoot => {
                self.list.push("Core", EntryKind::Action(MenuAction::OpenCoreList), 0);
                if !self.registry.is_empty() {
                    self.list.push(
                        "Load Content (Detect Core)",
                        EntryKind::Action(MenuAction::LoadContentDetect),
                        0,
                    );
                }
                if let Some(name) = self.current_core_label() {
                    self.list.push(
                        format!("Load Content ({})", name),
                        EntryKind::Action(MenuAction::LoadContent),
                        0,
                    );
                }
                if game_loaded {
                    self.list.push("Save State", EntryKind::Action(MenuAction::SaveState), 0);
                    self.list.push("Load State", EntryKind::Action(MenuAction::LoadState), 0);
                    self.list
                        .push("Take Screenshot", EntryKind::Action(MenuAction::Screenshot), 0);
                    self.list
                        .push("Resume Content", EntryKind::Action(MenuAction::Resume), 0);
                    self.list
                        .push("Restart Content", EntryKind::Action(MenuAction::Restart), 0);
                    self.list
                        .push("Disk Options", EntryKind::Action(MenuAction::DiskOptions), 0);
                }
                for id in SettingId::ALL {
                    self.list.push(id.label(), EntryKind::Setting(id), 0);
                }
                self.list
                    .push("Path Options", EntryKind::Action(MenuAction::PathOptions), 0);
                self.list
                    .push("Rebind Controls", EntryKind::Action(MenuAction::RebindControls), 0);
                self.list.push(
                    "Restart Frontend",
                    EntryKind::Action(MenuAction::RestartFrontend),
                    0,
                );
                self.list
                    .push("Save New Config", EntryKind::Action(MenuAction::SaveNewConfig), 0);
                self.list.push("Quit", EntryKind::Action(MenuAction::Quit), 0);
            }
            ScreenKind::PathOptions => {
                for ps in PathSetting::ALL {
                    self.list.push(ps.label(), EntryKind::Path(ps), 0);
                }
            }
            ScreenKind::DiskOptions => {
                self.list.push("Disk Index", EntryKind::Action(MenuAction::DiskIndex), 0);
                self.list
                    .push("Disk Image Append", EntryKind::Action(MenuAction::DiskAppend), 0);
            }
            _ => {}
        }
    }

    fn browse_filter(&self, kind: &ScreenKind) -> ExtFilter {
        match kind {
            ScreenKind::CoreList => {
                ExtFilter::Extensions(vec![core_file_extension().to_string()])
            }
            ScreenKind::DirectoryPick(_) => ExtFilter::DirectoriesOnly,
            ScreenKind::Browse if self.defer_core => {
                ExtFilter::extensions(&self.registry.all_extensions())
            }
            ScreenKind::Browse | ScreenKind::DiskAppend => {
                let core = self.settings.current_core.as_ref();
                match core.and_then(|c| self.registry.by_path(c)) {
                    Some(info) => {
                        let mut exts = info.supported_extensions.clone();
                        // archives are always browsable alongside raw content
                        if !exts.iter().any(|e| e == "zip") {
                            exts.push("zip".to_string());
                        }
                        ExtFilter::extensions(&exts)
                    }
                    None => ExtFilter::Any,
                }
            }
            _ => ExtFilter::Any,
        }
    }

    fn parse_and_resolve(&mut self, kind: &ScreenKind) {
        self.list.clear();
        let dir = self.stack.top_path().to_path_buf();

        // An unset path lists the filesystem root as the only row.
        if dir.as_os_str().is_empty() {
            self.list.push("/", EntryKind::Directory, 0);
            return;
        }

        let filter = self.browse_filter(kind);
        let mut items = match self.browser.list(&dir, &filter) {
            Ok(items) => items,
            Err(e) => {
                // Empty list is the recovery; the cursor clamp handles it.
                log::warn!("failed to read {}: {}", dir.display(), e);
                return;
            }
        };
        sort_items(&mut items);

        let picking_dir = matches!(kind, ScreenKind::DirectoryPick(_));
        if picking_dir {
            self.list.push("<Use this directory>", EntryKind::UseDirectory, 0);
        }

        for (i, item) in items.into_iter().enumerate() {
            if picking_dir && !item.is_dir {
                continue;
            }
            let entry_kind = if item.is_dir {
                EntryKind::Directory
            } else if *kind == ScreenKind::CoreList {
                EntryKind::Core
            } else {
                EntryKind::File
            };
            self.list.push(item.name, entry_kind, i);
        }

        if *kind == ScreenKind::CoreList {
            for i in 0..self.list.len() {
                let label = match self.list.get(i) {
                    Some(e) if e.kind == EntryKind::Core => e.label.clone(),
                    _ => continue,
                };
                let path = dir.join(&label);
                if let Some(name) = self.registry.display_name_for(&path) {
                    let name = name.to_string();
                    self.list.set_alt(i, name);
                }
            }
            self.list.sort_on_alt();
        }
    }

    fn populate_deferred(&mut self) {
        self.list.clear();
        let candidates = self.registry.supported_cores(&self.deferred_path);
        for (i, core) in candidates.iter().enumerate() {
            self.list
                .push(core.path.display().to_string(), EntryKind::Core, i);
            self.list.set_alt(i, core.display_name.clone());
        }
        self.list.sort_on_alt();
    }

    // --- renderer view ----------------------------------------------------

    pub fn screen(&self) -> Screen<'_> {
        let top = self.stack.top();
        let title = match &top.kind {
            ScreenKind::SettingsRoot => "Main Menu".to_string(),
            ScreenKind::PathOptions => "Path Options".to_string(),
            ScreenKind::DiskOptions => "Disk Options".to_string(),
            ScreenKind::CoreList => "Cores".to_string(),
            ScreenKind::DeferredCoreList => "Pick a core".to_string(),
            ScreenKind::CustomBind => self
                .bind_session
                .as_ref()
                .map(|b| b.prompt())
                .unwrap_or_default(),
            ScreenKind::DirectoryPick(ps) => {
                format!("{}: {}", ps.label(), top.path.display())
            }
            _ => top.path.display().to_string(),
        };
        let values = self
            .list
            .iter()
            .map(|e| match &e.kind {
                EntryKind::Setting(id) => self.settings.value_label(*id).to_string(),
                EntryKind::Path(ps) => ps.get(&self.settings).display().to_string(),
                EntryKind::Directory => "(DIR)".to_string(),
                _ => String::new(),
            })
            .collect();

        Screen {
            title,
            entries: &self.list,
            values,
            cursor: self.cursor,
            need_refresh: self.need_refresh,
            msg_force: self.msg_force,
            message: self.message.as_deref(),
        }
    }

    #[cfg(test)]
    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    #[cfg(test)]
    pub(crate) fn top_kind(&self) -> ScreenKind {
        self.stack.top().kind.clone()
    }

    #[cfg(test)]
    pub(crate) fn entries(&self) -> &EntryList {
        &self.list
    }
}
