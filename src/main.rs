mod bind;
mod config;
mod core_info;
mod emu;
mod input;
mod lifecycle;
mod list;
mod menu;
mod nav;
mod render;
mod scan;
#[cfg(feature = "sdl2-frontend")]
mod sdl;
mod session;
mod settings;
#[cfg(not(feature = "sdl2-frontend"))]
mod term;

use std::path::PathBuf;

#[cfg(not(feature = "sdl2-frontend"))]
use anyhow::Context;

use crate::emu::ProcessSession;
use crate::lifecycle::{ExitStatus, Frontend};
use crate::menu::MenuContext;
use crate::scan::FsBrowser;
use crate::settings::Settings;

fn run_once(roms_args: &[String]) -> anyhow::Result<ExitStatus> {
    let cfg = config::load();
    let settings = Settings::from_config(&cfg);
    let session = Box::new(ProcessSession::new(settings.cores.clone()));
    let mut menu = MenuContext::new(settings, Box::new(FsBrowser));

    // Optional positional content: ROM [CORE]. Without an explicit core the
    // registry must resolve exactly one candidate.
    if let Some(rom) = roms_args.first() {
        let rom = PathBuf::from(rom);
        let core = match roms_args.get(1) {
            Some(c) => Some(PathBuf::from(c)),
            None => menu.resolve_core_for(&rom),
        };
        match core {
            Some(core) => menu.stage_load(Some(rom), core),
            None => log::warn!(
                "no single core matches {}, pick one from the menu",
                rom.display()
            ),
        }
    }

    #[cfg(feature = "sdl2-frontend")]
    {
        let (input, renderer, binds) = sdl::init().map_err(anyhow::Error::msg)?;
        let mut frontend = Frontend::new(
            menu,
            session,
            Box::new(input),
            Box::new(renderer),
            Box::new(binds),
        );
        Ok(frontend.run())
    }

    #[cfg(not(feature = "sdl2-frontend"))]
    {
        let input = term::TermPoller::new().context("failed to enter raw terminal mode")?;
        let binds = Box::new(input.bind_poller());
        let renderer = Box::new(render::TextRenderer::new());
        let mut frontend = Frontend::new(menu, session, Box::new(input), renderer, binds);
        Ok(frontend.run())
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    // "Restart Frontend" tears everything down and starts over with a fresh
    // config read.
    loop {
        match run_once(&args)? {
            ExitStatus::Quit => break,
            ExitStatus::Restart => log::info!("restarting frontend"),
        }
    }
    Ok(())
}
