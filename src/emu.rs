use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::time::{Duration, Instant};

use crate::config::CoreEntry;
use crate::session::{GameSession, SessionError, SessionStep};

const STEP_POLL: Duration = Duration::from_millis(150);
const KILL_GRACE: Duration = Duration::from_secs(1);

/// Runs content through an external emulator process. The core path selects
/// the program; a matching config entry supplies the argument template, with
/// `{rom}` replaced by the content path.
pub struct ProcessSession {
    cores: Vec<CoreEntry>,
    child: Option<Child>,
    last_command: Option<(PathBuf, Vec<OsString>)>,
}

impl ProcessSession {
    pub fn new(cores: Vec<CoreEntry>) -> ProcessSession {
        ProcessSession {
            cores,
            child: None,
            last_command: None,
        }
    }

    fn template_for(&self, core: &Path) -> Option<&CoreEntry> {
        self.cores.iter().find(|c| {
            let p = Path::new(&c.program);
            p == core || p.file_name() == core.file_name()
        })
    }

    fn build_args(&self, core: &Path, rom: Option<&Path>) -> Vec<OsString> {
        match self.template_for(core) {
            Some(tmpl) if !tmpl.args.is_empty() => {
                let mut args = Vec::new();
                for a in &tmpl.args {
                    if a == "{rom}" {
                        if let Some(rom) = rom {
                            args.push(rom.as_os_str().to_owned());
                        }
                    } else {
                        args.push(OsString::from(a));
                    }
                }
                args
            }
            _ => rom.map(|r| vec![r.as_os_str().to_owned()]).unwrap_or_default(),
        }
    }

    fn spawn(&mut self, program: &Path, args: &[OsString]) -> Result<(), SessionError> {
        let child = Command::new(program).args(args).spawn()?;
        log::info!("launched {} with pid={}", program.display(), child.id());
        self.child = Some(child);
        Ok(())
    }

    fn kill_child(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Err(e) = child.kill() {
            log::warn!("failed to kill emulator: {}", e);
            return;
        }
        // poll for exit briefly so we do not leave a zombie behind
        let start = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    log::info!("emulator killed (status: {})", status);
                    return;
                }
                Ok(None) => {
                    if start.elapsed() > KILL_GRACE {
                        log::warn!("emulator kill signalled but still running");
                        return;
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(e) => {
                    log::warn!("error waiting for emulator: {}", e);
                    return;
                }
            }
        }
    }
}

impl GameSession for ProcessSession {
    fn load(&mut self, rom: Option<&Path>, core: &Path) -> Result<(), SessionError> {
        if self.child.is_some() {
            self.unload();
        }
        let args = self.build_args(core, rom);
        self.spawn(core, &args)?;
        self.last_command = Some((core.to_path_buf(), args));
        Ok(())
    }

    fn step(&mut self) -> SessionStep {
        let Some(child) = self.child.as_mut() else {
            return SessionStep::Finished;
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                log::info!("emulator exited with {}", status);
                self.child = None;
                SessionStep::Finished
            }
            Ok(None) => {
                std::thread::sleep(STEP_POLL);
                SessionStep::Running
            }
            Err(e) => {
                log::warn!("emulator wait error: {}", e);
                self.child = None;
                SessionStep::Finished
            }
        }
    }

    fn is_loaded(&self) -> bool {
        self.child.is_some()
    }

    fn unload(&mut self) {
        self.kill_child();
    }

    fn reset(&mut self) -> Result<(), SessionError> {
        let (program, args) = self
            .last_command
            .clone()
            .ok_or(SessionError::NoCore)?;
        self.kill_child();
        self.spawn(&program, &args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(program: &str, args: &[&str]) -> CoreEntry {
        CoreEntry {
            name: "Test".to_string(),
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            extensions: vec![],
            load_no_rom: false,
        }
    }

    #[test]
    fn args_substitute_rom_placeholder() {
        let s = ProcessSession::new(vec![entry("/cores/genplus.so", &["--fullscreen", "{rom}"])]);
        let args = s.build_args(Path::new("/cores/genplus.so"), Some(Path::new("/roms/s3.smd")));
        assert_eq!(args, vec![OsString::from("--fullscreen"), OsString::from("/roms/s3.smd")]);
    }

    #[test]
    fn unknown_core_falls_back_to_bare_rom_arg() {
        let s = ProcessSession::new(vec![]);
        let args = s.build_args(Path::new("/cores/other.so"), Some(Path::new("/roms/a.nes")));
        assert_eq!(args, vec![OsString::from("/roms/a.nes")]);
        assert!(s.build_args(Path::new("/cores/other.so"), None).is_empty());
    }

    #[test]
    fn template_matches_on_file_name() {
        let s = ProcessSession::new(vec![entry("/usr/lib/libretro/nestopia.so", &["{rom}"])]);
        assert!(s.template_for(Path::new("/elsewhere/nestopia.so")).is_some());
        assert!(s.template_for(Path::new("/elsewhere/unknown.so")).is_none());
    }

    #[test]
    fn load_spawns_and_unload_reaps() {
        // `sleep` stands in for an emulator binary.
        let mut s = ProcessSession::new(vec![entry("/bin/sleep", &["5"])]);
        s.load(None, Path::new("/bin/sleep")).unwrap();
        assert!(s.is_loaded());
        assert_eq!(s.step(), SessionStep::Running);
        s.unload();
        assert!(!s.is_loaded());
        assert_eq!(s.step(), SessionStep::Finished);
    }

    #[test]
    fn finished_child_reports_finished() {
        let mut s = ProcessSession::new(vec![entry("/bin/true", &[])]);
        s.load(None, Path::new("/bin/true")).unwrap();
        // give the process a moment to exit
        std::thread::sleep(Duration::from_millis(100));
        let mut saw_finished = false;
        for _ in 0..20 {
            if s.step() == SessionStep::Finished {
                saw_finished = true;
                break;
            }
        }
        assert!(saw_finished);
        assert!(!s.is_loaded());
    }

    #[test]
    fn load_failure_surfaces_spawn_error() {
        let mut s = ProcessSession::new(vec![]);
        let err = s.load(None, Path::new("/nonexistent/emulator"));
        assert!(matches!(err, Err(SessionError::Spawn(_))));
        assert!(!s.is_loaded());
    }
}
