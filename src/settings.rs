use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::{self, ConfigError, ConfigFile, CoreEntry};
use crate::input::Action;

/// Failure policy profile for the lifecycle driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Profile {
    Desktop,
    Console,
}

impl Profile {
    fn parse(s: Option<&str>) -> Profile {
        match s {
            Some("console") => Profile::Console,
            _ => Profile::Desktop,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Profile::Desktop => "desktop",
            Profile::Console => "console",
        }
    }
}

/// Toggleable boolean settings shown on the root menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingId {
    RewindEnable,
    SramAutosave,
    ConfigSaveOnExit,
    AudioMute,
}

impl SettingId {
    pub const ALL: [SettingId; 4] = [
        SettingId::RewindEnable,
        SettingId::SramAutosave,
        SettingId::ConfigSaveOnExit,
        SettingId::AudioMute,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SettingId::RewindEnable => "Rewind",
            SettingId::SramAutosave => "SRAM Autosave",
            SettingId::ConfigSaveOnExit => "Save Config On Exit",
            SettingId::AudioMute => "Mute Audio",
        }
    }
}

/// Configurable directories, each editable through a directory-pick screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathSetting {
    BrowserDir,
    CoresDir,
    ConfigDir,
    SavestateDir,
    SavefileDir,
    SystemDir,
    ScreenshotDir,
}

impl PathSetting {
    pub const ALL: [PathSetting; 7] = [
        PathSetting::BrowserDir,
        PathSetting::CoresDir,
        PathSetting::ConfigDir,
        PathSetting::SavestateDir,
        PathSetting::SavefileDir,
        PathSetting::SystemDir,
        PathSetting::ScreenshotDir,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PathSetting::BrowserDir => "Browser Directory",
            PathSetting::CoresDir => "Core Directory",
            PathSetting::ConfigDir => "Config Directory",
            PathSetting::SavestateDir => "Savestate Directory",
            PathSetting::SavefileDir => "Savefile Directory",
            PathSetting::SystemDir => "System Directory",
            PathSetting::ScreenshotDir => "Screenshot Directory",
        }
    }

    pub fn get(self, s: &Settings) -> &Path {
        match self {
            PathSetting::BrowserDir => &s.browser_dir,
            PathSetting::CoresDir => &s.cores_dir,
            PathSetting::ConfigDir => &s.config_dir,
            PathSetting::SavestateDir => &s.savestate_dir,
            PathSetting::SavefileDir => &s.savefile_dir,
            PathSetting::SystemDir => &s.system_dir,
            PathSetting::ScreenshotDir => &s.screenshot_dir,
        }
    }

    pub fn apply(self, s: &mut Settings, dir: &Path) {
        let dir = dir.to_path_buf();
        match self {
            PathSetting::BrowserDir => s.browser_dir = dir,
            PathSetting::CoresDir => s.cores_dir = dir,
            PathSetting::ConfigDir => s.config_dir = dir,
            PathSetting::SavestateDir => s.savestate_dir = dir,
            PathSetting::SavefileDir => s.savefile_dir = dir,
            PathSetting::SystemDir => s.system_dir = dir,
            PathSetting::ScreenshotDir => s.screenshot_dir = dir,
        }
    }
}

/// Immediate actions selectable from settings screens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuAction {
    OpenCoreList,
    LoadContentDetect,
    LoadContent,
    PathOptions,
    DiskOptions,
    DiskIndex,
    DiskAppend,
    RebindControls,
    SaveState,
    LoadState,
    Screenshot,
    Resume,
    Restart,
    RestartFrontend,
    SaveNewConfig,
    Quit,
}

/// Runtime settings, loaded from the config file at startup and written back
/// on save. The single mutable copy lives on the menu context.
#[derive(Clone, Debug)]
pub struct Settings {
    pub browser_dir: PathBuf,
    pub cores_dir: PathBuf,
    pub config_dir: PathBuf,
    pub savestate_dir: PathBuf,
    pub savefile_dir: PathBuf,
    pub system_dir: PathBuf,
    pub screenshot_dir: PathBuf,
    pub config_save_on_exit: bool,
    pub rewind_enable: bool,
    pub sram_autosave: bool,
    pub audio_mute: bool,
    pub frame_rate: f32,
    pub profile: Profile,
    pub current_core: Option<PathBuf>,
    pub joypad_binds: HashMap<String, String>,
    pub cores: Vec<CoreEntry>,
}

impl Settings {
    pub fn from_config(cfg: &ConfigFile) -> Settings {
        let dir = |v: &Option<String>| PathBuf::from(v.clone().unwrap_or_default());
        Settings {
            browser_dir: dir(&cfg.browser_directory),
            cores_dir: dir(&cfg.cores_directory),
            config_dir: dir(&cfg.config_directory),
            savestate_dir: dir(&cfg.savestate_directory),
            savefile_dir: dir(&cfg.savefile_directory),
            system_dir: dir(&cfg.system_directory),
            screenshot_dir: dir(&cfg.screenshot_directory),
            config_save_on_exit: cfg.config_save_on_exit.unwrap_or(false),
            rewind_enable: cfg.rewind_enable.unwrap_or(false),
            sram_autosave: cfg.sram_autosave.unwrap_or(false),
            audio_mute: cfg.audio_mute.unwrap_or(false),
            frame_rate: cfg.frame_rate.unwrap_or(60.0),
            profile: Profile::parse(cfg.profile.as_deref()),
            current_core: cfg.current_core.as_ref().map(PathBuf::from),
            joypad_binds: cfg.joypad_binds.clone().unwrap_or_default(),
            cores: cfg.cores.clone().unwrap_or_default(),
        }
    }

    pub fn to_config(&self) -> ConfigFile {
        let dir = |p: &Path| {
            if p.as_os_str().is_empty() {
                None
            } else {
                Some(p.display().to_string())
            }
        };
        ConfigFile {
            browser_directory: dir(&self.browser_dir),
            cores_directory: dir(&self.cores_dir),
            config_directory: dir(&self.config_dir),
            savestate_directory: dir(&self.savestate_dir),
            savefile_directory: dir(&self.savefile_dir),
            system_directory: dir(&self.system_dir),
            screenshot_directory: dir(&self.screenshot_dir),
            config_save_on_exit: Some(self.config_save_on_exit),
            rewind_enable: Some(self.rewind_enable),
            sram_autosave: Some(self.sram_autosave),
            audio_mute: Some(self.audio_mute),
            frame_rate: Some(self.frame_rate),
            profile: Some(self.profile.as_str().to_string()),
            current_core: self.current_core.as_ref().map(|p| p.display().to_string()),
            joypad_binds: if self.joypad_binds.is_empty() {
                None
            } else {
                Some(self.joypad_binds.clone())
            },
            cores: if self.cores.is_empty() {
                None
            } else {
                Some(self.cores.clone())
            },
        }
    }

    pub fn get(&self, id: SettingId) -> bool {
        match id {
            SettingId::RewindEnable => self.rewind_enable,
            SettingId::SramAutosave => self.sram_autosave,
            SettingId::ConfigSaveOnExit => self.config_save_on_exit,
            SettingId::AudioMute => self.audio_mute,
        }
    }

    fn set(&mut self, id: SettingId, value: bool) {
        match id {
            SettingId::RewindEnable => self.rewind_enable = value,
            SettingId::SramAutosave => self.sram_autosave = value,
            SettingId::ConfigSaveOnExit => self.config_save_on_exit = value,
            SettingId::AudioMute => self.audio_mute = value,
        }
    }

    /// Ok/Left/Right flip a boolean setting, Start restores its default.
    pub fn toggle(&mut self, id: SettingId, action: Action) {
        match action {
            Action::Ok | Action::Left | Action::Right => {
                let v = self.get(id);
                self.set(id, !v);
            }
            Action::Start => self.set(id, false),
            _ => {}
        }
    }

    pub fn value_label(&self, id: SettingId) -> &'static str {
        if self.get(id) {
            "ON"
        } else {
            "OFF"
        }
    }

    /// Write the current state back to the user config location.
    pub fn save(&self) -> Result<(), ConfigError> {
        config::save(&self.to_config())
    }

    /// Save a new config under a name inferred from the current core:
    /// `<core>.cfg`, then `<core>-1.cfg` and so on when taken.
    pub fn save_new_config(&self) -> Result<PathBuf, ConfigError> {
        if self.config_dir.as_os_str().is_empty() {
            log::warn!("config directory not set, cannot save new config");
            return Err(ConfigError::NoPath);
        }

        let stem = self
            .current_core
            .as_ref()
            .and_then(|p| p.file_stem())
            .and_then(|s| s.to_str())
            .unwrap_or("retro_frontend")
            .to_string();

        // In case of collision, find an alternative name.
        let mut target = None;
        for i in 0..16 {
            let name = if i == 0 {
                format!("{}.cfg", stem)
            } else {
                format!("{}-{}.cfg", stem, i)
            };
            let candidate = self.config_dir.join(name);
            if !candidate.exists() {
                target = Some(candidate);
                break;
            }
        }
        let target = target.ok_or(ConfigError::NoPath)?;
        config::write_to(&target, &self.to_config())?;
        Ok(target)
    }
}
