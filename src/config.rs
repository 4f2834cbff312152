use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no config path available")]
    NoPath,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// One installed core: how to launch it and which content it accepts.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CoreEntry {
    pub name: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub load_no_rom: bool,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct ConfigFile {
    pub browser_directory: Option<String>,
    pub cores_directory: Option<String>,
    pub config_directory: Option<String>,
    pub savestate_directory: Option<String>,
    pub savefile_directory: Option<String>,
    pub system_directory: Option<String>,
    pub screenshot_directory: Option<String>,
    pub config_save_on_exit: Option<bool>,
    pub rewind_enable: Option<bool>,
    pub sram_autosave: Option<bool>,
    pub audio_mute: Option<bool>,
    pub frame_rate: Option<f32>,
    pub profile: Option<String>,
    pub current_core: Option<String>,
    pub joypad_binds: Option<HashMap<String, String>>,
    pub cores: Option<Vec<CoreEntry>>,
}

pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        let mut p = PathBuf::from(xdg);
        p.push("retro_frontend");
        p.push("config.toml");
        Some(p)
    } else if let Some(home) = dirs::home_dir() {
        let mut p = home;
        p.push(".config/retro_frontend/config.toml");
        Some(p)
    } else {
        None
    }
}

fn write_default_config(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let sample = include_str!("../config.sample.toml");
    // atomic write
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, sample.as_bytes())?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn builtin_defaults() -> ConfigFile {
    ConfigFile {
        browser_directory: Some("./roms".to_string()),
        cores_directory: Some("/usr/lib/libretro".to_string()),
        config_save_on_exit: Some(false),
        rewind_enable: Some(false),
        sram_autosave: Some(false),
        audio_mute: Some(false),
        frame_rate: Some(60.0),
        profile: Some("desktop".to_string()),
        ..ConfigFile::default()
    }
}

/// Merge `parsed` over `cfg`, field by field: a value present in the file
/// wins over the built-in default.
fn merge(cfg: &mut ConfigFile, parsed: ConfigFile) {
    macro_rules! take {
        ($field:ident) => {
            if parsed.$field.is_some() {
                cfg.$field = parsed.$field;
            }
        };
    }
    take!(browser_directory);
    take!(cores_directory);
    take!(config_directory);
    take!(savestate_directory);
    take!(savefile_directory);
    take!(system_directory);
    take!(screenshot_directory);
    take!(config_save_on_exit);
    take!(rewind_enable);
    take!(sram_autosave);
    take!(audio_mute);
    take!(frame_rate);
    take!(profile);
    take!(current_core);
    take!(joypad_binds);
    take!(cores);
}

/// Parse the file at `path` merged over the built-in defaults.
pub fn load_from(path: &Path) -> Result<ConfigFile, ConfigError> {
    let mut cfg = builtin_defaults();
    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = toml::from_str(&contents)?;
    merge(&mut cfg, parsed);
    Ok(cfg)
}

/// Load the user config, writing the sample on first run. Falls back to the
/// built-in defaults when the file is missing or malformed.
pub fn load() -> ConfigFile {
    let Some(p) = user_config_path() else {
        return builtin_defaults();
    };
    if !p.exists() {
        if let Err(e) = write_default_config(&p) {
            log::warn!("failed to write default config: {}", e);
        }
    }
    match load_from(&p) {
        Ok(cfg) => cfg,
        Err(e) => {
            log::warn!("failed to load config at {}: {}", p.display(), e);
            builtin_defaults()
        }
    }
}

/// Serialize `cfg` to `path` atomically via a temp sibling.
pub fn write_to(path: &Path, cfg: &ConfigFile) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let s = toml::to_string_pretty(cfg)?;
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, s.as_bytes())?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

pub fn save(cfg: &ConfigFile) -> Result<(), ConfigError> {
    let p = user_config_path().ok_or(ConfigError::NoPath)?;
    write_to(&p, cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.toml");
        std::fs::write(&p, "browser_directory = \"/srv/roms\"\n").unwrap();

        let cfg = load_from(&p).unwrap();
        assert_eq!(cfg.browser_directory.as_deref(), Some("/srv/roms"));
        assert_eq!(cfg.frame_rate, Some(60.0));
        assert_eq!(cfg.profile.as_deref(), Some("desktop"));
    }

    #[test]
    fn save_and_reload_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.toml");

        let mut cfg = builtin_defaults();
        cfg.rewind_enable = Some(true);
        cfg.cores = Some(vec![CoreEntry {
            name: "Nestopia".to_string(),
            program: "/usr/lib/libretro/nestopia_libretro.so".to_string(),
            args: vec!["{rom}".to_string()],
            extensions: vec!["nes".to_string()],
            load_no_rom: false,
        }]);
        write_to(&p, &cfg).unwrap();

        let reread = load_from(&p).unwrap();
        assert_eq!(reread.rewind_enable, Some(true));
        let cores = reread.cores.unwrap();
        assert_eq!(cores.len(), 1);
        assert_eq!(cores[0].name, "Nestopia");
        assert_eq!(cores[0].extensions, vec!["nes"]);
        // atomic write leaves no temp sibling behind
        assert!(!p.with_extension("toml.tmp").exists());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.toml");
        std::fs::write(&p, "not valid = [toml").unwrap();
        assert!(matches!(load_from(&p), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn sample_config_parses() {
        let parsed: ConfigFile = toml::from_str(include_str!("../config.sample.toml")).unwrap();
        assert!(parsed.cores.unwrap().len() >= 2);
    }
}
