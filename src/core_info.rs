use std::path::{Path, PathBuf};

use crate::config::CoreEntry;

/// Dynamic library extension for core files on this platform.
pub fn core_file_extension() -> &'static str {
    if cfg!(target_os = "windows") {
        "dll"
    } else if cfg!(target_os = "macos") {
        "dylib"
    } else {
        "so"
    }
}

/// One installed core descriptor.
#[derive(Clone, Debug)]
pub struct CoreInfo {
    pub path: PathBuf,
    pub display_name: String,
    pub supported_extensions: Vec<String>,
    pub load_no_rom: bool,
}

/// Installed core descriptors, ordered by display name so candidate
/// resolution is deterministic across calls.
pub struct CoreRegistry {
    cores: Vec<CoreInfo>,
}

impl CoreRegistry {
    pub fn from_entries(entries: &[CoreEntry]) -> CoreRegistry {
        let mut cores: Vec<CoreInfo> = entries
            .iter()
            .map(|e| CoreInfo {
                path: PathBuf::from(&e.program),
                display_name: e.name.clone(),
                supported_extensions: e.extensions.iter().map(|x| x.to_lowercase()).collect(),
                load_no_rom: e.load_no_rom,
            })
            .collect();
        cores.sort_by(|a, b| {
            a.display_name
                .to_lowercase()
                .cmp(&b.display_name.to_lowercase())
        });
        CoreRegistry { cores }
    }

    pub fn is_empty(&self) -> bool {
        self.cores.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cores.len()
    }

    /// Union of every registered core's extensions, deduplicated and sorted.
    pub fn all_extensions(&self) -> Vec<String> {
        let mut exts: Vec<String> = self
            .cores
            .iter()
            .flat_map(|c| c.supported_extensions.iter().cloned())
            .collect();
        exts.sort();
        exts.dedup();
        exts
    }

    /// Cores whose extension set matches `file`, in registry order.
    pub fn supported_cores(&self, file: &Path) -> Vec<&CoreInfo> {
        let Some(ext) = file.extension().and_then(|s| s.to_str()) else {
            return Vec::new();
        };
        let ext = ext.to_lowercase();
        self.cores
            .iter()
            .filter(|c| c.supported_extensions.iter().any(|x| *x == ext))
            .collect()
    }

    /// Descriptor for a core file path, matched on file name so a core list
    /// row can be resolved wherever the file was found.
    pub fn by_path(&self, path: &Path) -> Option<&CoreInfo> {
        self.cores
            .iter()
            .find(|c| c.path == path || c.path.file_name() == path.file_name())
    }

    pub fn display_name_for(&self, path: &Path) -> Option<&str> {
        self.by_path(path).map(|c| c.display_name.as_str())
    }
}
