use std::io;
use std::path::Path;

/// One directory entry as seen by the menu.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirItem {
    pub name: String,
    pub is_dir: bool,
}

/// What the current screen wants listed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExtFilter {
    /// Everything (directories always pass).
    Any,
    /// Directories only.
    DirectoriesOnly,
    /// Files whose extension matches one of these, compared lowercase.
    Extensions(Vec<String>),
}

impl ExtFilter {
    pub fn extensions(exts: &[String]) -> ExtFilter {
        if exts.is_empty() {
            ExtFilter::Any
        } else {
            ExtFilter::Extensions(exts.iter().map(|e| e.to_lowercase()).collect())
        }
    }

    fn accepts_file(&self, name: &str) -> bool {
        match self {
            ExtFilter::Any => true,
            ExtFilter::DirectoriesOnly => false,
            ExtFilter::Extensions(exts) => {
                let ext = Path::new(name)
                    .extension()
                    .and_then(|s| s.to_str())
                    .map(|s| s.to_lowercase());
                match ext {
                    Some(e) => exts.iter().any(|x| *x == e),
                    None => false,
                }
            }
        }
    }
}

/// Filesystem listing seam. The menu resolver never touches `std::fs`
/// directly so screens can be populated from fakes in tests.
pub trait DirBrowser {
    fn list(&self, dir: &Path, filter: &ExtFilter) -> io::Result<Vec<DirItem>>;
}

/// Real directory browser.
pub struct FsBrowser;

impl DirBrowser for FsBrowser {
    fn list(&self, dir: &Path, filter: &ExtFilter) -> io::Result<Vec<DirItem>> {
        let mut items = Vec::new();
        for entry in dir.read_dir()? {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log::warn!("skipping unreadable entry in {}: {}", dir.display(), e);
                    continue;
                }
            };
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            // dotfiles are never interesting in a content browser
            if name.starts_with('.') {
                continue;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir || filter.accepts_file(&name) {
                items.push(DirItem { name, is_dir });
            }
        }
        Ok(items)
    }
}

/// Directories first, then case-insensitive by name. Callers sort after
/// listing, matching the browser contract.
pub fn sort_items(items: &mut [DirItem]) {
    items.sort_by(|a, b| {
        b.is_dir
            .cmp(&a.is_dir)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
}
