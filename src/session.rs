use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to start emulator: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("no core selected")]
    NoCore,
    #[error("{0} is not supported by this session backend")]
    Unsupported(&'static str),
}

/// Result of one game-mode tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStep {
    /// Game still running.
    Running,
    /// The game asked for the menu.
    MenuRequested,
    /// The game ended on its own.
    Finished,
}

/// The emulation side of the frontend, consumed through this narrow
/// contract. Loading must be safe to call again after `unload`.
pub trait GameSession {
    fn load(&mut self, rom: Option<&Path>, core: &Path) -> Result<(), SessionError>;
    fn step(&mut self) -> SessionStep;
    fn is_loaded(&self) -> bool;
    fn unload(&mut self);

    fn save_state(&mut self) -> Result<(), SessionError> {
        Err(SessionError::Unsupported("save state"))
    }
    fn load_state(&mut self) -> Result<(), SessionError> {
        Err(SessionError::Unsupported("load state"))
    }
    fn screenshot(&mut self) -> Result<(), SessionError> {
        Err(SessionError::Unsupported("screenshot"))
    }
    fn reset(&mut self) -> Result<(), SessionError> {
        Err(SessionError::Unsupported("reset"))
    }
    fn append_disk(&mut self, _image: &Path) -> Result<(), SessionError> {
        Err(SessionError::Unsupported("disk append"))
    }
    /// Cycle to the next disk slot, returning the new index.
    fn next_disk_index(&mut self) -> Result<usize, SessionError> {
        Err(SessionError::Unsupported("disk index"))
    }
}
