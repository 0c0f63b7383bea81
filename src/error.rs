// Error types module

use std::fmt;
use std::path::{Path, PathBuf};

/// Errors at the application edge: configuration and file I/O.
///
/// Watermarking itself never fails from the caller's point of view; see
/// [`crate::watermark::WatermarkError`] for the engine's internal errors.
#[derive(Debug, Clone)]
pub enum IntakeError {
    /// Configuration errors (invalid YAML, missing env vars, bad limits)
    Config(String),

    /// Reading an upload from disk failed
    Read { path: PathBuf, message: String },

    /// Writing an attachment or the manifest failed
    Write { path: PathBuf, message: String },

    /// Logging could not be initialised
    Logging(String),
}

impl IntakeError {
    pub fn read(path: impl AsRef<Path>, err: impl fmt::Display) -> Self {
        IntakeError::Read {
            path: path.as_ref().to_path_buf(),
            message: err.to_string(),
        }
    }

    pub fn write(path: impl AsRef<Path>, err: impl fmt::Display) -> Self {
        IntakeError::Write {
            path: path.as_ref().to_path_buf(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for IntakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntakeError::Config(msg) => write!(f, "Configuration error: {}", msg),
            IntakeError::Read { path, message } => {
                write!(f, "Failed to read '{}': {}", path.display(), message)
            }
            IntakeError::Write { path, message } => {
                write!(f, "Failed to write '{}': {}", path.display(), message)
            }
            IntakeError::Logging(msg) => write!(f, "Logging error: {}", msg),
        }
    }
}

impl std::error::Error for IntakeError {}
