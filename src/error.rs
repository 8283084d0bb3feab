use std::path::PathBuf;

use thiserror::Error;

/// Result alias for model2ts operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the watch/generate pipeline.
///
/// The variants follow how each failure is treated: configuration and
/// filesystem errors are fatal outside of a running watch, generation errors
/// are fatal only in one-shot mode.
#[derive(Error, Debug)]
pub enum Error {
    /// A manifest or descriptor could not be read or lacks the expected data.
    #[error("{0}")]
    Config(String),

    /// The external generator exited unsuccessfully or could not be spawned.
    #[error("Error generating TypeScript definitions from {models}: {stderr}")]
    Generation {
        models: &'static str,
        source_path: PathBuf,
        stderr: String,
    },

    /// A target path does not exist or cannot be inspected.
    #[error("{}: {message}", path.display())]
    Filesystem { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("watcher error: {0}")]
    Watch(#[from] notify::Error),
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    pub(crate) fn filesystem(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Error::Filesystem {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
