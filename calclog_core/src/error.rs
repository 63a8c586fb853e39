//! Error types for the calclog_core library.

use std::io;
use std::path::PathBuf;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for calclog_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The persisted history could not be read or parsed
    #[error("Could not load history from {path:?}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    /// A snapshot, export or backup could not be written
    #[error("Could not write {path:?}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    /// Invalid request from the caller (blank search, unknown id, ...)
    #[error("{0}")]
    Usage(String),

    /// The ledger has no entries to operate on
    #[error("No calculations in history")]
    EmptyLedger,

    /// Backup failed, so the destructive clear was not performed
    #[error("Backup failed, history was not cleared: {source}")]
    BackupGate {
        #[source]
        source: Box<Error>,
    },

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Wrap an error as a write failure for `path`
    pub fn save(path: impl Into<PathBuf>, source: impl Into<Error>) -> Self {
        Error::Save {
            path: path.into(),
            source: Box::new(source.into()),
        }
    }

    /// Wrap an error as a read failure for `path`
    pub fn load(path: impl Into<PathBuf>, source: impl Into<Error>) -> Self {
        Error::Load {
            path: path.into(),
            source: Box::new(source.into()),
        }
    }

    /// True for conditions the caller caused and can correct
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Usage(_))
    }
}
