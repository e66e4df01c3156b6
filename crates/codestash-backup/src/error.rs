//! Error types for backup runs.

use crate::engine::BackupResult;
use thiserror::Error;

/// Result type alias using the backup error type.
pub type Result<T> = std::result::Result<T, BackupError>;

/// Failure categories of a backup run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackupError {
    /// Invalid or missing configuration, including invalid project paths
    #[error("Configuration error: {0}")]
    Config(String),

    /// Deliberate early termination requested by the caller
    #[error("Backup cancelled by user")]
    Cancelled,

    /// Unexpected filesystem or archival failure
    #[error("I/O failure: {0}")]
    Io(String),
}

impl BackupError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an I/O failure
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    /// Whether this is a cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<std::io::Error> for BackupError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<codestash_core::Error> for BackupError {
    fn from(err: codestash_core::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<walkdir::Error> for BackupError {
    fn from(err: walkdir::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<zip::result::ZipError> for BackupError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Io(err.to_string())
    }
}

/// A failed run together with everything recorded before the failure.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct BackupFailure {
    pub error: BackupError,
    pub partial: Box<BackupResult>,
}

impl BackupFailure {
    pub fn new(error: BackupError, partial: BackupResult) -> Self {
        Self {
            error,
            partial: Box::new(partial),
        }
    }
}
