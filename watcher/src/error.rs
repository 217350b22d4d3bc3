//! Error types for the watcher.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Errors that can occur while watching or scanning.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Watch root does not exist.
    #[error("watch root not found: {0}")]
    RootNotFound(String),

    /// Watch root is not a directory.
    #[error("watch root is not a directory: {0}")]
    NotADirectory(String),

    /// Inclusion pattern failed to compile.
    #[error("invalid inclusion pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Structurally invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// A directory could not be registered with the notification backend.
    #[error("unable to register directory {path}: {source}")]
    Registration {
        path: String,
        #[source]
        source: notify::Error,
    },

    /// The external action exceeded its deadline.
    #[error("action timed out after {timeout:?} for {path}")]
    ActionTimeout { path: String, timeout: Duration },

    /// The external action exited with a failure status.
    #[error("action failed for {path} (status {status:?}): {output}")]
    ActionFailed {
        path: String,
        status: Option<i32>,
        output: String,
    },

    /// Notify error.
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    /// Directory traversal error.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatcherError {
    /// Whether this error must abort startup.
    ///
    /// Only structural misconfiguration is fatal; registration and action
    /// failures are contained within the loop and surfaced via logs.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::RootNotFound(_)
                | Self::NotADirectory(_)
                | Self::InvalidPattern { .. }
                | Self::Config(_)
        )
    }
}
