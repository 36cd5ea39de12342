//! Error types for mirrorgen
//!
//! Errors fall into three groups:
//!
//! - **Configuration errors** (missing root, bad conventions, bad exclude
//!   patterns) are detected before anything is written and abort the run.
//! - **Scan errors** for entries that vanish mid-walk are recovered locally by
//!   omitting the entry; see [`MirrorError::is_vanished`].
//! - **Write errors** abort the run. Records already written stay in place.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the mirrorgen library
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Main error type for all mirrorgen operations
#[derive(Debug, Error)]
pub enum MirrorError {
    /// I/O errors during filesystem reads
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Mirror root does not exist
    #[error("Root does not exist: {0:?}")]
    RootNotFound(PathBuf),

    /// Mirror root exists but is not a directory
    #[error("Root is not a directory: {0:?}")]
    RootNotDirectory(PathBuf),

    /// Invalid conventions or builder settings
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Exclude pattern failed to compile
    #[error("Invalid exclude pattern: {0}")]
    InvalidPattern(String),

    /// Failed to create, write or rename a record file
    #[error("Failed to persist {path:?}: {source}")]
    Persist {
        /// Destination of the failed write
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Walk directory error from walkdir crate
    #[error("Walk directory error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MirrorError {
    /// Create a configuration error with a custom message
    pub fn configuration(msg: impl Into<String>) -> Self {
        MirrorError::InvalidConfiguration(msg.into())
    }

    /// Create an internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        MirrorError::Internal(msg.into())
    }

    /// Create a persist error for `path`
    pub fn persist(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MirrorError::Persist {
            path: path.into(),
            source,
        }
    }

    /// Check if this error is a fatal configuration problem
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            MirrorError::RootNotFound(_)
                | MirrorError::RootNotDirectory(_)
                | MirrorError::InvalidConfiguration(_)
                | MirrorError::InvalidPattern(_)
        )
    }

    /// Check if this error means the entry disappeared between listing and stat
    pub fn is_vanished(&self) -> bool {
        match self {
            MirrorError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            MirrorError::WalkDir(e) => e
                .io_error()
                .map(|io| io.kind() == std::io::ErrorKind::NotFound)
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        if self.is_configuration() {
            2
        } else {
            1
        }
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            MirrorError::RootNotFound(path) => {
                format!("Root does not exist: {}", path.display())
            }
            MirrorError::RootNotDirectory(path) => {
                format!("Root {} is not a directory. Pass the mirror's top-level directory.", path.display())
            }
            MirrorError::Persist { path, source } => {
                format!(
                    "Could not write {}: {}. Check that the mirror is writable.",
                    path.display(),
                    source
                )
            }
            _ => self.to_string(),
        }
    }
}
