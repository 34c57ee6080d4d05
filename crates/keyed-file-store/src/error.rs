//! Error types for the keyed file store.

use std::path::PathBuf;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, CacheStoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheStoreError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No entry is stored under the key
    #[error("Entry not found: {key}")]
    NotFound { key: String },

    /// The key cannot be mapped to a file name
    #[error("Invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// Root directory creation failed
    #[error("Failed to create directory: {path:?} - {source}")]
    DirectoryCreation {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Permissions error
    #[error("Permission denied: {operation} on {path:?}")]
    Permission { operation: String, path: PathBuf },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl CacheStoreError {
    /// Whether this error means the entry is simply absent.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub(crate) fn from_io(key: &str, error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                key: key.to_string(),
            }
        } else {
            Self::Io(error)
        }
    }
}
