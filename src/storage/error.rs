//! Error types for metrics log operations

use std::fmt;

/// Result type alias for metrics log operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while reading or appending the metrics log
#[derive(Debug)]
pub enum StorageError {
    /// Record could not be encoded as a JSON line
    SerializationError(String),

    /// I/O error (open, write, flush, read)
    IoError(std::io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::SerializationError(msg) => {
                write!(f, "metric serialization error: {}", msg)
            }
            StorageError::IoError(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::IoError(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}
