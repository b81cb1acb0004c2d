//! Error types for the sequence engine.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in sequence engine operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// `Add` was called for a key that is already registered.
    #[error("key \"{key}\" already exists")]
    KeyAlreadyExists {
        /// The duplicate key.
        key: String,
    },

    /// The key cannot be stored in the write log format.
    #[error("invalid key {key:?}: keys must be non-empty and contain no whitespace")]
    InvalidKey {
        /// The rejected key.
        key: String,
    },

    /// The counter for a key cannot advance any further.
    #[error("counter for key \"{key}\" overflowed")]
    CounterOverflow {
        /// The exhausted key.
        key: String,
    },

    /// Configuration rejected at startup.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// Snapshot file exists but cannot be decoded.
    #[error("snapshot corruption: {message}")]
    SnapshotCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// Snapshot encoding failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// The flush worker is gone and cannot accept retired segments.
    #[error("flush queue closed")]
    FlushQueueClosed,

    /// Another engine holds the data directory.
    #[error("data directory locked: another process has exclusive access")]
    DataDirLocked,

    /// The engine has been stopped.
    #[error("sequence engine is stopped")]
    EngineStopped,
}

impl CoreError {
    /// Creates a key exists error.
    pub fn key_already_exists(key: impl Into<String>) -> Self {
        Self::KeyAlreadyExists { key: key.into() }
    }

    /// Creates an invalid key error.
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey { key: key.into() }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates a snapshot corruption error.
    pub fn snapshot_corruption(message: impl Into<String>) -> Self {
        Self::SnapshotCorruption {
            message: message.into(),
        }
    }

    /// Returns true if the error was caused by the caller rather than the engine.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::KeyAlreadyExists { .. } | Self::InvalidKey { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_is_client_error() {
        let err = CoreError::key_already_exists("orders");
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "key \"orders\" already exists");
    }

    #[test]
    fn io_is_not_client_error() {
        let err = CoreError::from(io::Error::new(io::ErrorKind::Other, "disk gone"));
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("disk gone"));
    }
}
