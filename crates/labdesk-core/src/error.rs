//! Core error types for labdesk-core.
//!
//! This module defines the error hierarchy using thiserror. Timer commands
//! and the folding renderer never fail; errors come from persistence,
//! configuration, settings validation and project sync.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for labdesk-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Key-value storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Project sync errors
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the backing database
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A stored value could not be encoded
    #[error("Failed to encode value for '{key}': {message}")]
    Encode { key: String, message: String },

    /// The data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Value must be strictly positive
    #[error("'{field}' must be greater than zero")]
    NotPositive { field: &'static str },

    /// Value below the allowed minimum
    #[error("'{field}' must be at least {min} (got {value})")]
    BelowMinimum {
        field: &'static str,
        min: u32,
        value: u32,
    },
}

/// Project sync errors.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Repository or token missing
    #[error("GitHub sync is not configured: {0}")]
    NotConfigured(String),

    /// GitHub answered with a non-success status
    #[error("GitHub API error: HTTP {status}")]
    Api { status: u16 },

    /// Transport failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote file content was not valid base64
    #[error("Remote content is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    /// Remote or local payload is not the expected JSON
    #[error("Invalid project data: {0}")]
    InvalidPayload(String),

    /// OS keyring failure
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg)
                if e.code == rusqlite::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                StorageError::Locked
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_name_the_field() {
        let err = ValidationError::BelowMinimum {
            field: "sessions_until_long_break",
            min: 2,
            value: 1,
        };
        assert_eq!(
            err.to_string(),
            "'sessions_until_long_break' must be at least 2 (got 1)"
        );
    }

    #[test]
    fn core_error_wraps_storage_error() {
        let err: CoreError = StorageError::Locked.into();
        assert!(matches!(err, CoreError::Storage(StorageError::Locked)));
        assert_eq!(err.to_string(), "Storage error: Database is locked");
    }
}
