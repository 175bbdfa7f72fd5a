//! Settings error types.

use thiserror::Error;

/// Errors that can occur when loading settings or parsing a connection URL.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read the settings file from disk.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse JSON in the settings file.
    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A settings value no connection can work with.
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
    /// The connection URL is not a valid RPC URL.
    #[error("invalid connection URL: {0}")]
    InvalidUrl(String),
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
