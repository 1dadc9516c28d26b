//! Error types for parameter store operations.

use goalstack_core::ConfigError;
use thiserror::Error;

/// Result type alias for the ssm module.
pub type Result<T> = std::result::Result<T, SsmError>;

/// Errors that can occur while talking to the parameter store.
#[derive(Error, Debug)]
pub enum SsmError {
    #[error("AWS SDK error: {0}")]
    AwsSdk(String),

    #[error("No environment given and '{path}' is not set")]
    MissingDefaultEnvironment { path: String },

    #[error("Operation cancelled by user")]
    UserCancelled,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
