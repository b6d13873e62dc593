//! Error types for R-Droid
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// Main error type for R-Droid
#[derive(Error, Debug)]
pub enum RDroidError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Result type alias for R-Droid operations
pub type Result<T> = std::result::Result<T, RDroidError>;

impl RDroidError {
    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            RDroidError::Io(e) => format!("File operation failed: {}", e),
            RDroidError::Config(msg) => format!("Configuration error: {}", msg),
            RDroidError::TomlParse(e) => format!("Configuration file is malformed: {}", e),
            RDroidError::Json(e) => format!("Model file is malformed: {}", e),
            RDroidError::NotFound(msg) => format!("Not found: {}", msg),
            _ => self.to_string(),
        }
    }
}
