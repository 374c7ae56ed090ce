//! Error types for RagDesk.

use thiserror::Error;

/// Core error type for all RagDesk operations.
#[derive(Error, Debug)]
pub enum RagDeskError {
    #[error("Provider error: {0}")]
    Provider(String),

    /// Credential missing or rejected by the completion service.
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, RagDeskError>;
