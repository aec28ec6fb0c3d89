//! Error types for the agent core

use thiserror::Error;

/// Main error type for the agent core
#[derive(Error, Debug)]
pub enum AgentError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Text generation backend failed
    #[error("Generation error: {0}")]
    Generation(String),

    /// Model reply could not be decoded into the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AgentError>;
