//! Error types for the AI module

use thiserror::Error;

use crate::llm::StreamFailure;

/// AI module error types
#[derive(Error, Debug)]
pub enum AiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("A turn is already streaming; wait for it to finish")]
    TurnInProgress,

    #[error("Stream failed: {0}")]
    Stream(#[from] StreamFailure),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for AI operations
pub type Result<T> = std::result::Result<T, AiError>;
