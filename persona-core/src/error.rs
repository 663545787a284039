//! Error types for persona-core

use thiserror::Error;

/// Main error type for the persona-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Caller supplied an argument outside the accepted range
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No chat history for the user in the requested window
    #[error("no chat messages found for user {user_id} in the last {days} days")]
    NotFound { user_id: String, days: u32 },

    /// Too few messages to produce a meaningful analysis
    #[error("not enough messages to analyze: found {found}, need at least {required}")]
    InsufficientSample { found: usize, required: usize },

    /// Model invocation failed (transport, status, or empty body)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Model answered, but the answer does not match the requested schema
    #[error("malformed model response: {0}")]
    MalformedResponse(String),
}

/// Coarse classification used at the entry-point boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InsufficientSample,
    Misconfiguration,
    ModelFailure,
    InvalidInput,
    Storage,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::InsufficientSample { .. } => ErrorKind::InsufficientSample,
            Error::Config(_) => ErrorKind::Misconfiguration,
            Error::Llm(_) | Error::MalformedResponse(_) => ErrorKind::ModelFailure,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::Database(_) | Error::Io(_) | Error::Json(_) => ErrorKind::Storage,
        }
    }
}

/// Result type alias for persona-core
pub type Result<T> = std::result::Result<T, Error>;
