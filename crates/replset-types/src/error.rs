//! Common error types shared across crates

use thiserror::Error;

/// Common result type
pub type Result<T> = std::result::Result<T, CommonError>;

/// Errors raised while building or decoding replica-set documents
#[derive(Error, Debug)]
pub enum CommonError {
    /// Document did not have the expected shape
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// Input failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Connection string could not be parsed
    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CommonError {
    pub fn malformed<T: Into<String>>(msg: T) -> Self {
        Self::MalformedDocument(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        Self::Validation(msg.into())
    }
}
