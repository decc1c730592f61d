use std::io;
use thiserror::Error;

/// Custom error type for infermon
#[derive(Error, Debug)]
pub enum InfermonError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Hardware sampler not available: {0}")]
    SamplerNotAvailable(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for infermon
pub type Result<T> = std::result::Result<T, InfermonError>;

impl InfermonError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        InfermonError::Config(msg.into())
    }

    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        InfermonError::InvalidArgument(msg.into())
    }

    pub fn runtime<S: Into<String>>(msg: S) -> Self {
        InfermonError::Runtime(msg.into())
    }

    pub fn sampler_not_available<S: Into<String>>(msg: S) -> Self {
        InfermonError::SamplerNotAvailable(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        InfermonError::Other(msg.into())
    }
}
