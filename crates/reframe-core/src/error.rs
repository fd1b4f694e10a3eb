/// Core error types for the Reframe engine.
use std::path::PathBuf;

/// A specialized Result type for Reframe operations.
pub type ReframeResult<T> = Result<T, ReframeError>;

/// Top-level error type encompassing all Reframe subsystems.
#[derive(Debug, thiserror::Error)]
pub enum ReframeError {
    #[error("render error: {0}")]
    Render(String),

    #[error("gpu error: {0}")]
    Gpu(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("asset error: {message} ({path:?})")]
    Asset { message: String, path: PathBuf },

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl ReframeError {
    /// Create an asset error.
    pub fn asset(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        ReframeError::Asset {
            message: message.into(),
            path: path.into(),
        }
    }

    /// Create a GPU error.
    pub fn gpu(message: impl Into<String>) -> Self {
        ReframeError::Gpu(message.into())
    }
}
