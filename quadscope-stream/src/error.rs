//! Error types for tile streaming.

use thiserror::Error;

/// Errors raised by adapters, the worker pool and the scheduler.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image decode error: {0}")]
    Decode(String),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error(transparent)]
    Core(#[from] quadscope_core::CoreError),
}

/// Result alias for streaming operations.
pub type StreamResult<T> = Result<T, StreamError>;
