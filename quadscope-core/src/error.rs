//! Error types for the navigation core.

use thiserror::Error;

/// Errors raised by coordinate, camera and path operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A decimal coordinate string could not be parsed.
    #[error("bad coordinate {input:?}: {reason}")]
    BadCoordinate { input: String, reason: String },

    /// A tile index does not fit the requested fixed-width integer.
    #[error("tile index {0} does not fit in 64 bits")]
    IndexTooLarge(String),

    /// A camera mutation carried a non-finite or otherwise invalid value.
    #[error("camera update rejected: {0}")]
    BadCameraUpdate(String),

    /// A camera could not be derived from the given inputs.
    #[error("bad camera: {0}")]
    BadCamera(String),

    /// A path had too few keyframes to sample.
    #[error("path needs at least {required} keyframes, got {actual}")]
    PathInvalid { required: usize, actual: usize },
}

/// Result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
