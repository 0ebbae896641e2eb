//! Handler engine error types

use thiserror::Error;

/// Errors raised at the handler boundary.
///
/// Remote faults are not errors in this sense: they travel as
/// [`crate::Fault`] values and end up inside an [`crate::Outcome`].
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Desired model is required for {0}")]
    MissingDesiredModel(String),

    #[error("Operation {0} is not supported by {1}")]
    UnsupportedOperation(String, String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HandlerError>;
