//! Error types for deepcheck
//!
//! Defines the detection error taxonomy using thiserror. The `Display`
//! string of each variant is the client-facing message; internal detail
//! (decoder output, paths, runtime errors) is logged at the failure site
//! and never placed in a variant.

use crate::validate::Modality;
use thiserror::Error;

/// Convenience Result type using the deepcheck error
pub type Result<T> = std::result::Result<T, DetectError>;

/// Detection pipeline errors
#[derive(Error, Debug)]
pub enum DetectError {
    /// Upload failed validation (missing file, bad name, wrong extension)
    #[error("{0}")]
    Validation(String),

    /// The model for this modality failed to load at startup
    #[error("{0} model not loaded")]
    ModelUnavailable(Modality),

    /// Payload could not be decoded despite a valid extension
    #[error("Could not decode {0} file")]
    Decode(Modality),

    /// The model produced no candidate labels
    #[error("No predictions returned")]
    NoPredictions,

    /// Any other runtime failure during classification
    #[error("Error running {0} inference")]
    Inference(Modality),

    /// File I/O errors while staging uploads
    #[error("Server error: file handling failed")]
    Io(#[from] std::io::Error),

    /// Catch-all for unexpected failures at the pipeline boundary
    #[error("Server error: {0}")]
    Internal(String),
}

impl DetectError {
    /// Whether this error is the client's fault (HTTP 400) rather than
    /// a server-side failure (HTTP 500).
    pub fn is_client_error(&self) -> bool {
        matches!(self, DetectError::Validation(_))
    }
}
