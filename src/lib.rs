//! # Deepcheck Library
//!
//! Deepfake detection service for image and audio uploads.
//!
//! **Purpose:** Accept a single media file over HTTP, stage it to disk, run
//! it through a pre-trained binary classifier, apply a confidence-threshold
//! correction policy, and return a `{label, confidence}` verdict as JSON.
//!
//! **Architecture:** axum HTTP layer over a synchronous detection pipeline:
//! validate → stage → classify → decide → respond, with the staged file
//! removed on every exit path.

pub mod api;
pub mod classifier;
pub mod error;
pub mod policy;
pub mod staging;
pub mod validate;

pub use error::{DetectError, Result};
pub use validate::Modality;
