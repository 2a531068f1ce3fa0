//! Upload validation
//!
//! Checks that an uploaded filename carries an extension allowed for the
//! declared modality. Pure functions; the multipart handler is responsible
//! for detecting a missing `file` part.

use crate::error::{DetectError, Result};
use std::fmt;

/// Media type of an upload, determining validation rules and classifier path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Image,
    Audio,
}

impl Modality {
    /// Lowercase extensions accepted for this modality
    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            Modality::Image => &["jpg", "jpeg", "png"],
            Modality::Audio => &["wav", "mp3"],
        }
    }

    fn invalid_type_message(&self) -> &'static str {
        match self {
            Modality::Image => "Invalid file type. Use JPG or PNG.",
            Modality::Audio => "Invalid file type. Use WAV or MP3.",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Image => write!(f, "image"),
            Modality::Audio => write!(f, "audio"),
        }
    }
}

/// Validate a client-supplied filename for the given modality.
///
/// Rejects empty names, names without an extension, and extensions outside
/// the modality's allowed set (case-insensitive).
pub fn validate_filename(modality: Modality, filename: &str) -> Result<()> {
    if filename.is_empty() {
        return Err(DetectError::Validation("No file selected".to_string()));
    }

    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match ext {
        Some(ext) if modality.allowed_extensions().contains(&ext.as_str()) => Ok(()),
        _ => Err(DetectError::Validation(
            modality.invalid_type_message().to_string(),
        )),
    }
}
