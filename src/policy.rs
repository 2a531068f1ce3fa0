//! Verdict policy
//!
//! Turns raw classifier output into the final verdict: pick the top-scoring
//! prediction, convert its score to a percentage, and apply a
//! modality-specific confidence threshold that can override the label.
//!
//! The thresholds are asymmetric on purpose. An image verdict of
//! "synthetic" is only trusted at high confidence; below the floor the
//! label is forced to `REAL`. Audio has the inverse bias: a low-confidence
//! prediction defaults to `Fake`. Both directions are product policy and
//! must be preserved exactly.

use crate::classifier::RawPrediction;
use crate::error::{DetectError, Result};
use crate::validate::Modality;
use serde::Serialize;

/// Below this confidence an image verdict is forced to `REAL`
pub const IMAGE_CONFIDENCE_FLOOR: f64 = 90.0;

/// Below this confidence an audio verdict is forced to `Fake`
pub const AUDIO_CONFIDENCE_FLOOR: f64 = 80.0;

/// Final detection result returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub label: String,
    /// Percentage in [0, 100], rounded to 2 decimals
    pub confidence: f64,
}

/// Decide the verdict for a set of raw predictions.
///
/// Ties on the top score are broken by first-encountered order in the
/// adapter's output (the scan only replaces on a strictly greater score).
pub fn decide(modality: Modality, predictions: &[RawPrediction]) -> Result<Verdict> {
    let mut top = predictions.first().ok_or(DetectError::NoPredictions)?;
    for p in &predictions[1..] {
        if p.score > top.score {
            top = p;
        }
    }

    let confidence = round2(f64::from(top.score) * 100.0);

    let label = match modality {
        Modality::Image if confidence < IMAGE_CONFIDENCE_FLOOR => "REAL".to_string(),
        Modality::Audio if confidence < AUDIO_CONFIDENCE_FLOOR => "Fake".to_string(),
        _ => top.label.clone(),
    };

    Ok(Verdict { label, confidence })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
