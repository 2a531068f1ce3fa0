//! Classifier boundary
//!
//! Wraps the external inference capability behind the [`Classifier`] trait
//! so the rest of the pipeline never depends on the runtime's output shape,
//! and tests can inject doubles. Concrete ONNX-backed adapters live in
//! [`image`] and [`audio`]; each owns the modality-appropriate decode step.
//!
//! Models are loaded once at process start into a [`ClassifierRegistry`]
//! held by the server's composition root. A model that fails to load leaves
//! its slot empty; that modality then reports `ModelUnavailable` on every
//! request until restart, without affecting the other modality.

pub mod audio;
pub mod image;

use crate::error::{DetectError, Result};
use crate::validate::Modality;
use std::path::Path;
use std::sync::Arc;

pub use audio::AudioClassifier;
pub use image::ImageClassifier;

/// A single (label, score) pair as produced by the model, pre-policy
#[derive(Debug, Clone, PartialEq)]
pub struct RawPrediction {
    pub label: String,
    /// Probability in [0, 1]
    pub score: f32,
}

/// Opaque classification capability for one modality.
///
/// Implementations load the staged file in their own representation and
/// return zero or more candidate labels. An empty list is a legitimate
/// model output, not an adapter failure.
pub trait Classifier: Send + Sync {
    fn classify(&self, path: &Path) -> Result<Vec<RawPrediction>>;
}

impl std::fmt::Debug for dyn Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Classifier")
    }
}

/// Per-modality classifier slots, built once at startup
#[derive(Clone, Default)]
pub struct ClassifierRegistry {
    image: Option<Arc<dyn Classifier>>,
    audio: Option<Arc<dyn Classifier>>,
}

impl ClassifierRegistry {
    pub fn new(
        image: Option<Arc<dyn Classifier>>,
        audio: Option<Arc<dyn Classifier>>,
    ) -> Self {
        Self { image, audio }
    }

    /// Whether the model for this modality loaded successfully
    pub fn is_ready(&self, modality: Modality) -> bool {
        self.slot(modality).is_some()
    }

    /// Get the classifier for a modality, or `ModelUnavailable` if its
    /// model failed to load at startup.
    pub fn get(&self, modality: Modality) -> Result<Arc<dyn Classifier>> {
        self.slot(modality)
            .cloned()
            .ok_or(DetectError::ModelUnavailable(modality))
    }

    fn slot(&self, modality: Modality) -> Option<&Arc<dyn Classifier>> {
        match modality {
            Modality::Image => self.image.as_ref(),
            Modality::Audio => self.audio.as_ref(),
        }
    }
}

/// Numerically stable softmax over raw model logits
pub(crate) fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|x| x / sum).collect()
}

/// Zip softmaxed scores with the model's label set, in label order
pub(crate) fn predictions_from_logits(logits: &[f32], labels: &[String]) -> Vec<RawPrediction> {
    softmax(logits)
        .into_iter()
        .zip(labels.iter())
        .map(|(score, label)| RawPrediction {
            label: label.clone(),
            score,
        })
        .collect()
}
