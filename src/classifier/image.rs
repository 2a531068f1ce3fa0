//! ONNX image classifier adapter
//!
//! Loads a staged file as a 3-channel color image, preprocesses it to the
//! model's fixed input shape, and runs the ONNX graph via tract. Decode
//! failures (extension lied about the content) surface as `Decode`; any
//! runtime failure after a successful decode surfaces as `Inference`, with
//! the underlying detail logged, not returned.

use crate::classifier::{predictions_from_logits, Classifier, RawPrediction};
use crate::error::{DetectError, Result};
use crate::validate::Modality;
use image::imageops::FilterType;
use std::path::Path;
use tract_onnx::prelude::*;
use tracing::{debug, error};

/// Model input is a square RGB image, NCHW
const INPUT_SIDE: usize = 224;

/// Output logit order of the detection model
const LABELS: [&str; 2] = ["FAKE", "REAL"];

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Binary authentic-vs-synthetic image classifier
pub struct ImageClassifier {
    model: OnnxPlan,
    labels: Vec<String>,
}

impl ImageClassifier {
    /// Load and optimize the ONNX model. Called once at process start;
    /// failure leaves the image modality unavailable rather than crashing.
    pub fn load<P: AsRef<Path>>(model_path: P) -> anyhow::Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_path(model_path.as_ref())?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, INPUT_SIDE, INPUT_SIDE),
                ),
            )?
            .into_optimized()?
            .into_runnable()?;

        Ok(Self {
            model,
            labels: LABELS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Decode to RGB, resize to the model's input side, normalize to
    /// [-1, 1] per channel, NCHW layout.
    fn preprocess(&self, path: &Path) -> Result<Tensor> {
        let img = image::open(path)
            .map_err(|e| {
                debug!("Image decode failed for staged upload: {}", e);
                DetectError::Decode(Modality::Image)
            })?
            .to_rgb8();

        let resized = image::imageops::resize(
            &img,
            INPUT_SIDE as u32,
            INPUT_SIDE as u32,
            FilterType::Triangle,
        );

        let tensor = tract_ndarray::Array4::from_shape_fn(
            (1, 3, INPUT_SIDE, INPUT_SIDE),
            |(_, c, y, x)| {
                let value = resized[(x as u32, y as u32)][c] as f32 / 255.0;
                (value - 0.5) / 0.5
            },
        );

        Ok(tensor.into())
    }
}

impl Classifier for ImageClassifier {
    fn classify(&self, path: &Path) -> Result<Vec<RawPrediction>> {
        let input = self.preprocess(path)?;

        let outputs = self.model.run(tvec!(input.into())).map_err(|e| {
            error!("Image inference failed: {}", e);
            DetectError::Inference(Modality::Image)
        })?;

        let logits: Vec<f32> = outputs[0]
            .to_array_view::<f32>()
            .map_err(|e| {
                error!("Unexpected image model output: {}", e);
                DetectError::Inference(Modality::Image)
            })?
            .iter()
            .copied()
            .collect();

        Ok(predictions_from_logits(&logits, &self.labels))
    }
}
