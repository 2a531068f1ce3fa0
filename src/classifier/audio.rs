//! ONNX audio classifier adapter
//!
//! Decodes a staged file with symphonia to a mono f32 sample sequence at
//! its native sample rate, normalizes it, and runs the ONNX graph via
//! tract. WAV and MP3 are covered by the enabled symphonia features.

use crate::classifier::{predictions_from_logits, Classifier, RawPrediction};
use crate::error::{DetectError, Result};
use crate::validate::Modality;
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tract_onnx::prelude::*;
use tracing::{debug, error};

/// Output logit order of the detection model
const LABELS: [&str; 2] = ["Fake", "Real"];

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Binary authentic-vs-synthetic audio classifier
pub struct AudioClassifier {
    model: OnnxPlan,
    labels: Vec<String>,
}

impl AudioClassifier {
    /// Load and optimize the ONNX model. The waveform input dimension is
    /// dynamic, so no input fact is pinned here.
    pub fn load<P: AsRef<Path>>(model_path: P) -> anyhow::Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_path(model_path.as_ref())?
            .into_optimized()?
            .into_runnable()?;

        Ok(Self {
            model,
            labels: LABELS.iter().map(|s| s.to_string()).collect(),
        })
    }
}

impl Classifier for AudioClassifier {
    fn classify(&self, path: &Path) -> Result<Vec<RawPrediction>> {
        let (samples, sample_rate) = decode_to_mono(path)?;
        debug!(
            "Decoded {} samples at {} Hz for audio inference",
            samples.len(),
            sample_rate
        );

        let samples = normalize(samples);
        let len = samples.len();
        let input: Tensor = tract_ndarray::Array2::from_shape_vec((1, len), samples)
            .map_err(|e| {
                error!("Audio tensor shape error: {}", e);
                DetectError::Inference(Modality::Audio)
            })?
            .into();

        let outputs = self.model.run(tvec!(input.into())).map_err(|e| {
            error!("Audio inference failed: {}", e);
            DetectError::Inference(Modality::Audio)
        })?;

        let logits: Vec<f32> = outputs[0]
            .to_array_view::<f32>()
            .map_err(|e| {
                error!("Unexpected audio model output: {}", e);
                DetectError::Inference(Modality::Audio)
            })?
            .iter()
            .copied()
            .collect();

        Ok(predictions_from_logits(&logits, &self.labels))
    }
}

/// Decode an audio file to mono f32 samples at its native sample rate.
///
/// Multi-channel input is downmixed by averaging; corrupt packets fail the
/// whole decode rather than producing a truncated waveform.
fn decode_to_mono(path: &Path) -> Result<(Vec<f32>, u32)> {
    let decode_err = |detail: &dyn std::fmt::Display| {
        debug!("Audio decode failed for staged upload: {}", detail);
        DetectError::Decode(Modality::Audio)
    };

    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| decode_err(&e))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| decode_err(&"no audio track"))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params.sample_rate.unwrap_or(16_000);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| decode_err(&e))?;

    let mut samples = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            // End of stream
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(decode_err(&e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder.decode(&packet).map_err(|e| decode_err(&e))?;
        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);

        let buf = sample_buf
            .get_or_insert_with(|| SampleBuffer::new(decoded.capacity() as u64, spec));
        buf.copy_interleaved_ref(decoded);

        for frame in buf.samples().chunks_exact(channels) {
            samples.push(frame.iter().sum::<f32>() / channels as f32);
        }
    }

    if samples.is_empty() {
        return Err(decode_err(&"no decodable samples"));
    }

    Ok((samples, sample_rate))
}

/// Zero-mean, unit-variance normalization over the whole waveform
fn normalize(mut samples: Vec<f32>) -> Vec<f32> {
    let n = samples.len() as f32;
    let mean = samples.iter().sum::<f32>() / n;
    let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f32>() / n;
    let std = var.sqrt().max(1e-7);

    for s in &mut samples {
        *s = (*s - mean) / std;
    }
    samples
}
