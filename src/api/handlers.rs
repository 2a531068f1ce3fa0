//! HTTP request handlers
//!
//! Implements the detection endpoints. Each request runs the full pipeline:
//! validate the filename, stage the payload, classify, apply the verdict
//! policy, and map the outcome to the fixed response envelope. The staged
//! file is dropped (and thus removed) on every exit path.

use crate::api::AppState;
use crate::classifier::{Classifier, RawPrediction};
use crate::error::{DetectError, Result};
use crate::policy::{self, Verdict};
use crate::staging::StagedFile;
use crate::validate::{self, Modality};
use std::sync::Arc;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, info};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    image_model: bool,
    audio_model: bool,
}

#[derive(Debug, Serialize)]
pub struct DetectResponse {
    success: bool,
    label: String,
    confidence: f64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    success: bool,
    error: String,
}

impl IntoResponse for DetectError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = Json(ErrorResponse {
            success: false,
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

// ============================================================================
// Endpoints
// ============================================================================

/// GET /health - Health check with per-modality model readiness
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "deepcheck".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        image_model: state.registry.is_ready(Modality::Image),
        audio_model: state.registry.is_ready(Modality::Audio),
    })
}

/// POST /detect/image - Image deepfake detection
pub async fn detect_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Response {
    detect(state, Modality::Image, multipart).await
}

/// POST /detect/audio - Audio deepfake detection
pub async fn detect_audio(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Response {
    detect(state, Modality::Audio, multipart).await
}

// ============================================================================
// Pipeline
// ============================================================================

async fn detect(state: AppState, modality: Modality, multipart: Multipart) -> Response {
    match run_pipeline(state, modality, multipart).await {
        Ok(verdict) => {
            info!(
                "{} verdict: {} ({:.2}%)",
                modality, verdict.label, verdict.confidence
            );
            Json(DetectResponse {
                success: true,
                label: verdict.label,
                confidence: verdict.confidence,
            })
            .into_response()
        }
        Err(err) => err.into_response(),
    }
}

/// Validate → stage → classify → decide. The staged file lives on this
/// function's stack; dropping it on any return removes it from disk.
async fn run_pipeline(
    state: AppState,
    modality: Modality,
    multipart: Multipart,
) -> Result<Verdict> {
    let (filename, bytes) = extract_file(multipart).await?;
    validate::validate_filename(modality, &filename)?;

    let staged = state.staging.stage(&filename, &bytes)?;

    // Checked up front so a missing model short-circuits before inference
    let classifier = state.registry.get(modality)?;

    let predictions = classify_blocking(classifier, staged).await?;
    policy::decide(modality, &predictions)
}

/// Run inference off the async runtime. The staged file moves into the
/// blocking task so it is removed when classification finishes, even if
/// the task panics or the request future is dropped.
async fn classify_blocking(
    classifier: Arc<dyn Classifier>,
    staged: StagedFile,
) -> Result<Vec<RawPrediction>> {
    tokio::task::spawn_blocking(move || {
        let result = classifier.classify(staged.path());
        drop(staged);
        result
    })
    .await
    .map_err(|e| {
        error!("Classification task failed: {}", e);
        DetectError::Internal("classification task failed".to_string())
    })?
}

/// Pull the `file` part out of the multipart form.
///
/// A request with no `file` field is a validation failure; a transport
/// error while reading the stream is a server error.
async fn extract_file(mut multipart: Multipart) -> Result<(String, Vec<u8>)> {
    loop {
        let field = multipart.next_field().await.map_err(|e| {
            error!("Failed to read multipart field: {}", e);
            DetectError::Internal("could not read upload".to_string())
        })?;

        let Some(field) = field else {
            return Err(DetectError::Validation("No file provided".to_string()));
        };

        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|e| {
            error!("Failed to read upload body: {}", e);
            DetectError::Internal("could not read upload".to_string())
        })?;

        return Ok((filename, bytes.to_vec()));
    }
}
