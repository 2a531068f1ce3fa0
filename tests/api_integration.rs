//! Integration tests for the deepcheck detection API
//!
//! Exercises the complete pipeline through the router with stub
//! classifiers: validation, staging cleanup, threshold policy, and the
//! response envelope for every error kind.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use deepcheck::api::{create_router, AppState};
use deepcheck::classifier::{Classifier, ClassifierRegistry, RawPrediction};
use deepcheck::staging::StagingStore;
use deepcheck::{DetectError, Modality};

// ============================================================================
// Test doubles and helpers
// ============================================================================

/// Stub classifier with a canned outcome
enum Stub {
    Predict(Vec<(&'static str, f32)>),
    DecodeFailure(Modality),
    Empty,
}

impl Classifier for Stub {
    fn classify(&self, path: &Path) -> deepcheck::Result<Vec<RawPrediction>> {
        // The staged file must exist while classification runs
        assert!(path.exists(), "staged file missing during classification");
        match self {
            Stub::Predict(preds) => Ok(preds
                .iter()
                .map(|(label, score)| RawPrediction {
                    label: label.to_string(),
                    score: *score,
                })
                .collect()),
            Stub::DecodeFailure(modality) => Err(DetectError::Decode(*modality)),
            Stub::Empty => Ok(Vec::new()),
        }
    }
}

/// Build a test router over a scratch staging directory
fn setup(image: Option<Stub>, audio: Option<Stub>) -> (axum::Router, TempDir) {
    let tmp = TempDir::new().expect("Failed to create staging dir");
    let staging = StagingStore::new(tmp.path()).expect("Failed to create store");

    let registry = ClassifierRegistry::new(
        image.map(|s| Arc::new(s) as Arc<dyn Classifier>),
        audio.map(|s| Arc::new(s) as Arc<dyn Classifier>),
    );

    let state = AppState {
        registry: Arc::new(registry),
        staging: Arc::new(staging),
    };

    (create_router(state), tmp)
}

const BOUNDARY: &str = "deepcheck-test-boundary";

/// Build a multipart/form-data body with a single file part
fn multipart_body(field_name: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; \
             name=\"{field_name}\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// POST a file upload and return (status, parsed JSON body)
async fn post_upload(
    app: &axum::Router,
    path: &str,
    field_name: &str,
    filename: &str,
    content: &[u8],
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(field_name, filename, content)))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).expect("response must be JSON");

    (status, json)
}

fn staged_file_count(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path()).unwrap().count()
}

// ============================================================================
// Success path
// ============================================================================

#[tokio::test]
async fn test_image_detection_success() {
    let (app, tmp) = setup(Some(Stub::Predict(vec![("FAKE", 0.97)])), None);

    let (status, body) =
        post_upload(&app, "/detect/image", "file", "photo.jpg", b"jpegbytes").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["label"], "FAKE");
    assert_eq!(body["confidence"], 97.0);
    assert_eq!(staged_file_count(&tmp), 0);
}

#[tokio::test]
async fn test_audio_detection_success() {
    let (app, tmp) = setup(None, Some(Stub::Predict(vec![("Real", 0.91), ("Fake", 0.09)])));

    let (status, body) =
        post_upload(&app, "/detect/audio", "file", "clip.wav", b"riffbytes").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["label"], "Real");
    assert_eq!(body["confidence"], 91.0);
    assert_eq!(staged_file_count(&tmp), 0);
}

#[tokio::test]
async fn test_low_confidence_image_forced_to_real() {
    let (app, _tmp) = setup(Some(Stub::Predict(vec![("FAKE", 0.85)])), None);

    let (status, body) =
        post_upload(&app, "/detect/image", "file", "photo.png", b"pngbytes").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["label"], "REAL");
    assert_eq!(body["confidence"], 85.0);
}

#[tokio::test]
async fn test_low_confidence_audio_forced_to_fake() {
    let (app, _tmp) = setup(None, Some(Stub::Predict(vec![("Real", 0.75)])));

    let (status, body) =
        post_upload(&app, "/detect/audio", "file", "clip.mp3", b"mp3bytes").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["label"], "Fake");
    assert_eq!(body["confidence"], 75.0);
}

// ============================================================================
// Validation failures (HTTP 400)
// ============================================================================

#[tokio::test]
async fn test_missing_file_field_is_rejected() {
    let (app, tmp) = setup(Some(Stub::Predict(vec![("FAKE", 0.97)])), None);

    let (status, body) =
        post_upload(&app, "/detect/image", "other", "photo.jpg", b"jpegbytes").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "No file provided");
    assert_eq!(staged_file_count(&tmp), 0);
}

#[tokio::test]
async fn test_empty_filename_is_rejected() {
    let (app, _tmp) = setup(Some(Stub::Predict(vec![("FAKE", 0.97)])), None);

    let (status, body) = post_upload(&app, "/detect/image", "file", "", b"jpegbytes").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "No file selected");
}

#[tokio::test]
async fn test_wrong_extension_is_rejected_per_modality() {
    let (app, tmp) = setup(
        Some(Stub::Predict(vec![("FAKE", 0.97)])),
        Some(Stub::Predict(vec![("Fake", 0.97)])),
    );

    let (status, body) =
        post_upload(&app, "/detect/image", "file", "notes.txt", b"plain text").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid file type. Use JPG or PNG.");

    // An image extension is not valid for the audio endpoint
    let (status, body) =
        post_upload(&app, "/detect/audio", "file", "photo.jpg", b"jpegbytes").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid file type. Use WAV or MP3.");

    // Nothing was staged for rejected uploads
    assert_eq!(staged_file_count(&tmp), 0);
}

// ============================================================================
// Pipeline failures (HTTP 500)
// ============================================================================

#[tokio::test]
async fn test_decode_failure_returns_500_and_cleans_up() {
    // A .txt renamed to .jpg passes validation but fails decoding
    let (app, tmp) = setup(Some(Stub::DecodeFailure(Modality::Image)), None);

    let (status, body) =
        post_upload(&app, "/detect/image", "file", "renamed.jpg", b"plain text").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Could not decode image file");
    assert_eq!(staged_file_count(&tmp), 0);
}

#[tokio::test]
async fn test_empty_predictions_return_500() {
    let (app, tmp) = setup(Some(Stub::Empty), None);

    let (status, body) =
        post_upload(&app, "/detect/image", "file", "photo.jpg", b"jpegbytes").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "No predictions returned");
    assert!(!body["error"].as_str().unwrap().is_empty());
    assert_eq!(staged_file_count(&tmp), 0);
}

#[tokio::test]
async fn test_unavailable_model_returns_500() {
    // No models loaded at all
    let (app, tmp) = setup(None, None);

    let (status, body) =
        post_upload(&app, "/detect/image", "file", "photo.jpg", b"jpegbytes").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "image model not loaded");

    let (status, body) =
        post_upload(&app, "/detect/audio", "file", "clip.wav", b"riffbytes").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "audio model not loaded");

    assert_eq!(staged_file_count(&tmp), 0);
}

#[tokio::test]
async fn test_one_modality_down_does_not_affect_the_other() {
    let (app, _tmp) = setup(None, Some(Stub::Predict(vec![("Real", 0.95)])));

    let (status, _) =
        post_upload(&app, "/detect/image", "file", "photo.jpg", b"jpegbytes").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, body) =
        post_upload(&app, "/detect/audio", "file", "clip.wav", b"riffbytes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["label"], "Real");
}

// ============================================================================
// Staging lifecycle
// ============================================================================

#[tokio::test]
async fn test_no_leaked_staging_files_across_repeated_requests() {
    let (app, tmp) = setup(
        Some(Stub::Predict(vec![("FAKE", 0.97)])),
        Some(Stub::DecodeFailure(Modality::Audio)),
    );

    for i in 0..100 {
        if i % 2 == 0 {
            // Success path, same filename every time
            let (status, _) =
                post_upload(&app, "/detect/image", "file", "same.jpg", b"jpegbytes").await;
            assert_eq!(status, StatusCode::OK);
        } else {
            // Failure path
            let (status, _) =
                post_upload(&app, "/detect/audio", "file", "same.wav", b"riffbytes").await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    assert_eq!(staged_file_count(&tmp), 0);
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_reports_model_readiness() {
    let (app, _tmp) = setup(Some(Stub::Predict(vec![("FAKE", 0.97)])), None);

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "deepcheck");
    assert_eq!(body["image_model"], true);
    assert_eq!(body["audio_model"], false);
    assert!(body["version"].is_string());
}
