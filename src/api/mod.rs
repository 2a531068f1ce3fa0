//! HTTP API for deepcheck
//!
//! Implements the detection endpoints plus a health check, with the upload
//! page served from `static/`. Request bodies are capped at 10 MiB before
//! any handler runs.

pub mod handlers;

use crate::classifier::ClassifierRegistry;
use crate::staging::StagingStore;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Maximum accepted upload size (10 MiB), enforced at the transport layer
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Per-modality classifier slots, loaded once at startup
    pub registry: Arc<ClassifierRegistry>,
    /// Staging store for uploaded files
    pub staging: Arc<StagingStore>,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/detect/image", post(handlers::detect_image))
        .route("/detect/audio", post(handlers::detect_audio))
        .fallback_service(ServeDir::new("static"))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
