//! Deepcheck - Main entry point
//!
//! Deepfake detection service: loads the image and audio classifier models
//! once at startup, then serves the detection API over HTTP. A model that
//! fails to load does not crash the process; its modality reports
//! "model not loaded" until restart.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use deepcheck::api::{self, AppState};
use deepcheck::classifier::{AudioClassifier, Classifier, ClassifierRegistry, ImageClassifier};
use deepcheck::staging::StagingStore;

/// Command-line arguments for deepcheck
#[derive(Parser, Debug)]
#[command(name = "deepcheck")]
#[command(about = "Deepfake detection service for image and audio uploads")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5000", env = "DEEPCHECK_PORT")]
    port: u16,

    /// Directory for transient upload staging
    #[arg(long, default_value = "uploads", env = "DEEPCHECK_UPLOAD_DIR")]
    upload_dir: PathBuf,

    /// Path to the image detection ONNX model
    #[arg(
        long,
        default_value = "models/image_detector.onnx",
        env = "DEEPCHECK_IMAGE_MODEL"
    )]
    image_model: PathBuf,

    /// Path to the audio detection ONNX model
    #[arg(
        long,
        default_value = "models/audio_detector.onnx",
        env = "DEEPCHECK_AUDIO_MODEL"
    )]
    audio_model: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deepcheck=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting deepcheck on port {}", args.port);

    // Load models. Failure is tolerated per modality: the endpoint keeps
    // answering with "model not loaded" instead of taking the process down.
    info!("Loading image detection model...");
    let image = match ImageClassifier::load(&args.image_model) {
        Ok(c) => {
            info!("Image model loaded successfully");
            Some(Arc::new(c) as Arc<dyn Classifier>)
        }
        Err(e) => {
            warn!("Error loading image model: {:#}", e);
            None
        }
    };

    info!("Loading audio detection model...");
    let audio = match AudioClassifier::load(&args.audio_model) {
        Ok(c) => {
            info!("Audio model loaded successfully");
            Some(Arc::new(c) as Arc<dyn Classifier>)
        }
        Err(e) => {
            warn!("Error loading audio model: {:#}", e);
            None
        }
    };

    let staging = StagingStore::new(&args.upload_dir)
        .context("Failed to create upload staging directory")?;

    let app_state = AppState {
        registry: Arc::new(ClassifierRegistry::new(image, audio)),
        staging: Arc::new(staging),
    };

    let app = api::create_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
