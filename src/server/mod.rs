//! HTTP API (axum).
//!
//! ```text
//! POST /analyze                  multipart image? audio? text? enable_tts?
//! POST /api/transcribe           multipart audio
//! POST /api/generate_response    form image_path, query
//! POST /api/text_to_speech       json { text, voice, speed, high_performance }
//! GET  /api/voices
//! GET  /api/voices_by_language
//! GET  /api/health
//! ```

pub mod error;
pub mod handlers;
pub mod state;
pub mod upload;

use std::future::Future;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::config::ServerConfig;

pub use error::ApiError;
pub use state::AppState;
pub use upload::{prepare_upload_dir, sanitize_filename, save_upload, MultipartForm, UploadedFile};

/// Build the application router; request bodies are capped at `max_body`
/// bytes.
pub fn router(state: AppState, max_body: usize) -> Router {
    Router::new()
        .route("/analyze", post(handlers::analyze))
        .route("/api/transcribe", post(handlers::transcribe))
        .route("/api/generate_response", post(handlers::generate_response))
        .route("/api/text_to_speech", post(handlers::text_to_speech))
        .route("/api/voices", get(handlers::voices))
        .route("/api/voices_by_language", get(handlers::voices_by_language))
        .route("/api/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `config.host:config.port` and serve until `shutdown` resolves.
pub async fn serve<F>(config: &ServerConfig, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    log::info!("server: listening on http://{addr}");

    axum::serve(listener, router(state, config.max_content_length))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    log::info!("server: stopped");
    Ok(())
}
