//! Application entry point: multimodal assistant HTTP server.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (default on first run) and overlay the
//!    environment.
//! 3. Create the [`tokio`] runtime.
//! 4. Build the STT engine, the multimodal model and the TTS core.
//! 5. Empty the upload directory.
//! 6. Serve the HTTP API until Ctrl-C.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use multimodal_assistant::{
    config::AppConfig,
    llm::GeminiClient,
    pipeline::MultimodalPipeline,
    server::{self, prepare_upload_dir, AppState},
    stt::{SttEngine, UnavailableSttEngine, WhisperEngine},
    tts::{KokoroApiSynthesizer, SpeechSynthesizer, TextToSpeech},
};

fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Multimodal assistant starting up");

    // 2. Configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    config.apply_env_overrides();

    if config.llm.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
        bail!("GOOGLE_API_KEY is not set; the multimodal model cannot be reached");
    }

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 4. Services (a missing Whisper model only disables transcription)
    let stt: Arc<dyn SttEngine> = match WhisperEngine::from_config(&config.stt) {
        Ok(engine) => {
            log::info!("Whisper model loaded: {}", config.stt.model_path.display());
            Arc::new(engine)
        }
        Err(e) => {
            log::warn!(
                "Could not load Whisper model ({}): {e}. Transcription will fail.",
                config.stt.model_path.display()
            );
            Arc::new(UnavailableSttEngine::new(e))
        }
    };

    let upload_dir = config.server.upload_dir.clone();
    let synthesizer: Arc<dyn SpeechSynthesizer> =
        Arc::new(KokoroApiSynthesizer::from_config(&config.tts));
    let tts = Arc::new(TextToSpeech::new(synthesizer, &config.tts, &upload_dir));
    let model = Arc::new(GeminiClient::from_config(&config.llm));
    let pipeline = Arc::new(MultimodalPipeline::new(
        stt,
        model,
        tts,
        config.pipeline.clone(),
    ));
    let state = AppState::new(pipeline, &upload_dir);

    // 5. Upload directory
    let removed = prepare_upload_dir(&upload_dir)
        .with_context(|| format!("cannot prepare {}", upload_dir.display()))?;
    log::info!("Upload directory {} ready ({removed} stale files removed)", upload_dir.display());

    // 6. Serve
    let result = rt.block_on(server::serve(&config.server, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {e}");
        }
        log::info!("Shutdown requested");
    }));

    if let Err(e) = prepare_upload_dir(&upload_dir) {
        log::warn!("Could not clean {} on exit: {e}", upload_dir.display());
    }
    result
}
