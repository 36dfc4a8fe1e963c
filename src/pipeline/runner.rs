//! Pipeline runner: transcribe → analyze → verify → (summarize) → speak.
//!
//! [`MultimodalPipeline`] holds explicitly injected service handles; nothing
//! is global.  One [`run`](MultimodalPipeline::run) call serves one request.
//!
//! # Pipeline flow
//!
//! ```text
//! audio?  ──▶ spawn_blocking(transcribe_file)            → transcribed_text
//! image?  ──▶ analyze_image("Analyze this image …")      → initial_analysis
//!   none  ──▶ "No image provided. Analyzing text only: …"
//! verifier pass (refine)                                  → corrected_analysis
//!   ├─ Ok  → corrected text
//!   └─ Err → warn + keep initial analysis
//! enable_tts?
//!   ├─ > summary threshold → summary pass (refine)        → summary_used
//!   └─ TextToSpeech::text_to_speech                       → tts_audio
//! ```
//!
//! Whisper inference is pushed onto `tokio::task::spawn_blocking` so the
//! async runtime never stalls.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::config::PipelineConfig;
use crate::llm::{analyze_image, prompt, refine, LlmError, MultimodalModel};
use crate::stt::{transcribe_file, SttEngine, SttError};
use crate::tts::{StorageError, TextToSpeech};

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Errors that abort a pipeline run.
///
/// Verifier and summary failures are not here: those passes fall back to the
/// text the pipeline already has.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// STT engine failed or the audio could not be decoded.
    #[error("transcription failed: {0}")]
    Stt(#[from] SttError),

    /// Image analysis failed.
    #[error("image analysis failed: {0}")]
    Llm(#[from] LlmError),

    /// The synthesized answer could not be written.
    #[error("audio output failed: {0}")]
    Storage(#[from] StorageError),

    /// Internal / unexpected error (e.g. tokio join failure).
    #[error("internal error: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// Request / output
// ---------------------------------------------------------------------------

/// Inputs of one pipeline run; files are already saved uploads.
#[derive(Debug, Clone, Default)]
pub struct PipelineRequest {
    pub image_path: Option<PathBuf>,
    pub audio_path: Option<PathBuf>,
    pub query_text: Option<String>,
    pub enable_tts: bool,
}

/// What a run produced.  Absent steps are omitted from the JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcribed_text: Option<String>,
    pub initial_analysis: String,
    pub corrected_analysis: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_used: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts_audio: Option<String>,
}

// ---------------------------------------------------------------------------
// MultimodalPipeline
// ---------------------------------------------------------------------------

/// Drives the complete analyze-then-correct pipeline.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use multimodal_assistant::config::AppConfig;
/// use multimodal_assistant::llm::GeminiClient;
/// use multimodal_assistant::pipeline::{MultimodalPipeline, PipelineRequest};
/// use multimodal_assistant::stt::WhisperEngine;
/// use multimodal_assistant::tts::{KokoroApiSynthesizer, TextToSpeech};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = AppConfig::default();
/// let engine = Arc::new(KokoroApiSynthesizer::from_config(&config.tts));
/// let pipeline = MultimodalPipeline::new(
///     Arc::new(WhisperEngine::from_config(&config.stt)?),
///     Arc::new(GeminiClient::from_config(&config.llm)),
///     Arc::new(TextToSpeech::new(engine, &config.tts, &config.server.upload_dir)),
///     config.pipeline.clone(),
/// );
///
/// let output = pipeline
///     .run(PipelineRequest {
///         query_text: Some("Why is the sky blue?".into()),
///         enable_tts: true,
///         ..PipelineRequest::default()
///     })
///     .await?;
/// println!("{}", output.corrected_analysis);
/// # Ok(())
/// # }
/// ```
pub struct MultimodalPipeline {
    stt: Arc<dyn SttEngine>,
    model: Arc<dyn MultimodalModel>,
    tts: Arc<TextToSpeech>,
    config: PipelineConfig,
}

impl MultimodalPipeline {
    pub fn new(
        stt: Arc<dyn SttEngine>,
        model: Arc<dyn MultimodalModel>,
        tts: Arc<TextToSpeech>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            stt,
            model,
            tts,
            config,
        }
    }

    pub fn model(&self) -> &Arc<dyn MultimodalModel> {
        &self.model
    }

    pub fn tts(&self) -> &Arc<TextToSpeech> {
        &self.tts
    }

    /// Transcribe the WAV file at `path` on the blocking thread pool.
    pub async fn transcribe(&self, path: &Path) -> Result<String, PipelineError> {
        let stt = Arc::clone(&self.stt);
        let path = path.to_path_buf();
        let text = tokio::task::spawn_blocking(move || transcribe_file(stt.as_ref(), &path))
            .await
            .map_err(|e| PipelineError::Internal(e.to_string()))??;
        log::debug!("pipeline: STT result = {text:?}");
        Ok(text)
    }

    /// Run every step for one request.
    pub async fn run(&self, request: PipelineRequest) -> Result<PipelineOutput, PipelineError> {
        let mut output = PipelineOutput::default();

        // ── 1. Audio → text ─────────────────────────────────────────────
        let query = match &request.audio_path {
            Some(path) => {
                let text = self.transcribe(path).await?;
                output.transcribed_text = Some(text.clone());
                text
            }
            None => request.query_text.clone().unwrap_or_default(),
        };

        // ── 2. Initial analysis ─────────────────────────────────────────
        output.initial_analysis = match &request.image_path {
            Some(path) => {
                analyze_image(self.model.as_ref(), path, &prompt::image_query(&query)).await?
            }
            None => prompt::text_only_analysis(&query),
        };

        // ── 3. Verifier pass ────────────────────────────────────────────
        let verifier = prompt::verifier_prompt(&output.initial_analysis);
        output.corrected_analysis = refine(self.model.as_ref(), &verifier, "verifier")
            .await
            .unwrap_or_else(|| output.initial_analysis.clone());

        // ── 4. Optional speech ──────────────────────────────────────────
        if request.enable_tts {
            let mut spoken = output.corrected_analysis.clone();
            let mut summary_used = false;

            if spoken.chars().count() > self.config.summary_threshold_chars {
                let summary = prompt::summary_prompt(&spoken);
                if let Some(short) = refine(self.model.as_ref(), &summary, "summary").await {
                    spoken = short;
                    summary_used = true;
                }
            }

            let filename = self
                .tts
                .text_to_speech(&spoken, self.tts.default_voice(), self.config.tts_speed)
                .await?;
            output.summary_used = Some(summary_used);
            output.tts_audio = Some(filename);
        }

        Ok(output)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
