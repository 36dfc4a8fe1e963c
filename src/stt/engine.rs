//! Speech-to-text engines behind the [`SttEngine`] seam.
//!
//! The pipeline only needs the transcript of one uploaded question, so an
//! engine maps a 16 kHz mono window to a `String`.  [`WhisperEngine`] runs a
//! local GGML model; [`UnavailableSttEngine`] keeps the server usable for
//! text and image requests when no model could be loaded.

use std::path::Path;

use thiserror::Error;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::config::SttConfig;
use crate::stt::transcribe::TranscribeParams;

/// Shortest window an engine accepts: 0.5 s at 16 kHz.
pub(crate) const MIN_AUDIO_SAMPLES: usize = 8_000;
/// Longest window an engine accepts: 30 s at 16 kHz.
pub(crate) const MAX_AUDIO_SAMPLES: usize = 480_000;

#[derive(Debug, Clone, Error)]
pub enum SttError {
    #[error("speech model not found: {0}")]
    ModelNotFound(String),

    /// whisper-rs could not build a context or per-call state.
    #[error("speech model failed to initialise: {0}")]
    ContextInit(String),

    #[error("transcription failed: {0}")]
    Transcription(String),

    /// The uploaded file could not be decoded or converted.
    #[error("audio could not be prepared: {0}")]
    Audio(String),

    #[error("audio shorter than {} samples", MIN_AUDIO_SAMPLES)]
    AudioTooShort,

    #[error("audio longer than {} samples", MAX_AUDIO_SAMPLES)]
    AudioTooLong,
}

/// Blocking transcription of one 16 kHz mono window.
///
/// Shared as `Arc<dyn SttEngine>` and called from `spawn_blocking`.
pub trait SttEngine: Send + Sync {
    fn transcribe(&self, audio: &[f32]) -> Result<String, SttError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn SttEngine) {}
};

fn check_window(audio: &[f32]) -> Result<(), SttError> {
    if audio.len() < MIN_AUDIO_SAMPLES {
        return Err(SttError::AudioTooShort);
    }
    if audio.len() > MAX_AUDIO_SAMPLES {
        return Err(SttError::AudioTooLong);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// WhisperEngine
// ---------------------------------------------------------------------------

/// Greedy Whisper decoding over a loaded GGML model.  Each call creates its
/// own `WhisperState`, so one engine serves concurrent requests.
pub struct WhisperEngine {
    ctx: WhisperContext,
    params: TranscribeParams,
}

impl std::fmt::Debug for WhisperEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperEngine")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

// SAFETY: whisper-rs declares its context Send + Sync; the model weights are
// read-only once loaded and inference state is created per call.
unsafe impl Send for WhisperEngine {}
unsafe impl Sync for WhisperEngine {}

impl WhisperEngine {
    /// # Errors
    ///
    /// [`SttError::ModelNotFound`] when `model_path` is missing or not UTF-8,
    /// [`SttError::ContextInit`] when whisper-rs rejects the file.
    pub fn load(model_path: impl AsRef<Path>, params: TranscribeParams) -> Result<Self, SttError> {
        let path = model_path.as_ref();
        if !path.is_file() {
            return Err(SttError::ModelNotFound(path.display().to_string()));
        }
        let path_str = path
            .to_str()
            .ok_or_else(|| SttError::ModelNotFound(format!("non-UTF-8 path {}", path.display())))?;

        let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| SttError::ContextInit(e.to_string()))?;
        log::debug!("stt: loaded {path_str} ({:?})", params);
        Ok(Self { ctx, params })
    }

    pub fn from_config(config: &SttConfig) -> Result<Self, SttError> {
        Self::load(&config.model_path, TranscribeParams::from_config(config))
    }

    fn full_params(&self) -> FullParams<'_, '_> {
        let mut fp = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        fp.set_language(self.params.whisper_language());
        fp.set_n_threads(self.params.n_threads);
        fp.set_print_progress(false);
        fp.set_print_realtime(false);
        fp.set_print_special(false);
        fp
    }
}

impl SttEngine for WhisperEngine {
    fn transcribe(&self, audio: &[f32]) -> Result<String, SttError> {
        check_window(audio)?;

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| SttError::ContextInit(e.to_string()))?;
        state
            .full(self.full_params(), audio)
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let n = state
            .full_n_segments()
            .map_err(|e| SttError::Transcription(e.to_string()))?;
        let mut text = String::new();
        for i in 0..n {
            let segment = state
                .full_get_segment_text(i)
                .map_err(|e| SttError::Transcription(format!("segment {i}: {e}")))?;
            text.push_str(&segment);
        }
        Ok(text.trim().to_string())
    }
}

// ---------------------------------------------------------------------------
// UnavailableSttEngine
// ---------------------------------------------------------------------------

/// Stands in for Whisper when the model failed to load; every call returns
/// the load error.
#[derive(Debug, Clone)]
pub struct UnavailableSttEngine {
    reason: SttError,
}

impl UnavailableSttEngine {
    pub fn new(reason: SttError) -> Self {
        Self { reason }
    }
}

impl SttEngine for UnavailableSttEngine {
    fn transcribe(&self, _audio: &[f32]) -> Result<String, SttError> {
        Err(self.reason.clone())
    }
}

// ---------------------------------------------------------------------------
// Test double
// ---------------------------------------------------------------------------

/// Returns a fixed transcript, after enforcing the same window bounds as
/// [`WhisperEngine`].
#[cfg(test)]
pub struct MockSttEngine {
    response: Result<String, SttError>,
}

#[cfg(test)]
impl MockSttEngine {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
        }
    }

    pub fn err(error: SttError) -> Self {
        Self {
            response: Err(error),
        }
    }
}

#[cfg(test)]
impl SttEngine for MockSttEngine {
    fn transcribe(&self, audio: &[f32]) -> Result<String, SttError> {
        check_window(audio)?;
        self.response.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn window_bounds_are_inclusive() {
        assert!(check_window(&vec![0.0; MIN_AUDIO_SAMPLES]).is_ok());
        assert!(check_window(&vec![0.0; MAX_AUDIO_SAMPLES]).is_ok());
        assert!(matches!(
            check_window(&vec![0.0; MIN_AUDIO_SAMPLES - 1]),
            Err(SttError::AudioTooShort)
        ));
        assert!(matches!(
            check_window(&vec![0.0; MAX_AUDIO_SAMPLES + 1]),
            Err(SttError::AudioTooLong)
        ));
    }

    #[test]
    fn missing_model_file_is_reported_with_its_path() {
        let config = SttConfig {
            model_path: "/nonexistent/ggml-tiny.bin".into(),
            language: "en".into(),
        };
        match WhisperEngine::from_config(&config) {
            Err(SttError::ModelNotFound(path)) => assert!(path.contains("ggml-tiny.bin")),
            other => panic!("expected ModelNotFound, got {other:?}"),
        }
    }

    #[test]
    fn model_path_pointing_at_a_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = WhisperEngine::load(dir.path(), TranscribeParams::default());
        assert!(matches!(result, Err(SttError::ModelNotFound(_))));
    }

    #[test]
    fn unavailable_engine_replays_the_load_error_for_every_call() {
        let load_error = SttError::ModelNotFound("/models/ggml-tiny.bin".into());
        let engine: Arc<dyn SttEngine> = Arc::new(UnavailableSttEngine::new(load_error));

        for _ in 0..2 {
            let err = engine.transcribe(&vec![0.0; MIN_AUDIO_SAMPLES]).unwrap_err();
            assert!(matches!(err, SttError::ModelNotFound(ref p) if p.contains("ggml-tiny")));
        }
    }

    #[test]
    fn mock_applies_window_before_answering() {
        let engine = MockSttEngine::ok("describe the chart");
        assert_eq!(
            engine.transcribe(&vec![0.0; 16_000]).unwrap(),
            "describe the chart"
        );
        assert!(matches!(
            engine.transcribe(&[0.0; 10]),
            Err(SttError::AudioTooShort)
        ));
    }

    #[test]
    fn errors_name_the_cause() {
        assert!(SttError::Audio("clip.wav: bad header".into())
            .to_string()
            .contains("clip.wav"));
        assert!(SttError::AudioTooShort.to_string().contains("8000"));
    }
}
