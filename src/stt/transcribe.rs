//! Decoding settings and file-based transcription.
//!
//! [`transcribe_file`] turns an uploaded WAV file into text with any
//! [`SttEngine`]: decode, downmix, resample to 16 kHz, then fit the clip into
//! the engine's window.

use std::path::Path;

use crate::audio::{read_wav_mono, resample, DecodedAudio};
use crate::config::SttConfig;
use crate::stt::engine::{SttEngine, SttError, MAX_AUDIO_SAMPLES, MIN_AUDIO_SAMPLES};

/// Sample rate Whisper expects.
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Per-engine decoding settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscribeParams {
    /// ISO-639-1 code, or `"auto"` to let Whisper detect the language.
    pub language: String,
    /// CPU threads handed to Whisper.
    pub n_threads: i32,
}

impl TranscribeParams {
    pub fn from_config(config: &SttConfig) -> Self {
        Self {
            language: config.language.clone(),
            ..Self::default()
        }
    }

    /// The language hint for Whisper; `None` means auto-detect.
    pub fn whisper_language(&self) -> Option<&str> {
        match self.language.trim() {
            "" | "auto" => None,
            lang => Some(lang),
        }
    }
}

impl Default for TranscribeParams {
    fn default() -> Self {
        Self {
            language: "en".into(),
            n_threads: inference_threads(),
        }
    }
}

/// Available cores, capped at 8.
fn inference_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8) as i32)
        .unwrap_or(4)
}

// ---------------------------------------------------------------------------
// File transcription
// ---------------------------------------------------------------------------

/// Convert decoded audio into the window Whisper accepts.
///
/// The audio is resampled to 16 kHz, truncated to the 30 s window and
/// zero-padded up to the engine's minimum length.
pub fn prepare_audio(audio: &DecodedAudio) -> Result<Vec<f32>, SttError> {
    let mut samples = resample(&audio.samples, audio.sample_rate, WHISPER_SAMPLE_RATE)
        .map_err(|e| SttError::Audio(e.to_string()))?;

    if samples.len() > MAX_AUDIO_SAMPLES {
        log::debug!(
            "stt: truncating {} samples to the {MAX_AUDIO_SAMPLES}-sample window",
            samples.len()
        );
        samples.truncate(MAX_AUDIO_SAMPLES);
    }
    if samples.len() < MIN_AUDIO_SAMPLES {
        samples.resize(MIN_AUDIO_SAMPLES, 0.0);
    }
    Ok(samples)
}

/// Read the WAV file at `path` and transcribe it with `engine`.
///
/// Blocking: call from `tokio::task::spawn_blocking` inside async code.
pub fn transcribe_file(engine: &dyn SttEngine, path: impl AsRef<Path>) -> Result<String, SttError> {
    let path = path.as_ref();
    let decoded = read_wav_mono(path)
        .map_err(|e| SttError::Audio(format!("{}: {e}", path.display())))?;
    let samples = prepare_audio(&decoded)?;
    engine.transcribe(&samples)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::write_wav;
    use crate::stt::MockSttEngine;
    use tempfile::tempdir;

    #[test]
    fn prepare_pads_short_clips() {
        let audio = DecodedAudio {
            samples: vec![0.1; 100],
            sample_rate: 16_000,
        };
        let out = prepare_audio(&audio).unwrap();
        assert_eq!(out.len(), MIN_AUDIO_SAMPLES);
        assert!((out[0] - 0.1).abs() < 1e-6);
        assert_eq!(out[MIN_AUDIO_SAMPLES - 1], 0.0);
    }

    #[test]
    fn prepare_truncates_long_clips() {
        let audio = DecodedAudio {
            samples: vec![0.0; MAX_AUDIO_SAMPLES + 16_000],
            sample_rate: 16_000,
        };
        assert_eq!(prepare_audio(&audio).unwrap().len(), MAX_AUDIO_SAMPLES);
    }

    #[test]
    fn prepare_resamples_to_16k() {
        let audio = DecodedAudio {
            samples: vec![0.0; 44_100],
            sample_rate: 44_100,
        };
        assert_eq!(prepare_audio(&audio).unwrap().len(), 16_000);
    }

    #[test]
    fn transcribe_file_reads_wav_and_calls_engine() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("question.wav");
        write_wav(&path, &vec![0.0; 22_050], 22_050).unwrap();

        let engine = MockSttEngine::ok("what is in this image");
        let text = transcribe_file(&engine, &path).unwrap();
        assert_eq!(text, "what is in this image");
    }

    #[test]
    fn params_follow_config_language() {
        let config = SttConfig {
            model_path: "unused.bin".into(),
            language: "auto".into(),
        };
        let params = TranscribeParams::from_config(&config);
        assert_eq!(params.whisper_language(), None);
        assert!((1..=8).contains(&params.n_threads));

        let english = TranscribeParams::default();
        assert_eq!(english.whisper_language(), Some("en"));
    }

    #[test]
    fn transcribe_file_missing_is_audio_error() {
        let engine = MockSttEngine::ok("unused");
        let err = transcribe_file(&engine, "/nonexistent/clip.wav").unwrap_err();
        assert!(matches!(err, SttError::Audio(_)));
    }
}
