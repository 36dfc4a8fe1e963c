//! Speech synthesis engine trait and the Kokoro HTTP adapter.
//!
//! [`SpeechSynthesizer`] is the seam between the synthesis core (planner,
//! executor, cascade) and whatever neural TTS actually produces audio.  An
//! engine returns a sequence of [`SpeechSegment`]s for one input text; the
//! core only ever looks at the samples.
//!
//! [`KokoroApiSynthesizer`] talks to a Kokoro server exposing the
//! OpenAI-style `/v1/audio/speech` endpoint and hands back audio already
//! converted to the configured output rate.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::audio::{decode_wav_bytes, resample};
use crate::config::TtsConfig;
use crate::tts::planner::PlanError;
use crate::tts::voices::VoiceSelection;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures raised by a synthesis engine for a single call.
#[derive(Debug, Error)]
pub enum TtsError {
    /// HTTP transport or connection error.
    #[error("TTS request failed: {0}")]
    Request(String),

    /// The engine did not answer within the configured timeout.
    #[error("TTS request timed out")]
    Timeout,

    /// The engine answered with a non-success status.
    #[error("TTS engine returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The returned audio could not be decoded.
    #[error("TTS audio could not be decoded: {0}")]
    Decode(String),

    /// The engine rejected the input text.
    #[error("TTS engine rejected input: {0}")]
    InvalidInput(String),
}

impl From<reqwest::Error> for TtsError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TtsError::Timeout
        } else {
            TtsError::Request(e.to_string())
        }
    }
}

/// Outcome of one synthesis strategy (a direct call, a parallel run or a
/// cascade tier).  Every variant is recoverable by a weaker strategy.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error(transparent)]
    Engine(#[from] TtsError),

    /// The engine succeeded but produced zero samples.
    #[error("synthesis produced no audio")]
    NoAudio,

    /// Every chunk of a parallel run came back empty.
    #[error("all {0} chunks failed to synthesize")]
    AllChunksFailed(usize),

    /// The text could not be split into a useful chunk plan.
    #[error("text is not chunkable: {0}")]
    NotChunkable(#[from] PlanError),
}

// ---------------------------------------------------------------------------
// SpeechSynthesizer trait
// ---------------------------------------------------------------------------

/// One unit of engine output: the text it covers, optional phonemes and the
/// mono samples at the engine's output rate.
#[derive(Debug, Clone, Default)]
pub struct SpeechSegment {
    pub text: String,
    pub phonemes: Option<String>,
    pub samples: Vec<f32>,
}

/// Async, thread-safe speech synthesis engine.
///
/// Implementations are shared as `Arc<dyn SpeechSynthesizer>` across
/// concurrent requests and must tolerate concurrent independent calls.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceSelection,
        speed: f32,
    ) -> Result<Vec<SpeechSegment>, TtsError>;
}

// Compile-time assertion: SpeechSynthesizer must stay object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn SpeechSynthesizer) {}
};

/// Run `engine` on `text` and concatenate every segment's samples.
///
/// # Errors
///
/// [`SynthesisError::Engine`] when the engine fails, and
/// [`SynthesisError::NoAudio`] when it returns no samples at all.
pub async fn synthesize_text(
    engine: &dyn SpeechSynthesizer,
    text: &str,
    voice: &VoiceSelection,
    speed: f32,
) -> Result<Vec<f32>, SynthesisError> {
    let segments = engine.synthesize(text, voice, speed).await?;
    let samples: Vec<f32> = segments.into_iter().flat_map(|s| s.samples).collect();
    if samples.is_empty() {
        return Err(SynthesisError::NoAudio);
    }
    Ok(samples)
}

// ---------------------------------------------------------------------------
// KokoroApiSynthesizer
// ---------------------------------------------------------------------------

/// Calls a Kokoro server's OpenAI-compatible `/v1/audio/speech` endpoint.
///
/// Audio arrives as a WAV body at the model's native rate (24 kHz for
/// Kokoro) and is resampled to `output_sample_rate` before being returned.
///
/// Voices are sent by id.  With `send_voice_paths` a local `.pt` asset is
/// sent by path, which only works when the server shares `voices_dir`.
pub struct KokoroApiSynthesizer {
    client: reqwest::Client,
    base_url: String,
    model: String,
    output_sample_rate: u32,
    send_voice_paths: bool,
}

impl KokoroApiSynthesizer {
    pub fn from_config(config: &TtsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            output_sample_rate: config.output_sample_rate,
            send_voice_paths: config.send_voice_paths,
        }
    }

    fn speech_url(&self) -> String {
        format!("{}/v1/audio/speech", self.base_url)
    }

    /// Value of the request's `voice` field.
    fn voice_param(&self, voice: &VoiceSelection) -> String {
        match &voice.asset {
            Some(asset) if self.send_voice_paths => asset.display().to_string(),
            _ => voice.id.clone(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for KokoroApiSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceSelection,
        speed: f32,
    ) -> Result<Vec<SpeechSegment>, TtsError> {
        if text.trim().is_empty() {
            return Err(TtsError::InvalidInput("empty text".into()));
        }
        let voice_param = self.voice_param(voice);
        if voice.asset.is_some() {
            log::debug!("tts: local voice {} sent as '{voice_param}'", voice.id);
        }

        let body = serde_json::json!({
            "model":           self.model,
            "input":           text,
            "voice":           voice_param,
            "speed":           speed,
            "response_format": "wav"
        });

        let response = self.client.post(self.speech_url()).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TtsError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let decoded = decode_wav_bytes(&bytes).map_err(|e| TtsError::Decode(e.to_string()))?;
        let samples = resample(&decoded.samples, decoded.sample_rate, self.output_sample_rate)
            .map_err(|e| TtsError::Decode(e.to_string()))?;

        Ok(vec![SpeechSegment {
            text: text.to_string(),
            phonemes: None,
            samples,
        }])
    }
}

// ---------------------------------------------------------------------------
// Test double
// ---------------------------------------------------------------------------

/// Scriptable engine for tests: one sample of `0.5` per input character,
/// failing whenever `fail_if(text)` is true.  Every call is recorded.
#[cfg(test)]
pub struct MockSynthesizer {
    fail_if: fn(&str) -> bool,
    calls: std::sync::Mutex<Vec<(String, String, f32)>>,
}

#[cfg(test)]
impl MockSynthesizer {
    pub fn ok() -> Self {
        Self::failing_when(|_| false)
    }

    pub fn failing() -> Self {
        Self::failing_when(|_| true)
    }

    pub fn failing_when(fail_if: fn(&str) -> bool) -> Self {
        Self {
            fail_if,
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Texts passed to `synthesize`, in call order.
    pub fn texts(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(t, _, _)| t.clone()).collect()
    }

    /// Voice ids passed to `synthesize`, in call order.
    pub fn voices(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(_, v, _)| v.clone()).collect()
    }

    /// Speeds passed to `synthesize`, in call order.
    pub fn speeds(&self) -> Vec<f32> {
        self.calls.lock().unwrap().iter().map(|(_, _, s)| *s).collect()
    }
}

#[cfg(test)]
#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceSelection,
        speed: f32,
    ) -> Result<Vec<SpeechSegment>, TtsError> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), voice.id.clone(), speed));
        if (self.fail_if)(text) {
            return Err(TtsError::Request("engine offline".into()));
        }
        Ok(vec![SpeechSegment {
            text: text.to_string(),
            phonemes: None,
            samples: vec![0.5; text.chars().count()],
        }])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
