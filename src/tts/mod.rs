//! Text-to-speech: chunk planning, parallel synthesis and the fallback cascade.
//!
//! # Architecture
//!
//! ```text
//!                         TextToSpeech::text_to_speech
//!                                      │
//!            ┌──────────── normalizer ─┴─ voices ────────────┐
//!            ▼                                               ▼
//!      ChunkPlanner ──▶ ParallelExecutor ──▶ assemble     FallbackCascade
//!                             │                  │             │
//!                             └── SpeechSynthesizer ◀──────────┘
//!                                  (KokoroApiSynthesizer)
//!                                                │
//!                                            AudioStore ──▶ <uuid>_response.wav
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use multimodal_assistant::config::TtsConfig;
//! use multimodal_assistant::tts::{KokoroApiSynthesizer, TextToSpeech};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TtsConfig::default();
//! let engine = Arc::new(KokoroApiSynthesizer::from_config(&config));
//! let tts = TextToSpeech::new(engine, &config, "uploads");
//! let filename = tts.text_to_speech("Hello there.", "af_heart", 1.0).await?;
//! println!("wrote {filename}");
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod cascade;
pub mod engine;
pub mod executor;
pub mod normalizer;
pub mod planner;
pub mod service;
pub mod voices;

pub use assembler::{assemble, AudioStore, OutputKind, StorageError, Waveform};
pub use cascade::{CascadeOutcome, FallbackCascade, Tier, APOLOGY_TEXT};
pub use engine::{
    synthesize_text, KokoroApiSynthesizer, SpeechSegment, SpeechSynthesizer, SynthesisError,
    TtsError,
};
pub use executor::{ParallelExecutor, SynthesisResult};
pub use normalizer::{clean_text_for_tts, needs_cleaning};
pub use planner::{split_at_sentence_breaks, split_sentences, ChunkPlanner, PlanError, TextChunk};
pub use service::TextToSpeech;
pub use voices::{
    find_voice, resolve_voice, voices_by_language, Gender, VoiceInfo, VoiceSelection,
    AVAILABLE_VOICES,
};

#[cfg(test)]
pub use engine::MockSynthesizer;
