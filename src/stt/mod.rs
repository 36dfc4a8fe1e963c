//! STT (Speech-to-Text) engine module.
//!
//! # Architecture
//!
//! ```text
//! upload.wav ──▶ transcribe_file ──▶ prepare_audio (mono, 16 kHz, ≤30 s)
//!                                          │
//!                                          ▼
//!                                 SttEngine::transcribe
//!                                  ├─ WhisperEngine        (whisper-rs)
//!                                  └─ UnavailableSttEngine (model missing)
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use multimodal_assistant::stt::{transcribe_file, TranscribeParams, WhisperEngine};
//!
//! let engine = WhisperEngine::load("models/ggml-tiny.bin", TranscribeParams::default())
//!     .expect("model not found");
//! let text = transcribe_file(&engine, "uploads/question.wav").unwrap();
//! println!("{text}");
//! ```

pub mod engine;
pub mod transcribe;

pub use engine::{SttEngine, SttError, UnavailableSttEngine, WhisperEngine};
pub use transcribe::{prepare_audio, transcribe_file, TranscribeParams, WHISPER_SAMPLE_RATE};

#[cfg(test)]
pub use engine::MockSttEngine;
