//! Multimodal analyze-then-correct pipeline.
//!
//! This module wires STT, the multimodal model and text-to-speech into the
//! single request flow served by `POST /analyze`.
//!
//! # Architecture
//!
//! ```text
//! PipelineRequest { image?, audio?, text?, enable_tts }
//!        │
//!        ▼
//! MultimodalPipeline::run()
//!        │
//!        ├─ SttEngine            (spawn_blocking)  → transcribed_text
//!        ├─ MultimodalModel      analyze / verify  → initial / corrected
//!        └─ TextToSpeech         summary? + speak  → tts_audio
//!        │
//!        ▼
//! PipelineOutput  (serialised as the JSON response)
//! ```

pub mod runner;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{MultimodalPipeline, PipelineError, PipelineOutput, PipelineRequest};
