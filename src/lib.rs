//! Multimodal analyze-then-correct assistant.
//!
//! A question arrives as text or speech, optionally with an image.  The
//! multimodal model answers it, a second verifier pass corrects the answer,
//! and the result can be spoken back through the resilient TTS core in
//! [`tts`].

pub mod audio;
pub mod config;
pub mod llm;
pub mod pipeline;
pub mod server;
pub mod stt;
pub mod tts;
