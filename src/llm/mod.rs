//! Multimodal model access for image analysis and answer refinement.
//!
//! This module provides:
//! * [`MultimodalModel`]: async trait for text (+ image) generation.
//! * [`GeminiClient`]: Gemini REST `generateContent` backend.
//! * [`ImageInput`]: image bytes + MIME type, loaded from an upload.
//! * [`analyze_image`]: first-pass image question answering.
//! * [`refine`]: best-effort text-only pass (verifier, summary).
//! * [`prompt`]: prompt builders for every pass.
//! * [`LlmError`]: error variants for model calls.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use multimodal_assistant::config::AppConfig;
//! use multimodal_assistant::llm::{analyze_image, prompt, refine, GeminiClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let model = GeminiClient::from_config(&config.llm);
//!
//!     let initial = analyze_image(&model, "uploads/photo.jpg", "What is on the table?")
//!         .await
//!         .unwrap();
//!     let corrected = refine(&model, &prompt::verifier_prompt(&initial), "verifier")
//!         .await
//!         .unwrap_or(initial);
//!     println!("{corrected}");
//! }
//! ```

pub mod client;
pub mod fallback;
pub mod prompt;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{analyze_image, mime_for_path, GeminiClient, ImageInput, LlmError, MultimodalModel};
pub use fallback::refine;

#[cfg(test)]
pub use client::ScriptedModel;
