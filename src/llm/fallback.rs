//! Best-effort refinement passes.
//!
//! The verifier and summary passes improve an answer the pipeline already
//! has.  When the model call fails for any reason (`Request`, `Timeout`,
//! `Status`, `Parse`, `EmptyResponse`) [`refine`] logs the error and returns
//! `None`, and the caller keeps the text it had.

use crate::llm::client::MultimodalModel;

/// Run a text-only `prompt` through `model`; `None` on any error.
///
/// `pass` names the step in the log line (e.g. `"verifier"`).
pub async fn refine(model: &dyn MultimodalModel, prompt: &str, pass: &str) -> Option<String> {
    match model.generate(prompt, None).await {
        Ok(text) => Some(text),
        Err(err) => {
            log::warn!("llm: {pass} pass failed, keeping previous text: {err}");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
