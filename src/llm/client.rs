//! Core `MultimodalModel` trait and the Gemini REST implementation.
//!
//! `GeminiClient` calls `models/{model}:generateContent` on the Gemini API.
//! Images travel inline as base64 next to the text prompt.  All connection
//! details come from [`LlmConfig`].

use std::path::Path;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use thiserror::Error;

use crate::config::LlmConfig;
use crate::llm::prompt::analysis_prompt;

// ---------------------------------------------------------------------------
// LlmError
// ---------------------------------------------------------------------------

/// Errors that can occur while talking to the multimodal model.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("model request timed out")]
    Timeout,

    /// The API answered with a non-success status.
    #[error("model API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse model response: {0}")]
    Parse(String),

    /// The model returned a response with no usable text content.
    #[error("model returned an empty response")]
    EmptyResponse,

    /// The image could not be read or has an unsupported type.
    #[error("image unusable: {0}")]
    Image(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// ImageInput
// ---------------------------------------------------------------------------

/// Image bytes plus the MIME type the API needs alongside them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub mime_type: &'static str,
    pub data: Vec<u8>,
}

impl ImageInput {
    /// Read an image file; the MIME type comes from its extension.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LlmError> {
        let path = path.as_ref();
        let mime_type = mime_for_path(path)
            .ok_or_else(|| LlmError::Image(format!("unsupported image type: {}", path.display())))?;
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| LlmError::Image(format!("{}: {e}", path.display())))?;
        Ok(Self { mime_type, data })
    }
}

/// MIME type for the image formats the Gemini API accepts.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// MultimodalModel trait
// ---------------------------------------------------------------------------

/// Async trait for a text (+ optional image) generation model.
///
/// Implementors must be `Send + Sync` so they can be shared as
/// `Arc<dyn MultimodalModel>` by the pipeline and the HTTP handlers.
#[async_trait]
pub trait MultimodalModel: Send + Sync {
    async fn generate(&self, prompt: &str, image: Option<&ImageInput>) -> Result<String, LlmError>;
}

/// Ask `model` about the image at `image_path`.
pub async fn analyze_image(
    model: &dyn MultimodalModel,
    image_path: impl AsRef<Path>,
    query: &str,
) -> Result<String, LlmError> {
    let image = ImageInput::load(image_path).await?;
    model.generate(&analysis_prompt(query), Some(&image)).await
}

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

/// Calls the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl GeminiClient {
    /// Build a client from application config.
    ///
    /// The HTTP client carries the per-request timeout from
    /// `config.timeout_secs`; a default client is used if the builder fails.
    pub fn from_config(config: &LlmConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn request_body(&self, prompt: &str, image: Option<&ImageInput>) -> serde_json::Value {
        let mut parts = Vec::with_capacity(2);
        if let Some(image) = image {
            parts.push(serde_json::json!({
                "inline_data": {
                    "mime_type": image.mime_type,
                    "data":      BASE64.encode(&image.data)
                }
            }));
        }
        parts.push(serde_json::json!({ "text": prompt }));

        serde_json::json!({
            "contents": [ { "role": "user", "parts": parts } ],
            "generationConfig": { "temperature": self.config.temperature }
        })
    }
}

#[async_trait]
impl MultimodalModel for GeminiClient {
    /// The `x-goog-api-key` header is attached only when `config.api_key`
    /// is a non-empty string.
    async fn generate(&self, prompt: &str, image: Option<&ImageInput>) -> Result<String, LlmError> {
        let mut req = self
            .client
            .post(self.endpoint())
            .json(&self.request_body(prompt, image));

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.header("x-goog-api-key", key);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;
        extract_text(&json)
    }
}

/// Join the text parts of the first candidate.
fn extract_text(json: &serde_json::Value) -> Result<String, LlmError> {
    let parts = json["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or(LlmError::EmptyResponse)?;

    let text: String = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join("");
    let text = text.trim();

    if text.is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(text.to_string())
}

// ---------------------------------------------------------------------------
// Test double
// ---------------------------------------------------------------------------

/// Answers from a script of canned replies, in order; records each prompt
/// and whether an image came with it.
#[cfg(test)]
pub struct ScriptedModel {
    replies: std::sync::Mutex<std::collections::VecDeque<Result<String, LlmError>>>,
    prompts: std::sync::Mutex<Vec<(String, bool)>>,
}

#[cfg(test)]
impl ScriptedModel {
    pub fn new(replies: Vec<Result<String, LlmError>>) -> Self {
        Self {
            replies: std::sync::Mutex::new(replies.into()),
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// `(prompt, had_image)` for every call so far.
    pub fn prompts(&self) -> Vec<(String, bool)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl MultimodalModel for ScriptedModel {
    async fn generate(&self, prompt: &str, image: Option<&ImageInput>) -> Result<String, LlmError> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), image.is_some()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyResponse))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
