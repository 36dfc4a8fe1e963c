//! Route handlers.
//!
//! Every handler answers JSON.  Failures are mapped to [`ApiError`] so the
//! body is always `{ "error": … }` or `{ "error": …, "details": … }`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use axum::extract::{Multipart, State};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::error::ApiError;
use super::state::AppState;
use super::upload::{save_upload, MultipartForm, UploadedFile};
use crate::llm::analyze_image;
use crate::pipeline::{PipelineOutput, PipelineRequest};
use crate::tts::{voices_by_language as grouped_voices, Gender, VoiceInfo, AVAILABLE_VOICES};

/// Floor applied to the speed of `high_performance` synthesis requests.
pub const HIGH_PERFORMANCE_MIN_SPEED: f32 = 1.2;

async fn store(dir: &Path, file: &UploadedFile) -> Result<PathBuf, ApiError> {
    save_upload(dir, &file.file_name, &file.bytes)
        .await
        .map_err(ApiError::failed("Could not save upload"))
}

// ---------------------------------------------------------------------------
// POST /analyze
// ---------------------------------------------------------------------------

/// Full pipeline over optional `image`, `audio` and `text` parts.
pub async fn analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<PipelineOutput>, ApiError> {
    let form = MultipartForm::read(multipart).await?;

    let image_path = match form.named_file("image") {
        Some(file) => Some(store(state.upload_dir(), file).await?),
        None => None,
    };
    let audio_path = match form.named_file("audio") {
        Some(file) => Some(store(state.upload_dir(), file).await?),
        None => None,
    };
    let enable_tts = form
        .fields
        .get("enable_tts")
        .map_or(true, |v| v.trim().eq_ignore_ascii_case("true"));

    let request = PipelineRequest {
        image_path,
        audio_path,
        query_text: form.fields.get("text").cloned(),
        enable_tts,
    };
    log::info!(
        "server: /analyze image={} audio={} tts={}",
        request.image_path.is_some(),
        request.audio_path.is_some(),
        request.enable_tts
    );

    let output = state
        .pipeline()
        .run(request)
        .await
        .map_err(ApiError::failed("An error occurred during multimodal analysis."))?;
    Ok(Json(output))
}

// ---------------------------------------------------------------------------
// POST /api/transcribe
// ---------------------------------------------------------------------------

pub async fn transcribe(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let form = MultipartForm::read(multipart).await?;
    let Some(file) = form.files.get("audio") else {
        return Err(ApiError::bad_request("No audio file provided"));
    };
    if !file.is_named() {
        return Err(ApiError::bad_request("Empty audio filename"));
    }

    let path = store(state.upload_dir(), file).await?;
    let transcription = state
        .pipeline()
        .transcribe(&path)
        .await
        .map_err(ApiError::failed("Transcription failed"))?;

    Ok(Json(json!({
        "transcription": transcription,
        "audio_path": path.display().to_string(),
    })))
}

// ---------------------------------------------------------------------------
// POST /api/generate_response
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
}

/// Analyze a previously uploaded image.  Only files inside the upload
/// directory are accepted.
pub async fn generate_response(
    State(state): State<AppState>,
    Form(request): Form<GenerateRequest>,
) -> Result<Json<Value>, ApiError> {
    let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
    let (Some(image_path), Some(query)) = (non_empty(request.image_path), non_empty(request.query))
    else {
        return Err(ApiError::bad_request("Image path and query are required"));
    };

    let root = tokio::fs::canonicalize(state.upload_dir())
        .await
        .map_err(ApiError::failed("Response generation failed"))?;
    let image = tokio::fs::canonicalize(&image_path)
        .await
        .map_err(|_| ApiError::bad_request("Image not found"))?;
    if !image.starts_with(&root) {
        log::warn!("server: rejected image path outside uploads: {image_path}");
        return Err(ApiError::bad_request("Image path must refer to an uploaded file"));
    }

    let response = analyze_image(state.model(), &image, &query)
        .await
        .map_err(ApiError::failed("Response generation failed"))?;
    Ok(Json(json!({ "response": response })))
}

// ---------------------------------------------------------------------------
// POST /api/text_to_speech
// ---------------------------------------------------------------------------

/// Omitted `voice` and `speed` take the `[tts]` defaults.
#[derive(Debug, Default, Deserialize)]
pub struct SpeechRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub speed: Option<f32>,
    #[serde(default)]
    pub high_performance: bool,
}

/// Speed actually used for a request.
pub fn effective_speed(speed: f32, high_performance: bool) -> f32 {
    if high_performance {
        speed.max(HIGH_PERFORMANCE_MIN_SPEED)
    } else {
        speed
    }
}

pub async fn text_to_speech(
    State(state): State<AppState>,
    Json(request): Json<SpeechRequest>,
) -> Result<Json<Value>, ApiError> {
    let Some(text) = request.text.filter(|t| !t.trim().is_empty()) else {
        return Err(ApiError::bad_request("No text provided"));
    };
    let tts = state.tts();
    let requested = request.speed.unwrap_or(tts.default_speed());
    if !requested.is_finite() || requested <= 0.0 {
        return Err(ApiError::bad_request("Speed must be a positive number"));
    }
    let speed = effective_speed(requested, request.high_performance);
    let voice = request.voice.as_deref().unwrap_or(tts.default_voice());

    let filename = tts
        .text_to_speech(&text, voice, speed)
        .await
        .map_err(ApiError::failed("TTS failed"))?;

    match tokio::fs::metadata(tts.store().path_of(&filename)).await {
        Ok(meta) if meta.len() > 0 => Ok(Json(json!({ "audio_response": filename }))),
        _ => Err(ApiError::Internal("Audio generation failed")),
    }
}

// ---------------------------------------------------------------------------
// Voices and health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct VoiceEntry {
    pub name: &'static str,
    pub language: &'static str,
    pub gender: Gender,
}

/// `GET /api/voices`: voice id → metadata.
pub async fn voices() -> Json<BTreeMap<&'static str, VoiceEntry>> {
    let map = AVAILABLE_VOICES
        .iter()
        .map(|v| {
            let entry = VoiceEntry {
                name: v.name,
                language: v.language,
                gender: v.gender,
            };
            (v.id, entry)
        })
        .collect();
    Json(map)
}

/// `GET /api/voices_by_language`.
pub async fn voices_by_language() -> Json<BTreeMap<&'static str, Vec<&'static VoiceInfo>>> {
    Json(grouped_voices())
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
