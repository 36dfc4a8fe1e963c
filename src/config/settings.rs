//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

/// HTTP listener and upload storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind (e.g. `"127.0.0.1"`).
    pub host: String,
    /// TCP port for the HTTP API.
    pub port: u16,
    /// Directory for uploaded files and generated audio responses.
    pub upload_dir: PathBuf,
    /// Maximum accepted request body size in bytes.
    pub max_content_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5000,
            upload_dir: AppPaths::new().uploads_dir,
            max_content_length: 16 * 1000 * 1000,
        }
    }
}

// ---------------------------------------------------------------------------
// LlmConfig
// ---------------------------------------------------------------------------

/// Settings for the multimodal (vision-language) model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the Gemini REST API.
    pub base_url: String,
    /// API key, normally supplied through `GOOGLE_API_KEY`.
    pub api_key: Option<String>,
    /// Model identifier (e.g. `"gemini-2.5-flash"`).
    pub model: String,
    /// Sampling temperature (0.0 – 1.0).
    pub temperature: f32,
    /// Maximum seconds to wait for a response before timing out.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".into(),
            api_key: None,
            model: "gemini-2.5-flash".into(),
            temperature: 0.4,
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Settings for the Whisper STT engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    /// Path to the GGML model file.
    pub model_path: PathBuf,
    /// Speech language as an ISO-639-1 code, or `"auto"`.
    pub language: String,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model_path: AppPaths::new().models_dir.join("ggml-tiny.bin"),
            language: "en".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// TtsConfig
// ---------------------------------------------------------------------------

/// Settings for speech synthesis and the chunking/fallback pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Base URL of the Kokoro server (OpenAI-compatible `/v1/audio/speech`).
    pub base_url: String,
    /// Model name sent with every synthesis request.
    pub model: String,
    /// Maximum seconds a single synthesis call may take.
    pub timeout_secs: u64,
    /// Directory searched for local `<voice>.pt` assets.
    pub voices_dir: PathBuf,
    /// Send a local asset's path instead of its voice id.  The Kokoro server
    /// must read the same `voices_dir` (same host or a shared mount).
    #[serde(default)]
    pub send_voice_paths: bool,
    /// Voice used when the requested one is unknown.
    pub default_voice: String,
    /// Speed used when a caller does not specify one.
    pub default_speed: f32,
    /// Texts shorter than this (in characters) are synthesized in one call.
    pub chunk_threshold_chars: usize,
    /// Upper bound for a packed chunk, in characters.
    pub max_chunk_chars: usize,
    /// Chunks shorter than this make a plan unusable.
    pub min_chunk_chars: usize,
    /// Concurrent synthesis calls per request.
    pub max_workers: usize,
    /// Sample rate of every written WAV file.
    pub output_sample_rate: u32,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8880".into(),
            model: "kokoro".into(),
            timeout_secs: 60,
            voices_dir: AppPaths::new().voices_dir,
            send_voice_paths: false,
            default_voice: "af_heart".into(),
            default_speed: 1.0,
            chunk_threshold_chars: 150,
            max_chunk_chars: 150,
            min_chunk_chars: 5,
            max_workers: 2,
            output_sample_rate: 22_050,
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Settings for the analyze → correct → speak pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Corrected answers longer than this are summarized before speech.
    pub summary_threshold_chars: usize,
    /// Speech speed used for pipeline answers.
    pub tts_speed: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            summary_threshold_chars: 800,
            tts_speed: 1.2,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use multimodal_assistant::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let mut config = AppConfig::load().unwrap();
/// config.apply_env_overrides();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub stt: SttConfig,
    pub tts: TtsConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Overlay values from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Overlay values from `lookup`; empty values are ignored.
    ///
    /// | Variable            | Field                 |
    /// |---------------------|-----------------------|
    /// | `GOOGLE_API_KEY`    | `llm.api_key`         |
    /// | `GEMINI_MODEL`      | `llm.model`           |
    /// | `UPLOAD_FOLDER`     | `server.upload_dir`   |
    /// | `STT_MODEL`         | `stt.model_path`      |
    /// | `KOKORO_BASE_URL`   | `tts.base_url`        |
    /// | `KOKORO_ASSETS_DIR` | `tts.voices_dir`      |
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("GOOGLE_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = get("GEMINI_MODEL") {
            self.llm.model = model;
        }
        if let Some(dir) = get("UPLOAD_FOLDER") {
            self.server.upload_dir = PathBuf::from(dir);
        }
        if let Some(model) = get("STT_MODEL") {
            self.stt.model_path = PathBuf::from(model);
        }
        if let Some(url) = get("KOKORO_BASE_URL") {
            self.tts.base_url = url;
        }
        if let Some(dir) = get("KOKORO_ASSETS_DIR") {
            self.tts.voices_dir = PathBuf::from(dir).join("voices");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        let default = AppConfig::default();

        assert_eq!(config.server.port, default.server.port);
        assert_eq!(config.llm.model, default.llm.model);
        assert_eq!(config.tts.default_voice, default.tts.default_voice);
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.server.port, 5000);
        assert_eq!(cfg.server.max_content_length, 16_000_000);
        assert!(cfg.llm.api_key.is_none());
        assert_eq!(cfg.stt.language, "en");
        assert_eq!(cfg.tts.default_voice, "af_heart");
        assert_eq!(cfg.tts.default_speed, 1.0);
        assert!(!cfg.tts.send_voice_paths);
        assert_eq!(cfg.tts.chunk_threshold_chars, 150);
        assert_eq!(cfg.tts.max_chunk_chars, 150);
        assert_eq!(cfg.tts.min_chunk_chars, 5);
        assert_eq!(cfg.tts.max_workers, 2);
        assert_eq!(cfg.tts.output_sample_rate, 22_050);
        assert_eq!(cfg.pipeline.summary_threshold_chars, 800);
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.server.port = 8080;
        cfg.llm.api_key = Some("key-123".into());
        cfg.llm.model = "gemini-2.0-flash".into();
        cfg.tts.max_workers = 4;
        cfg.tts.default_voice = "bf_emma".into();
        cfg.stt.model_path = PathBuf::from("/models/ggml-base.en.bin");

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.server.port, 8080);
        assert_eq!(loaded.llm.api_key.as_deref(), Some("key-123"));
        assert_eq!(loaded.llm.model, "gemini-2.0-flash");
        assert_eq!(loaded.tts.max_workers, 4);
        assert_eq!(loaded.tts.default_voice, "bf_emma");
        assert_eq!(
            loaded.stt.model_path,
            PathBuf::from("/models/ggml-base.en.bin")
        );
    }

    #[test]
    fn overrides_replace_fields() {
        let env: HashMap<&str, &str> = [
            ("GOOGLE_API_KEY", "secret"),
            ("UPLOAD_FOLDER", "/tmp/up"),
            ("KOKORO_ASSETS_DIR", "/opt/kokoro"),
            ("GEMINI_MODEL", "  "),
        ]
        .into_iter()
        .collect();

        let mut cfg = AppConfig::default();
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.llm.api_key.as_deref(), Some("secret"));
        assert_eq!(cfg.server.upload_dir, PathBuf::from("/tmp/up"));
        assert_eq!(cfg.tts.voices_dir, PathBuf::from("/opt/kokoro/voices"));
        // Blank values are ignored.
        assert_eq!(cfg.llm.model, LlmConfig::default().model);
    }
}
