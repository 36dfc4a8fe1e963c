//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\multimodal-assistant\
//!   macOS:   ~/Library/Application Support/multimodal-assistant/
//!   Linux:   ~/.config/multimodal-assistant/
//!
//! Data dir (models, voice assets, uploads):
//!   Windows: %LOCALAPPDATA%\multimodal-assistant\
//!   macOS:   ~/Library/Application Support/multimodal-assistant/
//!   Linux:   ~/.local/share/multimodal-assistant/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory for downloaded GGML Whisper model files.
    pub models_dir: PathBuf,
    /// Directory holding local `<voice>.pt` voice assets.
    pub voices_dir: PathBuf,
    /// Directory where uploads and generated audio are written.
    pub uploads_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "multimodal-assistant";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self {
            settings_file: config_dir.join("settings.toml"),
            config_dir,
            models_dir: data_dir.join("models"),
            voices_dir: data_dir.join("kokoro_assets").join("voices"),
            uploads_dir: data_dir.join("uploads"),
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
