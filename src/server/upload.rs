//! Upload directory management and multipart form collection.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use axum::extract::Multipart;
use uuid::Uuid;

use super::error::ApiError;

// ---------------------------------------------------------------------------
// Filenames
// ---------------------------------------------------------------------------

/// Reduce a client-supplied filename to `[A-Za-z0-9_.-]`.
///
/// Path separators and whitespace runs become `_`, other characters are
/// dropped, and leading/trailing `.`/`_` are trimmed so the result can never
/// escape the upload directory.  Falls back to `"upload"` when nothing is
/// left.
pub fn sanitize_filename(name: &str) -> String {
    let spaced: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Write `bytes` into `dir` as `<uuid>_<original name>`, sanitized.
pub async fn save_upload(
    dir: &Path,
    original_name: &str,
    bytes: &[u8],
) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let name = sanitize_filename(&format!("{}_{original_name}", Uuid::new_v4()));
    let path = dir.join(name);
    tokio::fs::write(&path, bytes).await?;
    log::debug!("server: saved upload {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

/// Create `dir` if needed and delete every file directly inside it.
///
/// Returns the number of files removed; files that cannot be removed are
/// logged and skipped.
pub fn prepare_upload_dir(dir: &Path) -> std::io::Result<usize> {
    std::fs::create_dir_all(dir)?;
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => log::warn!("server: could not delete {}: {e}", path.display()),
        }
    }
    Ok(removed)
}

// ---------------------------------------------------------------------------
// Multipart
// ---------------------------------------------------------------------------

/// A file part of a multipart request; `file_name` may be empty.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Bytes,
}

impl UploadedFile {
    /// A part only counts as an upload when the client named the file.
    pub fn is_named(&self) -> bool {
        !self.file_name.is_empty()
    }
}

/// Every part of a multipart body, split into files and plain fields.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub files: HashMap<String, UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = MultipartForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(e.to_string()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::bad_request(e.to_string()))?;
                    form.files.insert(name, UploadedFile { file_name, bytes });
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(e.to_string()))?;
                    form.fields.insert(name, text);
                }
            }
        }
        Ok(form)
    }

    /// The named upload under `name`, if any.
    pub fn named_file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name).filter(|f| f.is_named())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
