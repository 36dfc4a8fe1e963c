//! Ordered concatenation of chunk audio and WAV persistence.
//!
//! Every file lands in one directory under a fresh UUID name; callers only
//! ever see the bare filename.

use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

use crate::audio::{write_wav, AudioError};
use crate::tts::executor::SynthesisResult;

// ---------------------------------------------------------------------------
// Waveform
// ---------------------------------------------------------------------------

/// Mono audio owned by a single request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
}

impl Waveform {
    pub fn new(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    /// Exactly one second of zero amplitude at `sample_rate`.
    pub fn silence(sample_rate: u32) -> Self {
        Self::new(vec![0.0; sample_rate as usize])
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Concatenate `results` in ordinal order, without resampling or fades.
pub fn assemble(mut results: Vec<SynthesisResult>) -> Waveform {
    results.sort_by_key(|r| r.ordinal);
    let total = results.iter().map(|r| r.samples.len()).sum();
    let mut samples = Vec::with_capacity(total);
    for r in results {
        samples.extend(r.samples);
    }
    Waveform::new(samples)
}

// ---------------------------------------------------------------------------
// AudioStore
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("cannot create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {file}: {source}")]
    Write {
        file: String,
        #[source]
        source: AudioError,
    },
}

/// Which cascade outcome a file holds; decides the filename suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Response,
    ErrorResponse,
    SilentResponse,
}

impl OutputKind {
    pub fn suffix(self) -> &'static str {
        match self {
            OutputKind::Response => "_response.wav",
            OutputKind::ErrorResponse => "_error_response.wav",
            OutputKind::SilentResponse => "_silent_response.wav",
        }
    }
}

/// Writes waveforms as 16-bit mono WAV at one fixed sample rate.
#[derive(Debug, Clone)]
pub struct AudioStore {
    dir: PathBuf,
    sample_rate: u32,
}

impl AudioStore {
    pub fn new(dir: impl Into<PathBuf>, sample_rate: u32) -> Self {
        Self {
            dir: dir.into(),
            sample_rate,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Full path of a filename previously returned by [`write`](Self::write).
    pub fn path_of(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Persist `waveform` and return the generated filename.
    pub fn write(&self, waveform: &Waveform, kind: OutputKind) -> Result<String, StorageError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| StorageError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let filename = format!("{}{}", Uuid::new_v4(), kind.suffix());
        write_wav(self.path_of(&filename), &waveform.samples, self.sample_rate).map_err(
            |source| StorageError::Write {
                file: filename.clone(),
                source,
            },
        )?;

        log::debug!(
            "tts: wrote {filename} ({} samples @ {} Hz)",
            waveform.len(),
            self.sample_rate
        );
        Ok(filename)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
