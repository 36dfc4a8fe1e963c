//! Audio utilities: WAV I/O, channel mixing and resampling.
//!
//! # Flow
//!
//! ```text
//! upload.wav ─▶ read_wav_mono ─▶ resample(→16 kHz) ─▶ STT
//! engine WAV bytes ─▶ decode_wav_bytes ─▶ resample(→output rate) ─▶ assembler ─▶ write_wav
//! ```

pub mod resample;
pub mod wav;

use thiserror::Error;

pub use resample::{resample, stereo_to_mono};
pub use wav::{decode_wav_bytes, read_wav_mono, write_wav, DecodedAudio};

/// Errors raised while decoding, encoding or converting audio.
#[derive(Debug, Error)]
pub enum AudioError {
    /// The WAV container could not be read or written.
    #[error("WAV I/O failed: {0}")]
    Wav(#[from] hound::Error),

    /// The resampler could not be built or failed mid-stream.
    #[error("resampling failed: {0}")]
    Resample(String),
}
