//! Audio resampling and channel mixing utilities.
//!
//! The Whisper STT engine requires **16 kHz mono `f32`** audio and every
//! synthesized response is written at one fixed output rate.  This module
//! provides the two conversion steps:
//!
//! 1. [`stereo_to_mono`]: downmix any number of interleaved channels to mono.
//! 2. [`resample`]: band-limited sinc resampling (`rubato::SincFixedIn`)
//!    between arbitrary rates.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use super::AudioError;

/// Frames fed to the resampler per `process` call.
const CHUNK_FRAMES: usize = 1024;

// ---------------------------------------------------------------------------
// stereo_to_mono
// ---------------------------------------------------------------------------

/// Mix interleaved multi-channel audio down to mono by averaging all channels.
///
/// The output length is `samples.len() / channels`.  `channels == 1` copies
/// the input; `channels == 0` yields an empty vector.
///
/// # Example
///
/// ```rust
/// use multimodal_assistant::audio::stereo_to_mono;
///
/// let stereo = vec![0.5_f32, -0.5, 0.2, -0.2]; // L R L R
/// let mono = stereo_to_mono(&stereo, 2);
/// assert_eq!(mono.len(), 2);
/// assert!(mono[0].abs() < 1e-6);
/// ```
pub fn stereo_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// resample
// ---------------------------------------------------------------------------

/// Resample mono `samples` from `from_rate` Hz to `to_rate` Hz.
///
/// * Equal rates return a copy of the input (no filtering is applied).
/// * Empty input returns an empty vector.
///
/// The output length is `round(samples.len() * to_rate / from_rate)`; the
/// resampler's filter delay is trimmed from the front so the signal stays
/// aligned with the input.
///
/// # Errors
///
/// [`AudioError::Resample`] when either rate is zero or rubato rejects the
/// configuration.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, AudioError> {
    if from_rate == 0 || to_rate == 0 {
        return Err(AudioError::Resample(format!(
            "invalid sample rates {from_rate} -> {to_rate}"
        )));
    }
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, CHUNK_FRAMES, 1)
        .map_err(|e| AudioError::Resample(e.to_string()))?;

    let expected = (samples.len() as f64 * ratio).round() as usize;
    let delay = resampler.output_delay();
    let mut output: Vec<f32> = Vec::with_capacity(expected + delay);

    let mut pos = 0;
    while samples.len() - pos >= resampler.input_frames_next() {
        let n = resampler.input_frames_next();
        let chunk: &[&[f32]] = &[&samples[pos..pos + n]];
        let frames = resampler
            .process(chunk, None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        output.extend_from_slice(&frames[0]);
        pos += n;
    }

    if pos < samples.len() {
        let tail: &[&[f32]] = &[&samples[pos..]];
        let frames = resampler
            .process_partial(Some(tail), None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        output.extend_from_slice(&frames[0]);
    }

    // Flush the filter tail until the delayed signal is fully out.
    while output.len() < expected + delay {
        let frames = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        if frames[0].is_empty() {
            break;
        }
        output.extend_from_slice(&frames[0]);
    }

    output.drain(..delay.min(output.len()));
    output.resize(expected, 0.0);
    Ok(output)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
