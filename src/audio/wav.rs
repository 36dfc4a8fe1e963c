//! WAV file reading and writing via `hound`.
//!
//! Incoming uploads may be any PCM or float WAV layout; they are decoded to
//! mono `f32` in `[-1.0, 1.0]`.  Outgoing responses are always 16-bit PCM
//! mono.

use std::io::{Cursor, Read};
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use super::{stereo_to_mono, AudioError};

/// Decoded mono audio plus the rate it was recorded at.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Read a WAV file from disk and downmix it to mono.
pub fn read_wav_mono(path: impl AsRef<Path>) -> Result<DecodedAudio, AudioError> {
    let reader = WavReader::open(path)?;
    decode(reader)
}

/// Decode an in-memory WAV payload (e.g. an HTTP response body).
pub fn decode_wav_bytes(bytes: &[u8]) -> Result<DecodedAudio, AudioError> {
    let reader = WavReader::new(Cursor::new(bytes))?;
    decode(reader)
}

fn decode<R: Read>(mut reader: WavReader<R>) -> Result<DecodedAudio, AudioError> {
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    Ok(DecodedAudio {
        samples: stereo_to_mono(&interleaved, spec.channels),
        sample_rate: spec.sample_rate,
    })
}

/// Write mono `samples` as a 16-bit PCM WAV file.
///
/// Samples outside `[-1.0, 1.0]` are clamped.
pub fn write_wav(
    path: impl AsRef<Path>,
    samples: &[f32],
    sample_rate: u32,
) -> Result<(), AudioError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &s in samples {
        writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_then_read_preserves_length_and_rate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let samples: Vec<f32> = (0..2_205).map(|i| (i as f32 * 0.05).sin() * 0.5).collect();

        write_wav(&path, &samples, 22_050).unwrap();
        let decoded = read_wav_mono(&path).unwrap();

        assert_eq!(decoded.sample_rate, 22_050);
        assert_eq!(decoded.samples.len(), samples.len());
        for (a, b) in samples.iter().zip(&decoded.samples) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn write_clamps_out_of_range() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("loud.wav");
        write_wav(&path, &[2.0, -2.0], 16_000).unwrap();

        let decoded = read_wav_mono(&path).unwrap();
        assert!((decoded.samples[0] - 1.0).abs() < 1e-3);
        assert!((decoded.samples[1] + 1.0).abs() < 1e-3);
    }

    #[test]
    fn decode_stereo_float_bytes_downmixes() {
        let spec = WavSpec {
            channels: 2,
            sample_rate: 24_000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            for s in [0.2_f32, 0.4, -0.2, -0.4] {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }

        let decoded = decode_wav_bytes(cursor.get_ref()).unwrap();
        assert_eq!(decoded.sample_rate, 24_000);
        assert_eq!(decoded.samples.len(), 2);
        assert!((decoded.samples[0] - 0.3).abs() < 1e-6);
        assert!((decoded.samples[1] + 0.3).abs() < 1e-6);
    }

    #[test]
    fn decode_garbage_is_error() {
        assert!(matches!(
            decode_wav_bytes(b"not a wav file"),
            Err(AudioError::Wav(_))
        ));
    }
}
