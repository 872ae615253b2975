//! Decoded audio buffers.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use rodio::Source;

/// Malformed or corrupt audio bytes.
#[derive(Debug, thiserror::Error)]
#[error("Audio decode failed: {0}")]
pub struct DecodeError(pub String);

/// A fully decoded PCM buffer ready for playback.
///
/// Samples are shared behind an `Arc` so pause/resume (which restarts the
/// output stream from an offset) and completion watchers never copy audio.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Interleaved PCM f32 samples.
    pub samples: Arc<Vec<f32>>,

    /// Channel count.
    pub channels: u16,

    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Decode encoded audio bytes (WAV) into PCM.
    pub fn decode(bytes: Vec<u8>) -> Result<Self, DecodeError> {
        let decoder =
            rodio::Decoder::new(Cursor::new(bytes)).map_err(|e| DecodeError(e.to_string()))?;
        let channels = decoder.channels();
        let sample_rate = decoder.sample_rate();
        if channels == 0 || sample_rate == 0 {
            return Err(DecodeError("stream reports zero channels or sample rate".into()));
        }

        let samples: Vec<f32> = decoder.convert_samples().collect();
        if samples.is_empty() {
            return Err(DecodeError("stream decoded to zero samples".into()));
        }

        Ok(Self {
            samples: Arc::new(samples),
            channels,
            sample_rate,
        })
    }

    /// Construct from raw PCM (used by tests and in-memory sources).
    #[must_use]
    pub fn from_pcm(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples: Arc::new(samples),
            channels,
            sample_rate,
        }
    }

    /// Total duration of the buffer. Fixed once decoded.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration(&self) -> Duration {
        let frames = self.samples.len() / self.channels as usize;
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_accounts_for_channels() {
        // 1 second of stereo at 8 kHz = 16 000 interleaved samples.
        let audio = DecodedAudio::from_pcm(vec![0.0; 16_000], 2, 8_000);
        assert_eq!(audio.duration(), Duration::from_secs(1));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = DecodedAudio::decode(vec![0xde, 0xad, 0xbe, 0xef]).unwrap_err();
        assert!(!err.to_string().is_empty());
    }
}
