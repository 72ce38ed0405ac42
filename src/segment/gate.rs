//! Per-frame voice activity classification.
//!
//! The gate is a binary classifier: one fixed-length PCM frame in, one
//! speech/silence verdict out. It keeps no notion of utterances; silence
//! handling (zero-gap insertion) happens in the assembler.

use crate::error::{Result, StreamscribeError};
use webrtc_vad::{SampleRate, Vad, VadMode};

/// Trait for per-frame speech/silence classification.
///
/// Allows swapping the real WebRTC VAD for a deterministic one in tests.
pub trait SpeechClassifier {
    /// Classify one frame of 16-bit PCM at the pipeline sample rate.
    ///
    /// The frame length must match what the classifier was configured for.
    fn classify(&mut self, frame: &[i16]) -> Result<bool>;
}

/// WebRTC-based voice activity gate.
///
/// Not `Send` (the underlying detector holds a raw pointer), so it is
/// constructed on the worker thread via a factory.
pub struct WebRtcGate {
    vad: Vad,
}

impl WebRtcGate {
    /// Create a gate for the given sample rate and aggressiveness (0-3).
    ///
    /// Higher aggressiveness trades missed soft speech for fewer noise
    /// false positives.
    pub fn new(sample_rate: u32, aggressiveness: u8) -> Result<Self> {
        let rate = SampleRate::try_from(sample_rate as i32).map_err(|_| {
            StreamscribeError::AudioFormat {
                message: format!("sample rate {sample_rate}Hz not supported by WebRTC VAD"),
            }
        })?;
        let mode = match aggressiveness {
            0 => VadMode::Quality,
            1 => VadMode::LowBitrate,
            2 => VadMode::Aggressive,
            3 => VadMode::VeryAggressive,
            other => {
                return Err(StreamscribeError::Classification {
                    message: format!("aggressiveness must be 0-3, got {other}"),
                })
            }
        };
        Ok(Self {
            vad: Vad::new_with_rate_and_mode(rate, mode),
        })
    }
}

impl SpeechClassifier for WebRtcGate {
    fn classify(&mut self, frame: &[i16]) -> Result<bool> {
        self.vad
            .is_voice_segment(frame)
            .map_err(|_| StreamscribeError::Classification {
                message: format!(
                    "frame of {} samples rejected (length must be 10/20/30 ms of audio)",
                    frame.len()
                ),
            })
    }
}

/// Deterministic classifier for testing.
#[derive(Debug, Clone)]
pub struct MockClassifier {
    mode: MockMode,
}

#[derive(Debug, Clone)]
enum MockMode {
    Always(bool),
    Amplitude(i16),
    Fail,
}

impl MockClassifier {
    /// Classifier that returns the same verdict for every frame.
    pub fn always(is_speech: bool) -> Self {
        Self {
            mode: MockMode::Always(is_speech),
        }
    }

    /// Classifier that flags a frame as speech when any sample exceeds
    /// the threshold. Lets tests drive speech/silence with sample values.
    pub fn amplitude(threshold: i16) -> Self {
        Self {
            mode: MockMode::Amplitude(threshold),
        }
    }

    /// Classifier that fails on every frame.
    pub fn failing() -> Self {
        Self {
            mode: MockMode::Fail,
        }
    }
}

impl SpeechClassifier for MockClassifier {
    fn classify(&mut self, frame: &[i16]) -> Result<bool> {
        match self.mode {
            MockMode::Always(v) => Ok(v),
            MockMode::Amplitude(threshold) => {
                Ok(frame.iter().any(|&s| s.saturating_abs() > threshold))
            }
            MockMode::Fail => Err(StreamscribeError::Classification {
                message: "mock classifier failure".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsupported_sample_rate() {
        assert!(WebRtcGate::new(44_100, 2).is_err());
    }

    #[test]
    fn rejects_out_of_range_aggressiveness() {
        assert!(WebRtcGate::new(16_000, 4).is_err());
    }

    #[test]
    fn accepts_all_valid_modes() {
        for aggressiveness in 0..=3 {
            assert!(WebRtcGate::new(16_000, aggressiveness).is_ok());
        }
    }

    #[test]
    fn classifies_silence_as_non_speech() {
        let mut gate = WebRtcGate::new(16_000, 2).unwrap();
        let silence = vec![0i16; 480];
        assert!(!gate.classify(&silence).unwrap());
    }

    #[test]
    fn rejects_invalid_frame_length() {
        let mut gate = WebRtcGate::new(16_000, 2).unwrap();
        let frame = vec![0i16; 100];
        assert!(gate.classify(&frame).is_err());
    }

    #[test]
    fn mock_amplitude_thresholds_on_samples() {
        let mut gate = MockClassifier::amplitude(100);
        assert!(!gate.classify(&[0, 50, -100]).unwrap());
        assert!(gate.classify(&[0, 101]).unwrap());
        assert!(gate.classify(&[-32768]).unwrap());
    }
}
