//! Data types that flow between pipeline stages.

/// Capture status reported by the device alongside each block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureStatus {
    /// Block delivered normally.
    #[default]
    Ok,
    /// The device reported an overrun/underrun for this block. The block
    /// is still carried; the condition is only counted.
    Overrun,
}

/// A raw audio block as delivered by the capture callback.
///
/// Mono f32 samples in [-1, 1], variable length (device-determined),
/// ordered implicitly by arrival.
#[derive(Debug, Clone)]
pub struct AudioBlock {
    pub samples: Vec<f32>,
    pub status: CaptureStatus,
}

impl AudioBlock {
    pub fn new(samples: Vec<f32>) -> Self {
        Self {
            samples,
            status: CaptureStatus::Ok,
        }
    }

    pub fn with_status(samples: Vec<f32>, status: CaptureStatus) -> Self {
        Self { samples, status }
    }

    /// Duration of this block in milliseconds at the given rate.
    pub fn duration_ms(&self, sample_rate: u32) -> u32 {
        (self.samples.len() as u32 * 1000) / sample_rate
    }
}

/// A fixed-duration slice of the voiced stream, ready for recognition.
///
/// Every window is `target + overlap` PCM samples long; nothing is
/// emitted until that much history exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    /// Monotonically increasing emission index.
    pub index: u64,
    /// 16-bit PCM samples at the pipeline sample rate.
    pub samples: Vec<i16>,
}

impl Window {
    /// Duration of this window in milliseconds at the given rate.
    pub fn duration_ms(&self, sample_rate: u32) -> u32 {
        (self.samples.len() as u32 * 1000) / sample_rate
    }
}

/// A transcription result for one window.
///
/// `text` is trimmed and never empty; windows that transcribe to nothing
/// produce no event at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEvent {
    /// Index of the source window.
    pub index: u64,
    pub text: String,
}
