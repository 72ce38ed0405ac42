//! Default configuration constants for streamscribe.
//!
//! Shared across the config surface and the pipeline so the two never
//! disagree about the audio format.

/// Default audio sample rate in Hz.
///
/// 16kHz mono is what both WebRTC VAD and Whisper expect, and keeps the
/// capture path cheap.
pub const SAMPLE_RATE: u32 = 16_000;

/// Channel count. The pipeline is single-channel throughout; multi-channel
/// devices are downmixed at capture.
pub const CHANNELS: u16 = 1;

/// Analysis frame duration in milliseconds.
///
/// WebRTC VAD accepts only 10, 20 or 30 ms frames; 30 ms keeps per-frame
/// overhead lowest. At 16kHz this is 480 samples per frame.
pub const FRAME_MS: u32 = 30;

/// Window duration handed to the recognizer, in seconds.
pub const CHUNK_SECONDS: f32 = 1.5;

/// Overlap between consecutive windows, in seconds.
///
/// Consecutive windows share this much audio so words straddling a window
/// boundary are seen whole by the recognizer at least once.
pub const OVERLAP_SECONDS: f32 = 0.3;

/// Default VAD aggressiveness (0-3).
///
/// 0 classifies almost anything as speech (background noise included),
/// 3 is the strictest. 2 is a reasonable middle ground for typical
/// microphone input.
pub const VAD_AGGRESSIVENESS: u8 = 2;

/// Capacity of the ingest queue, in audio blocks.
///
/// 256 blocks of 30 ms is about 7.7 seconds of headroom before capture
/// starts dropping blocks.
pub const INGEST_CAPACITY: usize = 256;

/// Capacity of the transcript result channel, in events.
pub const RESULT_CAPACITY: usize = 64;

/// Default language hint for transcription.
///
/// Use "auto" to let the model detect the spoken language.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Language value that triggers automatic language detection.
pub const AUTO_LANGUAGE: &str = "auto";

/// Default Whisper model path.
pub const DEFAULT_MODEL: &str = "models/ggml-small.bin";

/// Default WebSocket bind address for transcript delivery.
pub const BIND_ADDR: &str = "127.0.0.1:8760";

/// Keep-alive interval for delivery connections, in milliseconds.
///
/// Also the poll timeout on the result channel: an empty poll sends a
/// ping instead of a transcript.
pub const KEEPALIVE_MS: u64 = 250;

/// Number of samples in one analysis frame for the given rate and duration.
pub fn frame_len(sample_rate: u32, frame_ms: u32) -> usize {
    (sample_rate as usize * frame_ms as usize) / 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_len_at_defaults_is_480() {
        assert_eq!(frame_len(SAMPLE_RATE, FRAME_MS), 480);
    }

    #[test]
    fn frame_len_rounds_down() {
        assert_eq!(frame_len(8000, 10), 80);
        assert_eq!(frame_len(16000, 20), 320);
    }
}
