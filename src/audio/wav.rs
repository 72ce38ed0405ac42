//! WAV file audio source for offline transcription.

use crate::audio::source::AudioSource;
use crate::defaults;
use crate::error::{Result, StreamscribeError};
use crate::segment::block::AudioBlock;
use crate::segment::ingest::IngestProducer;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Audio source that replays WAV file data through the pipeline.
///
/// Supports arbitrary sample rates and channels, resampling to the
/// pipeline rate. Delivery uses the blocking producer path, so a long
/// file applies backpressure instead of overflowing the ingest queue.
pub struct WavAudioSource {
    samples: Vec<f32>,
    block_len: usize,
    stop_flag: Arc<AtomicBool>,
    feeder: Option<JoinHandle<()>>,
}

impl WavAudioSource {
    /// Create from any reader (for testing/flexibility).
    pub fn from_reader(reader: Box<dyn Read + Send>) -> Result<Self> {
        let mut wav_reader =
            hound::WavReader::new(reader).map_err(|e| StreamscribeError::AudioFormat {
                message: format!("Failed to parse WAV file: {}", e),
            })?;

        let spec = wav_reader.spec();
        let source_rate = spec.sample_rate;
        let source_channels = spec.channels as usize;

        let raw_samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => wav_reader
                .samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>(),
            hound::SampleFormat::Int => wav_reader
                .samples::<i16>()
                .map(|s| s.map(|v| v as f32 / 32768.0))
                .collect::<std::result::Result<Vec<_>, _>>(),
        }
        .map_err(|e| StreamscribeError::AudioFormat {
            message: format!("Failed to read WAV samples: {}", e),
        })?;

        // Convert to mono by averaging channels
        let mono_samples = if source_channels > 1 {
            raw_samples
                .chunks_exact(source_channels)
                .map(|frame| frame.iter().sum::<f32>() / source_channels as f32)
                .collect()
        } else {
            raw_samples
        };

        let samples = if source_rate != defaults::SAMPLE_RATE {
            resample(&mono_samples, source_rate, defaults::SAMPLE_RATE)
        } else {
            mono_samples
        };

        Ok(Self {
            samples,
            block_len: defaults::frame_len(defaults::SAMPLE_RATE, defaults::FRAME_MS),
            stop_flag: Arc::new(AtomicBool::new(false)),
            feeder: None,
        })
    }

    /// Create from a file on disk.
    pub fn from_path(path: &std::path::Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_reader(Box::new(std::io::Cursor::new(data)))
    }

    /// Create from stdin.
    pub fn from_stdin() -> Result<Self> {
        // StdinLock is not Send, so buffer everything first
        let mut buffer = Vec::new();
        std::io::stdin().lock().read_to_end(&mut buffer)?;
        Self::from_reader(Box::new(std::io::Cursor::new(buffer)))
    }

    /// Total samples after mono downmix and resampling.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Consume the source and return all samples as a single buffer.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

impl AudioSource for WavAudioSource {
    fn start(&mut self, sink: IngestProducer) -> Result<()> {
        let samples = std::mem::take(&mut self.samples);
        let block_len = self.block_len;
        let stop_flag = self.stop_flag.clone();

        let feeder = std::thread::Builder::new()
            .name("wav-feeder".to_string())
            .spawn(move || {
                for chunk in samples.chunks(block_len) {
                    if stop_flag.load(Ordering::SeqCst) {
                        break;
                    }
                    if !sink.send(AudioBlock::new(chunk.to_vec())) {
                        break;
                    }
                }
            })
            .map_err(|e| StreamscribeError::AudioCapture {
                message: format!("failed to spawn wav feeder: {}", e),
            })?;

        self.feeder = Some(feeder);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(feeder) = self.feeder.take() {
            feeder
                .join()
                .map_err(|_| StreamscribeError::AudioCapture {
                    message: "wav feeder thread panicked".to_string(),
                })?;
        }
        Ok(())
    }
}

/// Simple linear interpolation resampling.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos.floor() as usize;
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[source_idx]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as f32
            }
        })
        .collect()
}
