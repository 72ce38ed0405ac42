use crate::error::{Result, StreamscribeError};
use crate::segment::block::AudioBlock;
use crate::segment::ingest::IngestProducer;

/// Trait for audio capture sources.
///
/// A source pushes capture blocks into the ingest queue from whatever
/// context it owns (a device callback, a file reader). This trait allows
/// swapping implementations (real device vs WAV replay vs mock).
pub trait AudioSource: Send {
    /// Start capturing and deliver blocks into `sink`.
    ///
    /// Returns once capture is running; delivery continues in the
    /// background until `stop` is called or the source is exhausted.
    fn start(&mut self, sink: IngestProducer) -> Result<()>;

    /// Stop capturing.
    fn stop(&mut self) -> Result<()>;
}

/// Mock audio source for testing.
///
/// Delivers its configured blocks synchronously on `start`, so tests see
/// a fully primed ingest queue without timing dependence.
#[derive(Debug, Clone)]
pub struct MockAudioSource {
    blocks: Vec<Vec<f32>>,
    is_started: bool,
    should_fail_start: bool,
    error_message: String,
}

impl MockAudioSource {
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            is_started: false,
            should_fail_start: false,
            error_message: "mock audio error".to_string(),
        }
    }

    /// Configure the blocks delivered on start.
    pub fn with_blocks(mut self, blocks: Vec<Vec<f32>>) -> Self {
        self.blocks = blocks;
        self
    }

    /// Deliver `samples` split into equal blocks of `block_len`.
    pub fn with_samples(mut self, samples: &[f32], block_len: usize) -> Self {
        self.blocks = samples.chunks(block_len).map(|c| c.to_vec()).collect();
        self
    }

    /// Configure the mock to fail on start.
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    pub fn is_started(&self) -> bool {
        self.is_started
    }
}

impl Default for MockAudioSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSource for MockAudioSource {
    fn start(&mut self, sink: IngestProducer) -> Result<()> {
        if self.should_fail_start {
            return Err(StreamscribeError::AudioCapture {
                message: self.error_message.clone(),
            });
        }
        self.is_started = true;
        for samples in &self.blocks {
            sink.push(AudioBlock::new(samples.clone()));
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.is_started = false;
        Ok(())
    }
}
