//! Pipeline orchestration: wires the audio source, worker thread and
//! result channel together and owns their lifetimes.

use crate::audio::source::AudioSource;
use crate::config::Config;
use crate::defaults;
use crate::error::{Result, StreamscribeError};
use crate::segment::assembler::AssemblerConfig;
use crate::segment::block::TranscriptEvent;
use crate::segment::gate::{SpeechClassifier, WebRtcGate};
use crate::segment::ingest::{ingest_queue, IngestCounters, IngestStats};
use crate::segment::worker::{run_worker, SegmentProcessor};
use crate::stt::engine::SpeechEngine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Configuration for the segmentation pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Classifier frame length in milliseconds (10, 20 or 30)
    pub frame_ms: u32,
    /// Fresh audio per window in seconds
    pub chunk_seconds: f32,
    /// Carried context per window in seconds
    pub overlap_seconds: f32,
    /// Voice gate aggressiveness (0-3)
    pub aggressiveness: u8,
    /// Ingest queue capacity in blocks
    pub ingest_capacity: usize,
    /// Result channel capacity in events
    pub result_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            frame_ms: defaults::FRAME_MS,
            chunk_seconds: defaults::CHUNK_SECONDS,
            overlap_seconds: defaults::OVERLAP_SECONDS,
            aggressiveness: defaults::VAD_AGGRESSIVENESS,
            ingest_capacity: defaults::INGEST_CAPACITY,
            result_capacity: defaults::RESULT_CAPACITY,
        }
    }
}

impl PipelineConfig {
    /// Build from the app config (assumed validated).
    pub fn from_config(config: &Config) -> Self {
        Self {
            sample_rate: config.audio.sample_rate,
            frame_ms: config.audio.frame_ms,
            chunk_seconds: config.segmenter.chunk_seconds,
            overlap_seconds: config.segmenter.overlap_seconds,
            aggressiveness: config.segmenter.aggressiveness,
            ingest_capacity: config.segmenter.ingest_capacity,
            result_capacity: defaults::RESULT_CAPACITY,
        }
    }

    /// Classifier frame length in samples.
    pub fn frame_len(&self) -> usize {
        defaults::frame_len(self.sample_rate, self.frame_ms)
    }

    /// Fresh samples per window.
    pub fn target(&self) -> usize {
        (self.chunk_seconds * self.sample_rate as f32) as usize
    }

    /// Carried samples per window.
    pub fn overlap(&self) -> usize {
        (self.overlap_seconds * self.sample_rate as f32) as usize
    }

    fn assembler(&self) -> AssemblerConfig {
        AssemblerConfig {
            target: self.target(),
            overlap: self.overlap(),
        }
    }

    /// Factory for the production WebRTC gate, suitable for
    /// [`Pipeline::start`]. The gate itself is not `Send`, so it is
    /// constructed on the worker thread.
    pub fn webrtc_gate_factory(&self) -> impl FnOnce() -> Result<WebRtcGate> + Send + 'static {
        let sample_rate = self.sample_rate;
        let aggressiveness = self.aggressiveness;
        move || WebRtcGate::new(sample_rate, aggressiveness)
    }
}

/// Handle to a running pipeline.
pub struct PipelineHandle {
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    source: Box<dyn AudioSource>,
    counters: Arc<IngestCounters>,
}

impl PipelineHandle {
    /// Whether the worker is still processing.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Snapshot of ingest health counters.
    pub fn stats(&self) -> IngestStats {
        self.counters.snapshot()
    }

    /// Stop the source, signal the worker and wait for it to finish.
    pub fn stop(mut self) -> Result<()> {
        self.source.stop()?;
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                return Err(StreamscribeError::PipelineStopped {
                    message: "worker thread panicked".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        // Unblocks the worker if the handle is dropped without stop().
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Outcome of polling the result channel with a timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptPoll {
    /// A transcript arrived.
    Event(TranscriptEvent),
    /// The timeout elapsed with nothing pending.
    Idle,
    /// The worker is gone and no more events will arrive.
    Closed,
}

/// Receiving end of the result channel.
pub struct TranscriptReceiver {
    rx: tokio::sync::mpsc::Receiver<TranscriptEvent>,
}

impl TranscriptReceiver {
    /// Await the next transcript. `None` means the worker is gone.
    pub async fn recv(&mut self) -> Option<TranscriptEvent> {
        self.rx.recv().await
    }

    /// Await the next transcript for at most `timeout`.
    pub async fn next_timeout(&mut self, timeout: Duration) -> TranscriptPoll {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(event)) => TranscriptPoll::Event(event),
            Ok(None) => TranscriptPoll::Closed,
            Err(_) => TranscriptPoll::Idle,
        }
    }

    /// Blocking receive for synchronous callers. Must not be called from
    /// an async context.
    pub fn blocking_recv(&mut self) -> Option<TranscriptEvent> {
        self.rx.blocking_recv()
    }
}

/// The segmentation pipeline.
pub struct Pipeline;

impl Pipeline {
    /// Start the pipeline: spawn the worker thread, construct the gate on
    /// it, then start the source.
    ///
    /// Gate construction happens on the worker thread because the WebRTC
    /// detector is not `Send`; its result is reported back before this
    /// function returns, so a bad gate config fails here and not later.
    pub fn start<S, G, F, E>(
        mut source: S,
        gate_factory: F,
        engine: E,
        config: &PipelineConfig,
    ) -> Result<(PipelineHandle, TranscriptReceiver)>
    where
        S: AudioSource + 'static,
        G: SpeechClassifier + 'static,
        F: FnOnce() -> Result<G> + Send + 'static,
        E: SpeechEngine + 'static,
    {
        let (producer, consumer, counters) = ingest_queue(config.ingest_capacity);
        let (event_tx, event_rx) = tokio::sync::mpsc::channel(config.result_capacity);
        let running = Arc::new(AtomicBool::new(true));

        let frame_len = config.frame_len();
        let assembler = config.assembler();
        let worker_running = running.clone();
        let (init_tx, init_rx) = std::sync::mpsc::channel::<Result<()>>();

        let worker = thread::Builder::new()
            .name("transcription-worker".to_string())
            .spawn(move || {
                let gate = match gate_factory() {
                    Ok(gate) => {
                        init_tx.send(Ok(())).ok();
                        gate
                    }
                    Err(e) => {
                        worker_running.store(false, Ordering::SeqCst);
                        init_tx.send(Err(e)).ok();
                        return;
                    }
                };
                let processor = SegmentProcessor::new(frame_len, assembler, gate, engine);
                run_worker(consumer, processor, event_tx, worker_running);
            })
            .map_err(|e| StreamscribeError::PipelineStopped {
                message: format!("failed to spawn worker thread: {}", e),
            })?;

        match init_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                worker.join().ok();
                return Err(e);
            }
            Err(_) => {
                running.store(false, Ordering::SeqCst);
                return Err(StreamscribeError::PipelineStopped {
                    message: "worker thread did not report gate initialization".to_string(),
                });
            }
        }

        if let Err(e) = source.start(producer) {
            running.store(false, Ordering::SeqCst);
            worker.join().ok();
            return Err(e);
        }

        log::info!(
            "pipeline started: frame {} samples, window {}+{} samples",
            frame_len,
            config.target(),
            config.overlap()
        );

        Ok((
            PipelineHandle {
                running,
                worker: Some(worker),
                source: Box::new(source),
                counters,
            },
            TranscriptReceiver { rx: event_rx },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::source::MockAudioSource;
    use crate::segment::gate::MockClassifier;
    use crate::stt::engine::MockEngine;

    fn small_config() -> PipelineConfig {
        PipelineConfig {
            sample_rate: 16_000,
            frame_ms: 30,
            chunk_seconds: 0.06,
            overlap_seconds: 0.03,
            aggressiveness: 2,
            ingest_capacity: 64,
            result_capacity: 16,
        }
    }

    #[test]
    fn derived_lengths_match_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.frame_len(), 480);
        assert_eq!(config.target(), 24_000);
        assert_eq!(config.overlap(), 4_800);
    }

    #[tokio::test]
    async fn end_to_end_with_mocks() {
        let config = small_config();
        // window_len = 960 + 480 = 1440 samples; 6 frames cover two windows
        let source =
            MockAudioSource::new().with_samples(&vec![0.5f32; 480 * 6], 480);
        let engine = MockEngine::new("m").with_segments(&["hi"]);

        let (handle, mut receiver) =
            Pipeline::start(source, || Ok(MockClassifier::always(true)), engine, &config)
                .unwrap();

        let first = receiver.next_timeout(Duration::from_secs(2)).await;
        match first {
            TranscriptPoll::Event(event) => {
                assert_eq!(event.index, 0);
                assert_eq!(event.text, "hi");
            }
            other => panic!("expected event, got {other:?}"),
        }

        handle.stop().unwrap();
    }

    #[tokio::test]
    async fn gate_factory_failure_surfaces_at_start() {
        let config = small_config();
        let source = MockAudioSource::new();
        let engine = MockEngine::new("m");

        let result = Pipeline::start(
            source,
            || -> Result<MockClassifier> {
                Err(StreamscribeError::Classification {
                    message: "bad gate".to_string(),
                })
            },
            engine,
            &config,
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn receiver_closes_after_stop() {
        let config = small_config();
        let source = MockAudioSource::new();
        let engine = MockEngine::new("m");

        let (handle, mut receiver) =
            Pipeline::start(source, || Ok(MockClassifier::always(false)), engine, &config)
                .unwrap();
        assert!(handle.is_running());
        assert_eq!(handle.stats().dropped_blocks, 0);

        handle.stop().unwrap();
        assert_eq!(
            receiver.next_timeout(Duration::from_secs(1)).await,
            TranscriptPoll::Closed
        );
    }
}
