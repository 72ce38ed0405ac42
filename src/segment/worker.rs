//! Transcription worker: drains the ingest queue, segments the audio and
//! runs the speech engine on each assembled window.
//!
//! The worker runs on a dedicated OS thread because both the voice gate and
//! the engine are blocking. Transcript events leave through a tokio channel
//! so async consumers (the delivery server) can await them.

use crate::error::{Result, StreamscribeError};
use crate::segment::assembler::{AssemblerConfig, WindowAssembler};
use crate::segment::block::{AudioBlock, TranscriptEvent};
use crate::segment::framer::FrameAccumulator;
use crate::segment::gate::SpeechClassifier;
use crate::segment::ingest::IngestConsumer;
use crate::stt::engine::SpeechEngine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long the worker waits on the ingest queue before re-checking the
/// running flag.
const RECV_POLL: Duration = Duration::from_millis(50);

/// Segmentation core, independent of threads and channels.
///
/// Feeding a block advances the whole chain: frame extraction, voice
/// classification, window assembly and transcription. Deterministic given
/// the same block sequence, which is what the tests rely on.
pub struct SegmentProcessor<G, E> {
    framer: FrameAccumulator,
    gate: G,
    assembler: WindowAssembler,
    engine: E,
}

impl<G: SpeechClassifier, E: SpeechEngine> SegmentProcessor<G, E> {
    pub fn new(frame_len: usize, assembler: AssemblerConfig, gate: G, engine: E) -> Self {
        Self {
            framer: FrameAccumulator::new(frame_len),
            gate,
            assembler: WindowAssembler::new(assembler),
            engine,
        }
    }

    /// Feed one capture block through the chain.
    ///
    /// Returns the transcript events produced by any windows that became
    /// ready. An error from the classifier is fatal to the stream; an
    /// error from the engine skips that window and is not returned here.
    pub fn process_block(&mut self, block: &AudioBlock) -> Result<Vec<TranscriptEvent>> {
        self.framer.push(&block.samples)?;

        let mut events = Vec::new();
        while let Some(frame) = self.framer.next_frame() {
            let is_speech = self.gate.classify(&frame)?;
            self.assembler.push_frame(&frame, is_speech);

            while let Some(window) = self.assembler.try_next_window() {
                let audio: Vec<f32> = window
                    .samples
                    .iter()
                    .map(|&sample| sample as f32 / 32768.0)
                    .collect();

                let segments = match self.engine.transcribe(&audio) {
                    Ok(segments) => segments,
                    Err(e) => {
                        log::warn!("transcription failed for window {}: {}", window.index, e);
                        continue;
                    }
                };

                let text = segments.concat().trim().to_string();
                if !text.is_empty() {
                    events.push(TranscriptEvent {
                        index: window.index,
                        text,
                    });
                }
            }
        }
        Ok(events)
    }
}

/// Worker thread body. Returns when the running flag clears, the producer
/// disconnects or the event channel closes.
pub(crate) fn run_worker<G, E>(
    consumer: IngestConsumer,
    mut processor: SegmentProcessor<G, E>,
    events: tokio::sync::mpsc::Sender<TranscriptEvent>,
    running: Arc<AtomicBool>,
) where
    G: SpeechClassifier,
    E: SpeechEngine,
{
    while running.load(Ordering::SeqCst) {
        let block = match consumer.recv_timeout(RECV_POLL) {
            Ok(Some(block)) => block,
            Ok(None) => continue,
            Err(_) => {
                log::info!("audio source disconnected, stopping worker");
                break;
            }
        };

        let produced = match processor.process_block(&block) {
            Ok(produced) => produced,
            Err(StreamscribeError::FrameBufferFull { .. }) => {
                consumer.count_dropped();
                log::warn!("frame buffer full, dropping {} samples", block.samples.len());
                continue;
            }
            Err(e) => {
                log::error!("voice classification failed, stopping worker: {}", e);
                break;
            }
        };

        for event in produced {
            if events.blocking_send(event).is_err() {
                log::info!("transcript receiver dropped, stopping worker");
                running.store(false, Ordering::SeqCst);
                return;
            }
        }
    }
    running.store(false, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::gate::MockClassifier;
    use crate::stt::engine::MockEngine;

    const FRAME: usize = 480;

    fn processor_with(
        gate: MockClassifier,
        engine: MockEngine,
    ) -> SegmentProcessor<MockClassifier, MockEngine> {
        SegmentProcessor::new(
            FRAME,
            AssemblerConfig {
                target: FRAME * 4,
                overlap: FRAME,
            },
            gate,
            engine,
        )
    }

    #[test]
    fn speech_blocks_produce_transcripts() {
        let mut processor = processor_with(
            MockClassifier::always(true),
            MockEngine::new("m").with_segments(&[" hello "]),
        );

        // 10 frames of audio, enough for two windows (5 frames then 4 more).
        let mut events = Vec::new();
        for _ in 0..10 {
            let block = AudioBlock::new(vec![0.1; FRAME]);
            events.extend(processor.process_block(&block).unwrap());
        }

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].index, 0);
        assert_eq!(events[0].text, "hello");
        assert_eq!(events[1].index, 1);
    }

    #[test]
    fn engine_failure_skips_window_and_continues() {
        let mut processor = processor_with(
            MockClassifier::always(true),
            MockEngine::new("m").with_failure(),
        );

        for _ in 0..10 {
            let block = AudioBlock::new(vec![0.1; FRAME]);
            let events = processor.process_block(&block).unwrap();
            assert!(events.is_empty());
        }
    }

    #[test]
    fn empty_transcription_is_suppressed() {
        let mut processor = processor_with(
            MockClassifier::always(true),
            MockEngine::new("m").with_segments(&["  ", ""]),
        );

        for _ in 0..10 {
            let block = AudioBlock::new(vec![0.1; FRAME]);
            assert!(processor.process_block(&block).unwrap().is_empty());
        }
    }

    #[test]
    fn classifier_error_is_fatal() {
        let mut processor = processor_with(
            MockClassifier::failing(),
            MockEngine::new("m").with_segments(&["x"]),
        );

        let block = AudioBlock::new(vec![0.1; FRAME]);
        assert!(processor.process_block(&block).is_err());
    }

    #[test]
    fn sub_frame_blocks_accumulate_before_classification() {
        let mut processor = processor_with(
            MockClassifier::always(true),
            MockEngine::new("m").with_segments(&["ok"]),
        );

        // 100-sample blocks never align with the 480-sample frame; the
        // chain must still produce the same windows as full-frame input.
        let total = FRAME * 10;
        let mut events = Vec::new();
        for _ in 0..(total / 100) {
            let block = AudioBlock::new(vec![0.1; 100]);
            events.extend(processor.process_block(&block).unwrap());
        }
        assert_eq!(events.len(), 2);
    }
}
