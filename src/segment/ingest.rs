//! Bounded ingest queue between the capture callback and the worker thread.
//!
//! Single producer (the device callback), single consumer (the worker).
//! The producer side never blocks: when the worker falls behind and the
//! queue fills, the newest block is dropped and counted. Material already
//! queued is always preferred over fresh input, so the voiced stream loses
//! its tail rather than its middle.

use crate::error::{Result, StreamscribeError};
use crate::segment::block::{AudioBlock, CaptureStatus};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counters shared between the producer and the pipeline handle.
#[derive(Debug, Default)]
pub struct IngestCounters {
    dropped_blocks: AtomicU64,
    device_overruns: AtomicU64,
}

/// Snapshot of ingest-side health counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    /// Blocks discarded because the queue was full.
    pub dropped_blocks: u64,
    /// Blocks the device flagged with an overrun/underrun condition.
    pub device_overruns: u64,
}

/// Producer half of the ingest queue, held by the audio source.
#[derive(Clone)]
pub struct IngestProducer {
    tx: Sender<AudioBlock>,
    counters: Arc<IngestCounters>,
}

impl IngestProducer {
    /// Enqueue a block without blocking.
    ///
    /// Returns true if the block was queued, false if it was dropped
    /// (queue full or consumer gone). Safe to call from the real-time
    /// capture callback.
    pub fn push(&self, block: AudioBlock) -> bool {
        if block.status == CaptureStatus::Overrun {
            self.counters.device_overruns.fetch_add(1, Ordering::Relaxed);
        }
        match self.tx.try_send(block) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.counters.dropped_blocks.fetch_add(1, Ordering::Relaxed);
                false
            }
            // Consumer shut down; nothing left to count against.
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Enqueue a block, blocking while the queue is full.
    ///
    /// For replay sources that want backpressure instead of drops. Must
    /// not be called from a real-time capture callback. Returns false if
    /// the consumer is gone.
    pub fn send(&self, block: AudioBlock) -> bool {
        if block.status == CaptureStatus::Overrun {
            self.counters.device_overruns.fetch_add(1, Ordering::Relaxed);
        }
        self.tx.send(block).is_ok()
    }
}

/// Consumer half of the ingest queue, owned by the worker thread.
pub struct IngestConsumer {
    rx: Receiver<AudioBlock>,
    counters: Arc<IngestCounters>,
}

impl IngestConsumer {
    /// Receive the next block, waiting at most `timeout`.
    ///
    /// `Ok(None)` means the timeout elapsed with no block available;
    /// an error means the producer side is gone.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<AudioBlock>> {
        match self.rx.recv_timeout(timeout) {
            Ok(block) => Ok(Some(block)),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Ok(None),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                Err(StreamscribeError::PipelineStopped {
                    message: "ingest queue producer disconnected".to_string(),
                })
            }
        }
    }

    /// Count a block the worker itself had to discard (frame buffer full).
    pub fn count_dropped(&self) {
        self.counters.dropped_blocks.fetch_add(1, Ordering::Relaxed);
    }
}

/// Create a bounded ingest queue of `capacity` blocks.
pub fn ingest_queue(capacity: usize) -> (IngestProducer, IngestConsumer, Arc<IngestCounters>) {
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    let counters = Arc::new(IngestCounters::default());
    (
        IngestProducer {
            tx,
            counters: counters.clone(),
        },
        IngestConsumer {
            rx,
            counters: counters.clone(),
        },
        counters,
    )
}

impl IngestCounters {
    pub fn snapshot(&self) -> IngestStats {
        IngestStats {
            dropped_blocks: self.dropped_blocks.load(Ordering::Relaxed),
            device_overruns: self.device_overruns.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_recv_in_order() {
        let (producer, consumer, _) = ingest_queue(8);
        for i in 0..4 {
            assert!(producer.push(AudioBlock::new(vec![i as f32; 10])));
        }
        for i in 0..4 {
            let block = consumer
                .recv_timeout(Duration::from_millis(10))
                .unwrap()
                .unwrap();
            assert_eq!(block.samples[0], i as f32);
        }
    }

    #[test]
    fn full_queue_drops_newest_and_counts() {
        let (producer, _consumer, counters) = ingest_queue(2);
        assert!(producer.push(AudioBlock::new(vec![0.0])));
        assert!(producer.push(AudioBlock::new(vec![1.0])));
        assert!(!producer.push(AudioBlock::new(vec![2.0])));
        assert!(!producer.push(AudioBlock::new(vec![3.0])));
        assert_eq!(counters.snapshot().dropped_blocks, 2);
    }

    #[test]
    fn overruns_are_counted_but_accepted() {
        let (producer, consumer, counters) = ingest_queue(4);
        assert!(producer.push(AudioBlock::with_status(
            vec![0.0; 480],
            CaptureStatus::Overrun
        )));
        assert_eq!(counters.snapshot().device_overruns, 1);
        assert_eq!(counters.snapshot().dropped_blocks, 0);
        // block still arrives
        assert!(consumer
            .recv_timeout(Duration::from_millis(10))
            .unwrap()
            .is_some());
    }

    #[test]
    fn recv_timeout_returns_none_when_empty() {
        let (_producer, consumer, _) = ingest_queue(2);
        let got = consumer.recv_timeout(Duration::from_millis(5)).unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn recv_errors_after_producer_dropped() {
        let (producer, consumer, _) = ingest_queue(2);
        drop(producer);
        assert!(consumer.recv_timeout(Duration::from_millis(5)).is_err());
    }
}
