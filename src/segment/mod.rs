//! Real-time audio segmentation pipeline.
//!
//! Turns a continuous capture stream into overlapping speech windows and
//! transcripts:
//! ```text
//! ┌─────────┐   ┌────────┐   ┌─────────┐   ┌──────┐   ┌───────────┐   ┌────────┐
//! │ Audio   │──▶│ Ingest │──▶│ Frame   │──▶│ Voice│──▶│  Window   │──▶│ Speech │──▶ results
//! │ Source  │   │ Queue  │   │ Accum.  │   │ Gate │   │ Assembler │   │ Engine │
//! └─────────┘   └────────┘   └─────────┘   └──────┘   └───────────┘   └────────┘
//!  (callback)    (bounded)    blocks→frames  per-frame  voiced stream    one window
//!                                            verdict    + overlap        per call
//! ```
//! Everything from the ingest queue onward runs on one worker thread; the
//! capture callback only enqueues.

pub mod assembler;
pub mod block;
pub mod framer;
pub mod gate;
pub mod ingest;
pub mod pipeline;
pub mod worker;

pub use assembler::{AssemblerConfig, WindowAssembler};
pub use block::{AudioBlock, CaptureStatus, TranscriptEvent, Window};
pub use framer::{to_pcm16, FrameAccumulator};
pub use gate::{MockClassifier, SpeechClassifier, WebRtcGate};
pub use ingest::{ingest_queue, IngestConsumer, IngestProducer, IngestStats};
pub use pipeline::{Pipeline, PipelineConfig, PipelineHandle, TranscriptPoll, TranscriptReceiver};
pub use worker::SegmentProcessor;
