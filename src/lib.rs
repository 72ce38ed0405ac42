//! streamscribe - live microphone transcription streamed over WebSocket
//!
//! Captures audio, gates it with a per-frame voice activity detector,
//! assembles overlapping recognition windows and serves the transcripts
//! to WebSocket clients as they arrive.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod segment;
pub mod server;
pub mod stt;

// Core traits (source → segment → engine)
pub use audio::source::AudioSource;
pub use segment::gate::SpeechClassifier;
pub use stt::engine::SpeechEngine;

// Pipeline
pub use segment::pipeline::{
    Pipeline, PipelineConfig, PipelineHandle, TranscriptPoll, TranscriptReceiver,
};

// Error handling
pub use error::{Result, StreamscribeError};

// Config
pub use config::Config;
