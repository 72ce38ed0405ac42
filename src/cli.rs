//! Command-line interface for streamscribe
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Live microphone transcription streamed over WebSocket
#[derive(Parser, Debug)]
#[command(
    name = "streamscribe",
    version,
    about = "Live microphone transcription streamed over WebSocket"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Audio input device name
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Path to the Whisper model file
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Language code for transcription (auto, en, de, es, ...)
    #[arg(long, value_name = "LANG")]
    pub language: Option<String>,

    /// WebSocket bind address
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Capture from the microphone and serve transcripts (default)
    Listen,

    /// List available audio input devices
    Devices,

    /// Transcribe a WAV file and print the transcripts
    Transcribe {
        /// Path to the WAV file, or "-" for stdin
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

impl Cli {
    /// Fold command-line overrides into a loaded config.
    pub fn apply_overrides(&self, config: &mut crate::config::Config) {
        if let Some(device) = &self.device {
            config.audio.device = Some(device.clone());
        }
        if let Some(model) = &self.model {
            config.stt.model = model.clone();
        }
        if let Some(language) = &self.language {
            config.stt.language = language.clone();
        }
        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
    }
}
