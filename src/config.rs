//! Configuration loading and validation.
//!
//! All settings are fixed at startup; nothing here is hot-reloaded. Values
//! come from a TOML file, with a handful of environment variable overrides
//! applied on top.

use crate::defaults;
use crate::error::{Result, StreamscribeError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub segmenter: SegmenterConfig,
    pub stt: SttConfig,
    pub server: ServerConfig,
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    /// Input device name; None picks the system default.
    pub device: Option<String>,
    pub sample_rate: u32,
    /// Analysis frame duration in ms. WebRTC VAD accepts 10, 20 or 30.
    pub frame_ms: u32,
}

/// Segmentation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Window duration handed to the recognizer, in seconds.
    pub chunk_seconds: f32,
    /// Overlap between consecutive windows, in seconds.
    pub overlap_seconds: f32,
    /// VAD aggressiveness, 0 (permissive) to 3 (strict).
    pub aggressiveness: u8,
    /// Ingest queue capacity in audio blocks.
    pub ingest_capacity: usize,
}

/// Speech-to-text configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttConfig {
    /// Path to the Whisper model file.
    pub model: String,
    /// Language hint ("auto" = detect).
    pub language: String,
    /// Beam width for decoding; None means greedy single-hypothesis.
    pub beam_size: Option<u32>,
}

/// Delivery server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// WebSocket listen address, host:port.
    pub bind: String,
    /// Keep-alive / result poll interval in milliseconds.
    pub keepalive_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: defaults::SAMPLE_RATE,
            frame_ms: defaults::FRAME_MS,
        }
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            chunk_seconds: defaults::CHUNK_SECONDS,
            overlap_seconds: defaults::OVERLAP_SECONDS,
            aggressiveness: defaults::VAD_AGGRESSIVENESS,
            ingest_capacity: defaults::INGEST_CAPACITY,
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: defaults::DEFAULT_MODEL.to_string(),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            beam_size: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: defaults::BIND_ADDR.to_string(),
            keepalive_ms: defaults::KEEPALIVE_MS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Missing fields use default values; invalid TOML is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file, or return defaults if it doesn't exist.
    ///
    /// Invalid TOML is still an error; only a missing file falls back.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(StreamscribeError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported variables:
    /// - STREAMSCRIBE_MODEL → stt.model
    /// - STREAMSCRIBE_LANGUAGE → stt.language
    /// - STREAMSCRIBE_AUDIO_DEVICE → audio.device
    /// - STREAMSCRIBE_BIND → server.bind
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("STREAMSCRIBE_MODEL") {
            if !model.is_empty() {
                self.stt.model = model;
            }
        }
        if let Ok(language) = std::env::var("STREAMSCRIBE_LANGUAGE") {
            if !language.is_empty() {
                self.stt.language = language;
            }
        }
        if let Ok(device) = std::env::var("STREAMSCRIBE_AUDIO_DEVICE") {
            if !device.is_empty() {
                self.audio.device = Some(device);
            }
        }
        if let Ok(bind) = std::env::var("STREAMSCRIBE_BIND") {
            if !bind.is_empty() {
                self.server.bind = bind;
            }
        }
        self
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.audio.frame_ms, 10 | 20 | 30) {
            return Err(StreamscribeError::ConfigInvalidValue {
                key: "audio.frame_ms".to_string(),
                message: format!("must be 10, 20 or 30, got {}", self.audio.frame_ms),
            });
        }
        if self.segmenter.aggressiveness > 3 {
            return Err(StreamscribeError::ConfigInvalidValue {
                key: "segmenter.aggressiveness".to_string(),
                message: format!("must be 0-3, got {}", self.segmenter.aggressiveness),
            });
        }
        if self.segmenter.chunk_seconds <= 0.0 {
            return Err(StreamscribeError::ConfigInvalidValue {
                key: "segmenter.chunk_seconds".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.segmenter.overlap_seconds < 0.0
            || self.segmenter.overlap_seconds >= self.segmenter.chunk_seconds
        {
            return Err(StreamscribeError::ConfigInvalidValue {
                key: "segmenter.overlap_seconds".to_string(),
                message: format!(
                    "must be in [0, chunk_seconds), got {} with chunk_seconds {}",
                    self.segmenter.overlap_seconds, self.segmenter.chunk_seconds
                ),
            });
        }
        if self.segmenter.ingest_capacity == 0 {
            return Err(StreamscribeError::ConfigInvalidValue {
                key: "segmenter.ingest_capacity".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Default config file path: `$XDG_CONFIG_HOME/streamscribe/config.toml`.
    #[cfg(feature = "cli")]
    pub fn default_path() -> std::path::PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| std::path::PathBuf::from("."))
            .join("streamscribe")
            .join("config.toml")
    }
}
