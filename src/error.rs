//! Error types for streamscribe.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamscribeError {
    // Configuration errors
    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio capture errors
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    #[error("Unsupported audio format: {message}")]
    AudioFormat { message: String },

    // Segmentation errors
    #[error("Frame buffer full: {needed} samples would not fit ({free} free)")]
    FrameBufferFull { needed: usize, free: usize },

    #[error("Voice activity classification failed: {message}")]
    Classification { message: String },

    // Transcription errors
    #[error("Transcription model not found at {path}")]
    ModelNotFound { path: String },

    #[error("Transcription inference failed: {message}")]
    Inference { message: String },

    // Delivery errors
    #[error("Delivery server error: {message}")]
    Server { message: String },

    #[error("Pipeline stopped: {message}")]
    PipelineStopped { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, StreamscribeError>;
