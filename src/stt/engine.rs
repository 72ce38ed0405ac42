use crate::error::{Result, StreamscribeError};
use std::sync::Arc;

/// Trait for the speech recognition engine.
///
/// The engine is synchronous and all-or-nothing: one window of normalized
/// mono f32 audio in, an ordered list of text segments out. Allows swapping
/// implementations (real Whisper vs mock).
pub trait SpeechEngine: Send + Sync {
    /// Transcribe one window of audio.
    ///
    /// # Arguments
    /// * `audio` - Mono samples in [-1.0, 1.0] at 16kHz
    ///
    /// # Returns
    /// Text segments in utterance order. Segments may be empty or
    /// whitespace; the caller joins and trims.
    fn transcribe(&self, audio: &[f32]) -> Result<Vec<String>>;

    /// Name of the loaded model.
    fn model_name(&self) -> &str;

    /// Whether the engine is ready to serve requests.
    fn is_ready(&self) -> bool;
}

/// Implement SpeechEngine for Arc<T> so one engine can be shared.
impl<T: SpeechEngine> SpeechEngine for Arc<T> {
    fn transcribe(&self, audio: &[f32]) -> Result<Vec<String>> {
        (**self).transcribe(audio)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

/// Mock engine for testing.
#[derive(Debug, Clone)]
pub struct MockEngine {
    model_name: String,
    segments: Vec<String>,
    should_fail: bool,
}

impl MockEngine {
    /// Create a mock that returns no segments.
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            segments: Vec::new(),
            should_fail: false,
        }
    }

    /// Configure the segments returned for every window.
    pub fn with_segments(mut self, segments: &[&str]) -> Self {
        self.segments = segments.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Configure the mock to fail on transcribe.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

impl SpeechEngine for MockEngine {
    fn transcribe(&self, _audio: &[f32]) -> Result<Vec<String>> {
        if self.should_fail {
            Err(StreamscribeError::Inference {
                message: "mock inference failure".to_string(),
            })
        } else {
            Ok(self.segments.clone())
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        !self.should_fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_returns_configured_segments() {
        let engine = MockEngine::new("test-model").with_segments(&[" hello", " world"]);
        let segments = engine.transcribe(&[0.0; 100]).unwrap();
        assert_eq!(segments, vec![" hello".to_string(), " world".to_string()]);
    }

    #[test]
    fn mock_failure_is_an_inference_error() {
        let engine = MockEngine::new("test-model").with_failure();
        match engine.transcribe(&[0.0; 100]) {
            Err(StreamscribeError::Inference { message }) => {
                assert_eq!(message, "mock inference failure");
            }
            other => panic!("expected Inference error, got {other:?}"),
        }
        assert!(!engine.is_ready());
    }

    #[test]
    fn engine_trait_is_object_safe() {
        let engine: Box<dyn SpeechEngine> =
            Box::new(MockEngine::new("boxed").with_segments(&["ok"]));
        assert_eq!(engine.model_name(), "boxed");
        assert_eq!(engine.transcribe(&[]).unwrap(), vec!["ok".to_string()]);
    }

    #[test]
    fn arc_engine_delegates() {
        let engine = Arc::new(MockEngine::new("shared").with_segments(&["a"]));
        assert_eq!(engine.model_name(), "shared");
        assert!(engine.is_ready());
        assert_eq!(engine.transcribe(&[]).unwrap(), vec!["a".to_string()]);
    }
}
