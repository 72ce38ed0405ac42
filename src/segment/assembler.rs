//! Window assembly over the voiced stream.
//!
//! Classified frames are appended to a running PCM stream: speech frames
//! verbatim, silence frames as zeros of the same length. Keeping silence in
//! the stream does two things: gaps survive at word boundaries (so the
//! recognizer doesn't glue words together), and the stream grows at
//! wall-clock rate, which makes window emission approximately periodic.
//!
//! The assembler is an explicit state object rather than a generator:
//! `try_next_window` returns `Some` exactly when enough material has
//! accumulated, which gives callers clean cancellation points.

use crate::segment::block::Window;

/// Configuration for window assembly, in samples.
#[derive(Debug, Clone, Copy)]
pub struct AssemblerConfig {
    /// New material required per window (`chunk_seconds * sample_rate`).
    pub target: usize,
    /// Samples shared between consecutive windows.
    pub overlap: usize,
}

impl AssemblerConfig {
    /// Full window length in samples.
    pub fn window_len(&self) -> usize {
        self.target + self.overlap
    }
}

/// Assembles classified frames into overlapping fixed-length windows.
///
/// The first window is withheld until `target + overlap` samples of
/// history exist, so every emitted window has the full length. After each
/// emission only the last `overlap` samples are retained; the next window
/// is ready `target` samples (that is, `chunk_seconds`) later.
pub struct WindowAssembler {
    config: AssemblerConfig,
    /// Voiced stream: PCM speech frames and zero-filled silence frames.
    voiced: Vec<i16>,
    next_index: u64,
}

impl WindowAssembler {
    pub fn new(config: AssemblerConfig) -> Self {
        Self {
            voiced: Vec::with_capacity(config.window_len()),
            config,
            next_index: 0,
        }
    }

    /// Current length of the voiced stream in samples.
    pub fn voiced_len(&self) -> usize {
        self.voiced.len()
    }

    /// Append one classified frame.
    ///
    /// Speech frames are appended verbatim; silence frames contribute an
    /// all-zero run of identical length, never nothing. That keeps the
    /// stream's growth in lockstep with wall-clock time.
    pub fn push_frame(&mut self, frame: &[i16], is_speech: bool) {
        if is_speech {
            self.voiced.extend_from_slice(frame);
        } else {
            self.voiced.resize(self.voiced.len() + frame.len(), 0);
        }
    }

    /// Emit a window if enough voiced material has accumulated.
    ///
    /// The window is exactly the last `target + overlap` samples. After
    /// emission only the trailing `overlap` samples are kept, so window
    /// N's tail equals window N+1's head and memory stays bounded.
    pub fn try_next_window(&mut self) -> Option<Window> {
        let full = self.config.window_len();
        if self.voiced.len() < full {
            return None;
        }

        let start = self.voiced.len() - full;
        let window = Window {
            index: self.next_index,
            samples: self.voiced[start..].to_vec(),
        };
        self.next_index += 1;

        let keep_from = self.voiced.len() - self.config.overlap;
        self.voiced.drain(..keep_from);
        Some(window)
    }
}
