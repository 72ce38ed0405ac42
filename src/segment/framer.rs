//! Frame accumulation: variable-size capture blocks in, fixed-size
//! classification frames out.
//!
//! Backed by a fixed-capacity circular buffer with read/write cursors, so
//! steady-state operation never reallocates. The residual after draining is
//! always shorter than one frame, which keeps the needed capacity small:
//! one frame plus the largest block the device delivers.

use crate::error::{Result, StreamscribeError};

/// Convert float samples in [-1, 1] to 16-bit PCM.
///
/// Samples outside the range are clipped first so spikes don't wrap around
/// on the integer side.
pub fn to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect()
}

/// Circular accumulation buffer that yields exact-length frames.
pub struct FrameAccumulator {
    buf: Box<[f32]>,
    read: usize,
    write: usize,
    len: usize,
    frame_len: usize,
}

impl FrameAccumulator {
    /// Create an accumulator producing frames of `frame_len` samples.
    ///
    /// Capacity defaults to 32 frames, plenty for any realistic device
    /// block size at 30 ms frames.
    pub fn new(frame_len: usize) -> Self {
        Self::with_capacity(frame_len, frame_len * 32)
    }

    /// Create an accumulator with an explicit capacity in samples.
    pub fn with_capacity(frame_len: usize, capacity: usize) -> Self {
        let capacity = capacity.max(frame_len * 2);
        Self {
            buf: vec![0.0; capacity].into_boxed_slice(),
            read: 0,
            write: 0,
            len: 0,
            frame_len,
        }
    }

    /// Number of buffered samples not yet extracted.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append a block of raw samples.
    ///
    /// Fails without side effects if the block does not fit; the caller
    /// decides whether to drop the block or treat it as fatal.
    pub fn push(&mut self, samples: &[f32]) -> Result<()> {
        let free = self.buf.len() - self.len;
        if samples.len() > free {
            return Err(StreamscribeError::FrameBufferFull {
                needed: samples.len(),
                free,
            });
        }

        let first = (self.buf.len() - self.write).min(samples.len());
        self.buf[self.write..self.write + first].copy_from_slice(&samples[..first]);
        let rest = samples.len() - first;
        if rest > 0 {
            self.buf[..rest].copy_from_slice(&samples[first..]);
        }
        self.write = (self.write + samples.len()) % self.buf.len();
        self.len += samples.len();
        Ok(())
    }

    /// Extract the next frame as PCM, or None if fewer than `frame_len`
    /// samples are buffered.
    ///
    /// The returned vector is always exactly `frame_len` long.
    pub fn next_frame(&mut self) -> Option<Vec<i16>> {
        if self.len < self.frame_len {
            return None;
        }

        let mut frame = Vec::with_capacity(self.frame_len);
        let first = (self.buf.len() - self.read).min(self.frame_len);
        frame.extend(to_pcm16(&self.buf[self.read..self.read + first]));
        let rest = self.frame_len - first;
        if rest > 0 {
            frame.extend(to_pcm16(&self.buf[..rest]));
        }
        self.read = (self.read + self.frame_len) % self.buf.len();
        self.len -= self.frame_len;
        Some(frame)
    }
}
