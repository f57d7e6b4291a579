//! Accumulates chunked PCM16 audio from a streaming client

use crate::{Error, Result};

/// Longest utterance accepted over a stream
pub const MAX_STREAM_SECS: usize = 60;

/// Per-connection audio buffer
#[derive(Debug)]
pub struct AudioStreamBuffer {
    data: Vec<u8>,
    sample_rate: u32,
    max_bytes: usize,
}

impl AudioStreamBuffer {
    /// Create a buffer for mono PCM16 at `sample_rate`
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        let bytes_per_sec = sample_rate as usize * 2;
        Self {
            data: Vec::new(),
            sample_rate,
            max_bytes: bytes_per_sec * MAX_STREAM_SECS,
        }
    }

    /// Append a chunk
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the buffer would exceed the maximum duration;
    /// the buffer is left unchanged.
    pub fn push(&mut self, chunk: &[u8]) -> Result<()> {
        if self.data.len() + chunk.len() > self.max_bytes {
            return Err(Error::InvalidInput(format!(
                "audio stream exceeds {MAX_STREAM_SECS} seconds"
            )));
        }
        self.data.extend_from_slice(chunk);
        Ok(())
    }

    /// Drain the buffered audio
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Buffered duration in seconds
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_secs(&self) -> f32 {
        self.data.len() as f32 / (self.sample_rate as f32 * 2.0)
    }
}
