//! Async reader for 24-bit length-prefixed frames.
//!
//! Wraps a [`FrameBuffer`] around any `AsyncRead`. Reads go straight into
//! the frame buffer, so a `read()` future that is dropped (for example by
//! a timeout) loses nothing: partial bytes stay buffered for the next call.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::ConnectionConfig;
use crate::error::{Result, WireError};
use crate::protocol::FrameBuffer;

/// Minimum spare capacity before each socket read.
const MIN_READ_CAPACITY: usize = 8 * 1024;

/// Yields one length-delimited frame at a time from a byte stream.
#[derive(Debug)]
pub struct LengthBasedFrameDecoder<R> {
    reader: R,
    buffer: FrameBuffer,
}

impl<R> LengthBasedFrameDecoder<R>
where
    R: AsyncRead + Unpin,
{
    /// Create a decoder with default buffer size and frame limit.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: FrameBuffer::new(),
        }
    }

    pub fn with_config(reader: R, config: &ConnectionConfig) -> Self {
        Self {
            reader,
            buffer: FrameBuffer::with_capacity_and_max_frame(
                config.read_buffer_size,
                config.effective_max_frame_length(),
            ),
        }
    }

    /// Read the next frame (header + body, without the length prefix).
    ///
    /// Returns `Ok(None)` when the stream ends on a frame boundary.
    ///
    /// # Errors
    ///
    /// - `Framing` if the stream ends inside a frame
    /// - `FrameTooLarge` if a length prefix exceeds the limit
    /// - `Read` for I/O failures
    ///
    /// # Cancel safety
    ///
    /// Cancel-safe. Bytes read before cancellation are kept.
    pub async fn read(&mut self) -> Result<Option<Bytes>> {
        loop {
            if let Some(frame) = self.buffer.try_next()? {
                return Ok(Some(frame));
            }

            let buf = self.buffer.read_buf();
            if buf.capacity() - buf.len() < MIN_READ_CAPACITY {
                buf.reserve(MIN_READ_CAPACITY);
            }
            let n = self.reader.read_buf(buf).await.map_err(WireError::Read)?;
            if n == 0 {
                if self.buffer.is_at_boundary() {
                    return Ok(None);
                }
                let (expected, buffered) = self.buffer.pending();
                return Err(WireError::Framing { expected, buffered });
            }
        }
    }

    /// True when no partial frame is buffered.
    pub fn is_at_boundary(&self) -> bool {
        self.buffer.is_at_boundary()
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}
