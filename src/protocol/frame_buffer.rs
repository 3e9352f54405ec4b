//! Frame buffer for accumulating partial reads.
//!
//! On byte-stream transports every frame is preceded by a 24-bit
//! big-endian length. `FrameBuffer` is a sans-io state machine that turns
//! arbitrary chunks into whole frames:
//! - `AwaitingLength`: need 3 bytes of length prefix
//! - `AwaitingBody`: prefix consumed, need `len` more bytes
//!
//! Yielded frames exclude the length prefix.
//!
//! # Example
//!
//! ```
//! use rsocket_wire::protocol::FrameBuffer;
//!
//! let mut buffer = FrameBuffer::new();
//!
//! let frames = buffer.push(&[0, 0, 6, 0, 0, 0, 1]).unwrap();
//! assert!(frames.is_empty());
//!
//! let frames = buffer.push(&[0x24, 0x00]).unwrap();
//! assert_eq!(frames.len(), 1);
//! assert_eq!(frames[0].len(), 6);
//! ```

use bytes::{Bytes, BytesMut};

use super::wire_format::{decode_u24, MAX_FRAME_LEN, UINT24_LEN};
use crate::config::DEFAULT_READ_BUFFER_SIZE;
use crate::error::{Result, WireError};

/// State machine for frame parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Waiting for the 3-byte length prefix.
    AwaitingLength,
    /// Prefix consumed, waiting for `len` frame bytes.
    AwaitingBody { len: usize },
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
#[derive(Debug)]
pub struct FrameBuffer {
    buffer: BytesMut,
    state: State,
    max_frame_length: usize,
}

impl FrameBuffer {
    /// Create a new frame buffer with default capacity (64 KiB) and the
    /// protocol maximum frame length.
    pub fn new() -> Self {
        Self::with_capacity_and_max_frame(DEFAULT_READ_BUFFER_SIZE, MAX_FRAME_LEN)
    }

    /// Create a new frame buffer with a custom frame length limit.
    pub fn with_max_frame(max_frame_length: usize) -> Self {
        Self::with_capacity_and_max_frame(DEFAULT_READ_BUFFER_SIZE, max_frame_length)
    }

    /// Create a new frame buffer with custom capacity and frame length limit.
    ///
    /// The limit never exceeds `MAX_FRAME_LEN`.
    pub fn with_capacity_and_max_frame(capacity: usize, max_frame_length: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            state: State::AwaitingLength,
            max_frame_length: max_frame_length.min(MAX_FRAME_LEN),
        }
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// Partial data stays buffered for the next push.
    ///
    /// # Errors
    ///
    /// `FrameTooLarge` if a length prefix exceeds the configured maximum.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.try_next()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Try to extract a single frame from what is already buffered.
    ///
    /// Returns `Ok(None)` if more data is needed.
    pub fn try_next(&mut self) -> Result<Option<Bytes>> {
        loop {
            match self.state {
                State::AwaitingLength => {
                    let Some(len) = decode_u24(&self.buffer) else {
                        return Ok(None);
                    };
                    if len > self.max_frame_length {
                        return Err(WireError::FrameTooLarge {
                            size: len,
                            max: self.max_frame_length,
                        });
                    }
                    let _ = self.buffer.split_to(UINT24_LEN);
                    self.state = State::AwaitingBody { len };
                }
                State::AwaitingBody { len } => {
                    if self.buffer.len() < len {
                        return Ok(None);
                    }
                    let frame = self.buffer.split_to(len).freeze();
                    self.state = State::AwaitingLength;
                    return Ok(Some(frame));
                }
            }
        }
    }

    /// Buffer space for the next socket read.
    pub(crate) fn read_buf(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    /// True when no partial frame is buffered.
    pub fn is_at_boundary(&self) -> bool {
        self.state == State::AwaitingLength && self.buffer.is_empty()
    }

    /// Bytes still needed to finish the current frame, and bytes buffered.
    pub fn pending(&self) -> (usize, usize) {
        match self.state {
            State::AwaitingLength => (UINT24_LEN, self.buffer.len()),
            State::AwaitingBody { len } => (len, self.buffer.len()),
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::AwaitingLength;
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match self.state {
            State::AwaitingLength => "AwaitingLength",
            State::AwaitingBody { .. } => "AwaitingBody",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::wire_format::encode_u24;

    fn prefixed(frame: &[u8]) -> Vec<u8> {
        let mut bytes = encode_u24(frame.len()).to_vec();
        bytes.extend_from_slice(frame);
        bytes
    }

    #[test]
    fn test_single_complete_frame() {
        let mut buffer = FrameBuffer::new();
        let frames = buffer.push(&prefixed(b"0123456789")).unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], b"0123456789");
        assert!(buffer.is_at_boundary());
    }

    #[test]
    fn test_multiple_frames_in_one_push() {
        let mut buffer = FrameBuffer::new();
        let mut combined = prefixed(b"first!");
        combined.extend_from_slice(&prefixed(b"second"));
        combined.extend_from_slice(&prefixed(b"third!"));

        let frames = buffer.push(&combined).unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(&frames[1][..], b"second");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_fragmented_length() {
        let mut buffer = FrameBuffer::new();
        let bytes = prefixed(b"abcdef");

        assert!(buffer.push(&bytes[..2]).unwrap().is_empty());
        assert_eq!(buffer.state_name(), "AwaitingLength");
        assert!(!buffer.is_at_boundary());

        let frames = buffer.push(&bytes[2..]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], b"abcdef");
    }

    #[test]
    fn test_fragmented_body() {
        let mut buffer = FrameBuffer::new();
        let bytes = prefixed(b"this body arrives in two pieces");

        assert!(buffer.push(&bytes[..10]).unwrap().is_empty());
        assert_eq!(buffer.state_name(), "AwaitingBody");
        assert_eq!(buffer.pending(), (31, 7));

        let frames = buffer.push(&bytes[10..]).unwrap();
        assert_eq!(&frames[0][..], b"this body arrives in two pieces");
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut buffer = FrameBuffer::new();
        let mut stream = prefixed(b"hello!");
        stream.extend_from_slice(&prefixed(b"world!"));

        let mut all = Vec::new();
        for byte in &stream {
            all.extend(buffer.push(&[*byte]).unwrap());
        }

        assert_eq!(all.len(), 2);
        assert_eq!(&all[0][..], b"hello!");
        assert_eq!(&all[1][..], b"world!");
    }

    #[test]
    fn test_max_frame_validation() {
        let mut buffer = FrameBuffer::with_max_frame(100);
        let err = buffer.push(&encode_u24(1000)).unwrap_err();

        assert!(matches!(err, WireError::FrameTooLarge { size: 1000, max: 100 }));
    }

    #[test]
    fn test_limit_is_clamped_to_protocol_max() {
        let mut buffer = FrameBuffer::with_max_frame(usize::MAX);
        assert!(buffer.push(&encode_u24(MAX_FRAME_LEN)).unwrap().is_empty());
        assert_eq!(buffer.pending(), (MAX_FRAME_LEN, 0));
    }

    #[test]
    fn test_clear_resets_state() {
        let mut buffer = FrameBuffer::new();
        buffer.push(&[0, 0, 9, 1, 2]).unwrap();
        assert_eq!(buffer.state_name(), "AwaitingBody");

        buffer.clear();
        assert_eq!(buffer.state_name(), "AwaitingLength");
        assert!(buffer.is_at_boundary());
    }
}
