//! Reassemble fragments of one stream into a single payload.

use bytes::{Bytes, BytesMut};

use crate::error::{Result, WireError};
use crate::protocol::{flags, Frame, FrameHeader};

/// Collects the fragments of one message.
///
/// A fragment without `FOLLOW` completes the message. Dropping the joiner
/// returns every fragment's buffer to its pool.
#[derive(Debug)]
pub struct Joiner {
    fragments: Vec<Frame>,
    complete: bool,
}

impl Joiner {
    /// Start from the first fragment.
    pub fn new(first: Frame) -> Self {
        let complete = !first.has_flag(flags::FOLLOW);
        Self {
            fragments: vec![first],
            complete,
        }
    }

    /// Append the next fragment. Returns `true` once the message is
    /// complete.
    ///
    /// # Errors
    ///
    /// `StreamMismatch` for a fragment of another stream, `AlreadyComplete`
    /// after the terminal fragment. The rejected frame is released.
    pub fn push(&mut self, next: Frame) -> Result<bool> {
        if self.complete {
            tracing::warn!(stream_id = next.stream_id(), "fragment after completed message");
            return Err(WireError::AlreadyComplete);
        }
        let expected = self.stream_id();
        if next.stream_id() != expected {
            tracing::warn!(expected, actual = next.stream_id(), "fragment for another stream");
            return Err(WireError::StreamMismatch {
                expected,
                actual: next.stream_id(),
            });
        }
        self.complete = !next.has_flag(flags::FOLLOW);
        self.fragments.push(next);
        Ok(self.complete)
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Header of the first fragment.
    pub fn header(&self) -> FrameHeader {
        self.fragments[0].header()
    }

    /// First fragment, which carries any leading fields of the request.
    pub fn first(&self) -> &Frame {
        &self.fragments[0]
    }

    #[inline]
    pub fn stream_id(&self) -> u32 {
        self.header().stream_id()
    }

    #[inline]
    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    /// Flags of the joined message: the union over all fragments, without
    /// `FOLLOW`.
    pub fn flags(&self) -> u16 {
        self.fragments
            .iter()
            .fold(0, |acc, f| acc | f.header().flags())
            & !flags::FOLLOW
    }

    /// Concatenated metadata, `None` if no fragment carried any.
    ///
    /// # Errors
    ///
    /// `Incomplete` before the terminal fragment arrived.
    pub fn metadata(&self) -> Result<Option<Bytes>> {
        if !self.complete {
            return Err(WireError::Incomplete);
        }
        let mut found = false;
        let mut buf = BytesMut::new();
        for m in self.fragments.iter().filter_map(Frame::metadata) {
            found = true;
            buf.extend_from_slice(m);
        }
        Ok(found.then(|| buf.freeze()))
    }

    /// Concatenated data.
    ///
    /// # Errors
    ///
    /// `Incomplete` before the terminal fragment arrived.
    pub fn data(&self) -> Result<Bytes> {
        if !self.complete {
            return Err(WireError::Incomplete);
        }
        let len = self.fragments.iter().map(|f| f.data().len()).sum();
        let mut buf = BytesMut::with_capacity(len);
        for f in &self.fragments {
            buf.extend_from_slice(f.data());
        }
        Ok(buf.freeze())
    }

    /// Return every fragment buffer to its pool.
    pub fn release(self) {
        for f in self.fragments {
            f.release();
        }
    }
}
