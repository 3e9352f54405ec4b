//! Header plus pooled body, shared by every frame variant.

use std::borrow::Cow;

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::buffer_pool::{BufferPool, PooledBuf};
use super::wire_format::{decode_u24, encode_u24, flags, FrameHeader, FrameType, HEADER_LEN, UINT24_LEN};
use crate::error::FrameError;

/// A frame header together with the body bytes that follow it.
///
/// The body is owned exclusively and goes back to its pool when the frame
/// is dropped.
#[derive(Debug)]
pub struct BaseFrame {
    header: FrameHeader,
    body: PooledBuf,
}

impl BaseFrame {
    /// Pair a header with a body buffer.
    pub fn new(header: FrameHeader, body: PooledBuf) -> Self {
        Self { header, body }
    }

    /// Parsed header.
    #[inline]
    pub fn header(&self) -> FrameHeader {
        self.header
    }

    /// Raw body bytes (everything after the header).
    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Encoded length: header plus body.
    #[inline]
    pub fn len(&self) -> usize {
        HEADER_LEN + self.body.len()
    }

    /// Always false, a frame has at least a header.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Check if a specific flag is set.
    #[inline]
    pub fn has_flag(&self, flag: u16) -> bool {
        self.header.has_flag(flag)
    }

    /// Give the body back to the pool.
    pub fn release(self) {
        self.body.release()
    }

    /// Append header and body to `dst`.
    pub fn encode_into(&self, dst: &mut BytesMut) {
        dst.reserve(self.len());
        dst.extend_from_slice(&self.header.encode());
        dst.extend_from_slice(&self.body);
    }

    /// Write header and body to an async writer (no length prefix).
    pub async fn write_to<W>(&self, writer: &mut W) -> std::io::Result<usize>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(&self.header.encode()).await?;
        writer.write_all(&self.body).await?;
        Ok(self.len())
    }

    pub(crate) fn read_u16(&self, offset: usize) -> u16 {
        let b = &self.body[offset..offset + 2];
        u16::from_be_bytes([b[0], b[1]])
    }

    pub(crate) fn read_u32(&self, offset: usize) -> u32 {
        let b = &self.body[offset..offset + 4];
        u32::from_be_bytes([b[0], b[1], b[2], b[3]])
    }

    pub(crate) fn read_u64(&self, offset: usize) -> u64 {
        let mut b = [0u8; 8];
        b.copy_from_slice(&self.body[offset..offset + 8]);
        u64::from_be_bytes(b)
    }

    /// Fail unless the body holds at least `min` bytes.
    pub(crate) fn require_len(&self, frame_type: FrameType, min: usize) -> Result<(), FrameError> {
        if self.body.len() < min {
            return Err(FrameError::IncompleteFrame {
                frame_type,
                expected: min,
                actual: self.body.len(),
            });
        }
        Ok(())
    }

    /// Check the length-prefixed metadata region starting at `offset`.
    pub(crate) fn validate_metadata(&self, frame_type: FrameType, offset: usize) -> Result<(), FrameError> {
        self.require_len(frame_type, offset)?;
        if !self.has_flag(flags::METADATA) {
            return Ok(());
        }
        self.require_len(frame_type, offset + UINT24_LEN)?;
        let declared = decode_u24(&self.body[offset..]).unwrap_or(0);
        let available = self.body.len() - offset - UINT24_LEN;
        if declared > available {
            return Err(FrameError::MetadataOverflow { declared, available });
        }
        Ok(())
    }

    /// Metadata region after `offset`, if the metadata flag is set and the
    /// declared length fits.
    pub(crate) fn try_slice_metadata(&self, offset: usize) -> Option<&[u8]> {
        if !self.has_flag(flags::METADATA) {
            return None;
        }
        let rest = self.body.get(offset..)?;
        let len = decode_u24(rest)?;
        rest.get(UINT24_LEN..UINT24_LEN + len)
    }

    /// Data region after `offset` and after the metadata region if any.
    pub(crate) fn try_slice_data(&self, offset: usize) -> &[u8] {
        let mut start = offset;
        if self.has_flag(flags::METADATA) {
            match self.body.get(offset..).and_then(decode_u24) {
                Some(len) => start += UINT24_LEN + len,
                None => return &[],
            }
        }
        self.body.get(start..).unwrap_or(&[])
    }
}

/// Builds frame bodies in a pooled buffer.
///
/// Writes into `BytesMut` cannot fail short of allocator exhaustion, which
/// aborts the process.
pub(crate) struct BodyWriter {
    buf: PooledBuf,
    flags: u16,
}

impl BodyWriter {
    pub(crate) fn new(pool: &BufferPool, flags: u16) -> Self {
        Self {
            buf: pool.borrow(),
            flags,
        }
    }

    pub(crate) fn put_u8(&mut self, n: u8) -> &mut Self {
        self.buf.put_u8(n);
        self
    }

    pub(crate) fn put_u16(&mut self, n: u16) -> &mut Self {
        self.buf.put_u16(n);
        self
    }

    pub(crate) fn put_u32(&mut self, n: u32) -> &mut Self {
        self.buf.put_u32(n);
        self
    }

    pub(crate) fn put_u64(&mut self, n: u64) -> &mut Self {
        self.buf.put_u64(n);
        self
    }

    pub(crate) fn put_slice(&mut self, b: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(b);
        self
    }

    /// Length-prefixed metadata; sets the metadata flag when non-empty.
    pub(crate) fn put_metadata(&mut self, metadata: &[u8]) -> &mut Self {
        if !metadata.is_empty() {
            self.flags |= flags::METADATA;
            self.buf.extend_from_slice(&encode_u24(metadata.len()));
            self.buf.extend_from_slice(metadata);
        }
        self
    }

    pub(crate) fn finish(self, stream_id: u32, frame_type: FrameType) -> BaseFrame {
        BaseFrame::new(FrameHeader::new(stream_id, frame_type, self.flags), self.buf)
    }
}

/// Lossy UTF-8 view for logging.
pub(crate) fn utf8(b: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(b)
}
