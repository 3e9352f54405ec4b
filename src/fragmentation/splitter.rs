//! Split oversized payloads into MTU-bounded fragments.
//!
//! Metadata is carved first, then data. Every fragment that carries
//! metadata has its own 24-bit metadata length prefix:
//!
//! ```text
//! fragment 0    [skip] [u24 m0] [metadata chunk]             FOLLOW|METADATA
//! fragment 1           [u24 m1] [metadata tail] [data head]  FOLLOW|METADATA
//! fragment 2                                    [data ...]   FOLLOW
//! fragment n                                    [data tail]  (terminal)
//! ```

use crate::error::{Result, WireError};
use crate::protocol::{
    encode_u24, flags, BaseFrame, BufferPool, FrameHeader, FrameType, PayloadFrame, PooledBuf,
    HEADER_LEN, UINT24_LEN,
};

/// Smallest MTU that fits a header, a metadata prefix and one byte.
pub const MIN_MTU: usize = HEADER_LEN + UINT24_LEN + 1;

/// Splits payloads so that each fragment, header included, fits in `mtu`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Splitter {
    mtu: usize,
}

impl Splitter {
    /// # Errors
    ///
    /// `InvalidMtu` if `mtu` is below [`MIN_MTU`].
    pub fn new(mtu: usize) -> Result<Self> {
        if mtu < MIN_MTU {
            return Err(WireError::InvalidMtu { mtu, min: MIN_MTU });
        }
        Ok(Self { mtu })
    }

    #[inline]
    pub fn mtu(&self) -> usize {
        self.mtu
    }

    /// Whether a single frame with this much data and metadata would
    /// exceed the MTU.
    pub fn needs_fragmentation(&self, data_len: usize, metadata_len: usize) -> bool {
        let metadata = if metadata_len > 0 { UINT24_LEN + metadata_len } else { 0 };
        HEADER_LEN + metadata + data_len > self.mtu
    }

    /// Split `data` and `metadata`, calling `emit(index, flags, body)` once
    /// per fragment in order.
    ///
    /// `flags` holds `METADATA` iff the fragment carries metadata and
    /// `FOLLOW` on every fragment but the last. Empty input still emits one
    /// fragment.
    pub fn split<F>(&self, pool: &BufferPool, data: &[u8], metadata: &[u8], emit: F)
    where
        F: FnMut(usize, u16, PooledBuf),
    {
        self.split_skip(pool, 0, data, metadata, emit)
    }

    /// Like [`split`](Self::split), but fragment 0 starts with `skip` zero
    /// bytes reserved for a leading field the caller fills in.
    pub fn split_skip<F>(&self, pool: &BufferPool, skip: usize, data: &[u8], metadata: &[u8], mut emit: F)
    where
        F: FnMut(usize, u16, PooledBuf),
    {
        let mut metadata = metadata;
        let mut data = data;
        let mut index = 0;

        loop {
            let mut body = pool.borrow();
            let mut budget = self.mtu - HEADER_LEN;
            let mut fg = 0;

            if index == 0 && skip > 0 {
                body.resize(skip, 0);
                budget = budget.saturating_sub(skip);
            }

            // Metadata needs room for its prefix and at least one byte.
            if !metadata.is_empty() && budget <= UINT24_LEN {
                budget = 0;
            } else if !metadata.is_empty() {
                fg |= flags::METADATA;
                budget -= UINT24_LEN;
                let n = metadata.len().min(budget);
                body.extend_from_slice(&encode_u24(n));
                body.extend_from_slice(&metadata[..n]);
                metadata = &metadata[n..];
                budget -= n;
            }

            if metadata.is_empty() {
                let n = data.len().min(budget);
                body.extend_from_slice(&data[..n]);
                data = &data[n..];
            }

            let last = metadata.is_empty() && data.is_empty();
            if !last {
                fg |= flags::FOLLOW;
            }
            emit(index, fg, body);
            if last {
                return;
            }
            index += 1;
        }
    }

    /// Build complete PAYLOAD fragments for one stream.
    ///
    /// `flags` (for example `NEXT | COMPLETE`) is applied to the terminal
    /// fragment.
    pub fn fragment_payload(
        &self,
        pool: &BufferPool,
        stream_id: u32,
        data: &[u8],
        metadata: &[u8],
        flags: u16,
    ) -> Vec<PayloadFrame> {
        let extra = flags & !(flags::FOLLOW | flags::METADATA);
        let mut frames = Vec::new();
        self.split(pool, data, metadata, |_, fg, body| {
            let fg = if fg & flags::FOLLOW == 0 { fg | extra } else { fg };
            let header = FrameHeader::new(stream_id, FrameType::Payload, fg);
            frames.push(PayloadFrame::from_base(BaseFrame::new(header, body)));
        });
        frames
    }
}
