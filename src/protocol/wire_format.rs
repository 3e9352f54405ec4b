//! Wire format encoding and decoding.
//!
//! Every frame starts with a 6-byte header:
//! ```text
//! ┌─┬─────────────────────────────┬────────────┬───────────────────┐
//! │R│ Stream ID                   │ Frame Type │ Flags             │
//! │1│ 31 bits                     │ 6 bits     │ 10 bits           │
//! └─┴─────────────────────────────┴────────────┴───────────────────┘
//! ```
//!
//! On byte streams each frame is preceded by a 24-bit length.
//! All multi-byte integers are Big Endian.

use std::fmt;

use crate::error::{Result, WireError};

/// Header size in bytes (fixed, exactly 6).
pub const HEADER_LEN: usize = 6;

/// Size of the frame length prefix and of the metadata length field.
pub const UINT24_LEN: usize = 3;

/// Largest value a 24-bit length can carry (16 MiB - 1).
pub const MAX_FRAME_LEN: usize = 0xFF_FFFF;

/// Largest stream id (top bit is reserved).
pub const MAX_STREAM_ID: u32 = 0x7FFF_FFFF;

const FLAGS_MASK: u16 = 0x03FF;
const TYPE_SHIFT: u16 = 10;

/// Flag constants for the protocol.
pub mod flags {
    /// Ignore frame if not understood.
    pub const IGNORE: u16 = 1 << 9;
    /// Metadata region present.
    pub const METADATA: u16 = 1 << 8;
    /// More fragments follow.
    pub const FOLLOW: u16 = 1 << 7;
    /// Stream completion.
    pub const COMPLETE: u16 = 1 << 6;
    /// Payload carries a next element.
    pub const NEXT: u16 = 1 << 5;

    /// Setup: client will honor leases.
    pub const LEASE: u16 = COMPLETE;
    /// Setup: resume token is present.
    pub const RESUME_ENABLE: u16 = FOLLOW;
    /// Keepalive: peer must answer.
    pub const RESPOND: u16 = FOLLOW;

    /// Check if a specific flag is set.
    #[inline]
    pub fn has_flag(flags: u16, flag: u16) -> bool {
        flags & flag != 0
    }
}

/// The frame kinds defined by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameType {
    Reserved = 0x00,
    Setup = 0x01,
    Lease = 0x02,
    Keepalive = 0x03,
    RequestResponse = 0x04,
    RequestFnf = 0x05,
    RequestStream = 0x06,
    RequestChannel = 0x07,
    RequestN = 0x08,
    Cancel = 0x09,
    Payload = 0x0A,
    Error = 0x0B,
    MetadataPush = 0x0C,
    Resume = 0x0D,
    ResumeOk = 0x0E,
    Ext = 0x3F,
}

impl FrameType {
    /// Map a 6-bit wire code to a known frame type.
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0x00 => Self::Reserved,
            0x01 => Self::Setup,
            0x02 => Self::Lease,
            0x03 => Self::Keepalive,
            0x04 => Self::RequestResponse,
            0x05 => Self::RequestFnf,
            0x06 => Self::RequestStream,
            0x07 => Self::RequestChannel,
            0x08 => Self::RequestN,
            0x09 => Self::Cancel,
            0x0A => Self::Payload,
            0x0B => Self::Error,
            0x0C => Self::MetadataPush,
            0x0D => Self::Resume,
            0x0E => Self::ResumeOk,
            0x3F => Self::Ext,
            _ => return None,
        })
    }

    /// Wire code of this frame type.
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether frames of this type count toward the resume position.
    pub fn is_resumable(self) -> bool {
        matches!(
            self,
            Self::RequestResponse
                | Self::RequestFnf
                | Self::RequestStream
                | Self::RequestChannel
                | Self::RequestN
                | Self::Cancel
                | Self::Error
                | Self::Payload
        )
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Reserved => "RESERVED",
            Self::Setup => "SETUP",
            Self::Lease => "LEASE",
            Self::Keepalive => "KEEPALIVE",
            Self::RequestResponse => "REQUEST_RESPONSE",
            Self::RequestFnf => "REQUEST_FNF",
            Self::RequestStream => "REQUEST_STREAM",
            Self::RequestChannel => "REQUEST_CHANNEL",
            Self::RequestN => "REQUEST_N",
            Self::Cancel => "CANCEL",
            Self::Payload => "PAYLOAD",
            Self::Error => "ERROR",
            Self::MetadataPush => "METADATA_PUSH",
            Self::Resume => "RESUME",
            Self::ResumeOk => "RESUME_OK",
            Self::Ext => "EXT",
        };
        f.write_str(name)
    }
}

/// Decoded frame header.
///
/// The type code is kept raw so that headers with unassigned codes can
/// still be parsed and reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    stream_id: u32,
    type_code: u8,
    flags: u16,
}

impl FrameHeader {
    /// Create a new header. Bits outside the stream id and flag ranges
    /// are discarded.
    pub fn new(stream_id: u32, frame_type: FrameType, flags: u16) -> Self {
        Self {
            stream_id: stream_id & MAX_STREAM_ID,
            type_code: frame_type.code(),
            flags: flags & FLAGS_MASK,
        }
    }

    /// Encode header to bytes (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use rsocket_wire::protocol::{flags, FrameHeader, FrameType};
    ///
    /// let header = FrameHeader::new(1, FrameType::RequestFnf, flags::METADATA);
    /// assert_eq!(header.encode(), [0, 0, 0, 1, 0x15, 0x00]);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_LEN` (6 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        let packed = (u16::from(self.type_code) << TYPE_SHIFT) | self.flags;
        buf[0..4].copy_from_slice(&self.stream_id.to_be_bytes());
        buf[4..6].copy_from_slice(&packed.to_be_bytes());
    }

    /// Parse a header from the first 6 bytes of `buf`.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_LEN {
            return Err(WireError::MalformedHeader { actual: buf.len() });
        }
        let stream_id = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) & MAX_STREAM_ID;
        let packed = u16::from_be_bytes([buf[4], buf[5]]);
        Ok(Self {
            stream_id,
            type_code: (packed >> TYPE_SHIFT) as u8,
            flags: packed & FLAGS_MASK,
        })
    }

    /// Stream identifier (0 for connection-level frames).
    #[inline]
    pub fn stream_id(&self) -> u32 {
        self.stream_id
    }

    /// Raw 6-bit type code.
    #[inline]
    pub fn type_code(&self) -> u8 {
        self.type_code
    }

    /// Known frame type, `None` for unassigned codes.
    #[inline]
    pub fn frame_type(&self) -> Option<FrameType> {
        FrameType::from_code(self.type_code)
    }

    /// The 10 flag bits.
    #[inline]
    pub fn flags(&self) -> u16 {
        self.flags
    }

    /// Check if a specific flag is set.
    #[inline]
    pub fn has_flag(&self, flag: u16) -> bool {
        flags::has_flag(self.flags, flag)
    }

    /// Whether this frame counts toward the resume position.
    #[inline]
    pub fn is_resumable(&self) -> bool {
        self.frame_type().is_some_and(FrameType::is_resumable)
    }
}

impl fmt::Display for FrameHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.frame_type() {
            Some(t) => write!(f, "stream_id={},type={}", self.stream_id, t)?,
            None => write!(f, "stream_id={},type=0x{:02X}", self.stream_id, self.type_code)?,
        }
        write!(f, ",flags=")?;
        write_flags(f, self.flags)
    }
}

fn write_flags(f: &mut fmt::Formatter<'_>, bits: u16) -> fmt::Result {
    const NAMES: [(u16, &str); 5] = [
        (flags::IGNORE, "I"),
        (flags::METADATA, "M"),
        (flags::FOLLOW, "F"),
        (flags::COMPLETE, "C"),
        (flags::NEXT, "N"),
    ];
    let mut any = false;
    for (bit, name) in NAMES {
        if bits & bit != 0 {
            if any {
                f.write_str("|")?;
            }
            f.write_str(name)?;
            any = true;
        }
    }
    if !any {
        f.write_str("-")?;
    }
    Ok(())
}

/// Encode a 24-bit big-endian length.
///
/// # Panics
///
/// Debug builds panic if `n` does not fit in 24 bits.
#[inline]
pub fn encode_u24(n: usize) -> [u8; UINT24_LEN] {
    debug_assert!(n <= MAX_FRAME_LEN);
    [(n >> 16) as u8, (n >> 8) as u8, n as u8]
}

/// Decode a 24-bit big-endian length from the first 3 bytes of `buf`.
///
/// Returns `None` if buffer is too short.
#[inline]
pub fn decode_u24(buf: &[u8]) -> Option<usize> {
    if buf.len() < UINT24_LEN {
        return None;
    }
    Some((usize::from(buf[0]) << 16) | (usize::from(buf[1]) << 8) | usize::from(buf[2]))
}
