//! Error types for rsocket-wire.

use thiserror::Error;

use crate::protocol::FrameType;

/// Structural problems found by a frame's `validate()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Body is shorter than the fixed fields of its frame type.
    #[error("incomplete {frame_type:?} frame: expected at least {expected} bytes, got {actual}")]
    IncompleteFrame {
        /// Frame type being validated.
        frame_type: FrameType,
        /// Minimum body length.
        expected: usize,
        /// Actual body length.
        actual: usize,
    },

    /// Declared metadata length runs past the end of the body.
    #[error("metadata length {declared} exceeds remaining body of {available} bytes")]
    MetadataOverflow {
        /// Length announced by the 24-bit prefix.
        declared: usize,
        /// Bytes left after the prefix.
        available: usize,
    },

    /// Frame type requires the metadata flag but it is not set.
    #[error("metadata flag is required for {0:?} frames")]
    MissingMetadata(FrameType),
}

/// Main error type for all codec, fragmentation and transport operations.
#[derive(Debug, Error)]
pub enum WireError {
    /// Fewer bytes than the fixed header width.
    #[error("malformed header: need 6 bytes, got {actual}")]
    MalformedHeader {
        /// Bytes available.
        actual: usize,
    },

    /// Header type code has no frame implementation.
    #[error("unknown frame type: 0x{0:02X}")]
    UnknownFrameType(u8),

    /// Frame failed its structural validation.
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] FrameError),

    /// Stream ended in the middle of a length-prefixed frame.
    #[error("stream ended mid-frame: expected {expected} bytes, {buffered} buffered")]
    Framing {
        /// Bytes needed to finish the current frame (including prefix).
        expected: usize,
        /// Bytes actually buffered.
        buffered: usize,
    },

    /// Frame does not fit the length prefix or the configured limit.
    #[error("frame of {size} bytes exceeds maximum {max}")]
    FrameTooLarge {
        /// Encoded frame length.
        size: usize,
        /// Allowed maximum.
        max: usize,
    },

    /// MTU cannot hold a header, a metadata prefix and one payload byte.
    #[error("mtu {mtu} is below the minimum of {min}")]
    InvalidMtu {
        /// Requested MTU.
        mtu: usize,
        /// Smallest usable MTU.
        min: usize,
    },

    /// Underlying stream read failed.
    #[error("read frame failed: {0}")]
    Read(#[source] std::io::Error),

    /// Underlying stream write or flush failed.
    #[error("write frame failed: {0}")]
    Write(#[source] std::io::Error),

    /// Deadline set on the connection expired.
    #[error("deadline exceeded")]
    Timeout,

    /// Fragment pushed into a joiner for another stream.
    #[error("fragment for stream {actual} pushed into joiner for stream {expected}")]
    StreamMismatch {
        /// Stream id of the joiner.
        expected: u32,
        /// Stream id of the pushed fragment.
        actual: u32,
    },

    /// Fragment pushed after the terminal fragment.
    #[error("joiner already received its final fragment")]
    AlreadyComplete,

    /// Reassembled payload read before the final fragment arrived.
    #[error("joiner is still waiting for fragments")]
    Incomplete,
}

/// Result type alias using WireError.
pub type Result<T> = std::result::Result<T, WireError>;
