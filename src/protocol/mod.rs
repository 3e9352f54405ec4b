//! Protocol module - wire format, framing, and frame types.
//!
//! This module implements the binary frame model:
//! - 6-byte header encoding/decoding
//! - Pooled frame bodies and per-type variants
//! - Frame buffer for the 24-bit length-prefixed stream framing

mod base;
mod buffer_pool;
mod frame;
mod frame_buffer;
mod variants;
mod wire_format;

pub use base::BaseFrame;
pub use buffer_pool::{BufferPool, PooledBuf};
pub use frame::Frame;
pub use frame_buffer::FrameBuffer;
pub use variants::{
    CancelFrame, ErrorCode, ErrorFrame, ExtFrame, FnfFrame, FrameSupport, KeepaliveFrame,
    LeaseFrame, MetadataPushFrame, PayloadFrame, RequestChannelFrame, RequestNFrame,
    RequestResponseFrame, RequestStreamFrame, ResumeFrame, ResumeOkFrame, SetupFrame,
    SetupParams, Version,
};
pub use wire_format::{
    decode_u24, encode_u24, flags, FrameHeader, FrameType, HEADER_LEN, MAX_FRAME_LEN,
    MAX_STREAM_ID, UINT24_LEN,
};
