//! The `Frame` sum type and decode dispatch.
//!
//! A received frame starts life as a [`BaseFrame`] (parsed header plus
//! pooled body). [`Frame::from_base`] looks the type code up in a static
//! table and wraps the body in the matching variant.
//!
//! # Example
//!
//! ```
//! use rsocket_wire::protocol::{BufferPool, FnfFrame, Frame, FrameType};
//!
//! let pool = BufferPool::global();
//! let frame = Frame::from(FnfFrame::new(pool, 1, b"ping", b"meta", 0));
//!
//! assert_eq!(frame.frame_type(), Some(FrameType::RequestFnf));
//! assert_eq!(frame.data(), b"ping");
//! assert_eq!(frame.metadata(), Some(&b"meta"[..]));
//! ```

use std::borrow::Cow;
use std::fmt;

use bytes::{Bytes, BytesMut};
use tokio::io::AsyncWrite;

use super::base::BaseFrame;
use super::buffer_pool::BufferPool;
use super::variants::*;
use super::wire_format::{FrameHeader, FrameType, HEADER_LEN};
use crate::error::{FrameError, Result, WireError};

/// Any protocol frame.
#[derive(Debug)]
pub enum Frame {
    Setup(SetupFrame),
    Lease(LeaseFrame),
    Keepalive(KeepaliveFrame),
    RequestResponse(RequestResponseFrame),
    RequestFnf(FnfFrame),
    RequestStream(RequestStreamFrame),
    RequestChannel(RequestChannelFrame),
    RequestN(RequestNFrame),
    Cancel(CancelFrame),
    Payload(PayloadFrame),
    Error(ErrorFrame),
    MetadataPush(MetadataPushFrame),
    Resume(ResumeFrame),
    ResumeOk(ResumeOkFrame),
    Ext(ExtFrame),
}

macro_rules! dispatch {
    ($self:expr, $f:ident => $body:expr) => {
        match $self {
            Frame::Setup($f) => $body,
            Frame::Lease($f) => $body,
            Frame::Keepalive($f) => $body,
            Frame::RequestResponse($f) => $body,
            Frame::RequestFnf($f) => $body,
            Frame::RequestStream($f) => $body,
            Frame::RequestChannel($f) => $body,
            Frame::RequestN($f) => $body,
            Frame::Cancel($f) => $body,
            Frame::Payload($f) => $body,
            Frame::Error($f) => $body,
            Frame::MetadataPush($f) => $body,
            Frame::Resume($f) => $body,
            Frame::ResumeOk($f) => $body,
            Frame::Ext($f) => $body,
        }
    };
}

macro_rules! variant_conversions {
    ($($variant:ident($ty:ident) => $decode:ident),* $(,)?) => {
        $(
            impl From<$ty> for Frame {
                fn from(f: $ty) -> Self {
                    Frame::$variant(f)
                }
            }

            fn $decode(base: BaseFrame) -> Frame {
                Frame::$variant($ty::from_base(base))
            }
        )*
    };
}

variant_conversions! {
    Setup(SetupFrame) => decode_setup,
    Lease(LeaseFrame) => decode_lease,
    Keepalive(KeepaliveFrame) => decode_keepalive,
    RequestResponse(RequestResponseFrame) => decode_request_response,
    RequestFnf(FnfFrame) => decode_fnf,
    RequestStream(RequestStreamFrame) => decode_request_stream,
    RequestChannel(RequestChannelFrame) => decode_request_channel,
    RequestN(RequestNFrame) => decode_request_n,
    Cancel(CancelFrame) => decode_cancel,
    Payload(PayloadFrame) => decode_payload,
    Error(ErrorFrame) => decode_error,
    MetadataPush(MetadataPushFrame) => decode_metadata_push,
    Resume(ResumeFrame) => decode_resume,
    ResumeOk(ResumeOkFrame) => decode_resume_ok,
    Ext(ExtFrame) => decode_ext,
}

type Decoder = fn(BaseFrame) -> Frame;

/// Variant constructors indexed by 6-bit type code. Reserved and
/// unassigned codes have no entry.
static DECODERS: [Option<Decoder>; 64] = {
    let mut table: [Option<Decoder>; 64] = [None; 64];
    table[FrameType::Setup as usize] = Some(decode_setup as Decoder);
    table[FrameType::Lease as usize] = Some(decode_lease as Decoder);
    table[FrameType::Keepalive as usize] = Some(decode_keepalive as Decoder);
    table[FrameType::RequestResponse as usize] = Some(decode_request_response as Decoder);
    table[FrameType::RequestFnf as usize] = Some(decode_fnf as Decoder);
    table[FrameType::RequestStream as usize] = Some(decode_request_stream as Decoder);
    table[FrameType::RequestChannel as usize] = Some(decode_request_channel as Decoder);
    table[FrameType::RequestN as usize] = Some(decode_request_n as Decoder);
    table[FrameType::Cancel as usize] = Some(decode_cancel as Decoder);
    table[FrameType::Payload as usize] = Some(decode_payload as Decoder);
    table[FrameType::Error as usize] = Some(decode_error as Decoder);
    table[FrameType::MetadataPush as usize] = Some(decode_metadata_push as Decoder);
    table[FrameType::Resume as usize] = Some(decode_resume as Decoder);
    table[FrameType::ResumeOk as usize] = Some(decode_resume_ok as Decoder);
    table[FrameType::Ext as usize] = Some(decode_ext as Decoder);
    table
};

impl Frame {
    /// Wrap a base frame in the variant named by its type code.
    ///
    /// Does not validate the body; call [`Frame::validate`] for that.
    ///
    /// # Errors
    ///
    /// `UnknownFrameType` for reserved or unassigned codes. The body is
    /// returned to its pool in that case.
    pub fn from_base(base: BaseFrame) -> Result<Self> {
        let code = base.header().type_code();
        match DECODERS.get(usize::from(code)).copied().flatten() {
            Some(decode) => Ok(decode(base)),
            None => Err(WireError::UnknownFrameType(code)),
        }
    }

    /// Parse header and body from raw frame bytes (no length prefix),
    /// copying the body into a buffer from `pool`, then validate.
    pub fn decode(pool: &BufferPool, raw: &[u8]) -> Result<Self> {
        let header = FrameHeader::parse(raw)?;
        let body = pool.borrow_from(&raw[HEADER_LEN..]);
        let frame = Self::from_base(BaseFrame::new(header, body))?;
        frame.validate()?;
        Ok(frame)
    }

    fn support(&self) -> &dyn FrameSupport {
        dispatch!(self, f => f as &dyn FrameSupport)
    }

    /// Underlying header and body.
    pub fn base(&self) -> &BaseFrame {
        self.support().base()
    }

    /// Unwrap into the base frame.
    pub fn into_base(self) -> BaseFrame {
        dispatch!(self, f => f.into_base())
    }

    #[inline]
    pub fn header(&self) -> FrameHeader {
        self.base().header()
    }

    #[inline]
    pub fn stream_id(&self) -> u32 {
        self.header().stream_id()
    }

    /// Frame type (always known for a constructed `Frame`).
    #[inline]
    pub fn frame_type(&self) -> Option<FrameType> {
        self.header().frame_type()
    }

    #[inline]
    pub fn has_flag(&self, flag: u16) -> bool {
        self.header().has_flag(flag)
    }

    /// Encoded length: header plus body, excluding any length prefix.
    #[inline]
    pub fn len(&self) -> usize {
        self.base().len()
    }

    /// Always false, a frame has at least a header.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether this frame counts toward the resume position.
    #[inline]
    pub fn is_resumable(&self) -> bool {
        self.header().is_resumable()
    }

    pub fn validate(&self) -> std::result::Result<(), FrameError> {
        self.support().validate()
    }

    pub fn metadata(&self) -> Option<&[u8]> {
        self.support().metadata()
    }

    pub fn data(&self) -> &[u8] {
        self.support().data()
    }

    pub fn metadata_utf8(&self) -> Option<Cow<'_, str>> {
        self.support().metadata_utf8()
    }

    pub fn data_utf8(&self) -> Cow<'_, str> {
        self.support().data_utf8()
    }

    /// Append header and body to `dst`.
    pub fn encode_into(&self, dst: &mut BytesMut) {
        self.base().encode_into(dst)
    }

    /// Header and body as one contiguous buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut dst = BytesMut::with_capacity(self.len());
        self.encode_into(&mut dst);
        dst.freeze()
    }

    /// Write header and body to an async writer (no length prefix).
    pub async fn write_to<W>(&self, writer: &mut W) -> std::io::Result<usize>
    where
        W: AsyncWrite + Unpin,
    {
        self.base().write_to(writer).await
    }

    /// Give the body back to the pool.
    pub fn release(self) {
        self.into_base().release()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dispatch!(self, frame => fmt::Display::fmt(frame, f))
    }
}
