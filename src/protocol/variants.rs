//! One type per protocol frame, each with its own body layout.
//!
//! ```text
//! [fixed fields] [metadata len: u24 + metadata, if METADATA] [data ...]
//! ```
//!
//! All variants wrap a [`BaseFrame`] and implement [`FrameSupport`].

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use super::base::{utf8, BaseFrame, BodyWriter};
use super::buffer_pool::BufferPool;
use super::wire_format::{flags, FrameHeader, FrameType};
use crate::error::FrameError;

/// Capabilities shared by every frame variant.
pub trait FrameSupport {
    /// Underlying header and body.
    fn base(&self) -> &BaseFrame;

    /// Structural check of the body layout.
    fn validate(&self) -> Result<(), FrameError>;

    /// Metadata bytes, present iff the metadata flag is set.
    fn metadata(&self) -> Option<&[u8]>;

    /// Data bytes (remainder after fixed fields and metadata).
    fn data(&self) -> &[u8];

    /// Frame header.
    fn header(&self) -> FrameHeader {
        self.base().header()
    }

    /// Encoded length: header plus body.
    fn len(&self) -> usize {
        self.base().len()
    }

    /// Metadata as text (lossy).
    fn metadata_utf8(&self) -> Option<Cow<'_, str>> {
        self.metadata().map(utf8)
    }

    /// Data as text (lossy).
    fn data_utf8(&self) -> Cow<'_, str> {
        utf8(self.data())
    }
}

macro_rules! frame_struct {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name(BaseFrame);

        impl $name {
            /// Wrap a base frame without checking its type or layout.
            ///
            /// Fixed-field accessors assume the frame passes `validate`.
            pub fn from_base(base: BaseFrame) -> Self {
                Self(base)
            }

            /// Unwrap into the base frame.
            pub fn into_base(self) -> BaseFrame {
                self.0
            }

            /// Stream identifier.
            #[inline]
            pub fn stream_id(&self) -> u32 {
                self.0.header().stream_id()
            }

            /// Give the body back to the pool.
            pub fn release(self) {
                self.0.release()
            }
        }
    };
}

/// Protocol version carried by SETUP and RESUME.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
}

impl Version {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::new(1, 0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Error code carried by ERROR frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub u32);

impl ErrorCode {
    pub const INVALID_SETUP: Self = Self(0x0000_0001);
    pub const UNSUPPORTED_SETUP: Self = Self(0x0000_0002);
    pub const REJECTED_SETUP: Self = Self(0x0000_0003);
    pub const REJECTED_RESUME: Self = Self(0x0000_0004);
    pub const CONNECTION_ERROR: Self = Self(0x0000_0101);
    pub const CONNECTION_CLOSE: Self = Self(0x0000_0102);
    pub const APPLICATION_ERROR: Self = Self(0x0000_0201);
    pub const REJECTED: Self = Self(0x0000_0202);
    pub const CANCELED: Self = Self(0x0000_0203);
    pub const INVALID: Self = Self(0x0000_0204);

    fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::INVALID_SETUP => "INVALID_SETUP",
            Self::UNSUPPORTED_SETUP => "UNSUPPORTED_SETUP",
            Self::REJECTED_SETUP => "REJECTED_SETUP",
            Self::REJECTED_RESUME => "REJECTED_RESUME",
            Self::CONNECTION_ERROR => "CONNECTION_ERROR",
            Self::CONNECTION_CLOSE => "CONNECTION_CLOSE",
            Self::APPLICATION_ERROR => "APPLICATION_ERROR",
            Self::REJECTED => "REJECTED",
            Self::CANCELED => "CANCELED",
            Self::INVALID => "INVALID",
            _ => return None,
        })
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}

fn millis(d: Duration) -> u32 {
    u32::try_from(d.as_millis()).unwrap_or(u32::MAX)
}

// ============================================================================
// Stream requests: REQUEST_RESPONSE, REQUEST_FNF
// ============================================================================

frame_struct!(
    /// REQUEST_RESPONSE: request a single response.
    RequestResponseFrame
);

impl RequestResponseFrame {
    pub fn new(pool: &BufferPool, stream_id: u32, data: &[u8], metadata: &[u8], flags: u16) -> Self {
        let mut w = BodyWriter::new(pool, flags);
        w.put_metadata(metadata).put_slice(data);
        Self(w.finish(stream_id, FrameType::RequestResponse))
    }
}

impl FrameSupport for RequestResponseFrame {
    fn base(&self) -> &BaseFrame {
        &self.0
    }

    fn validate(&self) -> Result<(), FrameError> {
        self.0.validate_metadata(FrameType::RequestResponse, 0)
    }

    fn metadata(&self) -> Option<&[u8]> {
        self.0.try_slice_metadata(0)
    }

    fn data(&self) -> &[u8] {
        self.0.try_slice_data(0)
    }
}

impl fmt::Display for RequestResponseFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FrameRequestResponse{{{},data={},metadata={}}}",
            self.header(),
            self.data_utf8(),
            self.metadata_utf8().unwrap_or_default()
        )
    }
}

frame_struct!(
    /// REQUEST_FNF: fire and forget.
    FnfFrame
);

impl FnfFrame {
    pub fn new(pool: &BufferPool, stream_id: u32, data: &[u8], metadata: &[u8], flags: u16) -> Self {
        let mut w = BodyWriter::new(pool, flags);
        w.put_metadata(metadata).put_slice(data);
        Self(w.finish(stream_id, FrameType::RequestFnf))
    }
}

impl FrameSupport for FnfFrame {
    fn base(&self) -> &BaseFrame {
        &self.0
    }

    fn validate(&self) -> Result<(), FrameError> {
        self.0.validate_metadata(FrameType::RequestFnf, 0)
    }

    fn metadata(&self) -> Option<&[u8]> {
        self.0.try_slice_metadata(0)
    }

    fn data(&self) -> &[u8] {
        self.0.try_slice_data(0)
    }
}

impl fmt::Display for FnfFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FrameFNF{{{},data={},metadata={}}}",
            self.header(),
            self.data_utf8(),
            self.metadata_utf8().unwrap_or_default()
        )
    }
}

// ============================================================================
// Requests with initial N: REQUEST_STREAM, REQUEST_CHANNEL
// ============================================================================

const INITIAL_REQUEST_N_LEN: usize = 4;

frame_struct!(
    /// REQUEST_STREAM: request a finite or infinite stream.
    RequestStreamFrame
);

impl RequestStreamFrame {
    pub fn new(
        pool: &BufferPool,
        stream_id: u32,
        initial_request_n: u32,
        data: &[u8],
        metadata: &[u8],
        flags: u16,
    ) -> Self {
        let mut w = BodyWriter::new(pool, flags);
        w.put_u32(initial_request_n).put_metadata(metadata).put_slice(data);
        Self(w.finish(stream_id, FrameType::RequestStream))
    }

    /// Number of items the requester is ready to receive.
    pub fn initial_request_n(&self) -> u32 {
        self.0.read_u32(0)
    }
}

impl FrameSupport for RequestStreamFrame {
    fn base(&self) -> &BaseFrame {
        &self.0
    }

    fn validate(&self) -> Result<(), FrameError> {
        self.0.validate_metadata(FrameType::RequestStream, INITIAL_REQUEST_N_LEN)
    }

    fn metadata(&self) -> Option<&[u8]> {
        self.0.try_slice_metadata(INITIAL_REQUEST_N_LEN)
    }

    fn data(&self) -> &[u8] {
        self.0.try_slice_data(INITIAL_REQUEST_N_LEN)
    }
}

impl fmt::Display for RequestStreamFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FrameRequestStream{{{},data={},metadata={},initialRequestN={}}}",
            self.header(),
            self.data_utf8(),
            self.metadata_utf8().unwrap_or_default(),
            self.initial_request_n()
        )
    }
}

frame_struct!(
    /// REQUEST_CHANNEL: bidirectional stream.
    RequestChannelFrame
);

impl RequestChannelFrame {
    pub fn new(
        pool: &BufferPool,
        stream_id: u32,
        initial_request_n: u32,
        data: &[u8],
        metadata: &[u8],
        flags: u16,
    ) -> Self {
        let mut w = BodyWriter::new(pool, flags);
        w.put_u32(initial_request_n).put_metadata(metadata).put_slice(data);
        Self(w.finish(stream_id, FrameType::RequestChannel))
    }

    /// Number of items the requester is ready to receive.
    pub fn initial_request_n(&self) -> u32 {
        self.0.read_u32(0)
    }
}

impl FrameSupport for RequestChannelFrame {
    fn base(&self) -> &BaseFrame {
        &self.0
    }

    fn validate(&self) -> Result<(), FrameError> {
        self.0.validate_metadata(FrameType::RequestChannel, INITIAL_REQUEST_N_LEN)
    }

    fn metadata(&self) -> Option<&[u8]> {
        self.0.try_slice_metadata(INITIAL_REQUEST_N_LEN)
    }

    fn data(&self) -> &[u8] {
        self.0.try_slice_data(INITIAL_REQUEST_N_LEN)
    }
}

impl fmt::Display for RequestChannelFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FrameRequestChannel{{{},data={},metadata={},initialRequestN={}}}",
            self.header(),
            self.data_utf8(),
            self.metadata_utf8().unwrap_or_default(),
            self.initial_request_n()
        )
    }
}

// ============================================================================
// Flow control: REQUEST_N, CANCEL
// ============================================================================

frame_struct!(
    /// REQUEST_N: request more items.
    RequestNFrame
);

impl RequestNFrame {
    pub fn new(pool: &BufferPool, stream_id: u32, n: u32, flags: u16) -> Self {
        let mut w = BodyWriter::new(pool, flags & !flags::METADATA);
        w.put_u32(n);
        Self(w.finish(stream_id, FrameType::RequestN))
    }

    /// Additional items requested.
    pub fn n(&self) -> u32 {
        self.0.read_u32(0)
    }
}

impl FrameSupport for RequestNFrame {
    fn base(&self) -> &BaseFrame {
        &self.0
    }

    fn validate(&self) -> Result<(), FrameError> {
        self.0.require_len(FrameType::RequestN, 4)
    }

    fn metadata(&self) -> Option<&[u8]> {
        None
    }

    fn data(&self) -> &[u8] {
        &[]
    }
}

impl fmt::Display for RequestNFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameRequestN{{{},n={}}}", self.header(), self.n())
    }
}

frame_struct!(
    /// CANCEL: cancel an outstanding request.
    CancelFrame
);

impl CancelFrame {
    pub fn new(pool: &BufferPool, stream_id: u32) -> Self {
        Self(BodyWriter::new(pool, 0).finish(stream_id, FrameType::Cancel))
    }
}

impl FrameSupport for CancelFrame {
    fn base(&self) -> &BaseFrame {
        &self.0
    }

    fn validate(&self) -> Result<(), FrameError> {
        Ok(())
    }

    fn metadata(&self) -> Option<&[u8]> {
        None
    }

    fn data(&self) -> &[u8] {
        &[]
    }
}

impl fmt::Display for CancelFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameCancel{{{}}}", self.header())
    }
}

// ============================================================================
// PAYLOAD
// ============================================================================

frame_struct!(
    /// PAYLOAD: stream element, completion, or fragment.
    PayloadFrame
);

impl PayloadFrame {
    pub fn new(pool: &BufferPool, stream_id: u32, data: &[u8], metadata: &[u8], flags: u16) -> Self {
        let mut w = BodyWriter::new(pool, flags);
        w.put_metadata(metadata).put_slice(data);
        Self(w.finish(stream_id, FrameType::Payload))
    }

    /// Carries a next element.
    #[inline]
    pub fn is_next(&self) -> bool {
        self.0.has_flag(flags::NEXT)
    }

    /// Completes the stream.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.0.has_flag(flags::COMPLETE)
    }

    /// More fragments of this payload follow.
    #[inline]
    pub fn is_follow(&self) -> bool {
        self.0.has_flag(flags::FOLLOW)
    }
}

impl FrameSupport for PayloadFrame {
    fn base(&self) -> &BaseFrame {
        &self.0
    }

    fn validate(&self) -> Result<(), FrameError> {
        self.0.validate_metadata(FrameType::Payload, 0)
    }

    fn metadata(&self) -> Option<&[u8]> {
        self.0.try_slice_metadata(0)
    }

    fn data(&self) -> &[u8] {
        self.0.try_slice_data(0)
    }
}

impl fmt::Display for PayloadFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FramePayload{{{},data={},metadata={}}}",
            self.header(),
            self.data_utf8(),
            self.metadata_utf8().unwrap_or_default()
        )
    }
}

// ============================================================================
// ERROR
// ============================================================================

frame_struct!(
    /// ERROR: stream or connection error with a UTF-8 message.
    ErrorFrame
);

impl ErrorFrame {
    pub fn new(pool: &BufferPool, stream_id: u32, code: ErrorCode, message: &[u8]) -> Self {
        let mut w = BodyWriter::new(pool, 0);
        w.put_u32(code.0).put_slice(message);
        Self(w.finish(stream_id, FrameType::Error))
    }

    pub fn error_code(&self) -> ErrorCode {
        ErrorCode(self.0.read_u32(0))
    }

    pub fn message(&self) -> Cow<'_, str> {
        utf8(self.data())
    }
}

impl FrameSupport for ErrorFrame {
    fn base(&self) -> &BaseFrame {
        &self.0
    }

    fn validate(&self) -> Result<(), FrameError> {
        self.0.require_len(FrameType::Error, 4)
    }

    fn metadata(&self) -> Option<&[u8]> {
        None
    }

    fn data(&self) -> &[u8] {
        self.0.body().get(4..).unwrap_or(&[])
    }
}

impl fmt::Display for ErrorFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FrameError{{{},code={},data={}}}",
            self.header(),
            self.error_code(),
            self.message()
        )
    }
}

// ============================================================================
// METADATA_PUSH
// ============================================================================

frame_struct!(
    /// METADATA_PUSH: connection-level metadata, whole body is metadata.
    MetadataPushFrame
);

impl MetadataPushFrame {
    pub fn new(pool: &BufferPool, metadata: &[u8]) -> Self {
        let mut w = BodyWriter::new(pool, flags::METADATA);
        w.put_slice(metadata);
        Self(w.finish(0, FrameType::MetadataPush))
    }
}

impl FrameSupport for MetadataPushFrame {
    fn base(&self) -> &BaseFrame {
        &self.0
    }

    fn validate(&self) -> Result<(), FrameError> {
        if !self.0.has_flag(flags::METADATA) {
            return Err(FrameError::MissingMetadata(FrameType::MetadataPush));
        }
        Ok(())
    }

    fn metadata(&self) -> Option<&[u8]> {
        self.0.has_flag(flags::METADATA).then(|| self.0.body())
    }

    fn data(&self) -> &[u8] {
        &[]
    }
}

impl fmt::Display for MetadataPushFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FrameMetadataPush{{{},metadata={}}}",
            self.header(),
            self.metadata_utf8().unwrap_or_default()
        )
    }
}

// ============================================================================
// Connection management: SETUP, LEASE, KEEPALIVE
// ============================================================================

const SETUP_FIXED_LEN: usize = 12;

/// Offsets of the variable-length SETUP fields.
struct SetupLayout {
    token: Option<(usize, usize)>,
    metadata_mime: (usize, usize),
    data_mime: (usize, usize),
    payload_offset: usize,
}

frame_struct!(
    /// SETUP: first frame sent by a client.
    SetupFrame
);

/// Parameters for a SETUP frame.
#[derive(Debug, Clone)]
pub struct SetupParams<'a> {
    pub version: Version,
    pub keepalive_interval: Duration,
    pub max_lifetime: Duration,
    pub resume_token: Option<&'a [u8]>,
    pub metadata_mime_type: &'a str,
    pub data_mime_type: &'a str,
    pub lease: bool,
}

impl Default for SetupParams<'_> {
    fn default() -> Self {
        Self {
            version: Version::default(),
            keepalive_interval: Duration::from_secs(20),
            max_lifetime: Duration::from_secs(90),
            resume_token: None,
            metadata_mime_type: "application/binary",
            data_mime_type: "application/binary",
            lease: false,
        }
    }
}

impl SetupFrame {
    /// Build a SETUP frame.
    ///
    /// MIME types longer than 255 bytes are truncated.
    pub fn new(pool: &BufferPool, params: &SetupParams<'_>, data: &[u8], metadata: &[u8]) -> Self {
        let mut fg = 0;
        if params.lease {
            fg |= flags::LEASE;
        }
        if params.resume_token.is_some() {
            fg |= flags::RESUME_ENABLE;
        }
        let mut w = BodyWriter::new(pool, fg);
        w.put_u16(params.version.major)
            .put_u16(params.version.minor)
            .put_u32(millis(params.keepalive_interval))
            .put_u32(millis(params.max_lifetime));
        if let Some(token) = params.resume_token {
            let token = &token[..token.len().min(u16::MAX as usize)];
            w.put_u16(token.len() as u16).put_slice(token);
        }
        for mime in [params.metadata_mime_type, params.data_mime_type] {
            let mime = &mime.as_bytes()[..mime.len().min(u8::MAX as usize)];
            w.put_u8(mime.len() as u8).put_slice(mime);
        }
        w.put_metadata(metadata).put_slice(data);
        Self(w.finish(0, FrameType::Setup))
    }

    fn layout(&self) -> Result<SetupLayout, FrameError> {
        let body = self.0.body();
        let incomplete = |expected: usize| FrameError::IncompleteFrame {
            frame_type: FrameType::Setup,
            expected,
            actual: body.len(),
        };
        let mut cursor = SETUP_FIXED_LEN;
        if body.len() < cursor {
            return Err(incomplete(cursor));
        }
        let mut token = None;
        if self.0.has_flag(flags::RESUME_ENABLE) {
            if body.len() < cursor + 2 {
                return Err(incomplete(cursor + 2));
            }
            let len = usize::from(self.0.read_u16(cursor));
            cursor += 2;
            if body.len() < cursor + len {
                return Err(incomplete(cursor + len));
            }
            token = Some((cursor, cursor + len));
            cursor += len;
        }
        let mut mimes = [(0, 0); 2];
        for mime in mimes.iter_mut() {
            let Some(&len) = body.get(cursor) else {
                return Err(incomplete(cursor + 1));
            };
            cursor += 1;
            let len = usize::from(len);
            if body.len() < cursor + len {
                return Err(incomplete(cursor + len));
            }
            *mime = (cursor, cursor + len);
            cursor += len;
        }
        Ok(SetupLayout {
            token,
            metadata_mime: mimes[0],
            data_mime: mimes[1],
            payload_offset: cursor,
        })
    }

    pub fn version(&self) -> Version {
        Version::new(self.0.read_u16(0), self.0.read_u16(2))
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.0.read_u32(4)))
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_millis(u64::from(self.0.read_u32(8)))
    }

    /// Client honors leases.
    pub fn lease(&self) -> bool {
        self.0.has_flag(flags::LEASE)
    }

    pub fn resume_token(&self) -> Option<&[u8]> {
        let (start, end) = self.layout().ok()?.token?;
        Some(&self.0.body()[start..end])
    }

    pub fn metadata_mime_type(&self) -> Cow<'_, str> {
        match self.layout() {
            Ok(l) => utf8(&self.0.body()[l.metadata_mime.0..l.metadata_mime.1]),
            Err(_) => Cow::Borrowed(""),
        }
    }

    pub fn data_mime_type(&self) -> Cow<'_, str> {
        match self.layout() {
            Ok(l) => utf8(&self.0.body()[l.data_mime.0..l.data_mime.1]),
            Err(_) => Cow::Borrowed(""),
        }
    }
}

impl FrameSupport for SetupFrame {
    fn base(&self) -> &BaseFrame {
        &self.0
    }

    fn validate(&self) -> Result<(), FrameError> {
        let layout = self.layout()?;
        self.0.validate_metadata(FrameType::Setup, layout.payload_offset)
    }

    fn metadata(&self) -> Option<&[u8]> {
        let layout = self.layout().ok()?;
        self.0.try_slice_metadata(layout.payload_offset)
    }

    fn data(&self) -> &[u8] {
        match self.layout() {
            Ok(layout) => self.0.try_slice_data(layout.payload_offset),
            Err(_) => &[],
        }
    }
}

impl fmt::Display for SetupFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FrameSetup{{{},version={},keepalive={:?},lifetime={:?},mimeMetadata={},mimeData={},data={},metadata={}}}",
            self.header(),
            self.version(),
            self.keepalive_interval(),
            self.max_lifetime(),
            self.metadata_mime_type(),
            self.data_mime_type(),
            self.data_utf8(),
            self.metadata_utf8().unwrap_or_default()
        )
    }
}

const LEASE_FIXED_LEN: usize = 8;

frame_struct!(
    /// LEASE: grants the peer a number of requests for a time window.
    LeaseFrame
);

impl LeaseFrame {
    pub fn new(pool: &BufferPool, ttl: Duration, number_of_requests: u32, metadata: &[u8]) -> Self {
        let fg = if metadata.is_empty() { 0 } else { flags::METADATA };
        let mut w = BodyWriter::new(pool, fg);
        w.put_u32(millis(ttl)).put_u32(number_of_requests).put_slice(metadata);
        Self(w.finish(0, FrameType::Lease))
    }

    pub fn time_to_live(&self) -> Duration {
        Duration::from_millis(u64::from(self.0.read_u32(0)))
    }

    pub fn number_of_requests(&self) -> u32 {
        self.0.read_u32(4)
    }
}

impl FrameSupport for LeaseFrame {
    fn base(&self) -> &BaseFrame {
        &self.0
    }

    fn validate(&self) -> Result<(), FrameError> {
        self.0.require_len(FrameType::Lease, LEASE_FIXED_LEN)
    }

    // No length prefix: metadata is the remainder.
    fn metadata(&self) -> Option<&[u8]> {
        if !self.0.has_flag(flags::METADATA) {
            return None;
        }
        self.0.body().get(LEASE_FIXED_LEN..)
    }

    fn data(&self) -> &[u8] {
        &[]
    }
}

impl fmt::Display for LeaseFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FrameLease{{{},ttl={:?},n={},metadata={}}}",
            self.header(),
            self.time_to_live(),
            self.number_of_requests(),
            self.metadata_utf8().unwrap_or_default()
        )
    }
}

const KEEPALIVE_FIXED_LEN: usize = 8;

frame_struct!(
    /// KEEPALIVE: liveness probe carrying the sender's receive position.
    KeepaliveFrame
);

impl KeepaliveFrame {
    pub fn new(pool: &BufferPool, last_received_position: u64, data: &[u8], respond: bool) -> Self {
        let fg = if respond { flags::RESPOND } else { 0 };
        let mut w = BodyWriter::new(pool, fg);
        w.put_u64(last_received_position).put_slice(data);
        Self(w.finish(0, FrameType::Keepalive))
    }

    pub fn last_received_position(&self) -> u64 {
        self.0.read_u64(0)
    }

    /// Peer must answer with a KEEPALIVE.
    pub fn respond(&self) -> bool {
        self.0.has_flag(flags::RESPOND)
    }
}

impl FrameSupport for KeepaliveFrame {
    fn base(&self) -> &BaseFrame {
        &self.0
    }

    fn validate(&self) -> Result<(), FrameError> {
        self.0.require_len(FrameType::Keepalive, KEEPALIVE_FIXED_LEN)
    }

    fn metadata(&self) -> Option<&[u8]> {
        None
    }

    fn data(&self) -> &[u8] {
        self.0.body().get(KEEPALIVE_FIXED_LEN..).unwrap_or(&[])
    }
}

impl fmt::Display for KeepaliveFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FrameKeepalive{{{},lastReceivedPosition={},data={}}}",
            self.header(),
            self.last_received_position(),
            self.data_utf8()
        )
    }
}

// ============================================================================
// Resumption: RESUME, RESUME_OK
// ============================================================================

const RESUME_MIN_LEN: usize = 2 + 2 + 2 + 8 + 8;

frame_struct!(
    /// RESUME: client asks to resume a session.
    ResumeFrame
);

impl ResumeFrame {
    pub fn new(
        pool: &BufferPool,
        version: Version,
        token: &[u8],
        last_received_server_position: u64,
        first_available_client_position: u64,
    ) -> Self {
        let token = &token[..token.len().min(u16::MAX as usize)];
        let mut w = BodyWriter::new(pool, 0);
        w.put_u16(version.major)
            .put_u16(version.minor)
            .put_u16(token.len() as u16)
            .put_slice(token)
            .put_u64(last_received_server_position)
            .put_u64(first_available_client_position);
        Self(w.finish(0, FrameType::Resume))
    }

    fn token_len(&self) -> usize {
        usize::from(self.0.read_u16(4))
    }

    pub fn version(&self) -> Version {
        Version::new(self.0.read_u16(0), self.0.read_u16(2))
    }

    pub fn token(&self) -> &[u8] {
        &self.0.body()[6..6 + self.token_len()]
    }

    pub fn last_received_server_position(&self) -> u64 {
        self.0.read_u64(6 + self.token_len())
    }

    pub fn first_available_client_position(&self) -> u64 {
        self.0.read_u64(14 + self.token_len())
    }
}

impl FrameSupport for ResumeFrame {
    fn base(&self) -> &BaseFrame {
        &self.0
    }

    fn validate(&self) -> Result<(), FrameError> {
        self.0.require_len(FrameType::Resume, RESUME_MIN_LEN)?;
        self.0.require_len(FrameType::Resume, RESUME_MIN_LEN + self.token_len())
    }

    fn metadata(&self) -> Option<&[u8]> {
        None
    }

    fn data(&self) -> &[u8] {
        &[]
    }
}

impl fmt::Display for ResumeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FrameResume{{{},version={},token={:02x?},lastReceivedServerPosition={},firstAvailableClientPosition={}}}",
            self.header(),
            self.version(),
            self.token(),
            self.last_received_server_position(),
            self.first_available_client_position()
        )
    }
}

frame_struct!(
    /// RESUME_OK: server accepts a resume.
    ResumeOkFrame
);

impl ResumeOkFrame {
    pub fn new(pool: &BufferPool, last_received_client_position: u64) -> Self {
        let mut w = BodyWriter::new(pool, 0);
        w.put_u64(last_received_client_position);
        Self(w.finish(0, FrameType::ResumeOk))
    }

    pub fn last_received_client_position(&self) -> u64 {
        self.0.read_u64(0)
    }
}

impl FrameSupport for ResumeOkFrame {
    fn base(&self) -> &BaseFrame {
        &self.0
    }

    fn validate(&self) -> Result<(), FrameError> {
        self.0.require_len(FrameType::ResumeOk, 8)
    }

    fn metadata(&self) -> Option<&[u8]> {
        None
    }

    fn data(&self) -> &[u8] {
        &[]
    }
}

impl fmt::Display for ResumeOkFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FrameResumeOK{{{},lastReceivedClientPosition={}}}",
            self.header(),
            self.last_received_client_position()
        )
    }
}

// ============================================================================
// EXT
// ============================================================================

const EXTENDED_TYPE_LEN: usize = 4;

frame_struct!(
    /// EXT: protocol extension frame.
    ExtFrame
);

impl ExtFrame {
    pub fn new(
        pool: &BufferPool,
        stream_id: u32,
        extended_type: u32,
        data: &[u8],
        metadata: &[u8],
        flags: u16,
    ) -> Self {
        let mut w = BodyWriter::new(pool, flags);
        w.put_u32(extended_type).put_metadata(metadata).put_slice(data);
        Self(w.finish(stream_id, FrameType::Ext))
    }

    pub fn extended_type(&self) -> u32 {
        self.0.read_u32(0)
    }
}

impl FrameSupport for ExtFrame {
    fn base(&self) -> &BaseFrame {
        &self.0
    }

    fn validate(&self) -> Result<(), FrameError> {
        self.0.validate_metadata(FrameType::Ext, EXTENDED_TYPE_LEN)
    }

    fn metadata(&self) -> Option<&[u8]> {
        self.0.try_slice_metadata(EXTENDED_TYPE_LEN)
    }

    fn data(&self) -> &[u8] {
        self.0.try_slice_data(EXTENDED_TYPE_LEN)
    }
}

impl fmt::Display for ExtFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FrameExt{{{},extendedType={},data={},metadata={}}}",
            self.header(),
            self.extended_type(),
            self.data_utf8(),
            self.metadata_utf8().unwrap_or_default()
        )
    }
}
