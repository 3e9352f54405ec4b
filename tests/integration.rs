//! Integration tests for rsocket-wire.
//!
//! These tests drive whole frames through a connection pair built on an
//! in-memory duplex stream.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use rsocket_wire::config::ConnectionConfig;
use rsocket_wire::fragmentation::{Joiner, Splitter};
use rsocket_wire::protocol::{
    encode_u24, flags, BufferPool, ErrorCode, ErrorFrame, FnfFrame, Frame, FrameHeader,
    FrameType, KeepaliveFrame, MetadataPushFrame, PayloadFrame, RequestResponseFrame,
    RequestStreamFrame, ResumeOkFrame, SetupFrame, SetupParams,
};
use rsocket_wire::transport::{Connection, Counter, FrameReader};
use rsocket_wire::{FrameError, WireError};
use tokio::io::{AsyncRead, AsyncWriteExt, DuplexStream, ReadBuf};
use tokio::time::Instant;

fn connection(stream: DuplexStream, pool: &BufferPool) -> Connection<DuplexStream> {
    Connection::with_pool(stream, ConnectionConfig::default(), pool.clone())
}

fn pair(pool: &BufferPool) -> (Connection<DuplexStream>, Connection<DuplexStream>) {
    let (a, b) = tokio::io::duplex(256 * 1024);
    (connection(a, pool), connection(b, pool))
}

/// Raw bytes for a frame: length prefix, header, body.
fn raw_frame(header: FrameHeader, body: &[u8]) -> Vec<u8> {
    let mut bytes = encode_u24(6 + body.len()).to_vec();
    bytes.extend_from_slice(&header.encode());
    bytes.extend_from_slice(body);
    bytes
}

/// FNF with metadata crosses the wire unchanged.
#[tokio::test]
async fn test_fnf_ping_meta() {
    let pool = BufferPool::default();
    let (mut client, mut server) = pair(&pool);

    let frame = Frame::from(FnfFrame::new(&pool, 1, b"ping", b"meta", 0));
    client.write(&frame).await.unwrap();

    let got = server.read().await.unwrap().unwrap();
    assert_eq!(got.frame_type(), Some(FrameType::RequestFnf));
    assert_eq!(got.stream_id(), 1);
    assert_eq!(got.data(), b"ping");
    assert_eq!(got.metadata(), Some(&b"meta"[..]));
    assert!(got.has_flag(flags::METADATA));
}

/// Exact bytes on the wire for a small frame.
#[tokio::test]
async fn test_wire_bytes() {
    let pool = BufferPool::default();
    let (a, mut b) = tokio::io::duplex(1024);
    let mut conn = connection(a, &pool);

    conn.write(&Frame::from(FnfFrame::new(&pool, 1, b"ping", b"meta", 0)))
        .await
        .unwrap();
    conn.close().await.unwrap();

    let mut wire = Vec::new();
    tokio::io::AsyncReadExt::read_to_end(&mut b, &mut wire).await.unwrap();
    // len=17 | stream 1, type 0x05, M | metadata len 4
    let mut expected = vec![0u8, 0, 17, 0, 0, 0, 1, 0x15, 0x00, 0, 0, 4];
    expected.extend_from_slice(b"metaping");
    assert_eq!(wire, expected);
}

/// Every frame type the codec knows survives a round trip.
#[tokio::test]
async fn test_mixed_frame_sequence() {
    let pool = BufferPool::default();
    let (mut client, mut server) = pair(&pool);

    let frames = vec![
        Frame::from(SetupFrame::new(&pool, &SetupParams::default(), b"hello", b"")),
        Frame::from(RequestResponseFrame::new(&pool, 1, b"req", b"", 0)),
        Frame::from(RequestStreamFrame::new(&pool, 3, 16, b"stream", b"m", 0)),
        Frame::from(PayloadFrame::new(&pool, 3, b"item", b"", flags::NEXT)),
        Frame::from(ErrorFrame::new(&pool, 3, ErrorCode::CANCELED, b"stop")),
        Frame::from(MetadataPushFrame::new(&pool, b"route")),
        Frame::from(KeepaliveFrame::new(&pool, 42, b"", true)),
        Frame::from(ResumeOkFrame::new(&pool, 7)),
    ];
    for f in &frames {
        client.write(f).await.unwrap();
    }

    for sent in &frames {
        let got = server.read().await.unwrap().unwrap();
        assert_eq!(got.header(), sent.header());
        assert_eq!(got.base().body(), sent.base().body());
        assert_eq!(got.to_string(), sent.to_string());
    }
}

/// Counters advance by header + body of resumable frames only.
#[tokio::test]
async fn test_resume_positions() {
    let pool = BufferPool::default();
    let (client, server) = pair(&pool);
    let sent = Arc::new(Counter::new());
    let received = Arc::new(Counter::new());
    let mut client = client.with_counter(sent.clone());
    let mut server = server.with_counter(received.clone());

    let frames = vec![
        Frame::from(RequestResponseFrame::new(&pool, 1, b"abc", b"", 0)),
        Frame::from(KeepaliveFrame::new(&pool, 0, b"", true)),
        Frame::from(PayloadFrame::new(&pool, 1, b"defgh", b"md", flags::NEXT)),
        Frame::from(MetadataPushFrame::new(&pool, b"ignored")),
    ];
    for f in &frames {
        client.write(f).await.unwrap();
    }
    for _ in &frames {
        server.read().await.unwrap().unwrap();
    }

    let expected = (frames[0].len() + frames[2].len()) as u64;
    assert_eq!(expected, (6 + 3) + (6 + 3 + 2 + 5));
    assert_eq!(sent.write_bytes(), expected);
    assert_eq!(received.read_bytes(), expected);
    assert_eq!(server.counter().unwrap().read_bytes(), expected);
}

/// Fragments written one by one are joined on the other side.
#[tokio::test]
async fn test_fragmented_payload_over_connection() {
    let pool = BufferPool::default();
    let (mut client, mut server) = pair(&pool);
    let data: Vec<u8> = (0..10_000u32).map(|i| (i % 256) as u8).collect();
    let metadata = vec![b'm'; 2_000];

    let splitter = Splitter::new(256).unwrap();
    assert!(splitter.needs_fragmentation(data.len(), metadata.len()));
    let fragments = splitter.fragment_payload(&pool, 5, &data, &metadata, flags::NEXT | flags::COMPLETE);
    assert_eq!(fragments.len(), 49);
    for f in fragments {
        client.write(&Frame::from(f)).await.unwrap();
    }

    let first = server.read().await.unwrap().unwrap();
    let mut joiner = Joiner::new(first);
    while !joiner.is_complete() {
        let next = server.read().await.unwrap().unwrap();
        joiner.push(next).unwrap();
    }

    assert_eq!(joiner.fragment_count(), 49);
    assert_eq!(joiner.data().unwrap(), &data[..]);
    assert_eq!(joiner.metadata().unwrap().as_deref(), Some(&metadata[..]));
    assert_eq!(joiner.flags() & (flags::NEXT | flags::COMPLETE), flags::NEXT | flags::COMPLETE);
    joiner.release();
}

/// Unknown type codes are reported and the body buffer is returned.
#[tokio::test]
async fn test_unknown_frame_type() {
    let pool = BufferPool::default();
    let (mut raw, peer) = tokio::io::duplex(1024);
    let mut conn = connection(peer, &pool);

    // type code 0x10 is unassigned
    let mut bytes = encode_u24(8).to_vec();
    bytes.extend_from_slice(&[0, 0, 0, 1, 0x40, 0x00, 1, 2]);
    raw.write_all(&bytes).await.unwrap();

    let err = conn.read().await.unwrap_err();
    assert!(matches!(err, WireError::UnknownFrameType(0x10)));
    assert_eq!(pool.outstanding(), 0);
}

/// Reserved type 0x00 has no frame implementation.
#[tokio::test]
async fn test_reserved_frame_type() {
    let pool = BufferPool::default();
    let (mut raw, peer) = tokio::io::duplex(1024);
    let mut conn = connection(peer, &pool);

    raw.write_all(&[0, 0, 6, 0, 0, 0, 0, 0, 0]).await.unwrap();
    assert!(matches!(conn.read().await, Err(WireError::UnknownFrameType(0))));
}

/// A frame shorter than its header is malformed.
#[tokio::test]
async fn test_short_frame_is_malformed_header() {
    let pool = BufferPool::default();
    let (mut raw, peer) = tokio::io::duplex(1024);
    let mut conn = connection(peer, &pool);

    raw.write_all(&[0, 0, 4, 0, 0, 0, 1]).await.unwrap();
    assert!(matches!(
        conn.read().await,
        Err(WireError::MalformedHeader { actual: 4 })
    ));
}

/// Metadata length past the body end is rejected, not truncated.
#[tokio::test]
async fn test_metadata_overflow_is_rejected() {
    let pool = BufferPool::default();
    let (mut raw, peer) = tokio::io::duplex(1024);
    let mut conn = connection(peer, &pool);

    let header = FrameHeader::new(1, FrameType::Payload, flags::METADATA | flags::NEXT);
    raw.write_all(&raw_frame(header, &[0, 0, 99, b'a', b'b'])).await.unwrap();

    let err = conn.read().await.unwrap_err();
    assert!(matches!(
        err,
        WireError::MalformedFrame(FrameError::MetadataOverflow {
            declared: 99,
            available: 2
        })
    ));
    assert_eq!(pool.outstanding(), 0);
}

/// Fixed fields missing from the body.
#[tokio::test]
async fn test_incomplete_request_n() {
    let pool = BufferPool::default();
    let (mut raw, peer) = tokio::io::duplex(1024);
    let mut conn = connection(peer, &pool);

    let header = FrameHeader::new(1, FrameType::RequestN, 0);
    raw.write_all(&raw_frame(header, &[0, 1])).await.unwrap();

    let err = conn.read().await.unwrap_err();
    assert!(matches!(
        err,
        WireError::MalformedFrame(FrameError::IncompleteFrame {
            frame_type: FrameType::RequestN,
            expected: 4,
            actual: 2
        })
    ));
}

/// End of stream on a boundary versus inside a frame.
#[tokio::test]
async fn test_end_of_stream() {
    let pool = BufferPool::default();

    let (raw, peer) = tokio::io::duplex(1024);
    let mut conn = connection(peer, &pool);
    drop(raw);
    assert!(conn.read().await.unwrap().is_none());

    let (mut raw, peer) = tokio::io::duplex(1024);
    let mut conn = connection(peer, &pool);
    raw.write_all(&[0, 0, 20, 0, 0, 0, 1, 0x28]).await.unwrap();
    drop(raw);
    assert!(matches!(
        conn.read().await,
        Err(WireError::Framing { expected: 20, buffered: 5 })
    ));
}

/// A deadline turns a blocked read into `Timeout`, and the connection
/// keeps working once the deadline is cleared.
#[tokio::test]
async fn test_deadline_then_recover() {
    let pool = BufferPool::default();
    let (mut client, mut server) = pair(&pool);

    server.set_deadline(Some(Instant::now() + Duration::from_millis(30)));
    assert!(matches!(server.read().await, Err(WireError::Timeout)));

    server.set_deadline(None);
    client
        .write(&Frame::from(PayloadFrame::new(&pool, 1, b"late", b"", flags::NEXT)))
        .await
        .unwrap();
    let got = server.read().await.unwrap().unwrap();
    assert_eq!(got.data(), b"late");
}

/// A peer that stops reading makes a write with a deadline time out.
#[tokio::test]
async fn test_write_deadline() {
    let pool = BufferPool::default();
    let (a, _b) = tokio::io::duplex(64);
    let mut conn = Connection::with_pool(a, ConnectionConfig::default().write_buffer_size(16), pool.clone());
    conn.set_deadline(Some(Instant::now() + Duration::from_millis(30)));

    let big = Frame::from(PayloadFrame::new(&pool, 1, &[0u8; 4096], b"", 0));
    assert!(matches!(conn.write(&big).await, Err(WireError::Timeout)));
}

/// Buffers borrowed for received frames go back to the pool.
#[tokio::test]
async fn test_pool_balance() {
    let pool = BufferPool::default();
    let (mut client, mut server) = pair(&pool);

    for i in 0..100u32 {
        let f = Frame::from(PayloadFrame::new(&pool, i + 1, b"payload", b"", flags::NEXT));
        client.write(&f).await.unwrap();
    }
    for _ in 0..100 {
        let f = server.read().await.unwrap().unwrap();
        f.release();
    }

    assert_eq!(pool.outstanding(), 0);
    assert!(pool.cached() > 0);
}

/// Stream whose every read fails.
struct ResetStream;

impl AsyncRead for ResetStream {
    fn poll_read(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")))
    }
}

/// Writing after the peer went away surfaces the I/O error as `Write`.
#[tokio::test]
async fn test_write_to_closed_peer() {
    let pool = BufferPool::default();
    let (mut client, server) = pair(&pool);
    drop(server);

    let err = client
        .write(&Frame::from(FnfFrame::new(&pool, 1, b"ping", b"", 0)))
        .await
        .unwrap_err();
    match &err {
        WireError::Write(e) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
        other => panic!("expected write error, got {:?}", other),
    }
    assert!(err.to_string().starts_with("write frame failed"));
}

/// A failing stream read surfaces as `Read` and leaks no buffers.
#[tokio::test]
async fn test_read_error_from_stream() {
    let pool = BufferPool::default();
    let mut reader = FrameReader::new(ResetStream, &ConnectionConfig::default(), pool.clone());

    let err = reader.read().await.unwrap_err();
    match &err {
        WireError::Read(e) => assert_eq!(e.kind(), io::ErrorKind::ConnectionReset),
        other => panic!("expected read error, got {:?}", other),
    }
    assert_eq!(err.to_string(), "read frame failed: connection reset");
    assert_eq!(pool.outstanding(), 0);
}
