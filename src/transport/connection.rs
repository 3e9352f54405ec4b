//! Frame-level connection over a byte stream.
//!
//! # Architecture
//!
//! ```text
//!            ┌──────────────── Connection<S> ────────────────┐
//! stream ──► │ FrameReader: decoder ─► parse ─► validate ─►  │ ──► Frame
//!            │                                count (read)  │
//! Frame  ──► │ FrameWriter: u24 len + header + body ─►       │ ──► stream
//!            │              count (write) ─► flush           │
//!            └───────────────────────────────────────────────┘
//! ```
//!
//! Both halves can be driven from separate tasks after
//! [`Connection::into_split`]. The optional [`Counter`] is shared by both.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufWriter, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};

use super::counter::Counter;
use super::decoder::LengthBasedFrameDecoder;
use crate::config::ConnectionConfig;
use crate::error::{Result, WireError};
use crate::protocol::{encode_u24, BufferPool, Frame};

/// Connection over a TCP stream.
pub type TcpConnection = Connection<TcpStream>;

/// Reads and writes whole frames on a byte stream.
#[derive(Debug)]
pub struct Connection<S> {
    reader: FrameReader<ReadHalf<S>>,
    writer: FrameWriter<WriteHalf<S>>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite,
{
    /// Wrap a stream. Received bodies are borrowed from the global pool.
    pub fn new(stream: S, config: ConnectionConfig) -> Self {
        Self::with_pool(stream, config, BufferPool::global().clone())
    }

    /// Wrap a stream, borrowing received bodies from `pool`.
    pub fn with_pool(stream: S, config: ConnectionConfig, pool: BufferPool) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        Self {
            reader: FrameReader::new(read_half, &config, pool),
            writer: FrameWriter::new(write_half, &config),
        }
    }

    /// Enable resumption byte counting.
    pub fn with_counter(mut self, counter: Arc<Counter>) -> Self {
        self.set_counter(Some(counter));
        self
    }

    pub fn set_counter(&mut self, counter: Option<Arc<Counter>>) {
        self.reader.counter = counter.clone();
        self.writer.counter = counter;
    }

    pub fn counter(&self) -> Option<&Arc<Counter>> {
        self.reader.counter.as_ref()
    }

    /// Bound subsequent reads and writes by `deadline`; `None` clears it.
    pub fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.reader.set_deadline(deadline);
        self.writer.set_deadline(deadline);
    }

    /// Read the next frame. See [`FrameReader::read`].
    pub async fn read(&mut self) -> Result<Option<Frame>> {
        self.reader.read().await
    }

    /// Write one frame and flush. See [`FrameWriter::write`].
    pub async fn write(&mut self, frame: &Frame) -> Result<()> {
        self.writer.write(frame).await
    }

    /// Flush and shut down the writer, then release the stream.
    ///
    /// The stream is dropped even if the shutdown fails.
    pub async fn close(self) -> Result<()> {
        let Self { reader, writer } = self;
        let result = writer.close().await;
        drop(reader);
        result
    }

    /// Split into halves that can be used from separate tasks.
    pub fn into_split(self) -> (FrameReader<ReadHalf<S>>, FrameWriter<WriteHalf<S>>) {
        (self.reader, self.writer)
    }
}

/// Read half of a connection.
#[derive(Debug)]
pub struct FrameReader<R> {
    decoder: LengthBasedFrameDecoder<R>,
    pool: BufferPool,
    counter: Option<Arc<Counter>>,
    deadline: Option<Instant>,
}

impl<R> FrameReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R, config: &ConnectionConfig, pool: BufferPool) -> Self {
        Self {
            decoder: LengthBasedFrameDecoder::with_config(reader, config),
            pool,
            counter: None,
            deadline: None,
        }
    }

    pub fn set_counter(&mut self, counter: Option<Arc<Counter>>) {
        self.counter = counter;
    }

    pub fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.deadline = deadline;
    }

    /// Read, parse and validate the next frame.
    ///
    /// Returns `Ok(None)` at end of stream on a frame boundary. Resumable
    /// frames advance the read counter by their header + body length.
    ///
    /// # Errors
    ///
    /// `MalformedHeader`, `UnknownFrameType`, `MalformedFrame`, `Framing`,
    /// `FrameTooLarge`, `Read`, or `Timeout` once the deadline passes. The
    /// body buffer goes back to the pool on every error.
    ///
    /// # Cancel safety
    ///
    /// Cancel-safe.
    pub async fn read(&mut self) -> Result<Option<Frame>> {
        let raw = match self.deadline {
            Some(deadline) => timeout_at(deadline, self.decoder.read())
                .await
                .map_err(|_| WireError::Timeout)??,
            None => self.decoder.read().await?,
        };
        let Some(raw) = raw else {
            return Ok(None);
        };

        let frame = match Frame::decode(&self.pool, &raw) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("decode frame failed: {}", e);
                return Err(e);
            }
        };
        if frame.is_resumable() {
            if let Some(counter) = &self.counter {
                counter.inc_read_bytes(frame.len() as u64);
            }
        }
        tracing::debug!("<--- rcv: {}", frame);
        Ok(Some(frame))
    }
}

/// Write half of a connection.
#[derive(Debug)]
pub struct FrameWriter<W> {
    writer: BufWriter<W>,
    counter: Option<Arc<Counter>>,
    deadline: Option<Instant>,
    max_frame_length: usize,
}

impl<W> FrameWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: W, config: &ConnectionConfig) -> Self {
        Self {
            writer: BufWriter::with_capacity(config.write_buffer_size, writer),
            counter: None,
            deadline: None,
            max_frame_length: config.effective_max_frame_length(),
        }
    }

    pub fn set_counter(&mut self, counter: Option<Arc<Counter>>) {
        self.counter = counter;
    }

    pub fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.deadline = deadline;
    }

    /// Write the length prefix, header and body, then flush.
    ///
    /// Resumable frames advance the write counter by their header + body
    /// length. Failed writes are not retried; after a `Timeout` the stream
    /// may hold a partial frame and should be closed.
    ///
    /// # Errors
    ///
    /// `FrameTooLarge` if the frame does not fit the 24-bit length, `Write`
    /// for I/O failures, `Timeout` once the deadline passes.
    pub async fn write(&mut self, frame: &Frame) -> Result<()> {
        let size = frame.len();
        if size > self.max_frame_length {
            return Err(WireError::FrameTooLarge {
                size,
                max: self.max_frame_length,
            });
        }
        match self.deadline {
            Some(deadline) => timeout_at(deadline, self.write_frame(frame, size))
                .await
                .map_err(|_| WireError::Timeout)?,
            None => self.write_frame(frame, size).await,
        }
    }

    async fn write_frame(&mut self, frame: &Frame, size: usize) -> Result<()> {
        self.writer
            .write_all(&encode_u24(size))
            .await
            .map_err(WireError::Write)?;
        frame.write_to(&mut self.writer).await.map_err(WireError::Write)?;
        if frame.is_resumable() {
            if let Some(counter) = &self.counter {
                counter.inc_write_bytes(size as u64);
            }
        }
        tracing::debug!("---> snd: {}", frame);
        self.writer.flush().await.map_err(WireError::Write)
    }

    /// Flush buffered bytes, shut down and drop the underlying writer.
    pub async fn close(mut self) -> Result<()> {
        self.writer.shutdown().await.map_err(WireError::Write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{flags, CancelFrame, FnfFrame, KeepaliveFrame, PayloadFrame};
    use std::time::Duration;

    fn pair(pool: &BufferPool) -> (Connection<tokio::io::DuplexStream>, Connection<tokio::io::DuplexStream>) {
        let (a, b) = tokio::io::duplex(64 * 1024);
        (
            Connection::with_pool(a, ConnectionConfig::default(), pool.clone()),
            Connection::with_pool(b, ConnectionConfig::default(), pool.clone()),
        )
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let pool = BufferPool::default();
        let (mut client, mut server) = pair(&pool);

        let sent = Frame::from(FnfFrame::new(&pool, 1, b"ping", b"meta", 0));
        client.write(&sent).await.unwrap();

        let got = server.read().await.unwrap().unwrap();
        assert_eq!(got.header(), sent.header());
        assert_eq!(got.data(), b"ping");
        assert_eq!(got.metadata(), Some(&b"meta"[..]));
    }

    #[tokio::test]
    async fn test_counter_counts_resumable_only() {
        let pool = BufferPool::default();
        let (client, server) = pair(&pool);
        let tx_counter = Arc::new(Counter::new());
        let rx_counter = Arc::new(Counter::new());
        let mut client = client.with_counter(tx_counter.clone());
        let mut server = server.with_counter(rx_counter.clone());

        let payload = Frame::from(PayloadFrame::new(&pool, 1, b"0123", b"", flags::NEXT));
        let keepalive = Frame::from(KeepaliveFrame::new(&pool, 0, b"", true));
        client.write(&payload).await.unwrap();
        client.write(&keepalive).await.unwrap();
        server.read().await.unwrap().unwrap();
        server.read().await.unwrap().unwrap();

        assert_eq!(tx_counter.write_bytes(), payload.len() as u64);
        assert_eq!(rx_counter.read_bytes(), payload.len() as u64);
        assert_eq!(tx_counter.read_bytes(), 0);
    }

    #[tokio::test]
    async fn test_close_gives_clean_eof() {
        let pool = BufferPool::default();
        let (mut client, mut server) = pair(&pool);
        client.write(&Frame::from(CancelFrame::new(&pool, 3))).await.unwrap();
        client.close().await.unwrap();

        assert!(server.read().await.unwrap().is_some());
        assert!(server.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_close_releases_stream() {
        let pool = BufferPool::default();
        let (client, mut server) = pair(&pool);
        client.close().await.unwrap();

        assert!(server.read().await.unwrap().is_none());
        // Both halves were dropped, so the peer can no longer write.
        let f = Frame::from(CancelFrame::new(&pool, 1));
        assert!(matches!(server.write(&f).await, Err(WireError::Write(_))));
    }

    #[tokio::test]
    async fn test_writer_close_consumes_half() {
        let pool = BufferPool::default();
        let (client, mut server) = pair(&pool);
        let (reader, mut writer) = client.into_split();
        writer.write(&Frame::from(CancelFrame::new(&pool, 7))).await.unwrap();
        writer.close().await.unwrap();

        assert_eq!(server.read().await.unwrap().unwrap().stream_id(), 7);
        assert!(server.read().await.unwrap().is_none());
        drop(reader);
    }

    #[tokio::test]
    async fn test_read_deadline() {
        let pool = BufferPool::default();
        let (_client, mut server) = pair(&pool);
        server.set_deadline(Some(Instant::now() + Duration::from_millis(20)));

        assert!(matches!(server.read().await, Err(WireError::Timeout)));
    }

    #[tokio::test]
    async fn test_write_rejects_oversized_frame() {
        let pool = BufferPool::default();
        let (a, _b) = tokio::io::duplex(1024);
        let mut conn = Connection::with_pool(a, ConnectionConfig::default().max_frame_length(32), pool.clone());
        let big = Frame::from(PayloadFrame::new(&pool, 1, &[0u8; 64], b"", 0));

        assert!(matches!(
            conn.write(&big).await,
            Err(WireError::FrameTooLarge { size: 70, max: 32 })
        ));
    }

    #[tokio::test]
    async fn test_split_halves_in_separate_tasks() {
        let pool = BufferPool::default();
        let (client, server) = pair(&pool);
        let (_, mut writer) = client.into_split();
        let (mut reader, _) = server.into_split();

        let sender_pool = pool.clone();
        let task = tokio::spawn(async move {
            for i in 1..=3u32 {
                let f = Frame::from(PayloadFrame::new(&sender_pool, i, b"x", b"", flags::NEXT));
                writer.write(&f).await.unwrap();
            }
        });

        for i in 1..=3u32 {
            let f = reader.read().await.unwrap().unwrap();
            assert_eq!(f.stream_id(), i);
        }
        task.await.unwrap();
    }
}
