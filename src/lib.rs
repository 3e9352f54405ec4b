//! # rsocket-wire
//!
//! Wire-level codec for the RSocket protocol: frame encoding and
//! validation, payload fragmentation, and 24-bit length-prefixed framing
//! over byte streams.
//!
//! ## Architecture
//!
//! - **Protocol**: 6-byte header, per-type frame variants, pooled bodies
//! - **Fragmentation**: MTU-bounded splitting and reassembly
//! - **Transport**: length-prefixed decoder and frame connection with
//!   resumption byte counting
//!
//! ## Example
//!
//! ```no_run
//! use rsocket_wire::config::ConnectionConfig;
//! use rsocket_wire::protocol::{BufferPool, FnfFrame, Frame};
//! use rsocket_wire::transport::TcpConnection;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stream = tokio::net::TcpStream::connect("127.0.0.1:7878").await?;
//!     let mut conn = TcpConnection::new(stream, ConnectionConfig::default());
//!
//!     let frame = FnfFrame::new(BufferPool::global(), 1, b"ping", b"", 0);
//!     conn.write(&Frame::from(frame)).await?;
//!     conn.close().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod fragmentation;
pub mod protocol;
pub mod transport;

pub use error::{FrameError, Result, WireError};
pub use fragmentation::{Joiner, Splitter};
pub use protocol::{BufferPool, Frame, FrameHeader, FrameType};
pub use transport::{Connection, Counter, TcpConnection};
