//! Transport module - length-prefixed framing over byte streams.
//!
//! Provides:
//! - [`LengthBasedFrameDecoder`] for reading 24-bit length-prefixed frames
//! - [`Connection`] with independent [`FrameReader`] / [`FrameWriter`] halves
//! - [`Counter`] for resumption byte positions

mod connection;
mod counter;
mod decoder;

pub use connection::{Connection, FrameReader, FrameWriter, TcpConnection};
pub use counter::Counter;
pub use decoder::LengthBasedFrameDecoder;
