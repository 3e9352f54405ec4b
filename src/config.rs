//! Tunables for connections and the buffer pool.

use serde::{Deserialize, Serialize};

use crate::protocol::MAX_FRAME_LEN;

/// Default size of the buffered writer in front of the stream (16 KiB).
pub const DEFAULT_WRITE_BUFFER_SIZE: usize = 16 * 1024;

/// Default initial capacity of the decoder's read buffer (64 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 64 * 1024;

/// Default number of idle buffers the pool keeps.
pub const DEFAULT_MAX_CACHED: usize = 1024;

/// Buffers that grew beyond this are freed instead of cached (1 MiB).
pub const DEFAULT_MAX_RETAINED_CAPACITY: usize = 1024 * 1024;

/// Capacity of freshly allocated pool buffers (1 KiB).
pub const DEFAULT_INITIAL_CAPACITY: usize = 1024;

/// Configuration for a transport connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Capacity of the buffered writer.
    pub write_buffer_size: usize,
    /// Initial capacity of the decoder buffer.
    pub read_buffer_size: usize,
    /// Largest accepted frame (header + body). Clamped to `MAX_FRAME_LEN`.
    pub max_frame_length: usize,
}

impl ConnectionConfig {
    /// Set the buffered writer capacity.
    pub fn write_buffer_size(mut self, size: usize) -> Self {
        self.write_buffer_size = size;
        self
    }

    /// Set the decoder buffer capacity.
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Set the largest accepted frame length.
    pub fn max_frame_length(mut self, len: usize) -> Self {
        self.max_frame_length = len;
        self
    }

    /// Frame length limit actually enforced.
    pub fn effective_max_frame_length(&self) -> usize {
        self.max_frame_length.min(MAX_FRAME_LEN)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            write_buffer_size: DEFAULT_WRITE_BUFFER_SIZE,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_frame_length: MAX_FRAME_LEN,
        }
    }
}

/// Configuration for a [`BufferPool`](crate::protocol::BufferPool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Idle buffers kept for reuse.
    pub max_cached: usize,
    /// Returned buffers with more capacity than this are dropped.
    pub max_retained_capacity: usize,
    /// Capacity of newly allocated buffers.
    pub initial_capacity: usize,
}

impl PoolConfig {
    /// Set the number of idle buffers kept.
    pub fn max_cached(mut self, n: usize) -> Self {
        self.max_cached = n;
        self
    }

    /// Set the retention limit for returned buffers.
    pub fn max_retained_capacity(mut self, capacity: usize) -> Self {
        self.max_retained_capacity = capacity;
        self
    }

    /// Set the capacity of fresh buffers.
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_cached: DEFAULT_MAX_CACHED,
            max_retained_capacity: DEFAULT_MAX_RETAINED_CAPACITY,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
        }
    }
}
