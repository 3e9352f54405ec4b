//! Byte buffer pool for allocation-free frame encoding and decoding.
//!
//! Frame bodies live in `BytesMut` buffers borrowed from a shared pool.
//! A borrowed buffer is wrapped in [`PooledBuf`], which hands it back to the
//! pool when released or dropped, so every exit path (including errors)
//! returns the buffer.
//!
//! # Design
//!
//! - Idle buffers sit in a bounded lock-free queue shared by all threads
//! - Returned buffers are cleared; oversized ones are freed instead of cached
//! - One process-wide pool is available through [`BufferPool::global()`],
//!   isolated pools can be created for tests or dedicated connections
//!
//! # Usage
//!
//! ```
//! use rsocket_wire::protocol::BufferPool;
//!
//! let pool = BufferPool::global();
//! let mut buf = pool.borrow();
//! buf.extend_from_slice(b"hello");
//! buf.release();
//! ```

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use bytes::BytesMut;
use crossbeam_queue::ArrayQueue;

use crate::config::PoolConfig;

struct PoolInner {
    idle: ArrayQueue<BytesMut>,
    max_retained_capacity: usize,
    initial_capacity: usize,
    outstanding: AtomicUsize,
}

/// A pool of reusable byte buffers.
///
/// Cloning is cheap; all clones share the same idle list.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

static GLOBAL_POOL: OnceLock<BufferPool> = OnceLock::new();

impl BufferPool {
    /// Create an isolated pool.
    pub fn new(config: PoolConfig) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                idle: ArrayQueue::new(config.max_cached.max(1)),
                max_retained_capacity: config.max_retained_capacity,
                initial_capacity: config.initial_capacity,
                outstanding: AtomicUsize::new(0),
            }),
        }
    }

    /// The process-wide pool, created with default settings on first use.
    pub fn global() -> &'static BufferPool {
        GLOBAL_POOL.get_or_init(|| BufferPool::new(PoolConfig::default()))
    }

    /// Borrow an empty buffer.
    ///
    /// Reuses an idle buffer when one is available.
    pub fn borrow(&self) -> PooledBuf {
        let buf = self
            .inner
            .idle
            .pop()
            .unwrap_or_else(|| BytesMut::with_capacity(self.inner.initial_capacity));
        self.inner.outstanding.fetch_add(1, Ordering::AcqRel);
        PooledBuf {
            buf,
            pool: self.clone(),
        }
    }

    /// Borrow a buffer pre-filled with `data`.
    pub fn borrow_from(&self, data: &[u8]) -> PooledBuf {
        let mut buf = self.borrow();
        buf.extend_from_slice(data);
        buf
    }

    /// Buffers currently borrowed and not yet returned.
    #[inline]
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::Acquire)
    }

    /// Idle buffers ready for reuse.
    #[inline]
    pub fn cached(&self) -> usize {
        self.inner.idle.len()
    }

    fn give_back(&self, mut buf: BytesMut) {
        self.inner.outstanding.fetch_sub(1, Ordering::AcqRel);
        if buf.capacity() > self.inner.max_retained_capacity {
            tracing::trace!(capacity = buf.capacity(), "dropping oversized pooled buffer");
            return;
        }
        buf.clear();
        // Full queue: let the buffer go.
        let _ = self.inner.idle.push(buf);
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("outstanding", &self.outstanding())
            .field("cached", &self.cached())
            .finish()
    }
}

/// A buffer on loan from a [`BufferPool`].
///
/// Dereferences to `BytesMut`. Returned to the pool on drop.
pub struct PooledBuf {
    buf: BytesMut,
    pool: BufferPool,
}

impl PooledBuf {
    /// Return the buffer to its pool now.
    #[inline]
    pub fn release(self) {
        drop(self)
    }

    /// The pool this buffer belongs to.
    #[inline]
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }
}

impl Deref for PooledBuf {
    type Target = BytesMut;

    #[inline]
    fn deref(&self) -> &BytesMut {
        &self.buf
    }
}

impl DerefMut for PooledBuf {
    #[inline]
    fn deref_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }
}

impl AsRef<[u8]> for PooledBuf {
    fn as_ref(&self) -> &[u8] {
        &self.buf
    }
}

impl fmt::Debug for PooledBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuf").field("len", &self.buf.len()).finish()
    }
}

impl Drop for PooledBuf {
    fn drop(&mut self) {
        let buf = std::mem::take(&mut self.buf);
        self.pool.give_back(buf);
    }
}
