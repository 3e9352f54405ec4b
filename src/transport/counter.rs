//! Resumption byte counter.

use std::sync::atomic::{AtomicU64, Ordering};

/// Cumulative bytes of resumable frames read and written on a connection.
///
/// Shared between the read and write halves through an `Arc`. Counts only
/// ever grow.
#[derive(Debug, Default)]
pub struct Counter {
    read: AtomicU64,
    written: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of resumable frames received so far.
    #[inline]
    pub fn read_bytes(&self) -> u64 {
        self.read.load(Ordering::Acquire)
    }

    /// Bytes of resumable frames sent so far.
    #[inline]
    pub fn write_bytes(&self) -> u64 {
        self.written.load(Ordering::Acquire)
    }

    #[inline]
    pub fn inc_read_bytes(&self, n: u64) {
        self.read.fetch_add(n, Ordering::AcqRel);
    }

    #[inline]
    pub fn inc_write_bytes(&self, n: u64) {
        self.written.fetch_add(n, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_starts_at_zero() {
        let c = Counter::new();
        assert_eq!(c.read_bytes(), 0);
        assert_eq!(c.write_bytes(), 0);
    }

    #[test]
    fn test_concurrent_increments() {
        let c = Arc::new(Counter::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let c = c.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        c.inc_read_bytes(3);
                        c.inc_write_bytes(5);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(c.read_bytes(), 12_000);
        assert_eq!(c.write_bytes(), 20_000);
    }
}
