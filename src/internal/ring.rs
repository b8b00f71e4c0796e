//! Fixed-capacity FIFO byte ring.

use alloc::vec::Vec;

use crate::driver::error::{ConfigError, ConfigResult};

/// Byte FIFO with wraparound storage.
///
/// Pushes never overwrite unread bytes: [`push_chunk`](Self::push_chunk) is
/// all-or-nothing and [`push_bytes`](Self::push_bytes) stops at the free
/// space.
pub struct ByteRing {
    storage: Vec<u8>,
    /// Index of the oldest unread byte
    head: usize,
    /// Number of unread bytes
    len: usize,
}

impl ByteRing {
    /// Allocate a zeroed ring holding `capacity` bytes.
    ///
    /// # Errors
    /// `OutOfMemory` if the allocation fails.
    pub fn with_capacity(capacity: usize) -> ConfigResult<Self> {
        let mut storage = Vec::new();
        storage
            .try_reserve_exact(capacity)
            .map_err(|_| ConfigError::OutOfMemory)?;
        storage.resize(capacity, 0);
        Ok(Self {
            storage,
            head: 0,
            len: 0,
        })
    }

    /// Total capacity in bytes
    #[inline(always)]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Unread bytes
    #[inline(always)]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Bytes that can still be pushed
    #[inline(always)]
    #[must_use]
    pub fn free(&self) -> usize {
        self.capacity() - self.len
    }

    /// No unread bytes
    #[inline(always)]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// No free space
    #[inline(always)]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Push all of `chunk` or nothing. Returns whether it was stored.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> bool {
        if chunk.len() > self.free() {
            return false;
        }
        self.copy_in(chunk);
        true
    }

    /// Push the prefix of `data` that fits. Returns the bytes stored.
    pub fn push_bytes(&mut self, data: &[u8]) -> usize {
        let count = data.len().min(self.free());
        self.copy_in(&data[..count]);
        count
    }

    /// Pop up to `out.len()` bytes in FIFO order. Returns the bytes copied.
    pub fn pop_into(&mut self, out: &mut [u8]) -> usize {
        let count = out.len().min(self.len);
        if count == 0 {
            return 0;
        }
        let cap = self.capacity();
        let first = count.min(cap - self.head);
        out[..first].copy_from_slice(&self.storage[self.head..self.head + first]);
        out[first..count].copy_from_slice(&self.storage[..count - first]);

        self.head = (self.head + count) % cap;
        self.len -= count;
        count
    }

    /// Drop every unread byte
    pub fn flush(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    fn copy_in(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let cap = self.capacity();
        let tail = (self.head + self.len) % cap;
        let first = data.len().min(cap - tail);
        self.storage[tail..tail + first].copy_from_slice(&data[..first]);
        self.storage[..data.len() - first].copy_from_slice(&data[first..]);
        self.len += data.len();
    }
}

// =============================================================================
// Tests
// =============================================================================
