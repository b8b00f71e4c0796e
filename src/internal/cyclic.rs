//! Rotating multi-slot staging buffer shared with the DMA channel.

use alloc::vec::Vec;

use crate::driver::error::{ConfigError, ConfigResult};
use crate::hal::dma::DmaRegion;

/// Cyclic transfer buffer of `slot_count` equal chunks.
///
/// The chunk index counts completions without bound (wrapping at `u32::MAX`);
/// the slot in use is always `index % slot_count`.
pub struct CyclicBuffer {
    storage: Vec<u8>,
    slot_count: usize,
    chunk_size: usize,
    index: u32,
}

impl CyclicBuffer {
    /// Allocate a zeroed buffer.
    ///
    /// # Errors
    /// `InvalidParameter` for a zero slot count or chunk size, `OutOfMemory`
    /// if the allocation fails.
    pub fn new(slot_count: usize, chunk_size: usize) -> ConfigResult<Self> {
        if slot_count == 0 || chunk_size == 0 {
            return Err(ConfigError::InvalidParameter);
        }
        let len = slot_count
            .checked_mul(chunk_size)
            .ok_or(ConfigError::InvalidParameter)?;

        let mut storage = Vec::new();
        storage
            .try_reserve_exact(len)
            .map_err(|_| ConfigError::OutOfMemory)?;
        storage.resize(len, 0);

        Ok(Self {
            storage,
            slot_count,
            chunk_size,
            index: 0,
        })
    }

    /// Bytes per slot
    #[inline(always)]
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Current chunk index
    #[inline(always)]
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Slot addressed by the current index
    #[inline(always)]
    #[must_use]
    pub const fn current_slot(&self) -> usize {
        self.slot_of(self.index)
    }

    /// Slot addressed by an arbitrary index
    #[inline(always)]
    #[must_use]
    pub const fn slot_of(&self, index: u32) -> usize {
        index as usize % self.slot_count
    }

    /// Advance the index by one
    #[inline(always)]
    pub fn advance(&mut self) {
        self.advance_by(1);
    }

    /// Advance the index past `count` chunks
    #[inline(always)]
    pub fn advance_by(&mut self, count: u32) {
        self.index = self.index.wrapping_add(count);
    }

    /// Restart counting from slot 0
    #[inline(always)]
    pub fn reset_index(&mut self) {
        self.index = 0;
    }

    /// Contents of one slot
    pub fn slot(&self, slot: usize) -> &[u8] {
        let start = (slot % self.slot_count) * self.chunk_size;
        &self.storage[start..start + self.chunk_size]
    }

    /// Mutable contents of one slot
    pub fn slot_mut(&mut self, slot: usize) -> &mut [u8] {
        let start = (slot % self.slot_count) * self.chunk_size;
        &mut self.storage[start..start + self.chunk_size]
    }

    /// Region descriptor covering every slot, period = one chunk
    pub fn region(&mut self) -> DmaRegion {
        DmaRegion {
            ptr: self.storage.as_mut_ptr(),
            len: self.storage.len(),
            period: self.chunk_size,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
