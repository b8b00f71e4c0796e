//! Configuration types for the streaming engine

use super::error::{ConfigError, ConfigResult};
use super::state::{BitOffset, offsets_compatible};
use crate::internal::constants::{
    DEFAULT_ADDR_CH_OFFSET, DEFAULT_ADDR_DIR_OFFSET, DEFAULT_COMPLETION_CREDITS,
    DEFAULT_FIFO_MULTIPLIER, DEFAULT_NATIVE_BUFFER_SIZE, DEFAULT_SLOT_COUNT, DISABLE_TIMEOUT_US,
    FIFO_MULTIPLIER_MAX_INIT, FIFO_MULTIPLIER_MAX_RUNTIME, FIFO_MULTIPLIER_MIN, POLL_INTERVAL_US,
    START_TIMEOUT_US, TRANSFER_MULTIPLIER, TX_IDLE_TIMEOUT_US,
};

/// What the transmit completion leaves in a slot when the TX ring is short
/// of a full chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxUnderrunPolicy {
    /// Leave the previous slot contents in place; the hardware resends them
    #[default]
    Stale,
    /// Zero the slot so the hardware sends padding
    ZeroFill,
}

/// Bounded-wait budgets for the peripheral handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeoutConfig {
    /// Budget for the enable flag to drop after disable, in microseconds
    pub disable_us: u32,
    /// Budget for the active flag to assert after start, in microseconds
    pub start_us: u32,
    /// Budget for the transmit refresh to see the peripheral idle
    pub tx_idle_us: u32,
    /// Delay between status polls, in microseconds
    pub poll_interval_us: u32,
}

impl TimeoutConfig {
    /// Default budgets
    #[must_use]
    pub const fn new() -> Self {
        Self {
            disable_us: DISABLE_TIMEOUT_US,
            start_us: START_TIMEOUT_US,
            tx_idle_us: TX_IDLE_TIMEOUT_US,
            poll_interval_us: POLL_INTERVAL_US,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Complete streaming engine configuration
///
/// The ring buffer multiplier and both address offsets are also runtime
/// tunables; the values here are their initial settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamConfig {
    /// Size of the whole cyclic transfer buffer in bytes
    pub native_buffer_size: usize,
    /// Number of slots the cyclic buffer is divided into
    pub slot_count: usize,
    /// Ring buffer capacity as a multiple of the chunk size
    pub fifo_multiplier: u32,
    /// Bit offset of the direction line
    pub addr_dir_offset: BitOffset,
    /// Bit offset of the channel line
    pub addr_ch_offset: BitOffset,
    /// Transfer count multiplier and transmit refresh period
    pub transfer_multiplier: u32,
    /// Unacknowledged completions allowed before refresh is withheld
    pub completion_credits: u32,
    /// Transmit underrun behaviour
    pub tx_underrun: TxUnderrunPolicy,
    /// Peripheral handshake budgets
    pub timeouts: TimeoutConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamConfig {
    /// Create a new configuration with defaults
    #[must_use]
    pub const fn new() -> Self {
        Self {
            native_buffer_size: DEFAULT_NATIVE_BUFFER_SIZE,
            slot_count: DEFAULT_SLOT_COUNT,
            fifo_multiplier: DEFAULT_FIFO_MULTIPLIER,
            addr_dir_offset: BitOffset::at(DEFAULT_ADDR_DIR_OFFSET as u8),
            addr_ch_offset: BitOffset::at(DEFAULT_ADDR_CH_OFFSET as u8),
            transfer_multiplier: TRANSFER_MULTIPLIER,
            completion_credits: DEFAULT_COMPLETION_CREDITS,
            tx_underrun: TxUnderrunPolicy::Stale,
            timeouts: TimeoutConfig::new(),
        }
    }

    // =========================================================================
    // Builder Methods
    // =========================================================================

    /// Set the cyclic buffer geometry
    #[must_use]
    pub const fn with_native_buffer(mut self, size: usize, slot_count: usize) -> Self {
        self.native_buffer_size = size;
        self.slot_count = slot_count;
        self
    }

    /// Set the ring buffer multiplier
    #[must_use]
    pub const fn with_fifo_multiplier(mut self, multiplier: u32) -> Self {
        self.fifo_multiplier = multiplier;
        self
    }

    /// Set both address line offsets
    #[must_use]
    pub const fn with_address_offsets(mut self, dir: BitOffset, ch: BitOffset) -> Self {
        self.addr_dir_offset = dir;
        self.addr_ch_offset = ch;
        self
    }

    /// Set the transfer count multiplier
    #[must_use]
    pub const fn with_transfer_multiplier(mut self, multiplier: u32) -> Self {
        self.transfer_multiplier = multiplier;
        self
    }

    /// Set the number of completion credits
    #[must_use]
    pub const fn with_completion_credits(mut self, credits: u32) -> Self {
        self.completion_credits = credits;
        self
    }

    /// Set the transmit underrun policy
    #[must_use]
    pub const fn with_tx_underrun(mut self, policy: TxUnderrunPolicy) -> Self {
        self.tx_underrun = policy;
        self
    }

    /// Set the handshake budgets
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Bytes per cyclic buffer slot
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.native_buffer_size / self.slot_count
    }

    /// Check the initialization-time rules.
    ///
    /// # Errors
    /// `InvalidParameter` if the geometry is degenerate, the multiplier is
    /// outside `2..=32`, or both offsets name the same bit.
    pub const fn validate(&self) -> ConfigResult<()> {
        if self.slot_count == 0
            || self.native_buffer_size == 0
            || self.native_buffer_size % self.slot_count != 0
        {
            return Err(ConfigError::InvalidParameter);
        }
        if !multiplier_in_range(self.fifo_multiplier, FIFO_MULTIPLIER_MAX_INIT) {
            return Err(ConfigError::InvalidParameter);
        }
        if !offsets_compatible(self.addr_dir_offset, self.addr_ch_offset) {
            return Err(ConfigError::InvalidParameter);
        }
        if self.transfer_multiplier == 0 || self.completion_credits == 0 {
            return Err(ConfigError::InvalidParameter);
        }
        Ok(())
    }
}

const fn multiplier_in_range(multiplier: u32, max: u32) -> bool {
    multiplier >= FIFO_MULTIPLIER_MIN && multiplier <= max
}

/// Runtime-adjustable parameters, changed through the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tunables {
    /// Ring buffer multiplier applied at the next open
    pub fifo_multiplier: u32,
    /// Direction line offset applied at the next state change
    pub addr_dir_offset: BitOffset,
    /// Channel line offset applied at the next state change
    pub addr_ch_offset: BitOffset,
}

impl Tunables {
    pub(crate) const fn from_config(config: &StreamConfig) -> Self {
        Self {
            fifo_multiplier: config.fifo_multiplier,
            addr_dir_offset: config.addr_dir_offset,
            addr_ch_offset: config.addr_ch_offset,
        }
    }

    /// Set the ring buffer multiplier (`2..=20`).
    pub fn set_fifo_multiplier(&mut self, raw: i32) -> ConfigResult<()> {
        let multiplier = u32::try_from(raw).map_err(|_| ConfigError::InvalidParameter)?;
        if !multiplier_in_range(multiplier, FIFO_MULTIPLIER_MAX_RUNTIME) {
            return Err(ConfigError::InvalidParameter);
        }
        self.fifo_multiplier = multiplier;
        Ok(())
    }

    /// Set the direction line offset (`-1 | 0..=4`, distinct from channel)
    pub fn set_addr_dir_offset(&mut self, raw: i32) -> ConfigResult<()> {
        let offset = BitOffset::from_raw(raw)?;
        if !offsets_compatible(offset, self.addr_ch_offset) {
            return Err(ConfigError::InvalidParameter);
        }
        self.addr_dir_offset = offset;
        Ok(())
    }

    /// Set the channel line offset (`-1 | 0..=4`, distinct from direction)
    pub fn set_addr_ch_offset(&mut self, raw: i32) -> ConfigResult<()> {
        let offset = BitOffset::from_raw(raw)?;
        if !offsets_compatible(self.addr_dir_offset, offset) {
            return Err(ConfigError::InvalidParameter);
        }
        self.addr_ch_offset = offset;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
