//! Centralized Constants
//!
//! Single source of truth for the sizes, limits and timing values used by the
//! streaming engine.
//!
//! # Organization
//!
//! - **Buffer geometry**: cyclic buffer and ring buffer sizing
//! - **Tunable bounds**: accepted ranges for runtime parameters
//! - **Hardware pacing**: transfer count multiplier and completion credits
//! - **Timing**: bounded waits on the peripheral status

// =============================================================================
// Buffer Geometry
// =============================================================================

/// Default size of the whole cyclic transfer buffer in bytes
pub const DEFAULT_NATIVE_BUFFER_SIZE: usize = 32 * 1024;

/// Default number of slots (chunks) in the cyclic transfer buffer
pub const DEFAULT_SLOT_COUNT: usize = 4;

/// Default ring buffer size, in chunks
pub const DEFAULT_FIFO_MULTIPLIER: u32 = 6;

// =============================================================================
// Tunable Bounds
// =============================================================================

/// Smallest ring buffer multiplier accepted anywhere
pub const FIFO_MULTIPLIER_MIN: u32 = 2;

/// Largest ring buffer multiplier accepted at initialization
pub const FIFO_MULTIPLIER_MAX_INIT: u32 = 32;

/// Largest ring buffer multiplier accepted through the control surface
pub const FIFO_MULTIPLIER_MAX_RUNTIME: u32 = 20;

/// Highest usable address bit offset
pub const ADDR_OFFSET_MAX: i32 = 4;

/// Raw value marking an address bit offset as unused
pub const ADDR_OFFSET_UNUSED: i32 = -1;

/// Default bit offset of the direction line in the address selector
pub const DEFAULT_ADDR_DIR_OFFSET: i32 = 2;

/// Default bit offset of the channel line in the address selector
pub const DEFAULT_ADDR_CH_OFFSET: i32 = 3;

// =============================================================================
// Hardware Pacing
// =============================================================================

/// Transfer count multiplier programmed on refresh, and the number of
/// transmit completions between refreshes
pub const TRANSFER_MULTIPLIER: u32 = 64;

/// Default number of unacknowledged completions before refresh is withheld
pub const DEFAULT_COMPLETION_CREDITS: u32 = 64;

/// Receive completions between periodic diagnostics
pub const RX_DIAG_INTERVAL: u32 = 100;

/// Transmit completions between periodic diagnostics
pub const TX_DIAG_INTERVAL: u32 = 111;

// =============================================================================
// Timing
// =============================================================================

/// Budget for the peripheral enable flag to drop after a disable request
pub const DISABLE_TIMEOUT_US: u32 = 1_000;

/// Budget for the peripheral to report active after start
pub const START_TIMEOUT_US: u32 = 10_000;

/// Budget for the transmit path to see the peripheral idle before refresh
pub const TX_IDLE_TIMEOUT_US: u32 = 1_000;

/// Interval between status polls during bounded waits
pub const POLL_INTERVAL_US: u32 = 1;
