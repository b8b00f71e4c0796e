//! Hardware Abstraction Layer
//!
//! The platform reaches the engine through two traits; everything above
//! them is hardware independent.
//!
//! # Modules
//!
//! - [`registers`]: Register block trait and peripheral settings
//! - [`dma`]: Cyclic DMA channel trait
//! - [`deadline`]: Bounded status polling
//! - [`controller`]: Enable/start/active handshake over both traits
//!
//! # Delay Integration
//!
//! All bounded waits use `embedded_hal::delay::DelayNs` directly.
//! Pass any delay implementation from your HAL.

pub mod controller;
pub mod deadline;
pub mod dma;
pub mod registers;

// Re-export commonly used types
pub use controller::{ControllerCounters, TransferController};
pub use deadline::{TimedOut, poll_until};
pub use dma::{CyclicDma, DmaRegion, TransferDirection};
pub use registers::{DataWidth, PeripheralSettings, StreamRegisters};
