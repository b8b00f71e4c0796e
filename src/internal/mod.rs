//! Internal Implementation Details
//!
//! This module contains implementation details that are not part of the public API.
//! Types in this module may change without notice between minor versions.
//!
//! # Contents
//!
//! - [`constants`]: Default sizes, tunable bounds and timing values
//! - [`ring`]: FIFO byte ring used for the RX and TX buffers
//! - [`cyclic`]: Slot-addressed buffer shared with the DMA channel

pub(crate) mod constants;
pub(crate) mod cyclic;
pub(crate) mod ring;
