//! SMI Stream Engine
//!
//! A `no_std` streaming engine that moves bulk data between a memory-mapped
//! peripheral and process-level readers and writers, using a cyclic DMA
//! transfer and two software ring buffers.
//!
//! # Architecture
//!
//! The crate is organized into three layers:
//!
//! 1. **Driver Layer** ([`driver`]): State machine, session, completion
//!    handling and control operations
//! 2. **HAL Layer** ([`hal`]): Register and DMA traits, deadline polling and
//!    the transfer controller built on them
//! 3. **Sync Layer** ([`sync`]): Readiness flags, wakers and the completion
//!    semaphore shared with the interrupt handler
//!
//! ## Data Flow
//!
//! - **Receive**: the peripheral fills a slot of the cyclic buffer, the
//!   completion handler copies it into the RX ring, the reader drains the ring
//! - **Transmit**: the writer fills the TX ring, the completion handler
//!   copies one chunk into the next free slot, the peripheral drains it
//!
//! Overruns and underruns drop whole chunks and are only counted.
//!
//! # Features
//!
//! - `log` (default): Diagnostics through the `log` facade
//! - `defmt`: Enable defmt formatting for public types
//! - `async`: Enable `readable`/`writable` futures on the session
//!
//! # Example
//!
//! ```ignore
//! use ph_smi_stream::{StreamConfig, StreamEngine, StreamState};
//!
//! // Platform types implementing StreamRegisters, CyclicDma and DelayNs
//! let engine = StreamEngine::new(regs, dma, delay, StreamConfig::new())?;
//!
//! // From the DMA completion interrupt:
//! // engine.on_chunk_complete();
//!
//! let session = engine.open()?;
//! session.set_state(StreamState::RxChannel0)?;
//!
//! let mut buf = [0u8; 4096];
//! let n = session.read(Some(&mut buf))?;
//!
//! // Discard anything still buffered
//! session.read(None)?;
//! ```
//!
//! # Memory Requirements
//!
//! With the default configuration (32 KiB cyclic buffer in 4 chunks, multiplier 6):
//! - Cyclic buffer: 32 KiB of DMA-capable memory
//! - Ring buffers: 2 x 48 KiB (6 chunks each), allocated on open and freed on close

#![no_std]
#![deny(missing_docs)]
#![allow(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]
// Clippy lint levels live here and in Cargo.toml [lints].
#![deny(clippy::correctness)]
#![warn(
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::cloned_instead_of_copied,
    clippy::explicit_iter_loop,
    clippy::implicit_clone,
    clippy::inconsistent_struct_constructor,
    clippy::manual_assert,
    clippy::manual_let_else,
    clippy::match_same_arms,
    clippy::needless_pass_by_value,
    clippy::semicolon_if_nothing_returned,
    clippy::uninlined_format_args,
    clippy::unnested_or_patterns,
    clippy::std_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::alloc_instead_of_core
)]
#![allow(
    clippy::mod_module_files,
    clippy::self_named_module_files,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::struct_excessive_bools,
    clippy::fn_params_excessive_bools,
    clippy::type_complexity,
    clippy::must_use_candidate,
    clippy::assertions_on_constants,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_lossless,
    clippy::panic_in_result_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::items_after_statements,
    clippy::let_underscore_future
)]

extern crate alloc;

// =============================================================================
// Modules
// =============================================================================

pub mod driver;
pub mod hal;
pub mod sync;

// Internal implementation details (pub(crate) only)
mod internal;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use driver::{
    AddressSelector, BitOffset, ConfigError, ConfigResult, ControlCode, ControlRequest,
    ControlResponse, ControllerError, ControllerResult, Error, PollFlags, Result, StreamConfig,
    StreamEngine, StreamError, StreamResult, StreamSession, StreamState, StreamStats,
    TimeoutConfig, Tunables, TxUnderrunPolicy,
};
pub use hal::{
    CyclicDma, DataWidth, DmaRegion, PeripheralSettings, StreamRegisters, TransferDirection,
};

/// Default sizes, tunable bounds and timing values
pub mod constants {
    pub use crate::internal::constants::*;
}
