//! Core streaming engine components.
//!
//! This module contains the building blocks for configuring and operating
//! the stream:
//!
//! - [`config`] - Configuration types and builder patterns
//! - [`error`] - Error types and result aliases
//! - [`state`] - Stream states and address selectors
//! - [`engine`] - The engine and its state machine
//! - [`session`] - The process-facing handle
//! - [`control`] - Configuration and introspection requests
//!
//! Chunk completion handling lives on [`StreamEngine`] as
//! [`StreamEngine::on_chunk_complete`].
//!
//! # Example
//!
//! ```ignore
//! use ph_smi_stream::driver::{StreamConfig, StreamEngine, StreamState};
//!
//! let config = StreamConfig::new().with_fifo_multiplier(8);
//! let engine = StreamEngine::new(regs, dma, delay, config)?;
//!
//! let session = engine.open()?;
//! session.set_state(StreamState::RxChannel0)?;
//! ```

// Submodules
mod completion;
pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod session;
pub mod state;

// Re-exports for convenience
pub use config::{StreamConfig, TimeoutConfig, Tunables, TxUnderrunPolicy};
pub use control::{ControlCode, ControlRequest, ControlResponse};
pub use engine::{StreamEngine, StreamStats};
pub use error::{
    ConfigError, ConfigResult, ControllerError, ControllerResult, Error, Result, StreamError,
    StreamResult,
};
pub use session::{PollFlags, StreamSession};
pub use state::{AddressSelector, BitOffset, StreamState};
