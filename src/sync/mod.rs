//! Synchronization and Concurrency Support
//!
//! Everything the completion handler shares with process context:
//!
//! - **Primitives** (`primitives`): [`CriticalSectionCell`] and
//!   [`AtomicWaker`], plus the interruptible lock used by process context
//! - **Readiness** (`readiness`): [`Readiness`] edge flags with reader and
//!   writer wakers, and the [`CompletionSemaphore`] that bounds how far the
//!   hardware may run ahead of software
//! - **Async Support** (`asynch`): [`ReadyFuture`] behind
//!   `StreamSession::readable` and `StreamSession::writable`
//!
//! # Feature Flags
//!
//! - `async`: Enables the `asynch` module

pub(crate) mod primitives;
pub(crate) mod readiness;

pub use primitives::{AtomicWaker, CriticalSectionCell};
pub use readiness::{CompletionSemaphore, Readiness};

#[cfg(feature = "async")]
pub mod asynch;

#[cfg(feature = "async")]
pub use asynch::ReadyFuture;
