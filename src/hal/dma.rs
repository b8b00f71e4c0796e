//! Cyclic DMA facility interface.
//!
//! The platform supplies a channel that can loop over one buffer forever,
//! raising a completion per period. The engine only submits, starts and
//! terminates; the completion itself is delivered by the platform calling
//! [`StreamEngine::on_chunk_complete`](crate::StreamEngine::on_chunk_complete).

use crate::driver::error::ControllerResult;

/// Direction of a cyclic transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferDirection {
    /// Peripheral fills the buffer (receive)
    DeviceToMemory,
    /// Peripheral drains the buffer (transmit)
    MemoryToDevice,
}

impl TransferDirection {
    /// Whether the peripheral must be enabled with its write flag
    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(self, TransferDirection::MemoryToDevice)
    }
}

/// Memory region handed to the DMA facility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaRegion {
    /// Start of the region
    pub ptr: *mut u8,
    /// Length of the whole region in bytes
    pub len: usize,
    /// Bytes per period; one completion is raised per period
    pub period: usize,
}

/// Platform cyclic DMA channel.
///
/// # Safety contract
///
/// Implementations may access the region handed to
/// [`submit_cyclic`](CyclicDma::submit_cyclic) until
/// [`terminate`](CyclicDma::terminate) returns. The engine keeps the buffer
/// alive and in place for that whole window.
pub trait CyclicDma {
    /// Prepare and commit a cyclic descriptor over `region`.
    ///
    /// # Errors
    /// `SubmissionFailed` if the descriptor cannot be prepared or committed.
    fn submit_cyclic(
        &mut self,
        region: DmaRegion,
        direction: TransferDirection,
    ) -> ControllerResult<()>;

    /// Start the committed descriptor
    fn issue_pending(&mut self);

    /// Stop the channel and wait until no completion can still be raised
    fn terminate(&mut self);
}
