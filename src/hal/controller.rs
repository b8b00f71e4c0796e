//! Hardware transfer controller.
//!
//! Owns the register block, the DMA channel and the cyclic buffer, and
//! implements the enable/start/active handshake around them. Only the stream
//! state machine may [`arm`](TransferController::arm) or
//! [`stop`](TransferController::stop); the completion path is limited to
//! [`refresh`](TransferController::refresh).

use embedded_hal::delay::DelayNs;

#[cfg(feature = "log")]
use log::{info, trace, warn};

use super::deadline::{TimedOut, poll_until};
use super::dma::{CyclicDma, TransferDirection};
use super::registers::{PeripheralSettings, StreamRegisters};
use crate::driver::config::{StreamConfig, TimeoutConfig};
use crate::driver::error::{ControllerError, ControllerResult};
use crate::driver::state::AddressSelector;
use crate::internal::cyclic::CyclicBuffer;

/// Counters kept by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerCounters {
    /// Successful arms
    pub arms: u32,
    /// Refreshes issued
    pub refreshes: u32,
    /// Address selector writes
    pub reprograms: u32,
}

/// Peripheral plus cyclic DMA channel plus the buffer they share
pub struct TransferController<R, C, D> {
    regs: R,
    dma: C,
    delay: D,
    buffer: CyclicBuffer,
    /// Settings restored on every stop
    settings: PeripheralSettings,
    timeouts: TimeoutConfig,
    transfer_multiplier: u32,
    armed: Option<TransferDirection>,
    completions_since_refresh: u32,
    counters: ControllerCounters,
}

impl<R, C, D> TransferController<R, C, D>
where
    R: StreamRegisters,
    C: CyclicDma,
    D: DelayNs,
{
    /// Take ownership of the hardware. The current register settings become
    /// the settings restored on stop.
    pub fn new(regs: R, dma: C, delay: D, buffer: CyclicBuffer, config: &StreamConfig) -> Self {
        let settings = regs.read_settings();
        Self {
            regs,
            dma,
            delay,
            buffer,
            settings,
            timeouts: config.timeouts,
            transfer_multiplier: config.transfer_multiplier,
            armed: None,
            completions_since_refresh: 0,
            counters: ControllerCounters::default(),
        }
    }

    /// Start a cyclic transfer in `direction`.
    ///
    /// On any failure the peripheral is left disabled and nothing is armed.
    ///
    /// # Errors
    /// - `DisableTimeout`: the peripheral would not disable first
    /// - `SubmissionFailed`: the DMA channel rejected the descriptor
    /// - `DidNotStart`: the peripheral never reported active
    pub fn arm(&mut self, direction: TransferDirection, chunk_count: u32) -> ControllerResult<()> {
        #[cfg(feature = "log")]
        info!("arming cyclic transfer: {direction:?}, count {chunk_count}");

        self.disable_sync()?;

        self.regs.set_transfer_count(0);
        self.regs.set_transfer_count(chunk_count);
        self.regs.clear_fifo();
        self.regs.enable(direction.is_write());

        let region = self.buffer.region();
        if let Err(e) = self.dma.submit_cyclic(region, direction) {
            #[cfg(feature = "log")]
            warn!("cyclic descriptor submission failed");
            let _disabled = self.disable_sync();
            #[cfg(feature = "log")]
            if _disabled.is_err() {
                warn!("arm rollback: peripheral did not disable in time");
            }
            return Err(e);
        }
        self.dma.issue_pending();

        self.refresh(chunk_count);

        let regs = &self.regs;
        let started = poll_until(
            &mut self.delay,
            self.timeouts.start_us,
            self.timeouts.poll_interval_us,
            || regs.is_active(),
        );
        if started.is_err() {
            #[cfg(feature = "log")]
            warn!("peripheral did not report active after start");
            self.dma.terminate();
            let _disabled = self.disable_sync();
            #[cfg(feature = "log")]
            if _disabled.is_err() {
                warn!("arm rollback: peripheral did not disable in time");
            }
            return Err(ControllerError::DidNotStart);
        }

        self.buffer.reset_index();
        self.completions_since_refresh = 0;
        self.armed = Some(direction);
        self.counters.arms = self.counters.arms.wrapping_add(1);
        Ok(())
    }

    /// Reprogram the transfer length and reassert start without touching
    /// the cyclic descriptor.
    pub fn refresh(&mut self, chunk_count: u32) {
        #[cfg(feature = "log")]
        trace!("refresh, count {chunk_count}");

        self.regs
            .set_transfer_count(self.transfer_multiplier.wrapping_mul(chunk_count));
        self.regs.start();
        self.completions_since_refresh = 0;
        self.counters.refreshes = self.counters.refreshes.wrapping_add(1);
    }

    /// Terminate the DMA, disable the peripheral and restore the stored
    /// settings. Safe to call when nothing is armed.
    ///
    /// # Errors
    /// `DisableTimeout` if the peripheral did not disable in time. The rest
    /// of the teardown has still been done.
    pub fn stop(&mut self) -> ControllerResult<()> {
        self.dma.terminate();
        self.armed = None;

        let disabled = self.disable_sync();
        #[cfg(feature = "log")]
        if disabled.is_err() {
            warn!("stop: peripheral did not disable in time");
        }

        self.regs.apply_settings(&self.settings);
        disabled
    }

    /// Disable and wait for the enable flag to drop
    fn disable_sync(&mut self) -> ControllerResult<()> {
        self.regs.disable();
        let regs = &self.regs;
        poll_until(
            &mut self.delay,
            self.timeouts.disable_us,
            self.timeouts.poll_interval_us,
            || !regs.is_enabled(),
        )
        .map_err(|TimedOut| ControllerError::DisableTimeout)
    }

    /// Wait for the current programmed run to finish
    pub fn wait_idle(&mut self) -> Result<(), TimedOut> {
        let regs = &self.regs;
        poll_until(
            &mut self.delay,
            self.timeouts.tx_idle_us,
            self.timeouts.poll_interval_us,
            || !regs.is_active(),
        )
    }

    /// Count one completion; returns `true` once the transfer multiplier is
    /// reached and a refresh is due.
    pub fn note_completion(&mut self) -> bool {
        self.completions_since_refresh = self.completions_since_refresh.saturating_add(1);
        self.completions_since_refresh >= self.transfer_multiplier
    }

    /// Account for `count` completions handled without the controller: the
    /// chunk index and the refresh pacing move past them.
    pub fn skip_completions(&mut self, count: u32) {
        self.buffer.advance_by(count);
        self.completions_since_refresh = self.completions_since_refresh.saturating_add(count);
    }

    /// Drive the address lines
    pub fn set_address(&mut self, selector: AddressSelector) {
        self.regs.set_address(selector);
        self.counters.reprograms = self.counters.reprograms.wrapping_add(1);
    }

    /// Peripheral busy status
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.regs.is_active()
    }

    /// Direction of the armed transfer, if any
    #[must_use]
    pub const fn armed(&self) -> Option<TransferDirection> {
        self.armed
    }

    /// Settings currently held in the registers
    #[must_use]
    pub fn read_settings(&self) -> PeripheralSettings {
        self.regs.read_settings()
    }

    /// Program new settings and keep them as the restore point
    pub fn write_settings(&mut self, settings: PeripheralSettings) {
        self.regs.apply_settings(&settings);
        self.settings = settings;
    }

    /// Shared cyclic buffer
    pub fn buffer(&self) -> &CyclicBuffer {
        &self.buffer
    }

    /// Mutable shared cyclic buffer
    pub fn buffer_mut(&mut self) -> &mut CyclicBuffer {
        &mut self.buffer
    }

    /// Counter snapshot
    #[must_use]
    pub const fn counters(&self) -> ControllerCounters {
        self.counters
    }

    /// DMA channel, for inspection
    pub fn dma(&self) -> &C {
        &self.dma
    }

    /// Register block, for inspection
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Register block, for platform fixups
    pub fn registers_mut(&mut self) -> &mut R {
        &mut self.regs
    }
}

// =============================================================================
// Tests
// =============================================================================
