//! Chunk completion handling.
//!
//! Runs in interrupt context once per completed chunk. Nothing here waits
//! on a lock: the controller and the rings are only `try_lock`ed, and a lost
//! race counts the chunk as missed.

use core::sync::atomic::Ordering;

use embedded_hal::delay::DelayNs;

#[cfg(feature = "log")]
use log::{debug, warn};

use super::config::TxUnderrunPolicy;
use super::engine::StreamEngine;
use crate::hal::controller::TransferController;
use crate::hal::dma::{CyclicDma, TransferDirection};
use crate::hal::registers::StreamRegisters;
#[cfg(feature = "log")]
use crate::internal::constants::{RX_DIAG_INTERVAL, TX_DIAG_INTERVAL};

impl<R, C, D> StreamEngine<R, C, D>
where
    R: StreamRegisters,
    C: CyclicDma,
    D: DelayNs,
{
    /// Handle one completed chunk.
    ///
    /// Call from the platform's DMA completion interrupt. Dispatches on the
    /// direction of the armed transfer and ignores completions that arrive
    /// with nothing armed.
    ///
    /// A completion that finds the controller locked is counted as missed
    /// and its chunk index is skipped by the next completion, so slots stay
    /// in step with the hardware.
    pub fn on_chunk_complete(&self) {
        let Some(mut ctrl) = self.controller.try_lock() else {
            self.count_missed();
            self.lagged.fetch_add(1, Ordering::AcqRel);
            return;
        };

        let lagged = self.lagged.swap(0, Ordering::AcqRel);
        if lagged > 0 && ctrl.armed().is_some() {
            ctrl.skip_completions(lagged);
        }

        match ctrl.armed() {
            Some(TransferDirection::DeviceToMemory) => self.complete_receive(&mut ctrl),
            Some(TransferDirection::MemoryToDevice) => self.complete_transmit(&mut ctrl),
            None => return,
        }
        self.completed.fetch_add(1, Ordering::AcqRel);
    }

    fn complete_receive(&self, ctrl: &mut TransferController<R, C, D>) {
        self.refresh_unless_saturated(ctrl);

        let slot = ctrl.buffer().current_slot();
        let stored = self.rx.try_lock().is_some_and(|mut rx| {
            rx.as_mut()
                .is_some_and(|ring| ring.push_chunk(ctrl.buffer().slot(slot)))
        });
        if !stored {
            self.count_missed();
        }

        #[cfg(feature = "log")]
        if ctrl.buffer().index() % RX_DIAG_INTERVAL == 0 {
            debug!(
                "rx chunk {}: missed {}, pending completions {}",
                ctrl.buffer().index(),
                self.missed.load(Ordering::Relaxed),
                self.semaphore.pending()
            );
        }

        self.semaphore.release();
        self.readiness.signal_readable();
        ctrl.buffer_mut().advance();
    }

    fn complete_transmit(&self, ctrl: &mut TransferController<R, C, D>) {
        if ctrl.note_completion() {
            if self.semaphore.is_saturated() {
                self.semaphore.mark_stalled();
            } else {
                let _idle = ctrl.wait_idle();
                #[cfg(feature = "log")]
                if _idle.is_err() {
                    warn!("tx refresh: peripheral still active after idle wait");
                }
                ctrl.refresh(self.transfer_count());
            }
        }

        ctrl.buffer_mut().advance();
        let slot = ctrl.buffer().current_slot();
        let chunk_size = self.chunk_size();

        let filled = self.tx.try_lock().is_some_and(|mut tx| match tx.as_mut() {
            Some(ring) if ring.len() >= chunk_size => {
                ring.pop_into(ctrl.buffer_mut().slot_mut(slot));
                true
            }
            _ => false,
        });
        if !filled {
            self.count_missed();
            if self.config.tx_underrun == TxUnderrunPolicy::ZeroFill {
                ctrl.buffer_mut().slot_mut(slot).fill(0);
            }
        }

        #[cfg(feature = "log")]
        if ctrl.buffer().index() % TX_DIAG_INTERVAL == 0 {
            let slot_bytes = ctrl.buffer().slot(slot);
            debug!(
                "tx chunk {}: missed {}, pending completions {}, head {:02x?}",
                ctrl.buffer().index(),
                self.missed.load(Ordering::Relaxed),
                self.semaphore.pending(),
                &slot_bytes[..slot_bytes.len().min(4)]
            );
        }

        self.semaphore.release();
        self.readiness.signal_writeable();
    }

    fn refresh_unless_saturated(&self, ctrl: &mut TransferController<R, C, D>) {
        if self.semaphore.is_saturated() {
            self.semaphore.mark_stalled();
        } else {
            ctrl.refresh(self.transfer_count());
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
