//! Process-facing stream handle.

use core::sync::atomic::Ordering;

use embedded_hal::delay::DelayNs;

#[cfg(feature = "log")]
use log::warn;

use super::control::{ControlRequest, ControlResponse};
use super::engine::{StreamEngine, StreamStats};
use super::error::{Result, StreamError};
use super::state::StreamState;
use crate::hal::dma::CyclicDma;
use crate::hal::registers::StreamRegisters;
use crate::internal::ring::ByteRing;

/// Readiness reported by [`StreamSession::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollFlags {
    /// RX ring holds data
    pub readable: bool,
    /// TX ring has free space
    pub writeable: bool,
}

impl PollFlags {
    /// Bit set when readable
    pub const READABLE: u32 = 1 << 0;
    /// Bit set when writeable
    pub const WRITEABLE: u32 = 1 << 1;

    /// Encode as a bitmask
    #[must_use]
    pub const fn bits(self) -> u32 {
        let mut bits = 0;
        if self.readable {
            bits |= Self::READABLE;
        }
        if self.writeable {
            bits |= Self::WRITEABLE;
        }
        bits
    }
}

/// The open stream.
///
/// Dropping the session closes it: the hardware is stopped and both rings
/// are freed.
pub struct StreamSession<'a, R, C, D>
where
    R: StreamRegisters,
    C: CyclicDma,
    D: DelayNs,
{
    engine: &'a StreamEngine<R, C, D>,
    closed: bool,
}

impl<'a, R, C, D> StreamSession<'a, R, C, D>
where
    R: StreamRegisters,
    C: CyclicDma,
    D: DelayNs,
{
    pub(super) const fn new(engine: &'a StreamEngine<R, C, D>) -> Self {
        Self {
            engine,
            closed: false,
        }
    }

    /// Close explicitly and observe teardown errors.
    ///
    /// # Errors
    /// `DisableTimeout` if the peripheral did not disable in time. The
    /// session is closed regardless.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.engine.close()
    }

    /// Read from the RX ring.
    ///
    /// `None` discards everything buffered and returns 0. Otherwise copies up
    /// to `buf.len()` bytes and returns the count, which is 0 when nothing
    /// is buffered.
    ///
    /// # Errors
    /// `Interrupted` if waiting for the RX lock was aborted.
    pub fn read(&self, buf: Option<&mut [u8]>) -> Result<usize> {
        let Some(buf) = buf else {
            self.flush_rx()?;
            return Ok(0);
        };

        let copied = {
            let mut rx = self.engine.acquire(&self.engine.rx)?;
            let ring = rx.as_mut().ok_or(StreamError::NotOpen)?;
            ring.pop_into(buf)
        };
        self.engine.acknowledge_completions()?;
        Ok(copied)
    }

    /// Queue bytes for transmission. Returns how many were accepted, which
    /// may be fewer than `data.len()` when the TX ring is nearly full.
    ///
    /// Once a full chunk is buffered in the transmit state the cyclic
    /// transmit transfer is armed. A failed arm is logged and retried by the
    /// next write.
    ///
    /// # Errors
    /// `Interrupted` if waiting for the TX lock was aborted.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        let (accepted, buffered) = {
            let mut tx = self.engine.acquire(&self.engine.tx)?;
            let ring = tx.as_mut().ok_or(StreamError::NotOpen)?;
            (ring.push_bytes(data), ring.len())
        };

        if buffered >= self.engine.chunk_size() {
            if let Err(_e) = self.engine.arm_transmit_if_ready() {
                #[cfg(feature = "log")]
                warn!("transmit arm failed, retrying on next write: {_e}");
            }
        }
        self.engine.acknowledge_completions()?;
        Ok(accepted)
    }

    /// Current readiness computed from ring occupancy. Clears the edge
    /// flags set by the completion path.
    pub fn poll(&self) -> PollFlags {
        let _ = self.engine.readiness.take();
        PollFlags {
            readable: self
                .engine
                .rx
                .lock()
                .as_ref()
                .is_some_and(|ring| !ring.is_empty()),
            writeable: self
                .engine
                .tx
                .lock()
                .as_ref()
                .is_some_and(|ring| !ring.is_full()),
        }
    }

    /// Discard all buffered RX data
    pub(super) fn flush_rx(&self) -> Result<()> {
        let mut rx = self.engine.acquire(&self.engine.rx)?;
        if let Some(ring) = rx.as_mut() {
            ring.flush();
        }
        Ok(())
    }

    /// Switch the stream state, see [`StreamEngine::set_state`]
    ///
    /// # Errors
    /// As [`StreamEngine::set_state`].
    pub fn set_state(&self, state: StreamState) -> Result<()> {
        self.engine.set_state(state)
    }

    /// Current stream state
    pub fn state(&self) -> StreamState {
        self.engine.state()
    }

    /// Run a control operation
    ///
    /// # Errors
    /// `InvalidParameter` for an out-of-range value (the previous value is
    /// kept), plus any error of the operation it drives.
    pub fn control(&self, request: ControlRequest) -> Result<ControlResponse> {
        super::control::execute(self, request)
    }

    /// Chunks missed since this session was opened
    pub fn missed_chunks(&self) -> u32 {
        self.engine.missed.load(Ordering::Acquire)
    }

    /// Engine counters
    pub fn stats(&self) -> StreamStats {
        self.engine.stats()
    }

    /// Bytes currently buffered in the RX ring
    pub fn rx_buffered(&self) -> usize {
        self.engine.rx.lock().as_ref().map_or(0, ByteRing::len)
    }

    /// Bytes currently buffered in the TX ring
    pub fn tx_buffered(&self) -> usize {
        self.engine.tx.lock().as_ref().map_or(0, ByteRing::len)
    }

    pub(super) const fn engine(&self) -> &'a StreamEngine<R, C, D> {
        self.engine
    }

    /// Wait until the RX ring holds data
    #[cfg(feature = "async")]
    pub fn readable(&self) -> impl core::future::Future<Output = ()> + '_ {
        let engine = self.engine;
        crate::sync::asynch::ReadyFuture::new(
            move |waker| engine.readiness.register_reader(waker),
            move || {
                engine
                    .rx
                    .try_lock()
                    .is_some_and(|rx| rx.as_ref().is_some_and(|ring| !ring.is_empty()))
            },
        )
    }

    /// Wait until the TX ring has free space
    #[cfg(feature = "async")]
    pub fn writable(&self) -> impl core::future::Future<Output = ()> + '_ {
        let engine = self.engine;
        crate::sync::asynch::ReadyFuture::new(
            move |waker| engine.readiness.register_writer(waker),
            move || {
                engine
                    .tx
                    .try_lock()
                    .is_some_and(|tx| tx.as_ref().is_some_and(|ring| !ring.is_full()))
            },
        )
    }
}

impl<R, C, D> Drop for StreamSession<'_, R, C, D>
where
    R: StreamRegisters,
    C: CyclicDma,
    D: DelayNs,
{
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.engine.close();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
