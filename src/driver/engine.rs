//! Stream engine: state machine, session lifecycle and shared state.
//!
//! One [`StreamEngine`] owns one peripheral. It is shared by reference
//! between process context (through [`StreamSession`]) and the platform's
//! DMA completion interrupt (through
//! [`on_chunk_complete`](StreamEngine::on_chunk_complete)), so every field
//! is either atomic or behind a `spin::Mutex`.
//!
//! Lock order is state, then controller, then a ring. The completion path
//! never waits on any of them.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use embedded_hal::delay::DelayNs;
use spin::{Mutex, MutexGuard};

#[cfg(feature = "log")]
use log::{info, warn};

use super::config::{StreamConfig, Tunables};
use super::error::{ConfigError, ControllerResult, Result, StreamError, StreamResult};
use super::session::StreamSession;
use super::state::{AddressSelector, StreamState};
use crate::hal::controller::TransferController;
use crate::hal::dma::{CyclicDma, TransferDirection};
use crate::hal::registers::StreamRegisters;
use crate::internal::cyclic::CyclicBuffer;
use crate::internal::ring::ByteRing;
use crate::sync::primitives::lock_interruptible;
use crate::sync::readiness::{CompletionSemaphore, Readiness};

/// Counter snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamStats {
    /// Chunks dropped on RX overrun or sent stale on TX underrun since the
    /// session was opened
    pub missed_chunks: u32,
    /// Completions handled by the completion path
    pub completed_chunks: u32,
    /// Transfer count refreshes issued
    pub refreshes: u32,
    /// Address selector writes
    pub reprograms: u32,
    /// Cyclic transfers armed
    pub arms: u32,
}

/// Streaming engine for one peripheral
pub struct StreamEngine<R, C, D> {
    pub(super) config: StreamConfig,
    pub(super) tunables: Mutex<Tunables>,
    pub(super) state: Mutex<StreamState>,
    pub(super) controller: Mutex<TransferController<R, C, D>>,
    pub(super) rx: Mutex<Option<ByteRing>>,
    pub(super) tx: Mutex<Option<ByteRing>>,
    pub(super) readiness: Readiness,
    pub(super) semaphore: CompletionSemaphore,
    open: AtomicBool,
    interrupt: AtomicBool,
    pub(super) missed: AtomicU32,
    pub(super) completed: AtomicU32,
    /// Completions that found the controller locked, not yet skipped
    pub(super) lagged: AtomicU32,
}

impl<R, C, D> StreamEngine<R, C, D>
where
    R: StreamRegisters,
    C: CyclicDma,
    D: DelayNs,
{
    /// Build an engine around the platform hardware.
    ///
    /// Validates `config`, allocates the cyclic buffer and drives the address
    /// lines to the idle selector.
    ///
    /// # Errors
    /// `InvalidParameter` for a rejected configuration, `OutOfMemory` if the
    /// cyclic buffer cannot be allocated.
    pub fn new(regs: R, dma: C, delay: D, config: StreamConfig) -> Result<Self> {
        config.validate()?;

        let buffer = CyclicBuffer::new(config.slot_count, config.chunk_size())?;
        let tunables = Tunables::from_config(&config);
        let mut controller = TransferController::new(regs, dma, delay, buffer, &config);
        controller.set_address(selector_for(StreamState::Idle, &tunables));

        #[cfg(feature = "log")]
        info!(
            "stream engine ready: buffer {} bytes in {} slots, fifo x{}, dir offset {}, ch offset {}",
            config.native_buffer_size,
            config.slot_count,
            tunables.fifo_multiplier,
            tunables.addr_dir_offset.to_raw(),
            tunables.addr_ch_offset.to_raw()
        );

        Ok(Self {
            config,
            tunables: Mutex::new(tunables),
            state: Mutex::new(StreamState::Idle),
            controller: Mutex::new(controller),
            rx: Mutex::new(None),
            tx: Mutex::new(None),
            readiness: Readiness::new(),
            semaphore: CompletionSemaphore::new(config.completion_credits),
            open: AtomicBool::new(false),
            interrupt: AtomicBool::new(false),
            missed: AtomicU32::new(0),
            completed: AtomicU32::new(0),
            lagged: AtomicU32::new(0),
        })
    }

    // =========================================================================
    // Session Lifecycle
    // =========================================================================

    /// Open the single stream session.
    ///
    /// Allocates both rings at `fifo_multiplier × chunk_size` bytes
    /// and starts in [`StreamState::Idle`]: transitions are refused while
    /// no session is open and close always ends idle.
    ///
    /// # Errors
    /// - `Busy` if a session is already open
    /// - `OutOfMemory` if a ring cannot be allocated; nothing is left open
    /// - `Interrupted` if waiting for a lock was aborted
    pub fn open(&self) -> Result<StreamSession<'_, R, C, D>> {
        if self.open.swap(true, Ordering::AcqRel) {
            return Err(StreamError::Busy.into());
        }

        if let Err(e) = self.open_rings() {
            self.open.store(false, Ordering::Release);
            return Err(e);
        }

        self.missed.store(0, Ordering::Release);
        self.semaphore.reset();
        self.readiness.clear();

        #[cfg(feature = "log")]
        info!("stream session opened");

        Ok(StreamSession::new(self))
    }

    fn open_rings(&self) -> Result<()> {
        let multiplier = self.acquire(&self.tunables)?.fifo_multiplier;
        let capacity = (multiplier as usize)
            .checked_mul(self.chunk_size())
            .ok_or(ConfigError::OutOfMemory)?;

        let rx = ByteRing::with_capacity(capacity)?;
        let tx = ByteRing::with_capacity(capacity)?;

        *self.acquire(&self.rx)? = Some(rx);
        *self.acquire(&self.tx)? = Some(tx);
        Ok(())
    }

    /// Tear down the open session: force idle, then free both rings.
    ///
    /// Runs to completion even if the peripheral misbehaves; a disable
    /// timeout during the teardown is returned after the rings are freed.
    pub(super) fn close(&self) -> Result<()> {
        let stopped = {
            let mut state = self.state.lock();
            let tunables = *self.tunables.lock();
            let mut ctrl = self.controller.lock();
            let stopped = ctrl.stop();
            ctrl.set_address(selector_for(StreamState::Idle, &tunables));
            *state = StreamState::Idle;
            stopped
        };
        self.semaphore.reset();

        *self.rx.lock() = None;
        *self.tx.lock() = None;
        self.readiness.clear();
        self.readiness.wake_all();
        self.open.store(false, Ordering::Release);

        #[cfg(feature = "log")]
        info!(
            "stream session closed, missed {} chunks",
            self.missed.load(Ordering::Relaxed)
        );

        stopped.map_err(Into::into)
    }

    /// Whether a session is open
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    // =========================================================================
    // State Machine
    // =========================================================================

    /// Switch the peripheral to `new`.
    ///
    /// Any running transfer is stopped and the idle selector is driven before
    /// anything else. Receive states arm a cyclic transfer immediately;
    /// the transmit state only clears the TX ring and leaves arming to the
    /// write path.
    ///
    /// # Errors
    /// - `NotOpen` without an open session; the state stays `Idle`
    /// - `Busy` if the peripheral is still active after the stop; the state
    ///   is left at `Idle`
    /// - a controller error if arming a receive transfer failed; the state
    ///   is rolled back to `Idle`
    /// - `Interrupted` if waiting for a lock was aborted
    pub fn set_state(&self, new: StreamState) -> Result<()> {
        if !self.is_open() {
            return Err(StreamError::NotOpen.into());
        }
        let mut state = self.acquire(&self.state)?;
        if *state == new {
            return Ok(());
        }

        #[cfg(feature = "log")]
        info!("stream state {:?} -> {:?}", *state, new);

        let tunables = *self.acquire(&self.tunables)?;
        let mut ctrl = self.acquire(&self.controller)?;

        if let Err(_e) = ctrl.stop() {
            #[cfg(feature = "log")]
            warn!("set_state: {_e}, continuing to idle");
        }
        self.semaphore.reset();
        ctrl.set_address(selector_for(StreamState::Idle, &tunables));
        *state = StreamState::Idle;

        if ctrl.is_active() {
            #[cfg(feature = "log")]
            warn!("set_state: peripheral still active, staying idle");
            return Err(StreamError::Busy.into());
        }

        match new {
            StreamState::Idle => Ok(()),
            StreamState::TxChannel => {
                {
                    let mut tx = self.acquire(&self.tx)?;
                    if let Some(ring) = tx.as_mut() {
                        ring.flush();
                    }
                }
                ctrl.set_address(selector_for(new, &tunables));
                *state = new;
                self.readiness.signal_writeable();
                Ok(())
            }
            StreamState::RxChannel0 | StreamState::RxChannel1 => {
                ctrl.set_address(selector_for(new, &tunables));
                match self.arm(&mut ctrl, TransferDirection::DeviceToMemory) {
                    Ok(()) => {
                        *state = new;
                        Ok(())
                    }
                    Err(e) => {
                        #[cfg(feature = "log")]
                        warn!("set_state: arming receive failed: {e}");
                        ctrl.set_address(selector_for(StreamState::Idle, &tunables));
                        Err(e.into())
                    }
                }
            }
        }
    }

    /// Current state
    pub fn state(&self) -> StreamState {
        *self.state.lock()
    }

    /// Arm the transmit transfer once a full chunk is waiting, if the state
    /// is [`StreamState::TxChannel`] and nothing is armed yet.
    pub(super) fn arm_transmit_if_ready(&self) -> Result<()> {
        let state = self.acquire(&self.state)?;
        if *state != StreamState::TxChannel {
            return Ok(());
        }
        let mut ctrl = self.acquire(&self.controller)?;
        if ctrl.armed().is_some() {
            return Ok(());
        }

        let buffered = self.acquire(&self.tx)?.as_ref().map_or(0, ByteRing::len);
        if buffered < self.chunk_size() {
            return Ok(());
        }

        self.semaphore.reset();
        self.arm(&mut ctrl, TransferDirection::MemoryToDevice)?;
        Ok(())
    }

    /// Arm a fresh cyclic transfer; completions lagged from an earlier
    /// transfer no longer apply.
    fn arm(
        &self,
        ctrl: &mut TransferController<R, C, D>,
        direction: TransferDirection,
    ) -> ControllerResult<()> {
        ctrl.arm(direction, self.transfer_count())?;
        self.lagged.store(0, Ordering::Release);
        Ok(())
    }

    /// Resume a refresh withheld because the completion credits ran out
    pub(super) fn acknowledge_completions(&self) -> Result<()> {
        if self.semaphore.acknowledge() {
            let mut ctrl = self.acquire(&self.controller)?;
            if ctrl.armed().is_some() {
                ctrl.refresh(self.transfer_count());
            }
        }
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Abort the next contended lock wait in process context with
    /// `Interrupted`.
    pub fn interrupt(&self) {
        self.interrupt.store(true, Ordering::Release);
    }

    /// Configuration the engine was built with
    pub const fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Current runtime tunables
    pub fn tunables(&self) -> Tunables {
        *self.tunables.lock()
    }

    /// Bytes per cyclic buffer slot
    pub const fn chunk_size(&self) -> usize {
        self.config.chunk_size()
    }

    /// Counter snapshot
    pub fn stats(&self) -> StreamStats {
        let counters = self.controller.lock().counters();
        StreamStats {
            missed_chunks: self.missed.load(Ordering::Acquire),
            completed_chunks: self.completed.load(Ordering::Acquire),
            refreshes: counters.refreshes,
            reprograms: counters.reprograms,
            arms: counters.arms,
        }
    }

    /// Run `f` with the controller locked
    pub fn with_controller<T>(&self, f: impl FnOnce(&mut TransferController<R, C, D>) -> T) -> T {
        f(&mut self.controller.lock())
    }

    /// Transfers per chunk, programmed on arm and refresh
    pub(super) const fn transfer_count(&self) -> u32 {
        self.config.chunk_size() as u32
    }

    pub(super) fn acquire<'a, T>(&'a self, mutex: &'a Mutex<T>) -> StreamResult<MutexGuard<'a, T>> {
        lock_interruptible(mutex, &self.interrupt)
    }

    pub(super) fn count_missed(&self) {
        self.missed.fetch_add(1, Ordering::AcqRel);
    }
}

pub(super) const fn selector_for(state: StreamState, tunables: &Tunables) -> AddressSelector {
    AddressSelector::from_state(state, tunables.addr_dir_offset, tunables.addr_ch_offset)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::error::{ControllerError, Error};
    use crate::testing::{TestEngine, test_config, test_engine, test_engine_with};

    #[test]
    fn new_rejects_invalid_config() {
        let config = test_config().with_fifo_multiplier(1);
        assert!(matches!(
            test_engine_with(config, |_, _| {}),
            Err(Error::Config(ConfigError::InvalidParameter))
        ));
    }

    #[test]
    fn new_drives_idle_selector() {
        let engine = test_engine();
        assert_eq!(engine.state(), StreamState::Idle);
        engine.with_controller(|ctrl| {
            assert_eq!(ctrl.registers().address(), 0);
        });
    }

    #[test]
    fn transitions_refused_without_session() {
        let engine = test_engine();

        assert_eq!(
            engine.set_state(StreamState::RxChannel0),
            Err(Error::Stream(StreamError::NotOpen))
        );
        assert_eq!(engine.state(), StreamState::Idle);
        assert_eq!(engine.stats().arms, 0);

        let session = engine.open().unwrap();
        assert_eq!(session.state(), StreamState::Idle);
        engine.with_controller(|ctrl| assert_eq!(ctrl.armed(), None));
    }

    #[test]
    fn reopened_session_starts_idle() {
        let engine = test_engine();
        let session = engine.open().unwrap();
        session.set_state(StreamState::RxChannel1).unwrap();
        drop(session);

        let session = engine.open().unwrap();
        assert_eq!(session.state(), StreamState::Idle);
        engine.with_controller(|ctrl| {
            assert_eq!(ctrl.armed(), None);
            assert_eq!(ctrl.registers().address(), 0);
        });
    }

    #[test]
    fn only_one_session_at_a_time() {
        let engine = test_engine();
        let session = engine.open().unwrap();
        assert!(matches!(engine.open(), Err(Error::Stream(StreamError::Busy))));

        drop(session);
        assert!(!engine.is_open());
        assert!(engine.open().is_ok());
    }

    #[test]
    fn open_sizes_rings_from_multiplier() {
        let engine = test_engine();
        let _session = engine.open().unwrap();
        let expected = 6 * engine.chunk_size();
        assert_eq!(engine.rx.lock().as_ref().map(ByteRing::capacity), Some(expected));
        assert_eq!(engine.tx.lock().as_ref().map(ByteRing::capacity), Some(expected));
    }

    #[test]
    fn receive_state_arms_immediately() {
        let engine = test_engine();
        let session = engine.open().unwrap();

        session.set_state(StreamState::RxChannel0).unwrap();

        assert_eq!(session.state(), StreamState::RxChannel0);
        engine.with_controller(|ctrl| {
            assert_eq!(ctrl.armed(), Some(TransferDirection::DeviceToMemory));
            assert_eq!(ctrl.registers().address(), 0b0100);
            assert_eq!(
                ctrl.dma().last_direction(),
                Some(TransferDirection::DeviceToMemory)
            );
        });
        assert_eq!(engine.stats().arms, 1);
    }

    #[test]
    fn transmit_state_defers_arming() {
        let engine = test_engine();
        let session = engine.open().unwrap();

        session.set_state(StreamState::TxChannel).unwrap();

        assert_eq!(session.state(), StreamState::TxChannel);
        engine.with_controller(|ctrl| {
            assert_eq!(ctrl.armed(), None);
            assert_eq!(ctrl.registers().address(), 0);
        });
        assert_eq!(engine.stats().arms, 0);
    }

    #[test]
    fn repeated_state_is_a_no_op() {
        let engine = test_engine();
        let session = engine.open().unwrap();

        session.set_state(StreamState::RxChannel0).unwrap();
        let before = engine.stats();
        session.set_state(StreamState::RxChannel0).unwrap();
        let after = engine.stats();

        assert_eq!(before.reprograms, after.reprograms);
        assert_eq!(before.arms, after.arms);
        assert_eq!(session.state(), StreamState::RxChannel0);
    }

    #[test]
    fn switching_channels_passes_through_idle() {
        let engine = test_engine();
        let session = engine.open().unwrap();

        session.set_state(StreamState::RxChannel0).unwrap();
        session.set_state(StreamState::RxChannel1).unwrap();

        engine.with_controller(|ctrl| {
            let regs = ctrl.registers();
            // construction, idle, rx0, idle, rx1
            assert_eq!(regs.address_history(), &[0, 0, 0b0100, 0, 0b1100]);
            assert_eq!(ctrl.dma().max_running(), 1);
        });
        assert_eq!(engine.stats().arms, 2);
    }

    #[test]
    fn stuck_active_peripheral_reports_busy_then_idle_succeeds() {
        let engine = test_engine();
        let session = engine.open().unwrap();
        session.set_state(StreamState::RxChannel0).unwrap();

        engine.with_controller(|ctrl| ctrl.registers_mut().set_stuck_active(true));

        let err = session.set_state(StreamState::TxChannel).unwrap_err();
        assert!(err.is_busy());
        assert_eq!(session.state(), StreamState::Idle);
        engine.with_controller(|ctrl| {
            assert_eq!(ctrl.armed(), None);
            assert_eq!(ctrl.registers().address(), 0);
        });

        assert!(session.set_state(StreamState::Idle).is_ok());
    }

    #[test]
    fn failed_receive_arm_rolls_back_to_idle() {
        let engine = test_engine_with(test_config(), |regs, _| regs.set_never_start(true)).unwrap();
        let session = engine.open().unwrap();

        let err = session.set_state(StreamState::RxChannel1).unwrap_err();
        assert_eq!(err, Error::Controller(ControllerError::DidNotStart));
        assert!(err.is_hardware_timeout());
        assert_eq!(session.state(), StreamState::Idle);
        engine.with_controller(|ctrl| assert_eq!(ctrl.registers().address(), 0));
    }

    #[test]
    fn failed_submission_rolls_back_to_idle() {
        let engine = test_engine_with(test_config(), |_, dma| dma.fail_next_submit()).unwrap();
        let session = engine.open().unwrap();

        assert_eq!(
            session.set_state(StreamState::RxChannel0),
            Err(Error::Controller(ControllerError::SubmissionFailed))
        );
        assert_eq!(session.state(), StreamState::Idle);

        // Next attempt succeeds
        session.set_state(StreamState::RxChannel0).unwrap();
        assert_eq!(session.state(), StreamState::RxChannel0);
    }

    #[test]
    fn interrupt_aborts_contended_transition() {
        let engine = test_engine();
        let session = engine.open().unwrap();

        let held = engine.state.lock();
        engine.interrupt();
        assert_eq!(
            session.set_state(StreamState::RxChannel0),
            Err(Error::Stream(StreamError::Interrupted))
        );
        drop(held);

        assert_eq!(session.state(), StreamState::Idle);
        session.set_state(StreamState::RxChannel0).unwrap();
    }

    #[test]
    fn close_stops_hardware_and_frees_rings() {
        let engine = test_engine();
        let session = engine.open().unwrap();
        session.set_state(StreamState::RxChannel0).unwrap();

        session.close().unwrap();

        assert_eq!(engine.state(), StreamState::Idle);
        assert!(engine.rx.lock().is_none());
        assert!(engine.tx.lock().is_none());
        engine.with_controller(|ctrl| {
            assert_eq!(ctrl.armed(), None);
            assert!(ctrl.dma().terminations() >= 1);
        });
    }

    #[test]
    fn offsets_take_effect_at_next_transition() {
        let engine: TestEngine = test_engine();
        let session = engine.open().unwrap();

        engine.tunables.lock().set_addr_dir_offset(0).unwrap();
        session.set_state(StreamState::RxChannel0).unwrap();

        engine.with_controller(|ctrl| assert_eq!(ctrl.registers().address(), 0b0001));
    }
}
