//! Test utilities for host-based unit testing
//!
//! Mock implementations of the register block, the cyclic DMA channel and
//! the delay provider, so the engine logic can run without hardware.

use alloc::vec::Vec;

use crate::driver::config::{StreamConfig, TimeoutConfig};
use crate::driver::engine::StreamEngine;
use crate::driver::error::{ControllerError, ControllerResult, Result};
use crate::driver::state::AddressSelector;
use crate::hal::dma::{CyclicDma, DmaRegion, TransferDirection};
use crate::hal::registers::{PeripheralSettings, StreamRegisters};

// =============================================================================
// Mock Registers
// =============================================================================

/// Simulated peripheral.
///
/// `start` makes the peripheral active while it is enabled, `disable` clears
/// both flags. Faults can pin either flag.
#[derive(Debug, Default)]
pub struct MockRegisters {
    enabled: bool,
    write: bool,
    active: bool,
    stuck_enabled: bool,
    stuck_active: bool,
    latch_enable: bool,
    never_start: bool,
    count_history: Vec<u32>,
    address_history: Vec<u8>,
    fifo_clears: u32,
    starts: u32,
    settings: PeripheralSettings,
    settings_applied: u32,
}

impl MockRegisters {
    /// Idle, healthy peripheral
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable flag asserted and ignoring disable requests
    pub fn set_stuck_enabled(&mut self, stuck: bool) {
        self.stuck_enabled = stuck;
        if stuck {
            self.enabled = true;
        }
    }

    /// Active flag asserted and ignoring disable requests
    pub fn set_stuck_active(&mut self, stuck: bool) {
        self.stuck_active = stuck;
        if stuck {
            self.active = true;
        }
    }

    /// Once enabled, the enable flag ignores disable requests
    pub fn set_latch_enable(&mut self, latch: bool) {
        self.latch_enable = latch;
    }

    /// Start requests never make the peripheral active
    pub fn set_never_start(&mut self, never: bool) {
        self.never_start = never;
    }

    /// Write flag as last enabled
    pub fn write_flag(&self) -> bool {
        self.write
    }

    /// Every transfer count programmed, oldest first
    pub fn count_history(&self) -> &[u32] {
        &self.count_history
    }

    /// Every selector written, oldest first
    pub fn address_history(&self) -> &[u8] {
        &self.address_history
    }

    /// Last selector written
    pub fn address(&self) -> u8 {
        self.address_history.last().copied().unwrap_or(0)
    }

    /// FIFO clear requests
    pub fn fifo_clears(&self) -> u32 {
        self.fifo_clears
    }

    /// Start requests
    pub fn starts(&self) -> u32 {
        self.starts
    }

    /// Settings writes
    pub fn settings_applied(&self) -> u32 {
        self.settings_applied
    }
}

impl StreamRegisters for MockRegisters {
    fn disable(&mut self) {
        if !self.stuck_enabled {
            self.enabled = false;
        }
        self.write = false;
        if !self.stuck_active {
            self.active = false;
        }
    }

    fn enable(&mut self, write: bool) {
        self.enabled = true;
        if self.latch_enable {
            self.stuck_enabled = true;
        }
        self.write = write;
    }

    fn clear_fifo(&mut self) {
        self.fifo_clears += 1;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_transfer_count(&mut self, count: u32) {
        self.count_history.push(count);
    }

    fn start(&mut self) {
        self.starts += 1;
        if self.enabled && !self.never_start {
            self.active = true;
        }
    }

    fn set_address(&mut self, selector: AddressSelector) {
        self.address_history.push(selector.bits());
    }

    fn read_settings(&self) -> PeripheralSettings {
        self.settings
    }

    fn apply_settings(&mut self, settings: &PeripheralSettings) {
        self.settings = *settings;
        self.settings_applied += 1;
    }
}

// =============================================================================
// Mock DMA
// =============================================================================

/// Simulated cyclic DMA channel
#[derive(Debug, Default)]
pub struct MockDma {
    submissions: u32,
    issued: u32,
    terminations: u32,
    running: u32,
    max_running: u32,
    fail_next: bool,
    last_region_len: Option<usize>,
    last_direction: Option<TransferDirection>,
}

impl MockDma {
    /// Healthy channel
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next submission
    pub fn fail_next_submit(&mut self) {
        self.fail_next = true;
    }

    /// Successful submissions
    pub fn submissions(&self) -> u32 {
        self.submissions
    }

    /// Issue-pending calls
    pub fn issued(&self) -> u32 {
        self.issued
    }

    /// Terminate calls
    pub fn terminations(&self) -> u32 {
        self.terminations
    }

    /// Most descriptors ever live at once
    pub fn max_running(&self) -> u32 {
        self.max_running
    }

    /// Length of the last submitted region
    pub fn last_region_len(&self) -> Option<usize> {
        self.last_region_len
    }

    /// Direction of the last submission
    pub fn last_direction(&self) -> Option<TransferDirection> {
        self.last_direction
    }
}

impl CyclicDma for MockDma {
    fn submit_cyclic(
        &mut self,
        region: DmaRegion,
        direction: TransferDirection,
    ) -> ControllerResult<()> {
        if self.fail_next {
            self.fail_next = false;
            return Err(ControllerError::SubmissionFailed);
        }
        self.submissions += 1;
        self.running += 1;
        self.max_running = self.max_running.max(self.running);
        self.last_region_len = Some(region.len);
        self.last_direction = Some(direction);
        Ok(())
    }

    fn issue_pending(&mut self) {
        self.issued += 1;
    }

    fn terminate(&mut self) {
        self.terminations += 1;
        self.running = 0;
    }
}

// =============================================================================
// Mock Delay
// =============================================================================

/// Mock delay that records the total time requested
#[derive(Debug, Default)]
pub struct MockDelay {
    total_ns: u64,
}

impl MockDelay {
    /// Create a new mock delay
    pub fn new() -> Self {
        Self::default()
    }

    /// Total nanoseconds that were "delayed"
    pub fn total_ns(&self) -> u64 {
        self.total_ns
    }
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

// =============================================================================
// Engine Fixtures
// =============================================================================

/// Engine over the mocks
pub type TestEngine = StreamEngine<MockRegisters, MockDma, MockDelay>;

/// Small geometry: 4 slots of 64 bytes, default multiplier, short timeouts
pub fn test_config() -> StreamConfig {
    StreamConfig::new()
        .with_native_buffer(256, 4)
        .with_timeouts(TimeoutConfig {
            disable_us: 20,
            start_us: 20,
            tx_idle_us: 20,
            poll_interval_us: 1,
        })
}

/// Engine with [`test_config`] and healthy mocks
pub fn test_engine() -> TestEngine {
    match test_engine_with(test_config(), |_, _| {}) {
        Ok(engine) => engine,
        Err(e) => panic!("test engine: {e}"),
    }
}

/// Engine with `config` and mocks adjusted by `setup`
pub fn test_engine_with(
    config: StreamConfig,
    setup: impl FnOnce(&mut MockRegisters, &mut MockDma),
) -> Result<TestEngine> {
    let mut regs = MockRegisters::new();
    let mut dma = MockDma::new();
    setup(&mut regs, &mut dma);
    StreamEngine::new(regs, dma, MockDelay::new(), config)
}

/// Fill one cyclic buffer slot as if the hardware had received `byte`s
pub fn fill_rx_slot(engine: &TestEngine, slot: usize, byte: u8) {
    engine.with_controller(|ctrl| ctrl.buffer_mut().slot_mut(slot).fill(byte));
}
