//! Peripheral register block interface.
//!
//! Bit positions stay with the platform; the engine only needs the
//! handshake operations below.

use crate::driver::state::AddressSelector;

/// Bus width of the parallel interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataWidth {
    /// 8-bit bus
    #[default]
    Bits8,
    /// 16-bit bus
    Bits16,
    /// 18-bit bus
    Bits18,
    /// 9-bit bus
    Bits9,
}

/// Low-level peripheral timing and DMA settings, passed through unchanged
/// by the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeripheralSettings {
    /// Bus width
    pub data_width: DataWidth,
    /// Pack multiple bus cycles into one 32-bit FIFO word
    pub pack_data: bool,
    /// Read setup time, in peripheral clock cycles
    pub read_setup_time: u8,
    /// Read hold time
    pub read_hold_time: u8,
    /// Read pace time
    pub read_pace_time: u8,
    /// Read strobe time
    pub read_strobe_time: u8,
    /// Write setup time
    pub write_setup_time: u8,
    /// Write hold time
    pub write_hold_time: u8,
    /// Write pace time
    pub write_pace_time: u8,
    /// Write strobe time
    pub write_strobe_time: u8,
    /// Raise DMA requests from the FIFO
    pub dma_enable: bool,
    /// DMA passthrough mode
    pub dma_passthrough_enable: bool,
    /// FIFO level raising a read DMA request
    pub dma_read_thresh: u8,
    /// FIFO level raising a write DMA request
    pub dma_write_thresh: u8,
    /// FIFO level raising a read panic request
    pub dma_panic_read_thresh: u8,
    /// FIFO level raising a write panic request
    pub dma_panic_write_thresh: u8,
}

/// Register block of the streaming peripheral.
///
/// All methods are plain register accesses and must not block.
pub trait StreamRegisters {
    /// Clear the enable and write flags
    fn disable(&mut self);

    /// Set the enable flag, plus the write flag when `write`
    fn enable(&mut self, write: bool);

    /// Request a FIFO clear, applied with the next enable
    fn clear_fifo(&mut self);

    /// Enable flag as seen by the hardware
    fn is_enabled(&self) -> bool;

    /// Whether a programmed transfer is in progress
    fn is_active(&self) -> bool;

    /// Program the transfer length register
    fn set_transfer_count(&mut self, count: u32);

    /// Assert the start flag
    fn start(&mut self);

    /// Drive the address lines
    fn set_address(&mut self, selector: AddressSelector);

    /// Decode the current settings from the registers
    fn read_settings(&self) -> PeripheralSettings;

    /// Program the registers from `settings`
    fn apply_settings(&mut self, settings: &PeripheralSettings);
}
