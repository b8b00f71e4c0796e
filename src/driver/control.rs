//! Control operations: configuration and introspection of an open stream.

use embedded_hal::delay::DelayNs;

#[cfg(feature = "log")]
use log::{info, warn};

use super::error::{ConfigError, ConfigResult, Result};
use super::session::StreamSession;
use super::state::StreamState;
use crate::hal::dma::CyclicDma;
use crate::hal::registers::{PeripheralSettings, StreamRegisters};

/// Raw control codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum ControlCode {
    /// Read peripheral settings
    GetSettings = 0x00,
    /// Write peripheral settings
    WriteSettings = 0x01,
    /// Address request, logged only
    Address = 0x02,
    /// Native chunk size
    GetNativeBufSize = 0x10,
    /// Drive the stream state machine
    SetStreamState = 0x11,
    /// Set the ring buffer multiplier
    SetFifoMultiplier = 0x12,
    /// Read the ring buffer multiplier
    GetFifoMultiplier = 0x13,
    /// Set the direction line offset
    SetAddrDirOffset = 0x14,
    /// Read the direction line offset
    GetAddrDirOffset = 0x15,
    /// Set the channel line offset
    SetAddrChOffset = 0x16,
    /// Read the channel line offset
    GetAddrChOffset = 0x17,
    /// Discard buffered RX data
    FlushFifo = 0x18,
}

impl TryFrom<u32> for ControlCode {
    type Error = ConfigError;

    fn try_from(raw: u32) -> ConfigResult<Self> {
        Ok(match raw {
            0x00 => ControlCode::GetSettings,
            0x01 => ControlCode::WriteSettings,
            0x02 => ControlCode::Address,
            0x10 => ControlCode::GetNativeBufSize,
            0x11 => ControlCode::SetStreamState,
            0x12 => ControlCode::SetFifoMultiplier,
            0x13 => ControlCode::GetFifoMultiplier,
            0x14 => ControlCode::SetAddrDirOffset,
            0x15 => ControlCode::GetAddrDirOffset,
            0x16 => ControlCode::SetAddrChOffset,
            0x17 => ControlCode::GetAddrChOffset,
            0x18 => ControlCode::FlushFifo,
            _ => return Err(ConfigError::UnsupportedOperation),
        })
    }
}

/// A control operation with its argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlRequest {
    /// Read the peripheral settings from the registers
    GetSettings,
    /// Program the peripheral settings and keep them as the restore point
    WriteSettings(PeripheralSettings),
    /// Address request; recorded in the log, the selector is not touched
    Address(u8),
    /// Bytes per hardware chunk, the unit every transfer moves
    GetNativeBufSize,
    /// Drive the state machine
    SetStreamState(StreamState),
    /// Ring multiplier for the next open, `2..=20`
    SetFifoMultiplier(i32),
    /// Current ring multiplier
    GetFifoMultiplier,
    /// Direction line offset, `-1 | 0..=4`
    SetAddrDirOffset(i32),
    /// Current direction line offset
    GetAddrDirOffset,
    /// Channel line offset, `-1 | 0..=4`
    SetAddrChOffset(i32),
    /// Current channel line offset
    GetAddrChOffset,
    /// Discard buffered RX data
    FlushFifo,
}

impl ControlRequest {
    /// Decode a raw code with a scalar argument.
    ///
    /// `WriteSettings` carries a settings block and cannot be decoded from a
    /// scalar; build [`ControlRequest::WriteSettings`] directly.
    ///
    /// # Errors
    /// `UnsupportedOperation` for an unknown code, `InvalidParameter` for an
    /// argument that does not fit the operation.
    pub fn from_raw(code: u32, arg: i64) -> ConfigResult<Self> {
        let narrow = || i32::try_from(arg).map_err(|_| ConfigError::InvalidParameter);

        Ok(match ControlCode::try_from(code)? {
            ControlCode::GetSettings => ControlRequest::GetSettings,
            ControlCode::WriteSettings => return Err(ConfigError::InvalidParameter),
            ControlCode::Address => ControlRequest::Address(
                u8::try_from(arg).map_err(|_| ConfigError::InvalidParameter)?,
            ),
            ControlCode::GetNativeBufSize => ControlRequest::GetNativeBufSize,
            ControlCode::SetStreamState => {
                let raw = u32::try_from(arg).map_err(|_| ConfigError::InvalidParameter)?;
                ControlRequest::SetStreamState(StreamState::try_from(raw)?)
            }
            ControlCode::SetFifoMultiplier => ControlRequest::SetFifoMultiplier(narrow()?),
            ControlCode::GetFifoMultiplier => ControlRequest::GetFifoMultiplier,
            ControlCode::SetAddrDirOffset => ControlRequest::SetAddrDirOffset(narrow()?),
            ControlCode::GetAddrDirOffset => ControlRequest::GetAddrDirOffset,
            ControlCode::SetAddrChOffset => ControlRequest::SetAddrChOffset(narrow()?),
            ControlCode::GetAddrChOffset => ControlRequest::GetAddrChOffset,
            ControlCode::FlushFifo => ControlRequest::FlushFifo,
        })
    }
}

/// Result of a control operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlResponse {
    /// Operation done, nothing to report
    Done,
    /// Peripheral settings
    Settings(PeripheralSettings),
    /// Size in bytes
    Size(usize),
    /// Integer tunable
    Value(i32),
}

pub(super) fn execute<R, C, D>(
    session: &StreamSession<'_, R, C, D>,
    request: ControlRequest,
) -> Result<ControlResponse>
where
    R: StreamRegisters,
    C: CyclicDma,
    D: DelayNs,
{
    let engine = session.engine();

    match request {
        ControlRequest::GetSettings => {
            let settings = engine.acquire(&engine.controller)?.read_settings();
            Ok(ControlResponse::Settings(settings))
        }
        ControlRequest::WriteSettings(settings) => {
            #[cfg(feature = "log")]
            info!("writing peripheral settings");
            engine.acquire(&engine.controller)?.write_settings(settings);
            Ok(ControlResponse::Done)
        }
        ControlRequest::Address(_address) => {
            #[cfg(feature = "log")]
            info!("address request 0x{_address:02x} ignored");
            Ok(ControlResponse::Done)
        }
        ControlRequest::GetNativeBufSize => {
            Ok(ControlResponse::Size(engine.chunk_size()))
        }
        ControlRequest::SetStreamState(state) => {
            engine.set_state(state)?;
            Ok(ControlResponse::Done)
        }
        ControlRequest::SetFifoMultiplier(value) => {
            engine.acquire(&engine.tunables)?.set_fifo_multiplier(value).map_err(|e| {
                #[cfg(feature = "log")]
                warn!("fifo multiplier {value} rejected, expected 2..=20");
                e
            })?;
            #[cfg(feature = "log")]
            info!("fifo multiplier set to {value}");
            Ok(ControlResponse::Done)
        }
        ControlRequest::GetFifoMultiplier => {
            let multiplier = engine.acquire(&engine.tunables)?.fifo_multiplier;
            Ok(ControlResponse::Value(multiplier as i32))
        }
        ControlRequest::SetAddrDirOffset(value) => {
            engine.acquire(&engine.tunables)?.set_addr_dir_offset(value).map_err(|e| {
                #[cfg(feature = "log")]
                warn!("direction offset {value} rejected");
                e
            })?;
            #[cfg(feature = "log")]
            info!("direction offset set to {value}");
            Ok(ControlResponse::Done)
        }
        ControlRequest::GetAddrDirOffset => {
            let offset = engine.acquire(&engine.tunables)?.addr_dir_offset;
            Ok(ControlResponse::Value(offset.to_raw()))
        }
        ControlRequest::SetAddrChOffset(value) => {
            engine.acquire(&engine.tunables)?.set_addr_ch_offset(value).map_err(|e| {
                #[cfg(feature = "log")]
                warn!("channel offset {value} rejected");
                e
            })?;
            #[cfg(feature = "log")]
            info!("channel offset set to {value}");
            Ok(ControlResponse::Done)
        }
        ControlRequest::GetAddrChOffset => {
            let offset = engine.acquire(&engine.tunables)?.addr_ch_offset;
            Ok(ControlResponse::Value(offset.to_raw()))
        }
        ControlRequest::FlushFifo => {
            session.flush_rx()?;
            Ok(ControlResponse::Done)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
