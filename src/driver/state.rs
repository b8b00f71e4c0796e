//! Stream states and the address selector derived from them.
//!
//! The peripheral's address lines carry two pieces of routing information:
//! a direction bit and a channel bit, each at a configurable offset. The
//! selector is a pure function of the state and the two offsets.

use super::error::{ConfigError, ConfigResult};
use crate::hal::dma::TransferDirection;
use crate::internal::constants::{ADDR_OFFSET_MAX, ADDR_OFFSET_UNUSED};

/// Direction line value while the host drives the peripheral (transmit, idle)
const DIR_HOST_TO_DEVICE: u8 = 0;
/// Direction line value while the device drives the host (receive)
const DIR_DEVICE_TO_HOST: u8 = 1;

const CHANNEL_0: u8 = 0;
const CHANNEL_1: u8 = 1;

/// Streaming state. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StreamState {
    /// No transfer; address lines put the device in high-Z
    #[default]
    Idle = 0,
    /// Receiving on channel 0
    RxChannel0 = 1,
    /// Receiving on channel 1
    RxChannel1 = 2,
    /// Transmitting
    TxChannel = 3,
}

impl StreamState {
    /// DMA direction served in this state, `None` when idle
    #[must_use]
    pub const fn direction(self) -> Option<TransferDirection> {
        match self {
            StreamState::Idle => None,
            StreamState::RxChannel0 | StreamState::RxChannel1 => {
                Some(TransferDirection::DeviceToMemory)
            }
            StreamState::TxChannel => Some(TransferDirection::MemoryToDevice),
        }
    }
}

impl TryFrom<u32> for StreamState {
    type Error = ConfigError;

    fn try_from(raw: u32) -> ConfigResult<Self> {
        match raw {
            0 => Ok(StreamState::Idle),
            1 => Ok(StreamState::RxChannel0),
            2 => Ok(StreamState::RxChannel1),
            3 => Ok(StreamState::TxChannel),
            _ => Err(ConfigError::InvalidParameter),
        }
    }
}

/// Bit offset of one routing line within the address selector.
///
/// Raw form is `-1` for an unused line or `0..=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitOffset(Option<u8>);

impl BitOffset {
    /// Line not wired; contributes nothing to the selector
    pub const UNUSED: Self = Self(None);

    /// Offset at a fixed bit position. Caller guarantees `bit <= 4`.
    #[must_use]
    pub const fn at(bit: u8) -> Self {
        Self(Some(bit))
    }

    /// Parse the raw `-1 | 0..=4` form
    pub const fn from_raw(raw: i32) -> ConfigResult<Self> {
        if raw == ADDR_OFFSET_UNUSED {
            Ok(Self::UNUSED)
        } else if raw >= 0 && raw <= ADDR_OFFSET_MAX {
            Ok(Self(Some(raw as u8)))
        } else {
            Err(ConfigError::InvalidParameter)
        }
    }

    /// Raw `-1 | 0..=4` form
    #[must_use]
    pub const fn to_raw(self) -> i32 {
        match self.0 {
            Some(bit) => bit as i32,
            None => ADDR_OFFSET_UNUSED,
        }
    }

    /// Whether the line is wired
    #[must_use]
    pub const fn is_used(self) -> bool {
        self.0.is_some()
    }

    const fn place(self, value: u8) -> u8 {
        match self.0 {
            Some(bit) => value << bit,
            None => 0,
        }
    }
}

/// Check that two offsets can coexist: distinct unless both unused.
pub(crate) const fn offsets_compatible(dir: BitOffset, ch: BitOffset) -> bool {
    match (dir.0, ch.0) {
        (Some(a), Some(b)) => a != b,
        _ => true,
    }
}

/// Encoded direction and channel written to the peripheral address lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AddressSelector(u8);

impl AddressSelector {
    /// Compute the selector for `state`.
    ///
    /// Idle and transmit both drive the host-to-device direction on
    /// channel 0, so idle never aliases an active receive channel.
    #[must_use]
    pub const fn from_state(state: StreamState, dir: BitOffset, ch: BitOffset) -> Self {
        let value = match state {
            StreamState::RxChannel0 => {
                dir.place(DIR_DEVICE_TO_HOST) | ch.place(CHANNEL_0)
            }
            StreamState::RxChannel1 => {
                dir.place(DIR_DEVICE_TO_HOST) | ch.place(CHANNEL_1)
            }
            StreamState::TxChannel | StreamState::Idle => {
                dir.place(DIR_HOST_TO_DEVICE) | ch.place(CHANNEL_0)
            }
        };
        Self(value)
    }

    /// Raw value for the address register
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [StreamState; 4] = [
        StreamState::Idle,
        StreamState::RxChannel0,
        StreamState::RxChannel1,
        StreamState::TxChannel,
    ];

    #[test]
    fn stream_state_from_raw() {
        assert_eq!(StreamState::try_from(0), Ok(StreamState::Idle));
        assert_eq!(StreamState::try_from(1), Ok(StreamState::RxChannel0));
        assert_eq!(StreamState::try_from(2), Ok(StreamState::RxChannel1));
        assert_eq!(StreamState::try_from(3), Ok(StreamState::TxChannel));
        assert_eq!(
            StreamState::try_from(4),
            Err(ConfigError::InvalidParameter)
        );
    }

    #[test]
    fn stream_state_directions() {
        assert_eq!(StreamState::Idle.direction(), None);
        assert_eq!(
            StreamState::RxChannel1.direction(),
            Some(TransferDirection::DeviceToMemory)
        );
        assert_eq!(
            StreamState::TxChannel.direction(),
            Some(TransferDirection::MemoryToDevice)
        );
    }

    #[test]
    fn bit_offset_raw_bounds() {
        assert_eq!(BitOffset::from_raw(-1), Ok(BitOffset::UNUSED));
        assert_eq!(BitOffset::from_raw(0), Ok(BitOffset::at(0)));
        assert_eq!(BitOffset::from_raw(4), Ok(BitOffset::at(4)));
        assert!(BitOffset::from_raw(5).is_err());
        assert!(BitOffset::from_raw(-2).is_err());
        assert_eq!(BitOffset::at(3).to_raw(), 3);
        assert_eq!(BitOffset::UNUSED.to_raw(), -1);
    }

    #[test]
    fn selectors_with_default_offsets() {
        let dir = BitOffset::at(2);
        let ch = BitOffset::at(3);

        assert_eq!(AddressSelector::from_state(StreamState::Idle, dir, ch).bits(), 0);
        assert_eq!(
            AddressSelector::from_state(StreamState::RxChannel0, dir, ch).bits(),
            0b0100
        );
        assert_eq!(
            AddressSelector::from_state(StreamState::RxChannel1, dir, ch).bits(),
            0b1100
        );
        assert_eq!(AddressSelector::from_state(StreamState::TxChannel, dir, ch).bits(), 0);
    }

    #[test]
    fn idle_never_aliases_receive_channels() {
        for dir_bit in 0..=4u8 {
            for ch_bit in (0..=4u8).filter(|b| *b != dir_bit) {
                let dir = BitOffset::at(dir_bit);
                let ch = BitOffset::at(ch_bit);
                let idle = AddressSelector::from_state(StreamState::Idle, dir, ch);
                let tx = AddressSelector::from_state(StreamState::TxChannel, dir, ch);
                let rx0 = AddressSelector::from_state(StreamState::RxChannel0, dir, ch);
                let rx1 = AddressSelector::from_state(StreamState::RxChannel1, dir, ch);

                assert_eq!(idle, tx);
                assert_ne!(idle, rx0);
                assert_ne!(idle, rx1);
                assert_ne!(rx0, rx1);
            }
        }
    }

    #[test]
    fn unused_offsets_give_constant_zero() {
        for state in ALL_STATES {
            let sel = AddressSelector::from_state(state, BitOffset::UNUSED, BitOffset::UNUSED);
            assert_eq!(sel.bits(), 0, "{state:?}");
        }
    }

    #[test]
    fn offsets_compatibility_rule() {
        assert!(offsets_compatible(BitOffset::at(2), BitOffset::at(3)));
        assert!(!offsets_compatible(BitOffset::at(2), BitOffset::at(2)));
        assert!(offsets_compatible(BitOffset::UNUSED, BitOffset::UNUSED));
        assert!(offsets_compatible(BitOffset::UNUSED, BitOffset::at(0)));
    }
}
