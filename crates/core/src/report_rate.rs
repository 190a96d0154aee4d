//! Polling frequency and the frequency command (0x0001/0x0005).
//!
//! Device encoding: 8 = 125 Hz, 2 = 500 Hz, 1 = 1000 Hz.

use crate::error::{Error, Result};
use crate::packet::CommandPacket;
use serde::{Deserialize, Serialize};

pub const FREQ_COMMAND: u16 = 0x0001;
pub const FREQ_REQUEST: u16 = 0x0005;

/// Polling frequencies known to the mouse abstraction.
///
/// Not every model supports every rate; the Naga has no 250 Hz setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    /// No explicit rate; the device default (1000 Hz) applies.
    #[default]
    Unspecified,
    Hz125,
    Hz250,
    Hz500,
    Hz1000,
}

impl Frequency {
    /// Convert from raw Hz value; 0 means unspecified.
    pub fn from_hz(hz: u32) -> Result<Self> {
        match hz {
            0 => Ok(Self::Unspecified),
            125 => Ok(Self::Hz125),
            250 => Ok(Self::Hz250),
            500 => Ok(Self::Hz500),
            1000 => Ok(Self::Hz1000),
            other => Err(Error::invalid(format!("unknown frequency {other} Hz"))),
        }
    }

    /// The Hz value, 0 for unspecified.
    pub fn as_hz(&self) -> u32 {
        match self {
            Self::Unspecified => 0,
            Self::Hz125 => 125,
            Self::Hz250 => 250,
            Self::Hz500 => 500,
            Self::Hz1000 => 1000,
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unspecified => f.write_str("unspecified"),
            other => write!(f, "{} Hz", other.as_hz()),
        }
    }
}

/// Frequencies the Naga accepts, in ascending order.
pub const SUPPORTED: [Frequency; 3] = [Frequency::Hz125, Frequency::Hz500, Frequency::Hz1000];

/// Map a frequency to the Naga's one-byte code.
pub fn frequency_code(freq: Frequency) -> Result<u8> {
    match freq {
        Frequency::Hz125 => Ok(8),
        Frequency::Hz500 => Ok(2),
        Frequency::Hz1000 | Frequency::Unspecified => Ok(1),
        other => Err(Error::invalid(format!("unsupported frequency {other}"))),
    }
}

/// Build the frequency command.
pub fn frequency_packet(freq: Frequency) -> Result<CommandPacket> {
    let mut pkt = CommandPacket::new(FREQ_COMMAND, FREQ_REQUEST);
    pkt.values_mut()[0] = frequency_code(freq)?;
    Ok(pkt)
}
