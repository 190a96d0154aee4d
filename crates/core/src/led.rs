//! LED table and LED command.

use crate::error::{Error, Result};
use crate::mouse::RazerMouse;
use crate::packet::CommandPacket;
use serde::{Deserialize, Serialize};

pub const LED_COMMAND: u16 = 0x0003;
pub const LED_REQUEST: u16 = 0x0300;

/// Number of LED slots known to the Naga protocol.
pub const LED_COUNT: usize = 3;

/// Logical LED ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedId {
    Scroll = 0,
    Logo = 1,
    ThumbGrid = 2,
}

impl LedId {
    pub const ALL: [LedId; LED_COUNT] = [LedId::Scroll, LedId::Logo, LedId::ThumbGrid];

    pub fn from_index(index: u32) -> Result<Self> {
        Self::ALL
            .get(index as usize)
            .copied()
            .ok_or_else(|| Error::invalid(format!("unknown LED id {index}")))
    }

    /// Parse an LED from a CLI-friendly name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "scroll" | "scrollwheel" => Some(Self::Scroll),
            "logo" | "glowinglogo" => Some(Self::Logo),
            "thumb" | "thumbgrid" | "thumb-grid" => Some(Self::ThumbGrid),
            _ => None,
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Scroll => "Scrollwheel",
            Self::Logo => "GlowingLogo",
            Self::ThumbGrid => "ThumbGrid",
        }
    }

    /// Two-byte id the firmware uses for this LED.
    pub fn protocol_id(&self) -> [u8; 2] {
        match self {
            Self::Scroll => [0x01, 0x01],
            Self::Logo => [0x01, 0x04],
            Self::ThumbGrid => [0x01, 0x05],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedState {
    Off,
    On,
}

impl LedState {
    pub fn from_bool(on: bool) -> Self {
        if on {
            Self::On
        } else {
            Self::Off
        }
    }

    pub fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }
}

impl std::fmt::Display for LedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(if self.is_on() { "on" } else { "off" })
    }
}

/// A supported LED and its current state, as handed out to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Led {
    pub id: LedId,
    pub name: &'static str,
    pub state: LedState,
}

impl Led {
    /// Stage a new state for this LED on `mouse`.
    pub fn toggle<M: RazerMouse + ?Sized>(&self, mouse: &mut M, state: LedState) -> Result<()> {
        mouse.set_led(self.id, state)
    }
}

/// Build the command that switches `id` on or off.
pub fn led_packet(id: LedId, state: LedState) -> CommandPacket {
    let mut pkt = CommandPacket::new(LED_COMMAND, LED_REQUEST);
    let values = pkt.values_mut();
    values[..2].copy_from_slice(&id.protocol_id());
    values[2] = u8::from(state.is_on());
    pkt
}
