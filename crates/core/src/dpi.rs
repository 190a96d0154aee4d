//! DPI mapping table, axis descriptors and resolution commands.
//!
//! Two firmware generations exist:
//!   - Scaled (Classic/Epic/2012/Hex/Hex v2): 100–5600 DPI, command 0x0003/0x0401,
//!     one byte per axis holding `((dpi / 100) - 1) * 4`.
//!   - Raw (2014): 100–8200 DPI, command 0x0007/0x0405, each axis as a
//!     big-endian word at value bytes 1..=2 (X) and 3..=4 (Y).

use crate::error::Result;
use crate::packet::CommandPacket;
use serde::{Deserialize, Serialize};

/// Distance between two neighbouring DPI mapping slots.
pub const DPI_STEP: u32 = 100;
/// Resolution selected on both axes at attach.
pub const DEFAULT_DPI: u32 = 1000;

/// Mapping slots on scaled-encoding models (100..=5600 DPI).
pub const SCALED_DPIMAPPINGS: usize = 56;
/// Mapping slots on raw-encoding models (100..=8200 DPI).
pub const RAW_DPIMAPPINGS: usize = 82;

/// Bit for the first (and only) resolution dimension of a mapping.
pub const DIMENSION_0: u32 = 1 << 0;

/// Resolution command format, fixed per model at attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionEncoding {
    Scaled,
    Raw,
}

impl ResolutionEncoding {
    pub fn dpimapping_count(&self) -> usize {
        match self {
            Self::Scaled => SCALED_DPIMAPPINGS,
            Self::Raw => RAW_DPIMAPPINGS,
        }
    }

    pub fn command(&self) -> u16 {
        match self {
            Self::Scaled => 0x0003,
            Self::Raw => 0x0007,
        }
    }

    pub fn request(&self) -> u16 {
        match self {
            Self::Scaled => 0x0401,
            Self::Raw => 0x0405,
        }
    }

    /// Build the resolution command for the given per-axis DPI values.
    pub fn packet(&self, x_dpi: u32, y_dpi: u32) -> CommandPacket {
        let mut pkt = CommandPacket::new(self.command(), self.request());
        match self {
            Self::Scaled => {
                let values = pkt.values_mut();
                values[0] = scaled_value(x_dpi);
                values[1] = scaled_value(y_dpi);
            }
            Self::Raw => {
                pkt.put_value_be16(1, raw_value(x_dpi));
                pkt.put_value_be16(3, raw_value(y_dpi));
            }
        }
        pkt
    }
}

/// Index into the legacy firmware's lookup table, which has four entries per 100 DPI.
fn scaled_value(dpi: u32) -> u8 {
    let step = (dpi / DPI_STEP).saturating_sub(1);
    u8::try_from(step * 4).unwrap_or(u8::MAX)
}

fn raw_value(dpi: u32) -> u16 {
    u16::try_from(dpi).unwrap_or(u16::MAX)
}

/// One fixed DPI mapping slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DpiMapping {
    /// Slot index.
    pub nr: u32,
    /// Resolution in DPI.
    pub resolution: u32,
    /// Which resolution dimensions this mapping carries.
    pub dimension_mask: u32,
}

impl DpiMapping {
    /// The Naga's mappings are fixed; callers select between them.
    pub fn is_changeable(&self) -> bool {
        false
    }
}

/// Build the full mapping table for an encoding: slot `i` is `(i + 1) * 100` DPI.
pub fn dpimapping_table(encoding: ResolutionEncoding) -> Result<Vec<DpiMapping>> {
    let count = encoding.dpimapping_count();
    let mut table = Vec::new();
    table.try_reserve_exact(count)?;
    table.extend((0..count as u32).map(|nr| DpiMapping {
        nr,
        resolution: (nr + 1) * DPI_STEP,
        dimension_mask: DIMENSION_0,
    }));
    Ok(table)
}

/// Slot index holding `dpi`, if the table has one.
pub fn find_mapping(table: &[DpiMapping], dpi: u32) -> Option<usize> {
    table.iter().position(|m| m.resolution == dpi)
}

pub const AXIS_X: u32 = 0;
pub const AXIS_Y: u32 = 1;
pub const AXIS_SCROLL: u32 = 2;

/// A movement axis of the mouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Axis {
    pub id: u32,
    pub name: &'static str,
    /// Whether this axis can carry its own DPI mapping.
    pub independent_dpimapping: bool,
}

pub const AXES: [Axis; 3] = [
    Axis {
        id: AXIS_X,
        name: "X",
        independent_dpimapping: true,
    },
    Axis {
        id: AXIS_Y,
        name: "Y",
        independent_dpimapping: true,
    },
    Axis {
        id: AXIS_SCROLL,
        name: "Scroll",
        independent_dpimapping: false,
    },
];
