//! naga-core: command framing, device state and configuration for Razer Naga mice.
//!
//! This crate provides the driver layer a configuration daemon programs
//! against: a checksummed 90-byte command protocol over USB control
//! transfers, staged changes flushed by an explicit commit, and a
//! capability interface shared by the six Naga variants.

pub mod clock;
pub mod comm;
pub mod device;
pub mod dpi;
pub mod error;
pub mod firmware;
pub mod led;
pub mod mouse;
pub mod naga;
pub mod packet;
pub mod profile;
pub mod report_rate;
pub mod transport;

pub use error::{Error, Result};
pub use mouse::RazerMouse;
pub use naga::NagaMouse;

/// Razer USB Vendor ID.
pub const RAZER_VID: u16 = 0x1532;

/// Known Razer Naga product IDs.
pub mod pids {
    pub const NAGA_CLASSIC: u16 = 0x0015;
    pub const NAGA_EPIC: u16 = 0x001F;
    pub const NAGA_2012: u16 = 0x002E;
    pub const NAGA_HEX: u16 = 0x0036;
    /// Naga 2014 (extended 8200 DPI range).
    pub const NAGA_2014: u16 = 0x0040;
    pub const NAGA_HEX_V2: u16 = 0x0050;
}
