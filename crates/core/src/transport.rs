//! USB control-transfer transport abstraction.
//!
//! Provides a trait-based transport layer so that real devices and mock
//! devices share the same interface. The Naga speaks class requests to
//! interface 0: `SET_CONFIGURATION` (0x09) to write a packet and
//! `CLEAR_FEATURE` (0x01) to read the answer back, both with value 0x0300.

use crate::error::Result;
use std::time::Duration;

/// Request code used to send a packet to the device.
pub const REQUEST_SET_CONFIGURATION: u8 = 0x09;
/// Request code used to read a packet back from the device.
pub const REQUEST_CLEAR_FEATURE: u8 = 0x01;
/// Control transfer value for all Naga commands.
pub const COMMAND_VALUE: u16 = 0x0300;
/// Per-transfer timeout.
pub const TRANSFER_TIMEOUT: Duration = Duration::from_millis(3000);

/// Abstraction over class/interface control transfers on an opened device.
///
/// Implementations report the number of bytes actually moved; checking it
/// against the requested size is the caller's job.
pub trait ControlTransport: Send {
    /// Host-to-device transfer of `data`.
    fn control_out(
        &self,
        request: u8,
        value: u16,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize>;

    /// Device-to-host transfer into `buf`.
    fn control_in(
        &self,
        request: u8,
        value: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize>;

    /// Take exclusive ownership of the interface.
    fn claim(&self) -> Result<()> {
        Ok(())
    }

    /// Give the interface back.
    fn release(&self) {}

    /// Bus location used in the device identification string.
    fn bus_id(&self) -> String {
        "unknown".to_string()
    }
}
