//! Firmware version query and the attach-time probe.
//!
//! Freshly enumerated devices sometimes answer the first few queries with
//! garbage, so the version is polled until the major byte is non-zero.

use crate::clock::Clock;
use crate::comm::CommandChannel;
use crate::error::{Error, Result};
use crate::packet::CommandPacket;
use crate::transport::ControlTransport;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::error;

pub const QUERY_COMMAND: u16 = 0x0002;
pub const QUERY_REQUEST: u16 = 0x0081;

/// Firmware queries sent before giving up.
pub const PROBE_ATTEMPTS: u32 = 5;
/// Pause between two firmware queries.
pub const PROBE_DELAY: Duration = Duration::from_millis(250);

/// Firmware version, major in the high byte and minor in the low byte.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct FirmwareVersion(pub u16);

impl FirmwareVersion {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self(((major as u16) << 8) | minor as u16)
    }

    pub fn major(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn minor(&self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    pub fn raw(&self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.major(), self.minor())
    }
}

/// Build the firmware version query.
pub fn query_packet() -> CommandPacket {
    CommandPacket::new(QUERY_COMMAND, QUERY_REQUEST)
}

/// Extract the version from a query response; `None` if the major byte is zero.
pub fn parse_version(resp: &CommandPacket) -> Option<FirmwareVersion> {
    let version = FirmwareVersion(resp.value_be16(0));
    (version.major() != 0).then_some(version)
}

/// Query the firmware version, retrying until the device gives a usable answer.
pub fn probe<T: ControlTransport, C: Clock>(
    channel: &mut CommandChannel<T, C>,
) -> Result<FirmwareVersion> {
    channel.retry(PROBE_ATTEMPTS, PROBE_DELAY, |chan, _| {
        let mut pkt = query_packet();
        chan.send_command(&mut pkt)?;
        parse_version(&pkt).ok_or_else(|| {
            Error::NotReady(format!("invalid firmware version 0x{:04X}", pkt.value_be16(0)))
        })
    })
    .map_err(|e| {
        error!("Failed to read firmware version: {e}");
        Error::NotReady(format!(
            "no firmware version after {PROBE_ATTEMPTS} attempts: {e}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::mock::VirtualClock;
    use crate::transport::mock::{Fault, MockTransport};

    fn channel(
        mock: &MockTransport,
        clock: &VirtualClock,
    ) -> CommandChannel<MockTransport, VirtualClock> {
        CommandChannel::new(mock.clone(), clock.clone())
    }

    #[test]
    fn version_parts() {
        let v = FirmwareVersion::new(1, 4);
        assert_eq!(v.raw(), 0x0104);
        assert_eq!(v.major(), 1);
        assert_eq!(v.minor(), 4);
        assert_eq!(v.to_string(), "1.04");
        assert!(FirmwareVersion::new(1, 3) < v);
    }

    #[test]
    fn parse_rejects_zero_major() {
        let mut pkt = query_packet();
        pkt.put_value_be16(0, 0x0042);
        assert_eq!(parse_version(&pkt), None);
        pkt.put_value_be16(0, 0x0142);
        assert_eq!(parse_version(&pkt), Some(FirmwareVersion(0x0142)));
    }

    #[test]
    fn probe_succeeds_first_time() {
        let mock = MockTransport::new();
        let clock = VirtualClock::new();
        mock.set_fw_version(0x0203);
        let mut chan = channel(&mock, &clock);
        assert_eq!(probe(&mut chan).unwrap(), FirmwareVersion(0x0203));
        assert_eq!(mock.sent_packets().len(), 1);
    }

    #[test]
    fn probe_survives_four_failures() {
        let mock = MockTransport::new();
        let clock = VirtualClock::new();
        mock.queue_fw_replies(&[0x0000, 0x0000, 0x0000, 0x0000, 0x0104]);
        let mut chan = channel(&mock, &clock);
        let v = probe(&mut chan).unwrap();
        assert_eq!(v.major(), 1);
        assert_eq!(mock.sent_packets().len(), 5);
        let probe_sleeps = clock.sleeps().iter().filter(|d| **d == PROBE_DELAY).count();
        assert_eq!(probe_sleeps, 4);
    }

    #[test]
    fn probe_gives_up_after_five_failures() {
        let mock = MockTransport::new();
        let clock = VirtualClock::new();
        mock.queue_fw_replies(&[0x0000; 5]);
        let mut chan = channel(&mock, &clock);
        let err = probe(&mut chan).unwrap_err();
        assert!(matches!(err, Error::NotReady(_)));
        assert_eq!(mock.sent_packets().len(), 5);
    }

    #[test]
    fn probe_treats_transfer_errors_as_failed_attempts() {
        let mock = MockTransport::new();
        let clock = VirtualClock::new();
        mock.queue_out_faults(&[Some(Fault::Error), Some(Fault::Error)]);
        let mut chan = channel(&mock, &clock);
        assert_eq!(probe(&mut chan).unwrap(), FirmwareVersion(0x0104));
        assert_eq!(mock.sent_packets().len(), 3);
    }
}
