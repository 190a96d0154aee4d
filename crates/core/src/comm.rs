//! Command channel: framed request/response exchange with retry and spacing.
//!
//! Every transfer is bracketed by the device's [`PacketSpacing`]. Reads are
//! retried; writes are not.

use crate::clock::{retry, retry_with, Clock, PacketSpacing};
use crate::error::{Error, Result};
use crate::packet::{CommandPacket, ACCEPTED_STATUS};
use crate::transport::{
    ControlTransport, COMMAND_VALUE, REQUEST_CLEAR_FEATURE, REQUEST_SET_CONFIGURATION,
    TRANSFER_TIMEOUT,
};
use std::time::Duration;
use tracing::{error, trace, warn};

/// Attempts for one read transfer before giving up.
pub const READ_ATTEMPTS: u32 = 3;

/// Minimum gap between two transfers to the same device.
pub const PACKET_SPACING: Duration = Duration::from_millis(25);

/// Owns the transport, the clock and the spacing timer of one device.
pub struct CommandChannel<T, C> {
    transport: T,
    clock: C,
    spacing: PacketSpacing,
}

impl<T: ControlTransport, C: Clock> CommandChannel<T, C> {
    pub fn new(transport: T, clock: C) -> Self {
        Self::with_spacing(transport, clock, PACKET_SPACING)
    }

    pub fn with_spacing(transport: T, clock: C, interval: Duration) -> Self {
        Self {
            transport,
            clock,
            spacing: PacketSpacing::new(interval),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Run `op` against this channel up to `attempts` times, sleeping on the
    /// channel's clock between failures.
    pub fn retry<R>(
        &mut self,
        attempts: u32,
        delay: Duration,
        op: impl FnMut(&mut Self, u32) -> Result<R>,
    ) -> Result<R> {
        retry_with(self, attempts, delay, |chan, d| chan.clock.sleep(d), op)
    }

    /// Send `buf` to the device. Fails unless every byte was accepted.
    pub fn write(&mut self, request: u8, value: u16, buf: &[u8]) -> Result<()> {
        let Self {
            transport,
            clock,
            spacing,
        } = self;
        let clock: &C = clock;
        let res = spacing.scoped(clock, || {
            transport.control_out(request, value, buf, TRANSFER_TIMEOUT)
        });
        check_len(res, request, value, buf.len()).inspect_err(|e| {
            error!(
                request = format_args!("0x{request:02X}"),
                value = format_args!("0x{value:04X}"),
                "USB write failed: {e}"
            );
        })
    }

    /// Fill `buf` from the device, retrying the whole transfer up to
    /// [`READ_ATTEMPTS`] times.
    pub fn read(&mut self, request: u8, value: u16, buf: &mut [u8]) -> Result<()> {
        let Self {
            transport,
            clock,
            spacing,
        } = self;
        let clock: &C = clock;
        let len = buf.len();
        retry(clock, READ_ATTEMPTS, Duration::ZERO, |_| {
            let res = spacing.scoped(clock, || {
                transport.control_in(request, value, &mut *buf, TRANSFER_TIMEOUT)
            });
            check_len(res, request, value, len)
        })
        .inspect_err(|e| {
            error!(
                request = format_args!("0x{request:02X}"),
                value = format_args!("0x{value:04X}"),
                "USB read failed: {e}"
            );
        })
    }

    /// Sign `pkt`, send it, and read the device's answer back into it.
    ///
    /// A status byte outside [`ACCEPTED_STATUS`] is logged but not turned
    /// into an error, since the transfer itself was acknowledged.
    pub fn send_command(&mut self, pkt: &mut CommandPacket) -> Result<()> {
        pkt.sign();
        let command = pkt.command();
        let request = pkt.request();
        trace!(
            command = format_args!("0x{command:04X}"),
            request = format_args!("0x{request:04X}"),
            values = format_args!("{:02X?}", pkt.values()),
            checksum = format_args!("0x{:02X}", pkt.stored_checksum()),
            "Naga TX"
        );

        self.write(REQUEST_SET_CONFIGURATION, COMMAND_VALUE, pkt.as_bytes())?;
        self.read(REQUEST_CLEAR_FEATURE, COMMAND_VALUE, pkt.as_bytes_mut())?;

        trace!(
            status = pkt.status(),
            values = format_args!("{:02X?}", pkt.values()),
            "Naga RX"
        );

        if !ACCEPTED_STATUS.contains(&pkt.status()) {
            warn!(
                command = format_args!("0x{command:04X}"),
                request = format_args!("0x{request:04X}"),
                status = format_args!("0x{:02X}", pkt.status()),
                "Command failed on device"
            );
        }

        Ok(())
    }
}

fn check_len(res: Result<usize>, request: u8, value: u16, expected: usize) -> Result<()> {
    match res {
        Ok(n) if n == expected => Ok(()),
        Ok(n) => Err(Error::Io {
            request,
            value,
            reason: format!("transferred {n} of {expected} bytes"),
        }),
        Err(Error::Io { reason, .. }) => Err(Error::Io {
            request,
            value,
            reason,
        }),
        Err(e) => Err(Error::Io {
            request,
            value,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::mock::VirtualClock;
    use crate::packet::PACKET_LEN;
    use crate::transport::mock::{Direction, Fault, MockTransport};

    fn channel() -> (CommandChannel<MockTransport, VirtualClock>, MockTransport, VirtualClock) {
        let mock = MockTransport::new();
        let clock = VirtualClock::new();
        let chan = CommandChannel::new(mock.clone(), clock.clone());
        (chan, mock, clock)
    }

    #[test]
    fn send_command_writes_then_reads() {
        let (mut chan, mock, _) = channel();
        let mut pkt = CommandPacket::encode(0x0001, 0x0005, [0x01, 0, 0, 0, 0]);
        chan.send_command(&mut pkt).unwrap();

        let transfers = mock.transfers();
        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].direction, Direction::Out);
        assert_eq!(transfers[0].request, REQUEST_SET_CONFIGURATION);
        assert_eq!(transfers[0].value, COMMAND_VALUE);
        assert_eq!(transfers[0].data.len(), PACKET_LEN);
        assert_eq!(transfers[1].direction, Direction::In);
        assert_eq!(transfers[1].request, REQUEST_CLEAR_FEATURE);
        assert_eq!(pkt.status(), 0x02);
    }

    #[test]
    fn send_command_signs_before_writing() {
        let (mut chan, mock, _) = channel();
        let mut pkt = CommandPacket::encode(0x0003, 0x0300, [0x01, 0x01, 0x01, 0, 0]);
        chan.send_command(&mut pkt).unwrap();
        let sent = &mock.sent_packets()[0];
        assert_ne!(sent.stored_checksum(), 0);
        assert_eq!(sent.stored_checksum(), sent.checksum());
    }

    #[test]
    fn transfers_are_spaced() {
        let (mut chan, _, clock) = channel();
        let mut pkt = CommandPacket::new(0x0001, 0x0005);
        chan.send_command(&mut pkt).unwrap();
        // The read follows the write immediately, so it waits one full interval.
        assert_eq!(clock.sleeps(), vec![PACKET_SPACING]);
    }

    #[test]
    fn short_write_is_io_error_without_retry() {
        let (mut chan, mock, _) = channel();
        mock.queue_out_faults(&[Some(Fault::Short)]);
        let mut pkt = CommandPacket::new(0x0001, 0x0005);
        let err = chan.send_command(&mut pkt).unwrap_err();
        assert!(matches!(
            err,
            Error::Io {
                request: REQUEST_SET_CONFIGURATION,
                ..
            }
        ));
        assert_eq!(mock.transfer_count(), 1);
    }

    #[test]
    fn read_retries_up_to_three_times() {
        let (mut chan, mock, _) = channel();
        mock.queue_in_faults(&[Some(Fault::Error), Some(Fault::Short)]);
        let mut pkt = CommandPacket::new(0x0001, 0x0005);
        chan.send_command(&mut pkt).unwrap();
        // one write + three reads
        assert_eq!(mock.transfer_count(), 4);
    }

    #[test]
    fn read_fails_after_three_attempts() {
        let (mut chan, mock, _) = channel();
        mock.queue_in_faults(&[Some(Fault::Error); 3]);
        let mut pkt = CommandPacket::new(0x0001, 0x0005);
        let err = chan.send_command(&mut pkt).unwrap_err();
        assert!(matches!(
            err,
            Error::Io {
                request: REQUEST_CLEAR_FEATURE,
                value: COMMAND_VALUE,
                ..
            }
        ));
        assert_eq!(mock.transfer_count(), 4);
    }

    #[test]
    fn unexpected_status_is_not_an_error() {
        let (mut chan, mock, _) = channel();
        mock.set_status(0x03);
        let mut pkt = CommandPacket::new(0x0001, 0x0005);
        chan.send_command(&mut pkt).unwrap();
        assert_eq!(pkt.status(), 0x03);
    }
}
