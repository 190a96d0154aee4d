//! Naga command packet framing.
//!
//! Every request and response is one fixed 90-byte record, big-endian for
//! multi-byte fields:
//!
//! | offset | size | field                         |
//! |--------|------|-------------------------------|
//! | 0      | 1    | status                        |
//! | 1      | 3    | padding                       |
//! | 4      | 2    | command code                  |
//! | 6      | 2    | request code                  |
//! | 8      | 5    | operation values              |
//! | 13     | 75   | padding                       |
//! | 88     | 1    | checksum (XOR of bytes 2..=87) |
//! | 89     | 1    | padding                       |
//!
//! The checksum only catches accidental corruption on the wire.

use crate::error::{Error, Result};

/// Total packet length on the wire.
pub const PACKET_LEN: usize = 90;
/// Number of operation-specific value bytes.
pub const VALUES_LEN: usize = 5;

const STATUS_OFFSET: usize = 0;
const COMMAND_OFFSET: usize = 4;
const REQUEST_OFFSET: usize = 6;
const VALUES_OFFSET: usize = 8;
const CHECKSUM_OFFSET: usize = 88;

/// First byte covered by the checksum.
const CHECKSUM_START: usize = 2;
/// One past the last byte covered by the checksum.
const CHECKSUM_END: usize = PACKET_LEN - 2;

const _: () = assert!(PACKET_LEN == 90);
const _: () = assert!(CHECKSUM_OFFSET == CHECKSUM_END);
const _: () = assert!(VALUES_OFFSET + VALUES_LEN + 75 == CHECKSUM_OFFSET);

/// Response status bytes the firmware uses for a handled command.
///
/// Models are inconsistent about which of these they report, so any of
/// them counts as acknowledged.
pub const ACCEPTED_STATUS: [u8; 3] = [0x00, 0x01, 0x02];

/// XOR all bytes of `data` together.
pub fn xor8_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, b| acc ^ b)
}

/// A single Naga command or response packet.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandPacket {
    buf: [u8; PACKET_LEN],
}

impl CommandPacket {
    /// Zeroed packet with the command and request codes filled in.
    pub fn new(command: u16, request: u16) -> Self {
        let mut pkt = Self {
            buf: [0u8; PACKET_LEN],
        };
        pkt.buf[COMMAND_OFFSET..COMMAND_OFFSET + 2].copy_from_slice(&command.to_be_bytes());
        pkt.buf[REQUEST_OFFSET..REQUEST_OFFSET + 2].copy_from_slice(&request.to_be_bytes());
        pkt
    }

    /// Build an unsigned packet from its header fields and value bytes.
    pub fn encode(command: u16, request: u16, values: [u8; VALUES_LEN]) -> Self {
        let mut pkt = Self::new(command, request);
        pkt.values_mut().copy_from_slice(&values);
        pkt
    }

    /// Decode a packet received from the device.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let buf: [u8; PACKET_LEN] = data.try_into().map_err(|_| {
            Error::invalid(format!(
                "packet must be {PACKET_LEN} bytes, got {}",
                data.len()
            ))
        })?;
        Ok(Self { buf })
    }

    pub fn status(&self) -> u8 {
        self.buf[STATUS_OFFSET]
    }

    pub fn command(&self) -> u16 {
        u16::from_be_bytes([self.buf[COMMAND_OFFSET], self.buf[COMMAND_OFFSET + 1]])
    }

    pub fn request(&self) -> u16 {
        u16::from_be_bytes([self.buf[REQUEST_OFFSET], self.buf[REQUEST_OFFSET + 1]])
    }

    /// The five operation value bytes.
    pub fn values(&self) -> &[u8] {
        &self.buf[VALUES_OFFSET..VALUES_OFFSET + VALUES_LEN]
    }

    pub fn values_mut(&mut self) -> &mut [u8] {
        &mut self.buf[VALUES_OFFSET..VALUES_OFFSET + VALUES_LEN]
    }

    /// Read a big-endian word starting at value byte `index`.
    ///
    /// Panics if `index + 1` is outside the value field.
    pub fn value_be16(&self, index: usize) -> u16 {
        let v = self.values();
        u16::from_be_bytes([v[index], v[index + 1]])
    }

    /// Store a big-endian word starting at value byte `index`.
    ///
    /// Panics if `index + 1` is outside the value field.
    pub fn put_value_be16(&mut self, index: usize, word: u16) {
        self.values_mut()[index..index + 2].copy_from_slice(&word.to_be_bytes());
    }

    /// Checksum byte as currently stored in the packet.
    pub fn stored_checksum(&self) -> u8 {
        self.buf[CHECKSUM_OFFSET]
    }

    /// Compute the checksum over bytes 2..=87.
    pub fn checksum(&self) -> u8 {
        xor8_checksum(&self.buf[CHECKSUM_START..CHECKSUM_END])
    }

    /// Write the computed checksum into the packet.
    pub fn sign(&mut self) {
        self.buf[CHECKSUM_OFFSET] = self.checksum();
    }

    pub fn as_bytes(&self) -> &[u8; PACKET_LEN] {
        &self.buf
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8; PACKET_LEN] {
        &mut self.buf
    }
}

impl std::fmt::Debug for CommandPacket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandPacket")
            .field("status", &format_args!("0x{:02X}", self.status()))
            .field("command", &format_args!("0x{:04X}", self.command()))
            .field("request", &format_args!("0x{:04X}", self.request()))
            .field("values", &format_args!("{:02X?}", self.values()))
            .field("checksum", &format_args!("0x{:02X}", self.stored_checksum()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_sets_header_fields() {
        let pkt = CommandPacket::encode(0x0003, 0x0401, [0x10, 0x20, 0, 0, 0]);
        let raw = pkt.as_bytes();
        assert_eq!(raw.len(), PACKET_LEN);
        assert_eq!(raw[0], 0x00); // status
        assert_eq!(&raw[4..6], &[0x00, 0x03]);
        assert_eq!(&raw[6..8], &[0x04, 0x01]);
        assert_eq!(&raw[8..13], &[0x10, 0x20, 0x00, 0x00, 0x00]);
        assert!(raw[13..].iter().all(|&b| b == 0));
    }

    #[test]
    fn accessors_read_back_header() {
        let pkt = CommandPacket::new(0x0002, 0x0081);
        assert_eq!(pkt.command(), 0x0002);
        assert_eq!(pkt.request(), 0x0081);
        assert_eq!(pkt.status(), 0);
    }

    #[test]
    fn checksum_covers_header_and_values() {
        let pkt = CommandPacket::encode(0x0001, 0x0005, [0x08, 0, 0, 0, 0]);
        // 0x00 ^ 0x01 ^ 0x00 ^ 0x05 ^ 0x08
        assert_eq!(pkt.checksum(), 0x0C);
    }

    #[test]
    fn checksum_ignores_status_and_trailer() {
        let mut a = CommandPacket::encode(0x0003, 0x0300, [0x01, 0x01, 0x01, 0, 0]);
        let b = a.clone();
        let raw = a.as_bytes_mut();
        raw[0] = 0x02;
        raw[1] = 0xFF;
        raw[89] = 0xAA;
        assert_eq!(a.checksum(), b.checksum());
    }

    #[test]
    fn checksum_includes_first_padding_bytes() {
        // Bytes 2 and 3 are padding but fall inside the checksummed range.
        let mut a = CommandPacket::new(0x0001, 0x0005);
        let before = a.checksum();
        a.as_bytes_mut()[2] = 0x40;
        assert_eq!(a.checksum(), before ^ 0x40);
    }

    #[test]
    fn sign_is_idempotent() {
        let mut pkt = CommandPacket::encode(0x0007, 0x0405, [0, 0x1F, 0x40, 0x1F, 0x40]);
        pkt.sign();
        let once = pkt.clone();
        pkt.sign();
        assert_eq!(pkt, once);
        assert_eq!(pkt.stored_checksum(), pkt.checksum());
    }

    #[test]
    fn be16_value_helpers() {
        let mut pkt = CommandPacket::new(0x0007, 0x0405);
        pkt.put_value_be16(1, 8000);
        assert_eq!(&pkt.values()[1..3], &[0x1F, 0x40]);
        assert_eq!(pkt.value_be16(1), 8000);
    }

    #[test]
    fn decode_requires_exact_length() {
        assert!(CommandPacket::decode(&[0u8; 89]).is_err());
        assert!(CommandPacket::decode(&[0u8; 91]).is_err());
        let pkt = CommandPacket::new(0x0002, 0x0081);
        let back = CommandPacket::decode(pkt.as_bytes()).unwrap();
        assert_eq!(back, pkt);
    }

    #[test]
    fn xor8_of_empty_is_zero() {
        assert_eq!(xor8_checksum(&[]), 0);
        assert_eq!(xor8_checksum(&[0xAA, 0xAA]), 0);
    }
}
