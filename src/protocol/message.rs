// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! The fixed-size bus message and its codec.
//!
//! Every message occupies exactly [`MAX_FRAME_LEN`] bytes on the wire:
//! ```text
//! offset 0   opcode     u8
//! offset 1   device_id  u32 LE
//! offset 5   nonce_z    [u8; 16]
//! offset 21  nonce_y    [u8; 16]
//! offset 37  payload    [u8; 219], zero padded
//! ```
//!
//! [`MAX_FRAME_LEN`]: ../../net/constant.MAX_FRAME_LEN.html

use core::fmt;

use byteorder::ByteOrder as _;
use byteorder::LE;

use crate::io::endian::LeInt as _;
use crate::io::Read;
use crate::io::Write;
use crate::net::MAX_FRAME_LEN;
use crate::protocol::wire;
use crate::protocol::wire::FromWire;
use crate::protocol::wire::ToWire;
use crate::protocol::wire::WireEnum as _;
use crate::protocol::DeviceId;
use crate::protocol::Nonce;
use crate::protocol::Opcode;
use crate::protocol::NONCE_LEN;

const HEADER_LEN: usize = 1 + 4 + NONCE_LEN + NONCE_LEN;

/// The number of payload bytes a [`Message`] carries.
pub const PAYLOAD_LEN: usize = MAX_FRAME_LEN - HEADER_LEN;

/// A message payload.
///
/// Payloads are always exactly [`PAYLOAD_LEN`] bytes; shorter contents are
/// zero-padded, so a decoded message always re-encodes to the same bytes.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Payload([u8; PAYLOAD_LEN]);

impl Payload {
    /// Returns an all-zeroes payload.
    pub const fn empty() -> Self {
        Self([0; PAYLOAD_LEN])
    }

    /// Builds a payload out of `bytes`, zero-padding the rest.
    ///
    /// Fails with [`wire::Error::PayloadTooLarge`] if `bytes` does not fit;
    /// nothing is ever truncated.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, wire::Error> {
        check!(bytes.len() <= PAYLOAD_LEN, wire::Error::PayloadTooLarge);
        let mut payload = Self::empty();
        payload.0[..bytes.len()].copy_from_slice(bytes);
        Ok(payload)
    }

    /// Returns the full, padded contents of this payload.
    pub fn as_bytes(&self) -> &[u8; PAYLOAD_LEN] {
        &self.0
    }

    /// Returns the full, padded contents of this payload, mutably.
    pub fn as_bytes_mut(&mut self) -> &mut [u8; PAYLOAD_LEN] {
        &mut self.0
    }

    /// Returns the contents of this payload up to, but not including, the
    /// first NUL byte.
    pub fn until_nul(&self) -> &[u8] {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(PAYLOAD_LEN);
        &self.0[..end]
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // Trailing padding is noise.
        let end = self
            .0
            .iter()
            .rposition(|&b| b != 0)
            .map(|i| i + 1)
            .unwrap_or(0);
        f.debug_tuple("Payload").field(&&self.0[..end]).finish()
    }
}

/// A bus message.
///
/// See the [module documentation](index.html) for the wire layout.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Message {
    /// The operation this message is part of.
    pub opcode: Opcode,
    /// The Component this message is about.
    pub device_id: DeviceId,
    /// The Coordinator's challenge.
    pub nonce_z: Nonce,
    /// The Component's counter-challenge.
    pub nonce_y: Nonce,
    /// The opcode-specific contents.
    pub payload: Payload,
}

impl Message {
    /// Creates a message with zero nonces and an empty payload.
    pub fn new(opcode: Opcode, device_id: DeviceId) -> Self {
        Self {
            opcode,
            device_id,
            nonce_z: Nonce::ZERO,
            nonce_y: Nonce::ZERO,
            payload: Payload::empty(),
        }
    }

    /// Encodes this message into its wire form.
    ///
    /// This never fails: every message has exactly one encoding, and it is
    /// always [`MAX_FRAME_LEN`] bytes long.
    pub fn encode(&self) -> [u8; MAX_FRAME_LEN] {
        let mut buf = [0; MAX_FRAME_LEN];
        buf[0] = self.opcode.to_wire_value();
        LE::write_u32(&mut buf[1..5], self.device_id.0);
        buf[5..5 + NONCE_LEN].copy_from_slice(self.nonce_z.as_bytes());
        buf[5 + NONCE_LEN..HEADER_LEN].copy_from_slice(self.nonce_y.as_bytes());
        buf[HEADER_LEN..].copy_from_slice(self.payload.as_bytes());
        buf
    }

    /// Decodes a message out of `bytes`.
    ///
    /// Fails if `bytes` is not exactly [`MAX_FRAME_LEN`] long, or if the
    /// opcode is unknown.
    pub fn decode(mut bytes: &[u8]) -> Result<Self, wire::Error> {
        Self::from_wire(&mut bytes)
    }
}

impl FromWire for Message {
    fn from_wire<R: Read + ?Sized>(r: &mut R) -> Result<Self, wire::Error> {
        let len = r.remaining_data();
        check!(
            len == MAX_FRAME_LEN,
            wire::Error::BadLength {
                expected: MAX_FRAME_LEN,
                found: len,
            }
        );

        let opcode_byte = u8::read_from(&mut *r)?;
        let opcode = Opcode::from_wire_value(opcode_byte)
            .ok_or_else(|| failed!(wire::Error::UnknownOpcode(opcode_byte)))?;
        let device_id = DeviceId(u32::read_from(&mut *r)?);

        let mut nonce_z = Nonce::ZERO;
        r.read_bytes(&mut nonce_z.0)?;
        let mut nonce_y = Nonce::ZERO;
        r.read_bytes(&mut nonce_y.0)?;
        let mut payload = Payload::empty();
        r.read_bytes(&mut payload.0)?;

        Ok(Self {
            opcode,
            device_id,
            nonce_z,
            nonce_y,
            payload,
        })
    }
}

impl ToWire for Message {
    fn to_wire<W: Write>(&self, mut w: W) -> Result<(), wire::Error> {
        w.write_bytes(&self.encode())?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::io::Cursor;
    use pretty_assertions::assert_eq;

    fn sample() -> Message {
        Message {
            opcode: Opcode::SecureSendConfirm,
            device_id: DeviceId(0x11111124),
            nonce_z: Nonce([0x5a; NONCE_LEN]),
            nonce_y: Nonce([0xa5; NONCE_LEN]),
            payload: Payload::from_slice(b"hello").unwrap(),
        }
    }

    #[test]
    fn layout() {
        let bytes = sample().encode();
        assert_eq!(bytes.len(), MAX_FRAME_LEN);
        assert_eq!(PAYLOAD_LEN, 219);
        assert_eq!(bytes[0], 0x06);
        assert_eq!(&bytes[1..5], &[0x24, 0x11, 0x11, 0x11]);
        assert_eq!(&bytes[5..21], &[0x5a; 16]);
        assert_eq!(&bytes[21..37], &[0xa5; 16]);
        assert_eq!(&bytes[37..42], b"hello");
        assert!(bytes[42..].iter().all(|&b| b == 0));
    }

    #[test]
    fn round_trip() {
        let message = sample();
        assert_eq!(Message::decode(&message.encode()), Ok(message));

        let empty = Message::new(Opcode::Scan, DeviceId(0));
        assert_eq!(Message::decode(&empty.encode()), Ok(empty));
    }

    #[test]
    fn to_wire_matches_encode() {
        let message = sample();
        let mut buf = [0; MAX_FRAME_LEN + 8];
        let mut cursor = Cursor::new(&mut buf);
        message.to_wire(&mut cursor).unwrap();
        assert_eq!(cursor.consumed_bytes(), &message.encode()[..]);
    }

    #[test]
    fn bad_length() {
        let bytes = sample().encode();
        assert_eq!(
            Message::decode(&bytes[..MAX_FRAME_LEN - 1]),
            Err(wire::Error::BadLength {
                expected: MAX_FRAME_LEN,
                found: MAX_FRAME_LEN - 1,
            })
        );
        assert!(Message::decode(&[]).is_err());

        let mut long = [0; MAX_FRAME_LEN + 1];
        long[..MAX_FRAME_LEN].copy_from_slice(&bytes);
        assert!(Message::decode(&long).is_err());
    }

    #[test]
    fn unknown_opcode() {
        let mut bytes = sample().encode();
        bytes[0] = 0x42;
        assert_eq!(
            Message::decode(&bytes),
            Err(wire::Error::UnknownOpcode(0x42))
        );
    }

    #[test]
    fn oversized_payload() {
        assert!(Payload::from_slice(&[1; PAYLOAD_LEN]).is_ok());
        assert_eq!(
            Payload::from_slice(&[1; PAYLOAD_LEN + 1]),
            Err(wire::Error::PayloadTooLarge)
        );
    }

    #[test]
    fn until_nul() {
        let payload = Payload::from_slice(b"abc\0def").unwrap();
        assert_eq!(payload.until_nul(), b"abc");
        let full = Payload::from_slice(&[7; PAYLOAD_LEN]).unwrap();
        assert_eq!(full.until_nul().len(), PAYLOAD_LEN);
    }
}
