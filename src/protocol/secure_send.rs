// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Secure-send data framing.
//!
//! After boot, the Coordinator and a Component may exchange opaque data
//! through a secure-send exchange. Data travels in the payload of the confirm
//! message (and of its result) as a length byte followed by the data.

use crate::protocol::wire;
use crate::protocol::Error;
use crate::protocol::Payload;
use crate::protocol::PAYLOAD_LEN;

/// The most data a single secure send can carry.
pub const MAX_DATA_LEN: usize = PAYLOAD_LEN - 1;

/// Frames `data` into a payload.
pub fn frame(data: &[u8]) -> Result<Payload, Error> {
    check!(data.len() <= MAX_DATA_LEN, Error::PayloadTooLarge);
    let mut payload = Payload::empty();
    let bytes = payload.as_bytes_mut();
    bytes[0] = data.len() as u8;
    bytes[1..=data.len()].copy_from_slice(data);
    Ok(payload)
}

/// Extracts the data framed in `payload`.
pub fn unframe(payload: &Payload) -> Result<&[u8], Error> {
    let bytes = payload.as_bytes();
    let len = bytes[0] as usize;
    check!(len <= MAX_DATA_LEN, Error::Malformed(wire::Error::OutOfRange));
    Ok(&bytes[1..=len])
}
