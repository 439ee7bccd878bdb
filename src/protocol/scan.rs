// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Bus scans.
//!
//! A scan sends [`Opcode::Scan`] to every usable bus address; whatever
//! answers with a well-formed `Scan` reply is present, and the reply names
//! its [`DeviceId`]. Scans carry no nonces: they are a discovery tool, not
//! proof of identity.
//!
//! [`Opcode::Scan`]: ../enum.Opcode.html#variant.Scan

use core::ops::Range;

use crate::net::Address;
use crate::protocol::DeviceId;
use crate::protocol::Error;
use crate::protocol::Message;
use crate::protocol::Opcode;

/// The range of addresses a scan covers.
pub const SCAN_RANGE: Range<Address> = 0x08..0x78;

/// The most devices a scan can find.
pub const MAX_DEVICES: usize = (SCAN_RANGE.end - SCAN_RANGE.start) as usize;

/// Addresses within [`SCAN_RANGE`] reserved for other bus peripherals.
///
/// These are never written to.
pub const BLACKLIST: [Address; 3] = [0x18, 0x28, 0x36];

/// Returns `true` if a scan may touch `addr`.
pub fn is_scannable(addr: Address) -> bool {
    SCAN_RANGE.contains(&addr) && !BLACKLIST.contains(&addr)
}

/// Returns every address a scan touches, in ascending order.
pub fn addresses() -> impl Iterator<Item = Address> {
    SCAN_RANGE.filter(|&a| is_scannable(a))
}

/// Builds a scan request.
pub fn request() -> Message {
    Message::new(Opcode::Scan, DeviceId(0))
}

/// Builds the reply a Component with id `own_id` sends to a scan.
pub fn reply(own_id: DeviceId) -> Message {
    Message::new(Opcode::Scan, own_id)
}

/// Extracts the id a scan reply announces.
pub fn parse_reply(reply: &Message) -> Result<DeviceId, Error> {
    check!(
        reply.opcode == Opcode::Scan,
        Error::UnexpectedOpcode {
            expected: Opcode::Scan,
            found: reply.opcode,
        }
    );
    Ok(reply.device_id)
}
