// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Attestation records.
//!
//! A Component answers an attestation exchange with a NUL-terminated text
//! record of the form:
//! ```text
//! LOC>{location}
//! DATE>{date}
//! CUST>{customer}
//! ```
//! where every line, including the last, ends in `\n`.

use crate::io::Cursor;
use crate::io::Write as _;
use crate::protocol::wire;
use crate::protocol::Error;
use crate::protocol::Payload;

/// A Component's attestation data.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct AttestationRecord<'a> {
    /// Where the Component was manufactured.
    pub location: &'a str,
    /// When the Component was manufactured.
    pub date: &'a str,
    /// Who the Component was manufactured for.
    pub customer: &'a str,
}

const FIELDS: [&str; 3] = ["LOC>", "DATE>", "CUST>"];

impl<'a> AttestationRecord<'a> {
    /// Renders this record into a payload.
    ///
    /// Fails if the rendered record, with its terminator, does not fit.
    pub fn to_payload(&self) -> Result<Payload, Error> {
        let mut payload = Payload::empty();
        let mut cursor = Cursor::new(payload.as_bytes_mut());
        for (tag, value) in FIELDS.iter().zip(&[self.location, self.date, self.customer]) {
            // Fields may not forge a line or end the record early.
            check!(
                !value.bytes().any(|b| b == b'\n' || b == 0),
                Error::Malformed(wire::Error::OutOfRange)
            );
            cursor
                .write_bytes(tag.as_bytes())
                .and_then(|_| cursor.write_bytes(value.as_bytes()))
                .and_then(|_| cursor.write_bytes(b"\n"))
                .map_err(|_| failed!(Error::PayloadTooLarge))?;
        }
        // The terminating NUL must fit too.
        check!(cursor.remaining_len() > 0, Error::PayloadTooLarge);
        Ok(payload)
    }

    /// Parses a record out of `payload`.
    pub fn parse(payload: &'a Payload) -> Result<Self, Error> {
        let malformed = || failed!(Error::Malformed(wire::Error::OutOfRange));

        let text = core::str::from_utf8(payload.until_nul()).map_err(|_| malformed())?;
        let mut lines = text.split_terminator('\n');
        let mut values = [""; 3];
        for (tag, value) in FIELDS.iter().zip(values.iter_mut()) {
            let line = lines.next().ok_or_else(malformed)?;
            *value = line.strip_prefix(tag).ok_or_else(malformed)?;
        }
        check!(lines.next().is_none(), malformed());
        check!(text.ends_with('\n'), malformed());

        Ok(Self {
            location: values[0],
            date: values[1],
            customer: values[2],
        })
    }
}
