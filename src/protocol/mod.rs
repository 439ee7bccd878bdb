// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Bus protocol messages.
//!
//! Every frame on the bus, once unsealed, is a fixed-size [`Message`]
//! consisting of:
//! - An [`Opcode`], naming the operation.
//! - A [`DeviceId`], naming the Component the message is about.
//! - Two [`Nonce`]s: `nonce_z`, the Coordinator's challenge, and `nonce_y`,
//!   the Component's counter-challenge.
//! - A [`Payload`], interpreted according to the opcode.
//!
//! Authenticated commands (boot, attestation and secure send) all run the
//! same four-message freshness-checked handshake, implemented by the
//! [`exchange` module]; the remaining submodules describe the payloads each
//! command carries.
//!
//! In addition to providing (de)serialization to and from the bus frame
//! format (via the [`wire` module]), the `serde` feature provides relevant
//! implementations of [`serde`] traits for opcodes and device ids, for use in
//! human-readable formats like JSON.
//!
//! [`exchange` module]: exchange/index.html
//! [`wire` module]: wire/index.html
//! [`serde`]: https://serde.rs

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::crypto::csrng;

#[macro_use]
pub mod wire;

pub mod attest;
pub mod exchange;
pub mod scan;
pub mod secure_send;

mod device_id;
pub use device_id::DeviceId;

mod message;
pub use message::Message;
pub use message::Payload;
pub use message::PAYLOAD_LEN;

mod nonce;
pub use nonce::Nonce;
pub use nonce::NONCE_LEN;

wire_enum! {
    /// A bus operation.
    ///
    /// This enum represents every opcode a [`Message`] may carry.
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub enum Opcode: u8 {
        /// No operation; never sent by a well-behaved party.
        None = 0x00,
        /// A request for the identity of whatever sits at an address.
        ///
        /// See [`scan`](scan/index.html).
        Scan = 0x01,
        /// The opening half of a boot or attestation exchange.
        Validate = 0x02,
        /// The confirming half of a boot exchange.
        Boot = 0x03,
        /// The confirming half of an attestation exchange.
        ///
        /// See [`attest`](attest/index.html).
        Attest = 0x04,
        /// The opening half of a secure-send exchange.
        SecureSendValidate = 0x05,
        /// The confirming half of a secure-send exchange.
        ///
        /// See [`secure_send`](secure_send/index.html).
        SecureSendConfirm = 0x06,
    }
}

/// A protocol error.
///
/// These errors are produced while building or checking messages; they say
/// nothing about how the message got from one party to the other.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Error {
    /// Indicates that a message could not be parsed.
    Malformed(wire::Error),
    /// Indicates that a reply carried a nonce other than the one expected,
    /// such as a replayed reply.
    NonceMismatch,
    /// Indicates that a message named a device other than the one expected.
    IdentityMismatch,
    /// Indicates that a message carried an opcode other than the one
    /// expected.
    UnexpectedOpcode {
        /// The opcode the exchange expected.
        expected: Opcode,
        /// The opcode actually received.
        found: Opcode,
    },
    /// Indicates that caller data did not fit in a payload.
    PayloadTooLarge,
    /// Indicates that fresh nonce material could not be generated.
    Entropy(csrng::Error),
    /// Indicates that an exchange operation was called in the wrong state.
    OutOfOrder,
}

impl From<wire::Error> for Error {
    fn from(e: wire::Error) -> Self {
        match e {
            wire::Error::PayloadTooLarge => Self::PayloadTooLarge,
            e => Self::Malformed(e),
        }
    }
}

impl From<csrng::Error> for Error {
    fn from(e: csrng::Error) -> Self {
        Self::Entropy(e)
    }
}
