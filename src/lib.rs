// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! `warden` secures a single multi-drop bus shared by one trusted
//! *Coordinator* and a set of peripheral *Components*.
//!
//! Before the Coordinator lets a Component run, it confirms the Component's
//! identity, the freshness of the exchange and the integrity of the boot
//! authorization. The crate is organized in layers, leaves first:
//!
//! - [`net`] abstracts the bus as a reliable, addressed frame transport.
//! - [`crypto`] holds the pluggable block cipher and entropy traits.
//! - [`protocol`] defines the fixed-size wire [`Message`] and the
//!   freshness-checked exchange that every authenticated command runs.
//! - [`session`] derives session keys with the masked-share handshake and
//!   seals frames under them.
//! - [`client`] is the Coordinator, [`server`] is the Component.
//!
//! Like the transport, the cipher, the entropy source and persistent storage
//! are supplied by the integration through traits; software implementations
//! live behind the `ring` and `aes` feature flags.
//!
//! [`Message`]: protocol::Message

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

#[macro_use]
mod debug;

#[macro_use]
pub mod protocol;

pub mod client;
pub mod crypto;
pub mod hardware;
pub mod io;
pub mod net;
pub mod server;
pub mod session;
