// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Pluggable hardware functionality
//!
//! This module provides traits for plugging in the device-specific pieces a
//! Component needs to answer the Coordinator: its identity, the act of
//! booting, and whatever application receives secure-send data.
//! `warden` calls into these only after a request has passed every check.

use static_assertions::assert_obj_safe;

use crate::protocol::attest::AttestationRecord;
use crate::protocol::DeviceId;

pub mod flash;
pub mod provisioning;

/// Provides access to a Component's identity information.
pub trait Identity {
    /// Returns this Component's device id.
    fn device_id(&self) -> DeviceId;

    /// Returns this Component's attestation data.
    fn attestation(&self) -> AttestationRecord<'_>;
}
assert_obj_safe!(Identity);

/// Provides the boot action of a Component.
pub trait Boot {
    /// Returns the message the Component announces when it boots.
    ///
    /// This travels back to the Coordinator in the boot result.
    fn boot_message(&self) -> &[u8] {
        b""
    }

    /// Boots the Component.
    ///
    /// This is called exactly once, after a boot exchange fully verifies and
    /// its result has been sent.
    fn boot(&self);
}
assert_obj_safe!(Boot);

/// The application endpoint for post-boot secure sends.
pub trait Mailbox {
    /// Handles `incoming` data from the Coordinator, writing any reply into
    /// `reply`.
    ///
    /// Returns the number of reply bytes written.
    fn exchange(&self, incoming: &[u8], reply: &mut [u8]) -> usize;
}
assert_obj_safe!(Mailbox);
