// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Coordinator-to-device communication.
//!
//! See [`DevicePort`].

use core::time::Duration;

use static_assertions::assert_obj_safe;

use crate::net;
use crate::net::Address;
use crate::net::Frame;

/// Represents a physical port that the Coordinator uses to reach
/// Components.
///
/// Every transaction is a `send()` to some address, optionally followed by a
/// `receive()` from that same address. The port does not interpret frames in
/// any way.
pub trait DevicePort {
    /// Sends `frame` to the device at `dest`.
    ///
    /// This should block until the operation is complete. A device that is
    /// absent from the bus may either fail the send with
    /// [`net::Error::Disconnected`] or simply never reply.
    fn send(&mut self, dest: Address, frame: &[u8]) -> Result<(), net::Error>;

    /// Waits for a frame from the device at `from`.
    ///
    /// `timeout` bounds the wait; `None` waits indefinitely. If no frame
    /// arrives in time, [`net::Error::Timeout`] is returned.
    fn receive(
        &mut self,
        from: Address,
        timeout: Option<Duration>,
    ) -> Result<Frame, net::Error>;
}
assert_obj_safe!(DevicePort);

impl<P: DevicePort + ?Sized> DevicePort for &mut P {
    fn send(&mut self, dest: Address, frame: &[u8]) -> Result<(), net::Error> {
        P::send(*self, dest, frame)
    }

    fn receive(
        &mut self,
        from: Address,
        timeout: Option<Duration>,
    ) -> Result<Frame, net::Error> {
        P::receive(*self, from, timeout)
    }
}
