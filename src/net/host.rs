// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Device-to-coordinator communication.
//!
//! See [`HostPort`] for detailed information.

use static_assertions::assert_obj_safe;

use crate::net;
use crate::net::Frame;

/// Represents the physical port a Component listens on.
///
/// A `HostPort` describes a simple state machine: a frame is received, and
/// then at most one reply is sent back to whoever sent it.
/// ```
/// # use warden::net::{*, host::*};
/// fn echo(port: &mut dyn HostPort) -> Result<(), Error> {
///     let frame = port.receive()?;
///     port.reply(&frame)
/// }
/// ```
/// Implementations should return [`net::Error::OutOfOrder`] when a reply is
/// attempted without a pending request, or when a request is replied to
/// twice.
///
/// [`InMemHost`] is a simple implementation meant for testing and for the
/// simulated bus.
pub trait HostPort {
    /// Receives an incoming frame from the Coordinator.
    ///
    /// This function blocks until a frame arrives.
    fn receive(&mut self) -> Result<Frame, net::Error>;

    /// Replies to the most recently received frame.
    fn reply(&mut self, frame: &[u8]) -> Result<(), net::Error>;
}
assert_obj_safe!(HostPort);

/// An in-memory [`HostPort`].
///
/// ```
/// # use warden::net::host::*;
/// let mut host = InMemHost::new();
/// host.request(b"ping").unwrap();
///
/// let frame = host.receive().unwrap();
/// assert_eq!(&frame[..], b"ping");
/// host.reply(b"pong").unwrap();
///
/// assert_eq!(host.take_response().as_deref(), Some(&b"pong"[..]));
/// ```
#[derive(Default)]
pub struct InMemHost {
    rx: Option<Frame>,
    tx: Option<Frame>,
    pending: bool,
}

impl InMemHost {
    /// Creates a new, idle `InMemHost`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules a new frame to be received.
    ///
    /// Calling this function makes `receive()` start working; otherwise, it
    /// reports that the port is disconnected. Any unread response is
    /// discarded.
    pub fn request(&mut self, frame: &[u8]) -> Result<(), net::Error> {
        self.rx = Some(net::frame(frame)?);
        self.tx = None;
        self.pending = false;
        Ok(())
    }

    /// Takes the reply to the most recent request, if one was sent.
    pub fn take_response(&mut self) -> Option<Frame> {
        self.tx.take()
    }
}

impl HostPort for InMemHost {
    fn receive(&mut self) -> Result<Frame, net::Error> {
        let frame = self.rx.take().ok_or(net::Error::Disconnected)?;
        self.pending = true;
        Ok(frame)
    }

    fn reply(&mut self, frame: &[u8]) -> Result<(), net::Error> {
        if !self.pending {
            return Err(net::Error::OutOfOrder);
        }
        self.pending = false;
        self.tx = Some(net::frame(frame)?);
        Ok(())
    }
}
