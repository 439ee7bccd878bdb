// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! `warden` "server" implementations
//!
//! A `warden` "server" is software running on a Component which responds to
//! incoming requests from the Coordinator.
//!
//! An integration builds a [`Component`] out of its [`hardware`] hooks and
//! secrets, then calls [`Component::process_request()`] in a loop, once per
//! frame received on its [`HostPort`].
//!
//! [`Component`]: component/struct.Component.html
//! [`Component::process_request()`]: component/struct.Component.html#method.process_request
//! [`hardware`]: ../hardware/index.html
//! [`HostPort`]: ../net/host/trait.HostPort.html

use crate::net;
use crate::protocol;
use crate::protocol::wire;
use crate::protocol::Opcode;
use crate::session;

pub mod component;

/// An error returned while processing a request.
///
/// None of these are fatal: the offending frame is dropped without a reply,
/// and the Component goes on to the next one.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// Indicates an error originating from a network connection.
    Network(net::Error),

    /// Indicates a failure during key synchronization, or while sealing or
    /// unsealing a frame.
    Session(session::Error),

    /// Indicates that a request failed a protocol check.
    Protocol(protocol::Error),

    /// Indicates a request that is only valid after boot.
    NotBooted,

    /// Indicates a second boot request.
    AlreadyBooted,

    /// Indicates a confirm message with no exchange pending.
    NoExchange,

    /// Indicates that a request could not be handled, because no handler
    /// exists for its opcode.
    UnhandledCommand(Opcode),
}

impl From<net::Error> for Error {
    fn from(e: net::Error) -> Error {
        Error::Network(e)
    }
}

impl From<session::Error> for Error {
    fn from(e: session::Error) -> Error {
        Error::Session(e)
    }
}

impl From<protocol::Error> for Error {
    fn from(e: protocol::Error) -> Error {
        Error::Protocol(e)
    }
}

impl From<wire::Error> for Error {
    fn from(e: wire::Error) -> Error {
        Error::Protocol(e.into())
    }
}
