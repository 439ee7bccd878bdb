// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! `warden` "client" implementations
//!
//! A `warden` "client" is software running on the Coordinator, which sends
//! requests to Components over a [`DevicePort`] and checks their replies.
//!
//! [`DevicePort`]: ../net/device/trait.DevicePort.html

use crate::hardware::provisioning;
use crate::net;
use crate::protocol;
use crate::protocol::wire;
use crate::protocol::DeviceId;
use crate::session;

pub mod coordinator;

/// An error returned by a Coordinator operation.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// Indicates an error originating from the bus.
    Network(net::Error),

    /// Indicates a failure during key synchronization, or while sealing or
    /// unsealing a frame.
    Session(session::Error),

    /// Indicates that a reply failed a protocol check.
    Protocol(protocol::Error),

    /// Indicates a failure of the provisioning store.
    Provisioning(provisioning::Error),

    /// Indicates that a PIN or token did not match.
    AuthorizationFailed,

    /// Indicates an operation on a Component that is not provisioned.
    NotProvisioned(DeviceId),

    /// Indicates an operation that requires a booted Component.
    NotBooted(DeviceId),

    /// Indicates that no session key exists yet to address the bus with.
    NotSynchronized,
}

impl From<net::Error> for Error {
    fn from(e: net::Error) -> Error {
        Error::Network(e)
    }
}

impl From<session::Error> for Error {
    fn from(e: session::Error) -> Error {
        match e {
            session::Error::Link(e) => Error::Network(e),
            e => Error::Session(e),
        }
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

impl From<provisioning::Error> for Error {
    fn from(e: provisioning::Error) -> Error {
        match e {
            provisioning::Error::NotProvisioned(id) => Error::NotProvisioned(id),
            e => Error::Provisioning(e),
        }
    }
}
