// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Networking interfaces.
//!
//! This module provides generic, abstract networking interfaces for moving
//! frames over the shared bus. The bus is modeled as a reliable, addressed
//! transport of opaque byte buffers of at most [`MAX_FRAME_LEN`] bytes;
//! everything below that (clocking, arbitration, acknowledgement) belongs to
//! the integration.
//!
//! The Coordinator talks to the bus through a [`DevicePort`], which can reach
//! every address. A Component talks to the bus through a [`HostPort`], which
//! only ever sees traffic addressed to it.
//!
//! [`DevicePort`]: device/trait.DevicePort.html
//! [`HostPort`]: host/trait.HostPort.html

use arrayvec::ArrayVec;

use crate::io;

pub mod device;
pub mod host;

#[cfg(feature = "std")]
pub mod sim;

/// A bus address.
pub type Address = u8;

/// The largest frame, in bytes, that the bus will carry.
///
/// This is exactly sixteen cipher blocks.
pub const MAX_FRAME_LEN: usize = 256;

/// A received frame.
pub type Frame = ArrayVec<u8, MAX_FRAME_LEN>;

/// A networking error.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// Indicates an underlying I/O error.
    Io(io::Error),
    /// Indicates that the other end of a connection is "disconnected". This
    /// can mean anything from a device being absent to the port being shut
    /// down.
    Disconnected,
    /// Indicates that some operation was done out of order, such as replying
    /// before a request was received.
    OutOfOrder,
    /// Indicates that a frame longer than [`MAX_FRAME_LEN`] was sent or
    /// received.
    FrameTooLarge,
    /// The operation timed out.
    Timeout,
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Copies `bytes` into a new [`Frame`].
pub fn frame(bytes: &[u8]) -> Result<Frame, Error> {
    let mut frame = Frame::new();
    frame
        .try_extend_from_slice(bytes)
        .map_err(|_| failed!(Error::FrameTooLarge))?;
    Ok(frame)
}
