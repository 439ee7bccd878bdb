// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! An in-process simulated bus.
//!
//! [`SimBus`] implements [`DevicePort`] on top of a set of [`Peripheral`]s,
//! each attached at an address. Frames are delivered synchronously: a
//! `send()` runs the addressed peripheral to completion and queues its reply,
//! if any, for a later `receive()`. This lets a Coordinator and several
//! Components run together on a single thread, which is how the test suite
//! and the `tool` simulator drive whole-system scenarios.
//!
//! Requires the `std` feature flag to be enabled.

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::time::Duration;

use crate::net;
use crate::net::device::DevicePort;
use crate::net::Address;
use crate::net::Frame;

/// Something that can sit on a [`SimBus`] and answer frames.
pub trait Peripheral {
    /// Handles a single inbound frame, optionally producing a reply.
    fn on_frame(&mut self, frame: &[u8]) -> Option<Frame>;
}

impl<F> Peripheral for F
where
    F: FnMut(&[u8]) -> Option<Frame>,
{
    fn on_frame(&mut self, frame: &[u8]) -> Option<Frame> {
        self(frame)
    }
}

/// A simulated multi-drop bus.
///
/// See the [module documentation](index.html) for more information.
#[derive(Default)]
pub struct SimBus<'a> {
    peripherals: BTreeMap<Address, Box<dyn Peripheral + 'a>>,
    outbox: VecDeque<(Address, Frame)>,
    queried: Vec<Address>,
    waits: Vec<(Address, Option<Duration>)>,
}

impl<'a> SimBus<'a> {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `peripheral` at `addr`, returning whatever was previously
    /// attached there.
    pub fn attach(
        &mut self,
        addr: Address,
        peripheral: impl Peripheral + 'a,
    ) -> Option<Box<dyn Peripheral + 'a>> {
        self.peripherals.insert(addr, Box::new(peripheral))
    }

    /// Detaches the peripheral at `addr`, if any.
    pub fn detach(&mut self, addr: Address) -> Option<Box<dyn Peripheral + 'a>> {
        self.outbox.retain(|(from, _)| *from != addr);
        self.peripherals.remove(&addr)
    }

    /// Returns every address a frame has been sent to, in order.
    pub fn queried(&self) -> &[Address] {
        &self.queried
    }

    /// Returns every `receive()` made, with the timeout it allowed, in order.
    ///
    /// Delivery is synchronous, so the timeout is never actually waited out;
    /// a reply is either already queued or will never come.
    pub fn waits(&self) -> &[(Address, Option<Duration>)] {
        &self.waits
    }
}

impl DevicePort for SimBus<'_> {
    fn send(&mut self, dest: Address, frame: &[u8]) -> Result<(), net::Error> {
        check!(frame.len() <= net::MAX_FRAME_LEN, net::Error::FrameTooLarge);
        self.queried.push(dest);

        // Nobody home: the frame goes out, but nothing will ever answer.
        let peripheral = match self.peripherals.get_mut(&dest) {
            Some(p) => p,
            None => return Ok(()),
        };
        if let Some(reply) = peripheral.on_frame(frame) {
            self.outbox.push_back((dest, reply));
        }
        Ok(())
    }

    fn receive(
        &mut self,
        from: Address,
        timeout: Option<Duration>,
    ) -> Result<Frame, net::Error> {
        self.waits.push((from, timeout));
        let idx = self
            .outbox
            .iter()
            .position(|(addr, _)| *addr == from)
            .ok_or(net::Error::Timeout)?;
        self.outbox
            .remove(idx)
            .map(|(_, frame)| frame)
            .ok_or(net::Error::Timeout)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn echo_peripheral() {
        let mut bus = SimBus::new();
        bus.attach(0x20, |frame: &[u8]| net::frame(frame).ok());

        bus.send(0x20, b"hello").unwrap();
        bus.send(0x21, b"nobody").unwrap();
        assert_eq!(&bus.receive(0x20, None).unwrap()[..], b"hello");
        assert_eq!(bus.receive(0x20, None), Err(net::Error::Timeout));
        let wait = Some(Duration::from_millis(5));
        assert_eq!(bus.receive(0x21, wait), Err(net::Error::Timeout));
        assert_eq!(bus.queried(), &[0x20, 0x21]);
        assert_eq!(bus.waits().len(), 3);
        assert_eq!(bus.waits()[2], (0x21, wait));
    }

    #[test]
    fn replacing_a_peripheral() {
        let mut bus = SimBus::new();
        bus.attach(0x30, |_: &[u8]| net::frame(b"a").ok());
        assert!(bus.attach(0x30, |_: &[u8]| net::frame(b"b").ok()).is_some());

        bus.send(0x30, b"?").unwrap();
        assert_eq!(&bus.receive(0x30, None).unwrap()[..], b"b");
        assert!(bus.detach(0x30).is_some());
    }
}
