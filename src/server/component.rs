// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! A `warden` server for a Component.
//!
//! This module provides the request dispatcher a Component runs: it takes
//! frames off a [`HostPort`], and answers scans, boot, attestation and
//! secure-send exchanges.
//!
//! A Component with no session key treats every frame as key
//! synchronization traffic, so no command is ever processed under an
//! undefined key.
//!
//! [`HostPort`]: ../../net/host/trait.HostPort.html

use crate::crypto::cipher::Cipher;
use crate::crypto::csrng::Csrng;
use crate::hardware;
use crate::net::host::HostPort;
use crate::protocol::exchange::Kind;
use crate::protocol::exchange::Responder;
use crate::protocol::scan;
use crate::protocol::secure_send;
use crate::protocol::Message;
use crate::protocol::Opcode;
use crate::protocol::Payload;
use crate::server::Error;
use crate::session;
use crate::session::key_sync::KeyShare;
use crate::session::key_sync::Listener;
use crate::session::key_sync::Masks;
use crate::session::key_sync::Step;
use crate::session::SessionKey;

#[cfg(feature = "std")]
use crate::net::{host::InMemHost, sim::Peripheral, Frame};

/// Options struct for initializing a [`Component`].
pub struct Options<'a, Identity, Boot, Mailbox> {
    /// A handle to the identity of the device.
    pub identity: &'a Identity,
    /// A handle to the device's boot action.
    pub boot: &'a Boot,
    /// A handle to the application receiving secure sends.
    pub mailbox: &'a Mailbox,

    /// The cipher frames are sealed with.
    pub cipher: &'a dyn Cipher,
    /// The source of fresh nonces.
    pub rng: &'a mut dyn Csrng,

    /// This device's private key share.
    pub key_share: KeyShare,
    /// The public key synchronization masks.
    pub masks: Masks,
}

/// A Component server.
///
/// This type implements the request -> response "business logic" of the
/// Coordinator <-> Component interaction.
pub struct Component<'a, Identity, Boot, Mailbox> {
    opts: Options<'a, Identity, Boot, Mailbox>,
    listener: Listener,
    key: Option<SessionKey>,
    pending: Option<Responder>,
    booted: bool,
}

impl<'a, Identity, Boot, Mailbox> Component<'a, Identity, Boot, Mailbox>
where
    Identity: hardware::Identity,
    Boot: hardware::Boot,
    Mailbox: hardware::Mailbox,
{
    /// Create a new `Component` with the given `Options`.
    pub fn new(opts: Options<'a, Identity, Boot, Mailbox>) -> Self {
        Self {
            opts,
            listener: Listener::new(),
            key: None,
            pending: None,
            booted: false,
        }
    }

    /// Returns `true` once a session key is established.
    pub fn is_synchronized(&self) -> bool {
        self.key.is_some()
    }

    /// Returns `true` once this Component has booted.
    pub fn is_booted(&self) -> bool {
        self.booted
    }

    /// Process a single incoming request.
    ///
    /// A request that fails any check gets no reply at all; the error is
    /// returned for the integration to log.
    #[cfg_attr(test, inline(never))]
    pub fn process_request(
        &mut self,
        host_port: &mut dyn HostPort,
    ) -> Result<(), Error> {
        let frame = host_port.receive()?;
        let key = match &self.key {
            Some(key) => key.clone(),
            None => return self.synchronize(host_port, &frame),
        };

        let request = session::open(self.opts.cipher, &key, &frame)?;
        trace!("received {:?} for {}", request.opcode, request.device_id);

        let reply = match request.opcode {
            Opcode::Scan => scan::reply(self.opts.identity.device_id()),
            Opcode::Validate | Opcode::SecureSendValidate => {
                self.on_validate(&request)?
            }
            Opcode::Boot | Opcode::Attest | Opcode::SecureSendConfirm => {
                self.on_confirm(&request)?
            }
            op => return fail!(Error::UnhandledCommand(op)),
        };

        let sealed = session::seal(self.opts.cipher, &key, &reply)?;
        host_port.reply(&sealed)?;

        if reply.opcode == Opcode::Boot {
            info!("booting");
            self.booted = true;
            self.opts.boot.boot();
        }
        Ok(())
    }

    fn synchronize(
        &mut self,
        host_port: &mut dyn HostPort,
        frame: &[u8],
    ) -> Result<(), Error> {
        let step =
            self.listener
                .on_frame(frame, &self.opts.key_share, &self.opts.masks)?;
        match step {
            Step::Reply(share) => host_port.reply(&share)?,
            Step::Established { key, reply } => {
                info!("session key established");
                self.key = Some(key);
                if let Some(share) = reply {
                    host_port.reply(&share)?;
                }
            }
        }
        Ok(())
    }

    fn on_validate(&mut self, request: &Message) -> Result<Message, Error> {
        let own_id = self.opts.identity.device_id();
        let (responder, echo) =
            Responder::accept(request, own_id, &mut *self.opts.rng)?;

        let kind = responder.kind();
        check!(kind != Kind::BOOT || !self.booted, Error::AlreadyBooted);
        check!(kind != Kind::SECURE_SEND || self.booted, Error::NotBooted);

        // A new exchange supersedes any pending one.
        self.pending = Some(responder);
        Ok(echo)
    }

    fn on_confirm(&mut self, request: &Message) -> Result<Message, Error> {
        // The pending exchange is spent whether or not this confirm checks
        // out.
        let responder =
            self.pending.take().ok_or_else(|| failed!(Error::NoExchange))?;
        let confirmed = responder.on_confirm(request)?;

        let payload = match confirmed.kind() {
            Kind::BOOT => Payload::from_slice(self.opts.boot.boot_message())?,
            Kind::ATTEST => self.opts.identity.attestation().to_payload()?,
            _ => {
                let data = secure_send::unframe(confirmed.request())?;
                let mut reply = [0; secure_send::MAX_DATA_LEN];
                let len = self.opts.mailbox.exchange(data, &mut reply);
                secure_send::frame(&reply[..len.min(reply.len())])?
            }
        };
        Ok(confirmed.reply(payload))
    }
}

#[cfg(feature = "std")]
impl<Identity, Boot, Mailbox> Peripheral for Component<'_, Identity, Boot, Mailbox>
where
    Identity: hardware::Identity,
    Boot: hardware::Boot,
    Mailbox: hardware::Mailbox,
{
    fn on_frame(&mut self, frame: &[u8]) -> Option<Frame> {
        let mut host = InMemHost::new();
        host.request(frame).ok()?;
        if let Err(e) = self.process_request(&mut host) {
            warn!(
                "{}: dropped request: {:?}",
                self.opts.identity.device_id(),
                e
            );
        }
        host.take_response()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::cipher::fake::Xor;
    use crate::crypto::csrng::fake::Counter;
    use crate::hardware::fake;
    use crate::net;
    use crate::net::device::DevicePort as _;
    use crate::net::sim::SimBus;
    use crate::protocol;
    use crate::protocol::attest::AttestationRecord;
    use crate::protocol::exchange::Initiator;
    use crate::protocol::DeviceId;
    use crate::session::key_sync;
    use crate::session::key_sync::Role;
    use pretty_assertions::assert_eq;
    use testutil::data::devices;
    use testutil::data::keys;

    const ADDR: net::Address = 0xaa;
    const ID: DeviceId = DeviceId(devices::COMPONENT_A);

    fn masks() -> Masks {
        Masks {
            mask: keys::MASK,
            final_mask: keys::FINAL_MASK,
        }
    }

    struct Hw {
        identity: fake::Identity,
        boot: fake::Boot,
        mailbox: fake::Mailbox,
    }

    impl Hw {
        fn new(id: u32) -> Self {
            Self {
                identity: fake::Identity::new(
                    id,
                    devices::LOCATION,
                    devices::DATE,
                    devices::CUSTOMER,
                ),
                boot: fake::Boot::default(),
                mailbox: fake::Mailbox::default(),
            }
        }

        fn component<'a>(
            &'a self,
            rng: &'a mut Counter,
        ) -> Component<'a, fake::Identity, fake::Boot, fake::Mailbox> {
            Component::new(Options {
                identity: &self.identity,
                boot: &self.boot,
                mailbox: &self.mailbox,
                cipher: &Xor,
                rng,
                key_share: KeyShare::new(keys::COMPONENT_SHARE),
                masks: masks(),
            })
        }
    }

    /// A bare-bones Coordinator, driving the bus one message at a time.
    struct Driver<'a> {
        bus: SimBus<'a>,
        key: SessionKey,
        rng: Counter,
    }

    impl<'a> Driver<'a> {
        fn new(component: impl Peripheral + 'a) -> Self {
            let mut bus = SimBus::new();
            bus.attach(ADDR, component);
            let key = key_sync::synchronize(
                &mut bus,
                ADDR,
                Role::Initiator,
                &KeyShare::new(keys::COORDINATOR_SHARE),
                &masks(),
                None,
            )
            .unwrap();
            Self {
                bus,
                key,
                rng: Counter(0x10),
            }
        }

        fn send(&mut self, message: &Message) -> Option<Message> {
            let sealed = session::seal(&Xor, &self.key, message).unwrap();
            self.bus.send(ADDR, &sealed).unwrap();
            let reply = self.bus.receive(ADDR, None).ok()?;
            Some(session::open(&Xor, &self.key, &reply).unwrap())
        }

        fn exchange(
            &mut self,
            kind: Kind,
            id: DeviceId,
            payload: Payload,
        ) -> Result<Payload, protocol::Error> {
            let (mut init, validate) =
                Initiator::start(kind, id, &mut self.rng).unwrap();
            let echo = self.send(&validate).ok_or(protocol::Error::OutOfOrder)?;
            init.on_echo(&echo)?;
            let confirm = init.confirm(payload)?;
            let result = self.send(&confirm).ok_or(protocol::Error::OutOfOrder)?;
            init.on_result(&result)
        }
    }

    #[test]
    fn scan_before_and_after_sync() {
        let hw = Hw::new(devices::COMPONENT_A);
        let mut rng = Counter(0x80);
        let mut component = hw.component(&mut rng);

        // An unsynchronized Component does not understand commands.
        let mut host = InMemHost::new();
        host.request(&scan::request().encode()).unwrap();
        assert!(component.process_request(&mut host).is_err());
        assert!(host.take_response().is_none());
        assert!(!component.is_synchronized());

        let mut driver = Driver::new(component);
        let reply = driver.send(&scan::request()).unwrap();
        assert_eq!(scan::parse_reply(&reply), Ok(ID));
    }

    #[test]
    fn boot() {
        let hw = Hw::new(devices::COMPONENT_A);
        let mut rng = Counter(0x80);
        let mut driver = Driver::new(hw.component(&mut rng));

        let result = driver.exchange(Kind::BOOT, ID, Payload::empty()).unwrap();
        assert_eq!(result.until_nul(), b"booted");
        assert_eq!(hw.boot.boots(), 1);

        // Booting twice is refused.
        assert!(driver.exchange(Kind::BOOT, ID, Payload::empty()).is_err());
        assert_eq!(hw.boot.boots(), 1);
    }

    #[test]
    fn boot_for_someone_else() {
        let hw = Hw::new(devices::COMPONENT_A);
        let mut rng = Counter(0x80);
        let mut driver = Driver::new(hw.component(&mut rng));

        let other = DeviceId(devices::COMPONENT_B);
        let (_, validate) =
            Initiator::start(Kind::BOOT, other, &mut Counter(0)).unwrap();
        assert!(driver.send(&validate).is_none());
        assert_eq!(hw.boot.boots(), 0);
    }

    #[test]
    fn replayed_confirm_is_dropped() {
        let hw = Hw::new(devices::COMPONENT_A);
        let mut rng = Counter(0x80);
        let mut driver = Driver::new(hw.component(&mut rng));

        let (mut init, validate) =
            Initiator::start(Kind::ATTEST, ID, &mut Counter(0)).unwrap();
        let echo = driver.send(&validate).unwrap();
        init.on_echo(&echo).unwrap();
        let confirm = init.confirm(Payload::empty()).unwrap();
        assert!(driver.send(&confirm).is_some());

        // Same confirm again: no exchange is pending any more.
        assert!(driver.send(&confirm).is_none());

        // Same confirm against a fresh exchange: stale nonce_y.
        let (_, validate) =
            Initiator::start(Kind::ATTEST, ID, &mut Counter(0)).unwrap();
        driver.send(&validate).unwrap();
        assert!(driver.send(&confirm).is_none());
    }

    #[test]
    fn attest() {
        let hw = Hw::new(devices::COMPONENT_A);
        let mut rng = Counter(0x80);
        let mut driver = Driver::new(hw.component(&mut rng));

        let result = driver.exchange(Kind::ATTEST, ID, Payload::empty()).unwrap();
        assert_eq!(
            AttestationRecord::parse(&result),
            Ok(AttestationRecord {
                location: devices::LOCATION,
                date: devices::DATE,
                customer: devices::CUSTOMER,
            })
        );
    }

    #[test]
    fn secure_send_requires_boot() {
        let hw = Hw::new(devices::COMPONENT_A);
        let mut rng = Counter(0x80);
        let mut driver = Driver::new(hw.component(&mut rng));

        let data = secure_send::frame(b"hello").unwrap();
        assert!(driver.exchange(Kind::SECURE_SEND, ID, data).is_err());
        assert!(hw.mailbox.received().is_empty());

        driver.exchange(Kind::BOOT, ID, Payload::empty()).unwrap();
        let reply = driver.exchange(Kind::SECURE_SEND, ID, data).unwrap();
        assert_eq!(secure_send::unframe(&reply), Ok(&b"olleh"[..]));
        assert_eq!(hw.mailbox.received(), vec![b"hello".to_vec()]);
    }

    #[test]
    fn unknown_frames_are_dropped() {
        let hw = Hw::new(devices::COMPONENT_A);
        let mut rng = Counter(0x80);
        let mut driver = Driver::new(hw.component(&mut rng));

        assert!(driver
            .send(&Message::new(Opcode::None, ID))
            .is_none());

        // Garbage that does not decrypt to a known opcode.
        driver.bus.send(ADDR, &[0x5a; net::MAX_FRAME_LEN]).unwrap();
        driver.bus.send(ADDR, &[0x5a; 3]).unwrap();
        assert_eq!(driver.bus.receive(ADDR, None), Err(net::Error::Timeout));

        // The Component is still fine.
        let reply = driver.send(&scan::request()).unwrap();
        assert_eq!(reply.device_id, ID);
    }
}
