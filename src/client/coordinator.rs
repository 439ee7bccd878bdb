// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! A `warden` client for the Coordinator.
//!
//! The [`Coordinator`] owns the provisioning list and one session key per
//! Component, and drives every operation the bus supports:
//! - [`Coordinator::scan()`] lists what answers on the bus.
//! - [`Coordinator::boot_all()`] validates and boots every provisioned
//!   Component, or none of them.
//! - [`Coordinator::attest()`] fetches a Component's attestation record.
//! - [`Coordinator::replace()`] swaps one provisioned id for another.
//! - [`Coordinator::secure_send()`] exchanges data with a booted Component.
//!
//! Session keys are established lazily: the first operation that needs to
//! talk to a Component synchronizes keys with it, once per process.

use core::time::Duration;

use arrayvec::ArrayVec;
use subtle::ConstantTimeEq as _;

use crate::client::Error;
use crate::crypto::cipher::Cipher;
use crate::crypto::csrng::Csrng;
use crate::hardware::provisioning;
use crate::hardware::provisioning::ProvisioningList;
use crate::hardware::provisioning::MAX_PROVISIONED;
use crate::net::device::DevicePort;
use crate::net::Address;
use crate::protocol::attest::AttestationRecord;
use crate::protocol::exchange::Initiator;
use crate::protocol::exchange::Kind;
use crate::protocol::scan;
use crate::protocol::secure_send;
use crate::protocol::DeviceId;
use crate::protocol::Message;
use crate::protocol::Payload;
use crate::session;
use crate::session::key_sync;
use crate::session::key_sync::KeyShare;
use crate::session::key_sync::Masks;
use crate::session::key_sync::Role;
use crate::session::Keyring;
use crate::session::SessionKey;

/// "Acceptable timeout" lengths for replies.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Timeouts {
    /// The wait for an ordinary reply.
    pub regular: Duration,
    /// The wait for the result of a confirm that makes the Component do
    /// application work, such as a secure send.
    pub confirm: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            regular: Duration::from_millis(100),
            confirm: Duration::from_millis(1000),
        }
    }
}

/// Options struct for initializing a [`Coordinator`].
pub struct Options<'a, Bus, Store> {
    /// The port to the bus.
    pub bus: Bus,
    /// The persistent home of the provisioning list.
    pub store: Store,

    /// The cipher frames are sealed with.
    pub cipher: &'a dyn Cipher,
    /// The source of fresh nonces.
    pub rng: &'a mut dyn Csrng,

    /// The Coordinator's private key share.
    pub key_share: KeyShare,
    /// The public key synchronization masks.
    pub masks: Masks,
    /// The role the Coordinator plays in key synchronization.
    pub sync_role: Role,

    /// The PIN that authorizes attestation.
    pub pin: &'a [u8],
    /// The token that authorizes replacing a Component.
    pub token: &'a [u8],

    /// Reply timeouts.
    pub timeouts: Timeouts,
    /// The list seeded into a blank store.
    pub defaults: &'a [DeviceId],
}

/// The result of a [`Coordinator::scan()`].
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct ScanReport {
    /// Every provisioned id.
    pub provisioned: ArrayVec<DeviceId, MAX_PROVISIONED>,
    /// Every address that answered, with the id it announced.
    pub found: ArrayVec<(Address, DeviceId), { scan::MAX_DEVICES }>,
}

/// The result of a [`Coordinator::boot_all()`].
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct BootReport {
    /// Every Component booted, with the boot message it announced.
    pub booted: ArrayVec<(DeviceId, Payload), MAX_PROVISIONED>,
}

/// The result of a [`Coordinator::attest()`].
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct AttestationReport {
    /// The Component that attested.
    pub device_id: DeviceId,
    /// The raw record it sent.
    pub payload: Payload,
}

impl AttestationReport {
    /// Returns the record exactly as the Component sent it.
    pub fn text(&self) -> &[u8] {
        self.payload.until_nul()
    }

    /// Parses the record into its fields.
    pub fn record(&self) -> Result<AttestationRecord<'_>, Error> {
        Ok(AttestationRecord::parse(&self.payload)?)
    }
}

/// A Coordinator client.
///
/// See the [module documentation](index.html) for more information.
pub struct Coordinator<'a, Bus, Store> {
    opts: Options<'a, Bus, Store>,
    list: ProvisioningList,
    keyring: Keyring,
    booted: ArrayVec<DeviceId, MAX_PROVISIONED>,
}

impl<'a, Bus, Store> Coordinator<'a, Bus, Store>
where
    Bus: DevicePort,
    Store: provisioning::Store,
{
    /// Create a new `Coordinator` with the given `Options`.
    ///
    /// This loads the provisioning list, seeding the store with
    /// `opts.defaults` if it is blank.
    pub fn new(mut opts: Options<'a, Bus, Store>) -> Result<Self, Error> {
        let list = provisioning::load_or_seed(&mut opts.store, opts.defaults)?;
        Ok(Self {
            opts,
            list,
            keyring: Keyring::new(),
            booted: ArrayVec::new(),
        })
    }

    /// Returns the port to the bus.
    pub fn bus(&self) -> &Bus {
        &self.opts.bus
    }

    /// Returns the provisioning store.
    pub fn store(&self) -> &Store {
        &self.opts.store
    }

    /// Returns the provisioned ids, in order.
    pub fn provisioned_ids(&self) -> &[DeviceId] {
        self.list.ids()
    }

    /// Returns `true` if `id` was booted by a successful
    /// [`Coordinator::boot_all()`].
    pub fn is_booted(&self, id: DeviceId) -> bool {
        self.booted.contains(&id)
    }

    /// Synchronizes keys with every provisioned Component that has no key
    /// yet.
    ///
    /// Every Component is attempted; the first failure, if any, is returned.
    pub fn synchronize(&mut self) -> Result<(), Error> {
        let mut result = Ok(());
        for &id in self.list.clone().ids() {
            if let Err(e) = self.session_for(id) {
                warn!("could not synchronize with {}: {:?}", id, e);
                result = result.and(Err(e));
            }
        }
        result
    }

    /// Scans the bus for Components.
    ///
    /// Failures at individual addresses are logged and skipped.
    pub fn scan(&mut self) -> Result<ScanReport, Error> {
        let _ = self.synchronize();

        let mut report = ScanReport::default();
        report.provisioned.extend(self.list.ids().iter().copied());

        for addr in scan::addresses() {
            let key = match self.keyring.key_for(addr) {
                Some(key) => key.clone(),
                None => return fail!(Error::NotSynchronized),
            };
            let timeout = self.opts.timeouts.regular;
            let reply = self
                .transact(&key, addr, &scan::request(), timeout)
                .and_then(|m| Ok(scan::parse_reply(&m)?));
            match reply {
                Ok(id) => {
                    info!("found {} at {:#04x}", id, addr);
                    // Capacity covers the whole scan range.
                    let _ = report.found.try_push((addr, id));
                }
                Err(e) => {
                    trace!("nothing at {:#04x}: {:?}", addr, e);
                }
            }
        }
        Ok(report)
    }

    /// Validates and boots every provisioned Component.
    ///
    /// Every Component is validated before any is told to boot; a single
    /// failure aborts the whole sequence, and nothing is recorded as booted
    /// unless every Component confirms.
    pub fn boot_all(&mut self) -> Result<BootReport, Error> {
        let list = self.list.clone();
        let regular = self.opts.timeouts.regular;

        let mut pending = ArrayVec::<(Initiator, SessionKey), MAX_PROVISIONED>::new();
        for &id in list.ids() {
            let key = self.session_for(id)?;
            let (mut init, validate) =
                Initiator::start(Kind::BOOT, id, &mut *self.opts.rng)?;
            let echo = self.transact(&key, id.address(), &validate, regular)?;
            init.on_echo(&echo)?;
            // Both lists are bounded by the provisioning list.
            let _ = pending.try_push((init, key));
        }

        let mut report = BootReport::default();
        for (mut init, key) in pending {
            let id = init.device_id();
            let confirm = init.confirm(Payload::empty())?;
            let result = self.transact(&key, id.address(), &confirm, regular)?;
            let message = init.on_result(&result)?;
            info!("booted {}", id);
            let _ = report.booted.try_push((id, message));
        }

        self.booted = report.booted.iter().map(|(id, _)| *id).collect();
        Ok(report)
    }

    /// Checks an operator-supplied PIN.
    pub fn check_pin(&self, pin: &[u8]) -> Result<(), Error> {
        check!(
            bool::from(pin.ct_eq(self.opts.pin)),
            Error::AuthorizationFailed
        );
        Ok(())
    }

    /// Requests the attestation record of the Component `id`.
    pub fn attest(&mut self, id: DeviceId) -> Result<AttestationReport, Error> {
        check!(self.list.contains(id), Error::NotProvisioned(id));
        let timeout = self.opts.timeouts.regular;
        let payload = self.exchange(Kind::ATTEST, id, Payload::empty(), timeout)?;
        Ok(AttestationReport {
            device_id: id,
            payload,
        })
    }

    /// Replaces the provisioned Component `old` with `new`, and persists the
    /// new list.
    ///
    /// `token` is checked before anything changes; on any failure, neither
    /// the list nor the store is touched.
    pub fn replace(
        &mut self,
        token: &[u8],
        old: DeviceId,
        new: DeviceId,
    ) -> Result<(), Error> {
        check!(
            bool::from(token.ct_eq(self.opts.token)),
            Error::AuthorizationFailed
        );

        let mut list = self.list.clone();
        list.replace(old, new)?;
        self.opts.store.save(&list)?;
        self.list = list;
        info!("replaced {} with {}", old, new);
        Ok(())
    }

    /// Sends `data` to the booted Component `id`, returning its reply.
    pub fn secure_send(
        &mut self,
        id: DeviceId,
        data: &[u8],
    ) -> Result<ArrayVec<u8, { secure_send::MAX_DATA_LEN }>, Error> {
        check!(self.list.contains(id), Error::NotProvisioned(id));
        check!(self.is_booted(id), Error::NotBooted(id));

        let payload = secure_send::frame(data)?;
        let timeout = self.opts.timeouts.confirm;
        let result = self.exchange(Kind::SECURE_SEND, id, payload, timeout)?;

        let mut reply = ArrayVec::new();
        // `unframe` never yields more than `MAX_DATA_LEN` bytes.
        let _ = reply.try_extend_from_slice(secure_send::unframe(&result)?);
        Ok(reply)
    }

    /// Runs a full exchange with `id`, waiting at most `result_timeout` for
    /// the final result.
    fn exchange(
        &mut self,
        kind: Kind,
        id: DeviceId,
        payload: Payload,
        result_timeout: Duration,
    ) -> Result<Payload, Error> {
        let key = self.session_for(id)?;
        let addr = id.address();

        let (mut init, validate) = Initiator::start(kind, id, &mut *self.opts.rng)?;
        let echo = self.transact(&key, addr, &validate, self.opts.timeouts.regular)?;
        init.on_echo(&echo)?;

        let confirm = init.confirm(payload)?;
        let result = self.transact(&key, addr, &confirm, result_timeout)?;
        Ok(init.on_result(&result)?)
    }

    /// Returns the session key for `id`, synchronizing first if needed.
    fn session_for(&mut self, id: DeviceId) -> Result<SessionKey, Error> {
        let addr = id.address();
        if let Some(key) = self.keyring.get(addr) {
            return Ok(key.clone());
        }

        let key = key_sync::synchronize(
            &mut self.opts.bus,
            addr,
            self.opts.sync_role,
            &self.opts.key_share,
            &self.opts.masks,
            Some(self.opts.timeouts.regular),
        )?;
        self.keyring.insert(addr, key.clone())?;
        Ok(key)
    }

    /// Seals and sends `message` to `addr`, then waits for and unseals the
    /// reply.
    fn transact(
        &mut self,
        key: &SessionKey,
        addr: Address,
        message: &Message,
        timeout: Duration,
    ) -> Result<Message, Error> {
        let sealed = session::seal(self.opts.cipher, key, message)?;
        self.opts.bus.send(addr, &sealed)?;
        let frame = self.opts.bus.receive(addr, Some(timeout))?;
        Ok(session::open(self.opts.cipher, key, &frame)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::cipher::fake::Xor;
    use crate::crypto::csrng::fake::Counter;
    use crate::hardware::fake;
    use crate::hardware::flash::Ram;
    use crate::hardware::provisioning::FlashStore;
    use crate::hardware::provisioning::RECORD_LEN;
    use crate::net;
    use crate::net::sim::Peripheral;
    use crate::net::sim::SimBus;
    use crate::net::Frame;
    use crate::protocol;
    use crate::server::component;
    use crate::server::component::Component;
    use pretty_assertions::assert_eq;
    use testutil::data::devices;
    use testutil::data::keys;

    const A: DeviceId = DeviceId(devices::COMPONENT_A);
    const B: DeviceId = DeviceId(devices::COMPONENT_B);
    const IMPOSTOR: DeviceId = DeviceId(devices::IMPOSTOR);
    const REPLACEMENT: DeviceId = DeviceId(devices::REPLACEMENT);

    type Store = FlashStore<Ram<[u8; RECORD_LEN]>>;

    fn masks() -> Masks {
        Masks {
            mask: keys::MASK,
            final_mask: keys::FINAL_MASK,
        }
    }

    fn blank_store() -> Store {
        FlashStore::new(Ram([0xff; RECORD_LEN]))
    }

    struct Hw {
        identity: fake::Identity,
        boot: fake::Boot,
        mailbox: fake::Mailbox,
    }

    impl Hw {
        fn new(id: DeviceId) -> Self {
            Self {
                identity: fake::Identity::new(
                    id.0,
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
            Component::new(component::Options {
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

    fn coordinator<'a, Bus: DevicePort>(
        bus: Bus,
        store: Store,
        rng: &'a mut Counter,
    ) -> Coordinator<'a, Bus, Store> {
        Coordinator::new(Options {
            bus,
            store,
            cipher: &Xor,
            rng,
            key_share: KeyShare::new(keys::COORDINATOR_SHARE),
            masks: masks(),
            sync_role: Role::Initiator,
            pin: keys::PIN,
            token: keys::TOKEN,
            timeouts: Timeouts::default(),
            defaults: &[A, B],
        })
        .unwrap()
    }

    #[test]
    fn seeds_blank_store() {
        let mut rng = Counter(0x10);
        let c = coordinator(SimBus::new(), blank_store(), &mut rng);
        assert_eq!(c.provisioned_ids(), &[A, B]);

        let mut store = c.opts.store;
        let list = provisioning::Store::load(&mut store).unwrap().unwrap();
        assert_eq!(list.ids(), &[A, B]);
    }

    #[test]
    fn scan() {
        let (hw_a, hw_b) = (Hw::new(A), Hw::new(B));
        let (mut rng_a, mut rng_b) = (Counter(0x80), Counter(0xa0));
        let mut bus = SimBus::new();
        bus.attach(A.address(), hw_a.component(&mut rng_a));
        bus.attach(B.address(), hw_b.component(&mut rng_b));

        let mut rng = Counter(0x10);
        let mut c = coordinator(bus, blank_store(), &mut rng);
        let report = c.scan().unwrap();

        assert_eq!(&report.provisioned[..], &[A, B]);
        assert_eq!(&report.found[..], &[(A.address(), A), (B.address(), B)]);
        for addr in &scan::BLACKLIST {
            assert!(!c.bus().queried().contains(addr));
        }
        assert_eq!(hw_a.boot.boots() + hw_b.boot.boots(), 0);
    }

    #[test]
    fn scan_without_any_component() {
        let mut rng = Counter(0x10);
        let mut c = coordinator(SimBus::new(), blank_store(), &mut rng);
        assert_eq!(c.scan(), Err(Error::NotSynchronized));
    }

    #[test]
    fn boot_all() {
        let (hw_a, hw_b) = (Hw::new(A), Hw::new(B));
        let (mut rng_a, mut rng_b) = (Counter(0x80), Counter(0xa0));
        let mut bus = SimBus::new();
        bus.attach(A.address(), hw_a.component(&mut rng_a));
        bus.attach(B.address(), hw_b.component(&mut rng_b));

        let mut rng = Counter(0x10);
        let mut c = coordinator(bus, blank_store(), &mut rng);
        let report = c.boot_all().unwrap();

        let booted = report.booted.iter().map(|(id, _)| *id).collect::<Vec<_>>();
        assert_eq!(booted, vec![A, B]);
        for (_, message) in &report.booted {
            assert_eq!(message.until_nul(), b"booted");
        }
        assert!(c.is_booted(A));
        assert!(c.is_booted(B));
        assert_eq!(hw_a.boot.boots(), 1);
        assert_eq!(hw_b.boot.boots(), 1);
    }

    #[test]
    fn boot_all_fails_closed() {
        let (hw_a, hw_x) = (Hw::new(A), Hw::new(IMPOSTOR));
        let (mut rng_a, mut rng_x) = (Counter(0x80), Counter(0xa0));
        let mut bus = SimBus::new();
        bus.attach(A.address(), hw_a.component(&mut rng_a));
        // The impostor sits where `B` should be.
        bus.attach(B.address(), hw_x.component(&mut rng_x));

        let mut rng = Counter(0x10);
        let mut c = coordinator(bus, blank_store(), &mut rng);
        assert_eq!(c.boot_all(), Err(Error::Network(net::Error::Timeout)));

        assert!(!c.is_booted(A));
        assert!(!c.is_booted(B));
        assert_eq!(hw_a.boot.boots(), 0);
        assert_eq!(hw_x.boot.boots(), 0);
    }

    #[test]
    fn boot_all_with_missing_component() {
        let hw_a = Hw::new(A);
        let mut rng_a = Counter(0x80);
        let mut bus = SimBus::new();
        bus.attach(A.address(), hw_a.component(&mut rng_a));

        let mut rng = Counter(0x10);
        let mut c = coordinator(bus, blank_store(), &mut rng);
        assert!(c.boot_all().is_err());
        assert_eq!(hw_a.boot.boots(), 0);
    }

    #[test]
    fn attest() {
        let hw_a = Hw::new(A);
        let mut rng_a = Counter(0x80);
        let mut bus = SimBus::new();
        bus.attach(A.address(), hw_a.component(&mut rng_a));

        let mut rng = Counter(0x10);
        let mut c = coordinator(bus, blank_store(), &mut rng);
        assert_eq!(c.check_pin(b"00000000"), Err(Error::AuthorizationFailed));
        assert_eq!(c.check_pin(keys::PIN), Ok(()));

        let report = c.attest(A).unwrap();
        assert_eq!(report.device_id, A);
        assert_eq!(
            report.record().unwrap(),
            AttestationRecord {
                location: devices::LOCATION,
                date: devices::DATE,
                customer: devices::CUSTOMER,
            }
        );
        assert!(report.text().starts_with(b"LOC>"));

        assert_eq!(c.attest(IMPOSTOR), Err(Error::NotProvisioned(IMPOSTOR)));
    }

    #[test]
    fn replayed_result_is_rejected() {
        let hw_a = Hw::new(A);
        let mut rng_a = Counter(0x80);
        let mut component = hw_a.component(&mut rng_a);

        // Replies: the key share, then (echo, result) per exchange. The
        // second exchange's result is swapped for the first one's.
        let mut replies = Vec::<Frame>::new();
        let replayer = move |frame: &[u8]| {
            let reply = component.on_frame(frame)?;
            replies.push(reply.clone());
            if replies.len() == 5 {
                return Some(replies[2].clone());
            }
            Some(reply)
        };

        let mut bus = SimBus::new();
        bus.attach(A.address(), replayer);

        let mut rng = Counter(0x10);
        let mut c = coordinator(bus, blank_store(), &mut rng);
        assert!(c.attest(A).is_ok());
        assert_eq!(
            c.attest(A),
            Err(Error::Protocol(protocol::Error::NonceMismatch))
        );
    }

    #[test]
    fn replace() {
        let mut rng = Counter(0x10);
        let mut c = coordinator(SimBus::new(), blank_store(), &mut rng);

        assert_eq!(
            c.replace(b"not the token", A, REPLACEMENT),
            Err(Error::AuthorizationFailed)
        );
        assert_eq!(
            c.replace(keys::TOKEN, IMPOSTOR, REPLACEMENT),
            Err(Error::NotProvisioned(IMPOSTOR))
        );
        assert_eq!(
            c.replace(keys::TOKEN, A, B),
            Err(Error::Provisioning(provisioning::Error::Duplicate(B)))
        );
        assert_eq!(c.provisioned_ids(), &[A, B]);

        c.replace(keys::TOKEN, A, REPLACEMENT).unwrap();
        assert_eq!(c.provisioned_ids(), &[REPLACEMENT, B]);

        // The new list survives a restart.
        let store = c.opts.store;
        let mut rng = Counter(0x10);
        let c = coordinator(SimBus::new(), store, &mut rng);
        assert_eq!(c.provisioned_ids(), &[REPLACEMENT, B]);
    }

    #[test]
    fn secure_send() {
        let (hw_a, hw_b) = (Hw::new(A), Hw::new(B));
        let (mut rng_a, mut rng_b) = (Counter(0x80), Counter(0xa0));
        let mut bus = SimBus::new();
        bus.attach(A.address(), hw_a.component(&mut rng_a));
        bus.attach(B.address(), hw_b.component(&mut rng_b));

        let mut rng = Counter(0x10);
        let mut c = coordinator(bus, blank_store(), &mut rng);
        assert_eq!(c.secure_send(A, b"hello"), Err(Error::NotBooted(A)));
        assert!(hw_a.mailbox.received().is_empty());

        c.boot_all().unwrap();
        let reply = c.secure_send(A, b"hello").unwrap();
        assert_eq!(&reply[..], b"olleh");
        assert_eq!(hw_a.mailbox.received(), vec![b"hello".to_vec()]);
        assert!(hw_b.mailbox.received().is_empty());

        assert_eq!(
            c.secure_send(A, &[0; secure_send::MAX_DATA_LEN + 1]),
            Err(Error::Protocol(protocol::Error::PayloadTooLarge))
        );
    }

    #[test]
    fn lost_secure_send_result() {
        let (hw_a, hw_b) = (Hw::new(A), Hw::new(B));
        let (mut rng_a, mut rng_b) = (Counter(0x80), Counter(0xa0));
        let mut component_a = hw_a.component(&mut rng_a);

        // Replies: the key share, the boot echo and result, then the
        // secure-send echo and result. The result never makes it back.
        let mut replies = 0;
        let lossy = move |frame: &[u8]| {
            let reply = component_a.on_frame(frame)?;
            replies += 1;
            if replies == 5 {
                return None;
            }
            Some(reply)
        };

        let mut bus = SimBus::new();
        bus.attach(A.address(), lossy);
        bus.attach(B.address(), hw_b.component(&mut rng_b));

        let mut rng = Counter(0x10);
        let mut c = coordinator(bus, blank_store(), &mut rng);
        c.boot_all().unwrap();

        assert_eq!(
            c.secure_send(A, b"hello"),
            Err(Error::Network(net::Error::Timeout))
        );
        let confirm = Timeouts::default().confirm;
        assert_eq!(c.bus().waits().last(), Some(&(A.address(), Some(confirm))));

        // A fresh exchange goes through.
        let reply = c.secure_send(A, b"hi").unwrap();
        assert_eq!(&reply[..], b"ih");
        assert_eq!(
            hw_a.mailbox.received(),
            vec![b"hello".to_vec(), b"hi".to_vec()]
        );
    }
}
