// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Masked-share key synchronization.
//!
//! Every party holds a private [`KeyShare`] and a pair of public [`Masks`].
//! Two parties agree on `initiator_share ^ responder_share` as their session
//! key, without either share ever crossing the bus in the clear:
//! 1. The Responder sends `responder_share ^ mask`.
//! 2. The Initiator derives `peer ^ initiator_share ^ mask`, and sends
//!    `initiator_share ^ final_mask`.
//! 3. The Responder derives `responder_share ^ peer ^ final_mask`.
//!
//! The Coordinator always opens. Its first frame is [`OPEN_FRAME_LEN`] bytes:
//! a share slot (zeroes if the Coordinator is the Initiator, its masked share
//! if it is the Responder) followed by a [`Role`] flag naming the role the
//! *receiving Component* plays. Every later frame is a bare
//! [`SHARE_LEN`]-byte share.
//!
//! # Security
//!
//! The masks are static and the scheme is linear: anyone who sees both
//! transmitted values and knows the masks can XOR the key back out. This
//! protects the key only against an observer who sees one direction of the
//! traffic. Where eavesdroppers matter, this module should be replaced by an
//! authenticated key exchange.

use core::fmt;
use core::time::Duration;

use zeroize::Zeroize;
use zeroize::ZeroizeOnDrop;

use crate::net::device::DevicePort;
use crate::net::Address;
use crate::session::Error;
use crate::session::SessionKey;

/// The width, in bytes, of a key share.
pub const SHARE_LEN: usize = 16;

/// The width, in bytes, of the opening frame.
pub const OPEN_FRAME_LEN: usize = SHARE_LEN + 1;

/// A raw share frame.
pub type Share = [u8; SHARE_LEN];

/// A role in key synchronization.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Role {
    /// Derives the key first, from the Responder's masked share.
    Initiator,
    /// Offers its masked share first, and derives the key last.
    Responder,
}

impl Role {
    /// Returns the flag byte naming this role on the wire.
    pub fn flag(self) -> u8 {
        match self {
            Self::Initiator => b'1',
            Self::Responder => b'2',
        }
    }

    /// Parses a role flag byte.
    pub fn from_flag(flag: u8) -> Result<Self, Error> {
        match flag {
            b'1' => Ok(Self::Initiator),
            b'2' => Ok(Self::Responder),
            b => fail!(Error::BadRole(b)),
        }
    }

    /// Returns the role the other party plays.
    pub fn peer(self) -> Self {
        match self {
            Self::Initiator => Self::Responder,
            Self::Responder => Self::Initiator,
        }
    }
}

/// A private key share.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyShare(Share);

impl KeyShare {
    /// Wraps raw share bytes.
    pub fn new(bytes: Share) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for KeyShare {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("KeyShare(<redacted>)")
    }
}

/// The public masks applied to shares in flight.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Masks {
    /// Applied to the Responder's share.
    pub mask: Share,
    /// Applied to the Initiator's share.
    pub final_mask: Share,
}

fn xor(a: &Share, b: &Share) -> Share {
    let mut out = *a;
    for (o, b) in out.iter_mut().zip(b) {
        *o ^= b;
    }
    out
}

fn share_of(frame: &[u8], expected: usize) -> Result<Share, Error> {
    let found = frame.len();
    check!(found == expected, Error::KeyShareLength { expected, found });

    let mut share = [0; SHARE_LEN];
    share.copy_from_slice(&frame[..SHARE_LEN]);
    Ok(share)
}

/// Derives the key on the Initiator side, from the Responder's masked share.
fn initiator_key(own: &KeyShare, peer: &Share, masks: &Masks) -> SessionKey {
    let mut key = xor(peer, &own.0);
    key = xor(&key, &masks.mask);
    SessionKey::new(key)
}

/// Derives the key on the Responder side, from the Initiator's final share.
fn responder_key(own: &KeyShare, peer: &Share, masks: &Masks) -> SessionKey {
    let key = xor(&xor(&own.0, peer), &masks.final_mask);
    SessionKey::new(key)
}

/// Runs key synchronization with the Component at `addr`, with the
/// Coordinator playing `role`.
///
/// Any failure leaves no key behind; the whole handshake must then be run
/// again from the start.
pub fn synchronize(
    port: &mut dyn DevicePort,
    addr: Address,
    role: Role,
    share: &KeyShare,
    masks: &Masks,
    timeout: Option<Duration>,
) -> Result<SessionKey, Error> {
    info!("synchronizing keys with {:#04x} as {:?}", addr, role);

    let mut open = [0; OPEN_FRAME_LEN];
    open[SHARE_LEN] = role.peer().flag();
    if role == Role::Responder {
        open[..SHARE_LEN].copy_from_slice(&xor(&share.0, &masks.mask));
    }
    port.send(addr, &open)?;

    let reply = port.receive(addr, timeout)?;
    let peer = share_of(&reply, SHARE_LEN)?;
    match role {
        Role::Initiator => {
            let key = initiator_key(share, &peer, masks);
            port.send(addr, &xor(&share.0, &masks.final_mask))?;
            Ok(key)
        }
        Role::Responder => Ok(responder_key(share, &peer, masks)),
    }
}

/// What a [`Listener`] wants done after a frame.
#[derive(Debug)]
pub enum Step {
    /// Reply with this share and keep listening.
    Reply(Share),
    /// The key is established; send `reply`, if any, and stop listening.
    Established {
        /// The derived session key.
        key: SessionKey,
        /// The final frame to send back, if this side owes one.
        reply: Option<Share>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum State {
    AwaitingOpen,
    AwaitingFinal,
}

/// The Component side of key synchronization.
///
/// A `Listener` consumes frames until a key is established. Any bad frame
/// resets it, so the Coordinator must start over.
#[derive(Debug)]
pub struct Listener {
    state: State,
}

impl Default for Listener {
    fn default() -> Self {
        Self::new()
    }
}

impl Listener {
    /// Creates a listener waiting for an opening frame.
    pub fn new() -> Self {
        Self {
            state: State::AwaitingOpen,
        }
    }

    /// Processes one inbound key-sync frame.
    ///
    /// An opening frame always starts the handshake over, even while a final
    /// share is expected.
    pub fn on_frame(
        &mut self,
        frame: &[u8],
        share: &KeyShare,
        masks: &Masks,
    ) -> Result<Step, Error> {
        let state = self.state;
        self.state = State::AwaitingOpen;
        match state {
            State::AwaitingFinal if frame.len() != OPEN_FRAME_LEN => {
                let peer = share_of(frame, SHARE_LEN)?;
                Ok(Step::Established {
                    key: responder_key(share, &peer, masks),
                    reply: None,
                })
            }
            _ => self.on_open(frame, share, masks),
        }
    }

    fn on_open(
        &mut self,
        frame: &[u8],
        share: &KeyShare,
        masks: &Masks,
    ) -> Result<Step, Error> {
        let peer = share_of(frame, OPEN_FRAME_LEN)?;
        match Role::from_flag(frame[SHARE_LEN])? {
            Role::Responder => {
                self.state = State::AwaitingFinal;
                Ok(Step::Reply(xor(&share.0, &masks.mask)))
            }
            Role::Initiator => Ok(Step::Established {
                key: initiator_key(share, &peer, masks),
                reply: Some(xor(&share.0, &masks.final_mask)),
            }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::net;
    use crate::net::sim::SimBus;
    use crate::crypto::csrng::fake::Counter;
    use crate::crypto::csrng::Csrng as _;
    use crate::net::Frame;
    use testutil::data::keys;

    fn masks() -> Masks {
        Masks {
            mask: keys::MASK,
            final_mask: keys::FINAL_MASK,
        }
    }

    fn expected_key() -> SessionKey {
        SessionKey::new(xor(&keys::COORDINATOR_SHARE, &keys::COMPONENT_SHARE))
    }

    /// Runs a `Listener` behind a simulated bus address.
    fn component<'a>(
        listener: &'a mut Listener,
        key: &'a mut Option<SessionKey>,
        share: KeyShare,
        masks: Masks,
    ) -> impl FnMut(&[u8]) -> Option<Frame> + 'a {
        move |frame: &[u8]| match listener.on_frame(frame, &share, &masks) {
            Ok(Step::Reply(reply)) => net::frame(&reply).ok(),
            Ok(Step::Established { key: k, reply }) => {
                *key = Some(k);
                reply.and_then(|r| net::frame(&r).ok())
            }
            Err(_) => None,
        }
    }

    fn draw(rng: &mut Counter) -> Share {
        let mut share = [0; SHARE_LEN];
        rng.fill(&mut share).unwrap();
        share
    }

    #[test]
    fn agreement_in_both_roles() {
        for seed in (0..=255).step_by(17) {
            let mut rng = Counter(seed);
            let coordinator_share = draw(&mut rng);
            rng.0 = rng.0.wrapping_mul(7);
            let component_share = draw(&mut rng);
            rng.0 = rng.0.wrapping_mul(13);
            let masks = Masks {
                mask: draw(&mut rng),
                final_mask: draw(&mut rng),
            };
            let expected =
                SessionKey::new(xor(&coordinator_share, &component_share));

            for &role in &[Role::Initiator, Role::Responder] {
                let mut listener = Listener::new();
                let mut component_key = None;
                let coordinator_key = {
                    let mut bus = SimBus::new();
                    bus.attach(
                        0x24,
                        component(
                            &mut listener,
                            &mut component_key,
                            KeyShare::new(component_share),
                            masks,
                        ),
                    );
                    synchronize(
                        &mut bus,
                        0x24,
                        role,
                        &KeyShare::new(coordinator_share),
                        &masks,
                        None,
                    )
                    .unwrap()
                };

                assert_eq!(coordinator_key, expected, "{} {:?}", seed, role);
                assert_eq!(component_key, Some(expected.clone()), "{} {:?}", seed, role);
            }
        }
    }

    #[test]
    fn agreement_with_fixed_shares() {
        let mut listener = Listener::new();
        let mut component_key = None;
        let coordinator_key = {
            let mut bus = SimBus::new();
            bus.attach(
                0x24,
                component(
                    &mut listener,
                    &mut component_key,
                    KeyShare::new(keys::COMPONENT_SHARE),
                    masks(),
                ),
            );
            synchronize(
                &mut bus,
                0x24,
                Role::Initiator,
                &KeyShare::new(keys::COORDINATOR_SHARE),
                &masks(),
                None,
            )
            .unwrap()
        };
        assert_eq!(coordinator_key, expected_key());
        assert_eq!(component_key, Some(expected_key()));
    }

    #[test]
    fn open_restarts_handshake() {
        let share = KeyShare::new(keys::COMPONENT_SHARE);
        let mut listener = Listener::new();
        let mut open = [0; OPEN_FRAME_LEN];
        open[SHARE_LEN] = Role::Responder.flag();

        // The Coordinator never saw the first reply, and starts over.
        assert!(matches!(
            listener.on_frame(&open, &share, &masks()),
            Ok(Step::Reply(_))
        ));
        assert!(matches!(
            listener.on_frame(&open, &share, &masks()),
            Ok(Step::Reply(_))
        ));

        let last = xor(&keys::COORDINATOR_SHARE, &keys::FINAL_MASK);
        match listener.on_frame(&last, &share, &masks()) {
            Ok(Step::Established { key, reply: None }) => {
                assert_eq!(key, expected_key())
            }
            other => panic!("unexpected step: {:?}", other),
        }
    }

    #[test]
    fn opening_frame_layout() {
        let mut sent = Vec::new();
        {
            let mut bus = SimBus::new();
            bus.attach(0x24, |frame: &[u8]| {
                sent.push(frame.to_vec());
                None
            });
            let err = synchronize(
                &mut bus,
                0x24,
                Role::Initiator,
                &KeyShare::new(keys::COORDINATOR_SHARE),
                &masks(),
                None,
            );
            assert_eq!(err.unwrap_err(), Error::Link(net::Error::Timeout));
        }

        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].len(), OPEN_FRAME_LEN);
        assert_eq!(&sent[0][..SHARE_LEN], &[0; SHARE_LEN]);
        assert_eq!(sent[0][SHARE_LEN], b'2');
    }

    #[test]
    fn wrong_width_aborts() {
        let share = KeyShare::new(keys::COMPONENT_SHARE);
        let mut listener = Listener::new();

        assert_eq!(
            listener.on_frame(&[0; SHARE_LEN], &share, &masks()).unwrap_err(),
            Error::KeyShareLength {
                expected: OPEN_FRAME_LEN,
                found: SHARE_LEN
            }
        );

        let mut open = [0; OPEN_FRAME_LEN];
        open[SHARE_LEN] = Role::Responder.flag();
        assert!(matches!(
            listener.on_frame(&open, &share, &masks()),
            Ok(Step::Reply(_))
        ));
        assert_eq!(
            listener.on_frame(&[0; 15], &share, &masks()).unwrap_err(),
            Error::KeyShareLength {
                expected: SHARE_LEN,
                found: 15
            }
        );

        // The handshake is not resumed: a final share now is rejected as a
        // malformed opening frame.
        assert!(listener.on_frame(&[0; SHARE_LEN], &share, &masks()).is_err());
    }

    #[test]
    fn wrong_width_on_coordinator() {
        let mut bus = SimBus::new();
        bus.attach(0x24, |_: &[u8]| net::frame(&[0; 8]).ok());
        let err = synchronize(
            &mut bus,
            0x24,
            Role::Responder,
            &KeyShare::new(keys::COORDINATOR_SHARE),
            &masks(),
            None,
        );
        assert_eq!(
            err.unwrap_err(),
            Error::KeyShareLength {
                expected: SHARE_LEN,
                found: 8
            }
        );
    }

    #[test]
    fn bad_role_flag() {
        let share = KeyShare::new(keys::COMPONENT_SHARE);
        let mut open = [0; OPEN_FRAME_LEN];
        open[SHARE_LEN] = b'3';
        assert_eq!(
            Listener::new().on_frame(&open, &share, &masks()).unwrap_err(),
            Error::BadRole(b'3')
        );
    }

    #[test]
    fn eavesdropper_recovers_key() {
        // Documents the weakness of static masks: both transmitted values
        // plus the public masks give away the key.
        let masks = masks();
        let sent_by_responder = xor(&keys::COMPONENT_SHARE, &masks.mask);
        let sent_by_initiator = xor(&keys::COORDINATOR_SHARE, &masks.final_mask);
        let recovered = xor(
            &xor(&sent_by_responder, &masks.mask),
            &xor(&sent_by_initiator, &masks.final_mask),
        );
        assert_eq!(SessionKey::new(recovered), expected_key());
    }
}
