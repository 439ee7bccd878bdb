// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! The freshness-checked exchange.
//!
//! Every authenticated command is a four-message handshake between an
//! [`Initiator`] (the Coordinator) and a [`Responder`] (a Component):
//! ```text
//! Initiator                               Responder
//!     | -- validate {id, nonce_z} ------------> |  check id, draw nonce_y
//!     | <------------ validate {id, nonce_z, nonce_y}
//!     | -- confirm {id, nonce_z, nonce_y, data} |  check both nonces, act
//!     | <------------ confirm {id, nonce_z, nonce_y, reply}
//! ```
//! Each side only acts on a message that carries the nonce it drew for this
//! exchange, so a captured message cannot be replayed into a later one.
//!
//! The payload of the validate message carries the confirm opcode the
//! initiator intends to send, so the responder is bound to a single command
//! before any nonce is drawn.
//!
//! Neither side retries. A failed exchange is abandoned, and a new one draws
//! new nonces.

use crate::crypto::csrng::Csrng;
use crate::protocol::wire::WireEnum as _;
use crate::protocol::DeviceId;
use crate::protocol::Error;
use crate::protocol::Message;
use crate::protocol::Nonce;
use crate::protocol::Opcode;
use crate::protocol::Payload;

/// A kind of exchange: a pair of validate and confirm opcodes.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Kind {
    /// The opcode of the opening half.
    pub validate: Opcode,
    /// The opcode of the confirming half.
    pub confirm: Opcode,
}

impl Kind {
    /// Validate-and-boot.
    pub const BOOT: Self = Self {
        validate: Opcode::Validate,
        confirm: Opcode::Boot,
    };

    /// Attestation.
    pub const ATTEST: Self = Self {
        validate: Opcode::Validate,
        confirm: Opcode::Attest,
    };

    /// Post-boot secure send.
    pub const SECURE_SEND: Self = Self {
        validate: Opcode::SecureSendValidate,
        confirm: Opcode::SecureSendConfirm,
    };

    const ALL: [Self; 3] = [Self::BOOT, Self::ATTEST, Self::SECURE_SEND];

    /// Looks up the kind a validate message asks for.
    fn requested_by(validate: &Message) -> Result<Self, Error> {
        let intent = Opcode::from_wire_value(validate.payload.as_bytes()[0]);
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.validate == validate.opcode && Some(k.confirm) == intent)
            .ok_or_else(|| {
                failed!(Error::UnexpectedOpcode {
                    expected: Opcode::Validate,
                    found: validate.opcode,
                })
            })
    }
}

/// The state of an [`Initiator`].
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum State {
    /// No message has been sent yet.
    Start,
    /// The validate message is out; waiting for its echo.
    AwaitingEcho,
    /// The echo verified; the confirm message may be built.
    AwaitingConfirm,
    /// The confirm message is out; waiting for the result.
    AwaitingResult,
    /// The result verified.
    Done,
    /// Something failed; the exchange cannot continue.
    Failed,
}

/// The initiating side of an exchange.
#[derive(Clone, Debug)]
pub struct Initiator {
    kind: Kind,
    device_id: DeviceId,
    nonce_z: Nonce,
    nonce_y: Nonce,
    state: State,
}

impl Initiator {
    /// Starts a new exchange of the given kind with `device_id`.
    ///
    /// Returns the initiator along with the validate message to send.
    pub fn start(
        kind: Kind,
        device_id: DeviceId,
        rng: &mut dyn Csrng,
    ) -> Result<(Self, Message), Error> {
        let mut initiator = Self {
            kind,
            device_id,
            nonce_z: Nonce::ZERO,
            nonce_y: Nonce::ZERO,
            state: State::Start,
        };
        initiator.nonce_z = Nonce::generate(rng)?;

        let mut validate = Message::new(kind.validate, device_id);
        validate.nonce_z = initiator.nonce_z;
        validate.payload.as_bytes_mut()[0] = kind.confirm.to_wire_value();

        initiator.state = State::AwaitingEcho;
        Ok((initiator, validate))
    }

    /// Returns the current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Returns the kind of this exchange.
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Returns the Component this exchange is with.
    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// Checks the responder's echo of the validate message.
    pub fn on_echo(&mut self, echo: &Message) -> Result<(), Error> {
        check!(self.state == State::AwaitingEcho, Error::OutOfOrder);
        let result = self
            .verify(echo, self.kind.validate)
            .and_then(|_| self.verify_nonce(&echo.nonce_z, &self.nonce_z));
        if result.is_err() {
            self.state = State::Failed;
            return result;
        }

        self.nonce_y = echo.nonce_y;
        self.state = State::AwaitingConfirm;
        Ok(())
    }

    /// Builds the confirm message, carrying `payload`.
    pub fn confirm(&mut self, payload: Payload) -> Result<Message, Error> {
        check!(self.state == State::AwaitingConfirm, Error::OutOfOrder);

        let mut confirm = Message::new(self.kind.confirm, self.device_id);
        confirm.nonce_z = self.nonce_z;
        confirm.nonce_y = self.nonce_y;
        confirm.payload = payload;

        self.state = State::AwaitingResult;
        Ok(confirm)
    }

    /// Checks the responder's result, returning its payload.
    pub fn on_result(&mut self, result: &Message) -> Result<Payload, Error> {
        check!(self.state == State::AwaitingResult, Error::OutOfOrder);
        let verdict = self
            .verify(result, self.kind.confirm)
            .and_then(|_| self.verify_nonce(&result.nonce_z, &self.nonce_z))
            .and_then(|_| self.verify_nonce(&result.nonce_y, &self.nonce_y));
        if let Err(e) = verdict {
            self.state = State::Failed;
            return Err(e);
        }

        self.state = State::Done;
        Ok(result.payload)
    }

    fn verify(&self, message: &Message, opcode: Opcode) -> Result<(), Error> {
        check!(
            message.opcode == opcode,
            Error::UnexpectedOpcode {
                expected: opcode,
                found: message.opcode,
            }
        );
        check!(message.device_id == self.device_id, Error::IdentityMismatch);
        Ok(())
    }

    fn verify_nonce(&self, found: &Nonce, expected: &Nonce) -> Result<(), Error> {
        check!(found == expected, Error::NonceMismatch);
        Ok(())
    }
}

/// The responding side of an exchange, between the validate and confirm
/// messages.
///
/// A `Responder` is consumed by [`Responder::on_confirm()`], so each nonce
/// pair is accepted at most once.
#[derive(Debug)]
pub struct Responder {
    kind: Kind,
    device_id: DeviceId,
    nonce_z: Nonce,
    nonce_y: Nonce,
}

impl Responder {
    /// Accepts a validate message addressed to `own_id`.
    ///
    /// Returns the responder along with the echo to send back.
    pub fn accept(
        validate: &Message,
        own_id: DeviceId,
        rng: &mut dyn Csrng,
    ) -> Result<(Self, Message), Error> {
        let kind = Kind::requested_by(validate)?;
        check!(validate.device_id == own_id, Error::IdentityMismatch);

        let responder = Self {
            kind,
            device_id: own_id,
            nonce_z: validate.nonce_z,
            nonce_y: Nonce::generate(rng)?,
        };

        let mut echo = Message::new(kind.validate, own_id);
        echo.nonce_z = responder.nonce_z;
        echo.nonce_y = responder.nonce_y;
        Ok((responder, echo))
    }

    /// Returns the kind of exchange this responder is bound to.
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Checks the confirm message.
    ///
    /// The confirm must carry the bound opcode, this device's id, and both
    /// nonces of this exchange.
    pub fn on_confirm(self, confirm: &Message) -> Result<Confirmed, Error> {
        check!(
            confirm.opcode == self.kind.confirm,
            Error::UnexpectedOpcode {
                expected: self.kind.confirm,
                found: confirm.opcode,
            }
        );
        check!(confirm.device_id == self.device_id, Error::IdentityMismatch);
        check!(confirm.nonce_z == self.nonce_z, Error::NonceMismatch);
        check!(confirm.nonce_y == self.nonce_y, Error::NonceMismatch);

        Ok(Confirmed {
            responder: self,
            request: confirm.payload,
        })
    }
}

/// A confirmed exchange, ready for the responder to act on and reply to.
#[derive(Debug)]
pub struct Confirmed {
    responder: Responder,
    request: Payload,
}

impl Confirmed {
    /// Returns the kind of exchange that was confirmed.
    pub fn kind(&self) -> Kind {
        self.responder.kind
    }

    /// Returns the payload the initiator sent with its confirm.
    pub fn request(&self) -> &Payload {
        &self.request
    }

    /// Builds the result message, carrying `payload`.
    pub fn reply(self, payload: Payload) -> Message {
        let r = self.responder;
        let mut result = Message::new(r.kind.confirm, r.device_id);
        result.nonce_z = r.nonce_z;
        result.nonce_y = r.nonce_y;
        result.payload = payload;
        result
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::csrng::fake;
    use pretty_assertions::assert_eq;

    const ID: DeviceId = DeviceId(0x11111124);

    fn run(kind: Kind, data: &[u8]) -> (Initiator, Result<Payload, Error>) {
        let mut c_rng = fake::Counter(0x10);
        let mut p_rng = fake::Counter(0x80);

        let (mut init, validate) = Initiator::start(kind, ID, &mut c_rng).unwrap();
        let (resp, echo) = Responder::accept(&validate, ID, &mut p_rng).unwrap();
        assert_eq!(resp.kind(), kind);
        init.on_echo(&echo).unwrap();

        let confirm = init.confirm(Payload::from_slice(data).unwrap()).unwrap();
        let confirmed = resp.on_confirm(&confirm).unwrap();
        assert_eq!(confirmed.request().until_nul(), data);
        let result = confirmed.reply(Payload::from_slice(b"ok").unwrap());

        let out = init.on_result(&result);
        (init, out)
    }

    #[test]
    fn full_exchange() {
        for &kind in &[Kind::BOOT, Kind::ATTEST, Kind::SECURE_SEND] {
            let (init, result) = run(kind, b"data");
            assert_eq!(init.state(), State::Done);
            assert_eq!(result.unwrap().until_nul(), b"ok");
        }
    }

    #[test]
    fn validate_carries_intent() {
        let mut rng = fake::Counter(0);
        let (init, validate) =
            Initiator::start(Kind::ATTEST, ID, &mut rng).unwrap();
        assert_eq!(init.state(), State::AwaitingEcho);
        assert_eq!(validate.opcode, Opcode::Validate);
        assert_eq!(validate.device_id, ID);
        assert_eq!(validate.payload.as_bytes()[0], 0x04);
        assert_eq!(validate.nonce_y, Nonce::ZERO);
    }

    #[test]
    fn replayed_echo() {
        let mut c_rng = fake::Counter(0x10);
        let mut p_rng = fake::Counter(0x80);

        // Capture an echo from one exchange...
        let (_, old_validate) =
            Initiator::start(Kind::BOOT, ID, &mut c_rng).unwrap();
        let (_, old_echo) =
            Responder::accept(&old_validate, ID, &mut p_rng).unwrap();

        // ...and replay it into a fresh one.
        let (mut init, _) = Initiator::start(Kind::BOOT, ID, &mut c_rng).unwrap();
        assert_eq!(init.on_echo(&old_echo), Err(Error::NonceMismatch));
        assert_eq!(init.state(), State::Failed);
        assert_eq!(init.confirm(Payload::empty()), Err(Error::OutOfOrder));
    }

    #[test]
    fn replayed_result() {
        let mut c_rng = fake::Counter(0x10);
        let mut p_rng = fake::Counter(0x80);

        let (mut old, validate) =
            Initiator::start(Kind::BOOT, ID, &mut c_rng).unwrap();
        let (resp, echo) = Responder::accept(&validate, ID, &mut p_rng).unwrap();
        old.on_echo(&echo).unwrap();
        let confirm = old.confirm(Payload::empty()).unwrap();
        let old_result = resp.on_confirm(&confirm).unwrap().reply(Payload::empty());

        let (mut init, validate) =
            Initiator::start(Kind::BOOT, ID, &mut c_rng).unwrap();
        let (_, echo) = Responder::accept(&validate, ID, &mut p_rng).unwrap();
        init.on_echo(&echo).unwrap();
        init.confirm(Payload::empty()).unwrap();
        assert_eq!(init.on_result(&old_result), Err(Error::NonceMismatch));
        assert_eq!(init.state(), State::Failed);
    }

    #[test]
    fn replayed_confirm() {
        let mut c_rng = fake::Counter(0x10);
        let mut p_rng = fake::Counter(0x80);

        let (mut init, validate) =
            Initiator::start(Kind::BOOT, ID, &mut c_rng).unwrap();
        let (resp, echo) = Responder::accept(&validate, ID, &mut p_rng).unwrap();
        init.on_echo(&echo).unwrap();
        let old_confirm = init.confirm(Payload::empty()).unwrap();
        resp.on_confirm(&old_confirm).unwrap();

        // A new responder draws a new nonce_y; the old confirm is stale.
        let (resp, _) = Responder::accept(&validate, ID, &mut p_rng).unwrap();
        assert_eq!(resp.on_confirm(&old_confirm).unwrap_err(), Error::NonceMismatch);
    }

    #[test]
    fn wrong_identity() {
        let mut c_rng = fake::Counter(0x10);
        let mut p_rng = fake::Counter(0x80);

        let (mut init, validate) =
            Initiator::start(Kind::BOOT, ID, &mut c_rng).unwrap();
        assert_eq!(
            Responder::accept(&validate, DeviceId(0xcc), &mut p_rng).unwrap_err(),
            Error::IdentityMismatch
        );

        // An impostor answering under its own id is caught by the initiator.
        let mut impostor = validate;
        impostor.device_id = DeviceId(0xcc);
        let (_, echo) =
            Responder::accept(&impostor, DeviceId(0xcc), &mut p_rng).unwrap();
        assert_eq!(init.on_echo(&echo), Err(Error::IdentityMismatch));
    }

    #[test]
    fn confirm_for_other_command() {
        let mut c_rng = fake::Counter(0x10);
        let mut p_rng = fake::Counter(0x80);

        let (mut init, validate) =
            Initiator::start(Kind::ATTEST, ID, &mut c_rng).unwrap();
        let (resp, echo) = Responder::accept(&validate, ID, &mut p_rng).unwrap();
        init.on_echo(&echo).unwrap();
        let mut confirm = init.confirm(Payload::empty()).unwrap();
        confirm.opcode = Opcode::Boot;
        assert_eq!(
            resp.on_confirm(&confirm).unwrap_err(),
            Error::UnexpectedOpcode {
                expected: Opcode::Attest,
                found: Opcode::Boot,
            }
        );
    }

    #[test]
    fn mismatched_intent() {
        let mut rng = fake::Counter(0);
        let mut validate = Message::new(Opcode::Validate, ID);
        validate.payload.as_bytes_mut()[0] = Opcode::SecureSendConfirm as u8;
        assert!(Responder::accept(&validate, ID, &mut rng).is_err());
    }

    #[test]
    fn out_of_order() {
        let mut rng = fake::Counter(0);
        let (mut init, validate) =
            Initiator::start(Kind::BOOT, ID, &mut rng).unwrap();
        assert_eq!(init.confirm(Payload::empty()), Err(Error::OutOfOrder));
        assert_eq!(init.on_result(&validate), Err(Error::OutOfOrder));
        assert_eq!(init.state(), State::AwaitingEcho);
    }

    #[test]
    fn no_entropy() {
        assert_eq!(
            Initiator::start(Kind::BOOT, ID, &mut fake::Broken).unwrap_err(),
            Error::Entropy(crate::crypto::csrng::Error::Unspecified)
        );
    }
}
