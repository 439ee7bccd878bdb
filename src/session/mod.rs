// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Session management.
//!
//! A session is a 128-bit [`SessionKey`] shared by the Coordinator and one
//! Component. Keys are established once per peer per process, through
//! [`key_sync`], and are never rotated.
//!
//! Once a key exists, every [`Message`] crossing the bus is sealed under it:
//! the encoded frame is encrypted one cipher block at a time with
//! [`seal()`], and decrypted with [`open()`].
//!
//! # Security
//!
//! Blocks are encrypted independently, so equal plaintext blocks under the
//! same key produce equal ciphertext blocks. The fresh nonces carried in the
//! first three blocks of every authenticated exchange keep those blocks
//! unique, but the payload blocks get no such help.
//!
//! [`key_sync`]: key_sync/index.html
//! [`Message`]: ../protocol/struct.Message.html

use core::fmt;

use arrayvec::ArrayVec;
use subtle::ConstantTimeEq as _;
use zeroize::Zeroize;
use zeroize::ZeroizeOnDrop;

use crate::crypto::cipher;
use crate::crypto::cipher::Cipher;
use crate::crypto::cipher::Block;
use crate::crypto::cipher::BLOCK_LEN;
use crate::net;
use crate::net::Address;
use crate::net::MAX_FRAME_LEN;
use crate::protocol::wire;
use crate::protocol::Message;

pub mod key_sync;

/// The most peers a [`Keyring`] holds keys for.
pub const MAX_PEERS: usize = 32;

/// A session error.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// Indicates that a key share frame had the wrong width.
    KeyShareLength {
        /// The width the handshake requires at this step.
        expected: usize,
        /// The width actually received.
        found: usize,
    },
    /// Indicates an unknown role flag in an opening frame.
    BadRole(u8),
    /// Indicates that the transport failed during the handshake.
    Link(net::Error),
    /// Indicates that the cipher failed.
    Cipher(cipher::Error),
    /// Indicates that a frame could not be unsealed into a message.
    Malformed(wire::Error),
    /// Indicates that a [`Keyring`] has no room for another peer.
    KeyringFull,
}

impl From<net::Error> for Error {
    fn from(e: net::Error) -> Self {
        Self::Link(e)
    }
}

impl From<cipher::Error> for Error {
    fn from(e: cipher::Error) -> Self {
        Self::Cipher(e)
    }
}

impl From<wire::Error> for Error {
    fn from(e: wire::Error) -> Self {
        Self::Malformed(e)
    }
}

/// A session key.
///
/// The key is wiped on drop, and compares in constant time.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey(cipher::Key);

impl SessionKey {
    /// Wraps raw key bytes.
    pub fn new(key: cipher::Key) -> Self {
        Self(key)
    }

    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &cipher::Key {
        &self.0
    }
}

impl PartialEq for SessionKey {
    fn eq(&self, other: &Self) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

impl Eq for SessionKey {}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("SessionKey(<redacted>)")
    }
}

/// The Coordinator's set of session keys, one per peer address.
///
/// The first key ever established doubles as the bus key, used to address
/// peers the Coordinator has no pairwise key for.
#[derive(Default, Debug)]
pub struct Keyring {
    keys: ArrayVec<(Address, SessionKey), MAX_PEERS>,
}

impl Keyring {
    /// Creates an empty keyring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `key` as the session key for `addr`, replacing any prior key.
    pub fn insert(&mut self, addr: Address, key: SessionKey) -> Result<(), Error> {
        if let Some(slot) = self.keys.iter_mut().find(|(a, _)| *a == addr) {
            slot.1 = key;
            return Ok(());
        }
        self.keys
            .try_push((addr, key))
            .map_err(|_| failed!(Error::KeyringFull))
    }

    /// Returns the session key for `addr`, if one was established.
    pub fn get(&self, addr: Address) -> Option<&SessionKey> {
        self.keys.iter().find(|(a, _)| *a == addr).map(|(_, k)| k)
    }

    /// Returns the key for talking to `addr`: its own, if it has one, and
    /// the bus key otherwise.
    pub fn key_for(&self, addr: Address) -> Option<&SessionKey> {
        self.get(addr).or_else(|| self.bus_key())
    }

    /// Returns the bus key.
    pub fn bus_key(&self) -> Option<&SessionKey> {
        self.keys.first().map(|(_, k)| k)
    }

    /// Returns `true` if a key was established for `addr`.
    pub fn contains(&self, addr: Address) -> bool {
        self.get(addr).is_some()
    }
}

/// Encodes `message` and encrypts it under `key`.
pub fn seal(
    cipher: &dyn Cipher,
    key: &SessionKey,
    message: &Message,
) -> Result<[u8; MAX_FRAME_LEN], Error> {
    let mut frame = message.encode();
    for_each_block(&mut frame, |block| cipher.encrypt(key.as_bytes(), block))?;
    Ok(frame)
}

/// Decrypts `frame` under `key` and decodes the message inside it.
pub fn open(
    cipher: &dyn Cipher,
    key: &SessionKey,
    frame: &[u8],
) -> Result<Message, Error> {
    check!(
        frame.len() == MAX_FRAME_LEN,
        Error::Malformed(wire::Error::BadLength {
            expected: MAX_FRAME_LEN,
            found: frame.len(),
        })
    );

    let mut plain = [0; MAX_FRAME_LEN];
    plain.copy_from_slice(frame);
    for_each_block(&mut plain, |block| cipher.decrypt(key.as_bytes(), block))?;
    Ok(Message::decode(&plain)?)
}

/// Runs `f` over each cipher block of `frame`, in order.
fn for_each_block(
    frame: &mut [u8; MAX_FRAME_LEN],
    mut f: impl FnMut(&mut Block) -> Result<(), cipher::Error>,
) -> Result<(), cipher::Error> {
    let mut block: Block = [0; BLOCK_LEN];
    for chunk in frame.chunks_exact_mut(BLOCK_LEN) {
        block.copy_from_slice(chunk);
        f(&mut block)?;
        chunk.copy_from_slice(&block);
    }
    block.zeroize();
    Ok(())
}
