// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Keyed block ciphers.
//!
//! Every frame on the bus is sealed one [`Block`] at a time with a 128-bit
//! [`Key`]. The cipher itself is supplied by the integration.

use static_assertions::assert_obj_safe;

/// The width, in bytes, of a cipher block and of a cipher key.
pub const BLOCK_LEN: usize = 16;

/// A single cipher block.
pub type Block = [u8; BLOCK_LEN];

/// A raw cipher key.
pub type Key = [u8; BLOCK_LEN];

/// An error returned by a cipher operation.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// Indicates an unspecified, internal error.
    Unspecified,
}

/// A 128-bit block cipher.
///
/// Implementations transform `block` in place. `decrypt(k, encrypt(k, b))`
/// must yield `b` for every key `k` and block `b`.
pub trait Cipher {
    /// Encrypts `block` under `key`.
    fn encrypt(&self, key: &Key, block: &mut Block) -> Result<(), Error>;

    /// Decrypts `block` under `key`.
    fn decrypt(&self, key: &Key, block: &mut Block) -> Result<(), Error>;
}
assert_obj_safe!(Cipher);
