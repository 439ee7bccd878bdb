// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of [`crypto::cipher`] based on the RustCrypto AES crate.
//!
//! The block cipher is reached through the `aes` re-export of `aes-gcm`.
//!
//! [`crypto::cipher`]: ../cipher/index.html

use aes_gcm::aes;
use aes_gcm::aes::cipher::generic_array::GenericArray;
use aes_gcm::aes::cipher::BlockDecrypt as _;
use aes_gcm::aes::cipher::BlockEncrypt as _;
use aes_gcm::aes::cipher::KeyInit as _;

use crate::crypto::cipher;
use crate::crypto::cipher::Block;
use crate::crypto::cipher::Key;

/// A [`cipher::Cipher`] implementing AES-128 on a single block.
///
/// The key schedule is recomputed on every call; bus frames are short and
/// the key changes with the peer.
#[derive(Copy, Clone, Default, Debug)]
pub struct Aes128;

impl Aes128 {
    /// Creates a new AES-128 cipher.
    pub fn new() -> Self {
        Self
    }
}

impl cipher::Cipher for Aes128 {
    fn encrypt(&self, key: &Key, block: &mut Block) -> Result<(), cipher::Error> {
        let engine = aes::Aes128::new(GenericArray::from_slice(key));
        engine.encrypt_block(GenericArray::from_mut_slice(block));
        Ok(())
    }

    fn decrypt(&self, key: &Key, block: &mut Block) -> Result<(), cipher::Error> {
        let engine = aes::Aes128::new(GenericArray::from_slice(key));
        engine.decrypt_block(GenericArray::from_mut_slice(block));
        Ok(())
    }
}
