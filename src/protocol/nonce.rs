// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Exchange nonces.

use subtle::ConstantTimeEq as _;

use crate::crypto::csrng;
use crate::crypto::csrng::Csrng;

/// The width, in bytes, of a [`Nonce`].
pub const NONCE_LEN: usize = 16;

/// A single-use random value binding a reply to its request.
///
/// Nonces compare in constant time.
#[derive(Copy, Clone, Default, Debug)]
pub struct Nonce(pub [u8; NONCE_LEN]);

impl Nonce {
    /// The all-zeroes nonce, carried by messages that have no nonce.
    pub const ZERO: Self = Self([0; NONCE_LEN]);

    /// Generates a fresh nonce.
    pub fn generate(rng: &mut dyn Csrng) -> Result<Self, csrng::Error> {
        let mut nonce = Self::ZERO;
        rng.fill(&mut nonce.0)?;
        Ok(nonce)
    }

    /// Returns the raw bytes of this nonce.
    pub fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }
}

impl PartialEq for Nonce {
    fn eq(&self, other: &Self) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

impl Eq for Nonce {}
