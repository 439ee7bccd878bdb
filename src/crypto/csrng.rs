// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Cryptographic random numbers.

use static_assertions::assert_obj_safe;

/// An error returned by a CSRNG.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// Indicates an unspecified, internal error.
    Unspecified,
}

/// A cryptographically-secure random number generator.
///
/// The sole purpose of this type is to fill buffers with random bytes,
/// specifically for exchange nonces.
///
/// `Csrng`s must already be seeded with sufficient entropy; creating new
/// random number generators is beyond the scope of this trait.
pub trait Csrng {
    /// Fills `buf` with random bytes.
    fn fill(&mut self, buf: &mut [u8]) -> Result<(), Error>;
}
assert_obj_safe!(Csrng);

#[cfg(test)]
pub(crate) mod fake {
    /// A fake `Csrng` that yields an incrementing byte stream.
    ///
    /// Each instance starts from its own seed so that two parties in a test
    /// never produce the same nonce by accident.
    pub struct Counter(pub u8);

    impl super::Csrng for Counter {
        fn fill(&mut self, buf: &mut [u8]) -> Result<(), super::Error> {
            for b in buf {
                *b = self.0;
                self.0 = self.0.wrapping_add(1);
            }
            Ok(())
        }
    }

    /// A fake `Csrng` that always fails.
    pub struct Broken;

    impl super::Csrng for Broken {
        fn fill(&mut self, _: &mut [u8]) -> Result<(), super::Error> {
            Err(super::Error::Unspecified)
        }
    }
}
