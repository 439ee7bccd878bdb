// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Provides the [`Write`] trait, analogous to `std::io::Write`.

use core::mem;

use static_assertions::assert_obj_safe;

use crate::io;
use crate::io::endian::LeInt;

/// Represents a place that bytes can be written to, such as a frame buffer.
pub trait Write {
    /// Attempt to write `buf` exactly to `self`.
    ///
    /// This function does not perform partial writes: it either writes all of
    /// `buf` or returns an error.
    fn write_bytes(&mut self, buf: &[u8]) -> Result<(), io::Error>;

    /// Writes a little-endian integer.
    #[inline]
    fn write_le<I: LeInt>(&mut self, val: I) -> Result<(), io::Error>
    where
        Self: Sized,
    {
        val.write_to(self)
    }
}
assert_obj_safe!(Write);

impl<W: Write + ?Sized> Write for &'_ mut W {
    #[inline]
    fn write_bytes(&mut self, buf: &[u8]) -> Result<(), io::Error> {
        W::write_bytes(*self, buf)
    }
}

impl Write for &'_ mut [u8] {
    fn write_bytes(&mut self, buf: &[u8]) -> Result<(), io::Error> {
        let n = buf.len();
        if self.len() < n {
            return Err(io::Error::BufferExhausted);
        }

        let (dest, rest) = mem::take(self).split_at_mut(n);
        dest.copy_from_slice(buf);
        *self = rest;
        Ok(())
    }
}

impl<const N: usize> Write for arrayvec::ArrayVec<u8, N> {
    fn write_bytes(&mut self, buf: &[u8]) -> Result<(), io::Error> {
        self.try_extend_from_slice(buf)
            .map_err(|_| io::Error::BufferExhausted)
    }
}
