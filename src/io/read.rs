// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Provides the [`Read`] trait, analogous to `std::io::Read`.

use static_assertions::assert_obj_safe;

use crate::io;
use crate::io::endian::LeInt;

/// Represents a place that bytes can be read from, such as a received frame.
///
/// Unlike `std::io::Read`, a `Read` knows up front how many bytes remain,
/// which is what lets the frame codec reject short or overlong frames before
/// interpreting any field.
pub trait Read {
    /// Reads exactly `out.len()` bytes from `self`.
    fn read_bytes(&mut self, out: &mut [u8]) -> Result<(), io::Error>;

    /// Returns the number of bytes still available to read.
    fn remaining_data(&self) -> usize;

    /// Reads a little-endian integer.
    #[inline]
    fn read_le<I: LeInt>(&mut self) -> Result<I, io::Error>
    where
        Self: Sized,
    {
        I::read_from(self)
    }
}
assert_obj_safe!(Read);

impl<R: Read + ?Sized> Read for &'_ mut R {
    #[inline]
    fn read_bytes(&mut self, out: &mut [u8]) -> Result<(), io::Error> {
        R::read_bytes(*self, out)
    }

    #[inline]
    fn remaining_data(&self) -> usize {
        R::remaining_data(*self)
    }
}

impl Read for &[u8] {
    fn read_bytes(&mut self, out: &mut [u8]) -> Result<(), io::Error> {
        let n = out.len();
        if self.len() < n {
            return Err(io::Error::BufferExhausted);
        }

        out.copy_from_slice(&self[..n]);
        *self = &self[n..];
        Ok(())
    }

    fn remaining_data(&self) -> usize {
        self.len()
    }
}
