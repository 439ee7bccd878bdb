// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Persistent storage abstraction.
//!
//! This module provides the [`Flash`] trait, which represents an *abstract
//! flash device*: a region of memory that can be transactionally read or
//! written. Such a "device" can range from a simple Rust slice to a page of
//! on-chip flash reserved for the provisioning list.
//!
//! [`Flash`]: trait.Flash.html

use core::convert::TryInto as _;

use static_assertions::assert_obj_safe;

/// A [`Flash`] error.
///
/// All of these errors are non-retryable; a [`Flash`] implementation should
/// block until the operation succeeds.
///
/// [`Flash`]: trait.Flash.html
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// Indicates that an operation failed because the requested
    /// operation was outside of the device's address space.
    OutOfRange,

    /// Indicates that the device is locked in some manner and cannot
    /// be affected by the operation.
    Locked,

    /// Indicates that an unspecified error occured.
    Unspecified,
}

/// Provides access to a flash-like storage device.
///
/// This trait provides abstract operations on a device, as if it were a
/// block of random-access memory. It is the implementation's responsibility
/// to implement these operations efficiently with respect to the underlying
/// device, including any erase-before-write the medium requires.
pub trait Flash {
    /// Returns the size, in bytes, of this device.
    fn size(&self) -> Result<u32, Error>;

    /// Attempts to read `out.len()` bytes starting at `offset`.
    fn read(&self, offset: u32, out: &mut [u8]) -> Result<(), Error>;

    /// Attempts to write `buf` at `offset`.
    ///
    /// This function may buffer writes; [`Flash::flush()`] must be called
    /// to make them durable.
    fn program(&mut self, offset: u32, buf: &[u8]) -> Result<(), Error>;

    /// Flushes any pending writes to the device.
    fn flush(&mut self) -> Result<(), Error> {
        Ok(())
    }
}
assert_obj_safe!(Flash);

impl<F: Flash + ?Sized> Flash for &mut F {
    #[inline]
    fn size(&self) -> Result<u32, Error> {
        F::size(*self)
    }

    #[inline]
    fn read(&self, offset: u32, out: &mut [u8]) -> Result<(), Error> {
        F::read(*self, offset, out)
    }

    #[inline]
    fn program(&mut self, offset: u32, buf: &[u8]) -> Result<(), Error> {
        F::program(*self, offset, buf)
    }

    #[inline]
    fn flush(&mut self) -> Result<(), Error> {
        F::flush(*self)
    }
}

/// Adapter for converting RAM-backed storage into a [`Flash`].
///
/// For the purposes of this type, "RAM-backed" means that `AsRef<[u8]>`
/// and `AsMut<[u8]>` are implemented.
///
/// [`Flash`]: trait.Flash.html
#[derive(Copy, Clone, Debug)]
pub struct Ram<Bytes>(pub Bytes);

impl<Bytes: AsRef<[u8]>> Ram<Bytes> {
    fn range(&self, offset: u32, len: usize) -> Result<(usize, usize), Error> {
        let start = offset as usize;
        let end = start.checked_add(len).ok_or(Error::OutOfRange)?;
        if end > self.0.as_ref().len() {
            return Err(Error::OutOfRange);
        }
        Ok((start, end))
    }
}

impl<Bytes: AsRef<[u8]> + AsMut<[u8]>> Flash for Ram<Bytes> {
    fn size(&self) -> Result<u32, Error> {
        self.0
            .as_ref()
            .len()
            .try_into()
            .map_err(|_| Error::Unspecified)
    }

    fn read(&self, offset: u32, out: &mut [u8]) -> Result<(), Error> {
        let (start, end) = self.range(offset, out.len())?;
        out.copy_from_slice(&self.0.as_ref()[start..end]);
        Ok(())
    }

    fn program(&mut self, offset: u32, buf: &[u8]) -> Result<(), Error> {
        let (start, end) = self.range(offset, buf.len())?;
        self.0.as_mut()[start..end].copy_from_slice(buf);
        Ok(())
    }
}
