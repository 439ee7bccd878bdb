// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! I/O interfaces, in lieu of [`std::io`].
//!
//! These traits are intended for filling and draining fixed-size frame
//! buffers; every bus frame in this crate is built by writing into a byte
//! buffer through [`Write`] and parsed by reading from one through [`Read`].
//!
//! [`std::io`]: https://doc.rust-lang.org/std/io/index.html

pub mod cursor;
pub mod endian;
pub mod read;
pub mod write;

pub use cursor::Cursor;
pub use read::Read;
pub use write::Write;

/// A generic, low-level I/O error.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Indicates that some underlying buffer has been completely used up,
    /// either for reading from or writing to.
    ///
    /// For frame buffers this means a message did not fit its frame, which is
    /// always a programming or framing error rather than a transient one.
    BufferExhausted,

    /// Indicates that an unspecified, internal failure occurred.
    Internal,
}
