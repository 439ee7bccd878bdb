// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Implementations of crypto traits, using the [`ring`] crate.
//!
//! This module provides software implementations of [`crypto`] traits
//! suitable for hosted uses of `warden`, such as the simulator in `tool/`.
//! Everything here depends on the `std` feature flag.
//!
//! The [`ring` warranty disclaimer] applies to this module as well.
//!
//! [`ring` warranty disclaimer]: https://github.com/briansmith/ring/blob/main/README.md

#[cfg(feature = "std")]
pub mod csrng;

#[cfg(doc)]
use crate::crypto;
