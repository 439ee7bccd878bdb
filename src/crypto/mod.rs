// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Pluggable cryptography traits.
//!
//! `warden` needs two primitives: a keyed 128-bit block cipher, used to seal
//! every frame on the bus, and a source of cryptographically secure random
//! bytes, used for exchange nonces. This module provides object-safe traits
//! that abstract over both.
//!
//! Users are expected to provide their own implementations of these traits,
//! which may suit particular hardware or certification needs (many bus
//! controllers ship with an AES engine and a TRNG).
//!
//! It is recommended to not import the traits in this module directly.
//! Instead, use imports like `use warden::crypto::cipher;` and
//! partially-qualified names like `cipher::Cipher`.
//!
//! Software implementations are provided under the [`aes` module] (based on
//! the RustCrypto `aes` crate, re-exported through `aes-gcm`) and the
//! [`ring` module] (based on [`ring`]). Their presence is controlled by the
//! `aes` and `ring` feature flags.
//!
//! [`aes` module]: aes/index.html
//! [`ring` module]: ring/index.html

pub mod cipher;
pub mod csrng;

#[cfg(feature = "aes")]
pub mod aes;

#[cfg(feature = "ring")]
pub mod ring;
