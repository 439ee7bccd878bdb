// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Key material intended only for testing.

/// Test-only mask applied to the first share of key synchronization.
#[rustfmt::skip]
pub const MASK: [u8; 16] = [
    0x5a, 0x17, 0x2e, 0x90, 0x4b, 0xd3, 0x61, 0x08,
    0xc4, 0x7f, 0x33, 0xa9, 0x1e, 0xe5, 0x82, 0x6c,
];

/// Test-only mask applied to the final share of key synchronization.
#[rustfmt::skip]
pub const FINAL_MASK: [u8; 16] = [
    0x93, 0x0c, 0xb7, 0x45, 0xfa, 0x28, 0x6e, 0xd1,
    0x39, 0x84, 0x5b, 0x02, 0xcf, 0x76, 0xa0, 0x1d,
];

/// Test-only private share held by the Coordinator.
#[rustfmt::skip]
pub const COORDINATOR_SHARE: [u8; 16] = [
    0x3c, 0x61, 0x0f, 0xd8, 0x27, 0x9a, 0x44, 0xb3,
    0x70, 0x1c, 0xe9, 0x56, 0x8d, 0x02, 0xfb, 0x35,
];

/// Test-only private share held by every Component.
#[rustfmt::skip]
pub const COMPONENT_SHARE: [u8; 16] = [
    0xc3, 0x0e, 0x92, 0x7b, 0x14, 0xad, 0x58, 0xe6,
    0x2f, 0xb1, 0x46, 0x9c, 0x03, 0x7a, 0xd5, 0x68,
];

/// Test-only PIN that authorizes attestation.
pub const PIN: &[u8] = b"12345678";

/// Test-only token that authorizes replacing a Component.
pub const TOKEN: &[u8] = b"0123456789abcdef";
