// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Device identities intended only for testing.
//!
//! The low byte of each id is the bus address the device answers at.

/// A provisioned Component, at address `0x20`.
pub const COMPONENT_A: u32 = 0x1111_1120;

/// A provisioned Component, at address `0x30`.
pub const COMPONENT_B: u32 = 0x2222_2230;

/// An unprovisioned Component answering at `COMPONENT_B`'s address.
pub const IMPOSTOR: u32 = 0x0bad_0030;

/// A spare Component, at address `0x40`.
pub const REPLACEMENT: u32 = 0x4444_4440;

/// Test-only attestation location.
pub const LOCATION: &str = "Ithaca, NY";

/// Test-only attestation date.
pub const DATE: &str = "2023-04-01";

/// Test-only attestation customer.
pub const CUSTOMER: &str = "Acme Avionics";
