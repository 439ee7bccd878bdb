// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Test data of all kinds, ranging from key material to device identities.

pub mod devices;
pub mod keys;
