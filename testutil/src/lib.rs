// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Shared test fixtures for `warden` and its tooling.

#![deny(missing_docs)]

pub mod data;
