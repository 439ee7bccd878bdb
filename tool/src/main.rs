// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! `warden-tool` is a simple command-line tool for working with `warden`
//! messages, and for driving a Coordinator against simulated Components.

#![deny(missing_docs)]
#![deny(warnings)]
#![deny(unused)]
#![deny(unsafe_code)]

use structopt::StructOpt as _;

#[macro_use]
mod util;

mod message;
mod sim;

/// A command-line tool for working with warden data.
#[allow(missing_docs)]
#[derive(structopt::StructOpt)]
#[structopt(author)]
enum CliCommand {
    #[structopt(flatten)]
    Message(message::Message),
    Sim(sim::Sim),
}

fn main() {
    env_logger::init();
    match CliCommand::from_args() {
        CliCommand::Message(m) => m.run(),
        CliCommand::Sim(s) => s.run(),
    }
}
