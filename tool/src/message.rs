// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Helpers for converting bus messages between wire form and JSON.

use std::io::Read;
use std::io::Write;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use warden::protocol;
use warden::protocol::DeviceId;
use warden::protocol::Nonce;
use warden::protocol::Opcode;
use warden::protocol::Payload;

use crate::util::parse_hex;

/// The JSON form of a [`protocol::Message`].
///
/// Byte strings are hex-encoded; trailing zeros of the payload are dropped.
#[derive(Serialize, Deserialize)]
struct Json {
    opcode: Opcode,
    device_id: DeviceId,
    #[serde(default)]
    nonce_z: String,
    #[serde(default)]
    nonce_y: String,
    #[serde(default)]
    payload: String,
}

impl Json {
    fn from_message(m: &protocol::Message) -> Self {
        let payload = m.payload.as_bytes();
        let end = payload.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        Self {
            opcode: m.opcode,
            device_id: m.device_id,
            nonce_z: hex::encode(m.nonce_z.as_bytes()),
            nonce_y: hex::encode(m.nonce_y.as_bytes()),
            payload: hex::encode(&payload[..end]),
        }
    }

    fn to_message(&self) -> Result<protocol::Message, String> {
        let nonce = |s: &str| match s {
            "" => Ok(Nonce::ZERO),
            s => parse_hex(s).map(Nonce),
        };
        let payload = hex::decode(&self.payload).map_err(|e| e.to_string())?;

        let mut m = protocol::Message::new(self.opcode, self.device_id);
        m.nonce_z = nonce(&self.nonce_z)?;
        m.nonce_y = nonce(&self.nonce_y)?;
        m.payload = Payload::from_slice(&payload).map_err(|e| format!("{:?}", e))?;
        Ok(m)
    }
}

/// Convert a bus message between wire form and JSON.
#[derive(structopt::StructOpt)]
pub enum Message {
    /// Converts a message from JSON form to wire form.
    #[structopt(name = "encode", alias = "j2w")]
    Encode {
        /// Write the frame as a hex string rather than raw bytes.
        #[structopt(long)]
        hex: bool,

        /// Input file; defaults to stdin.
        #[structopt(short = "i", long, parse(from_os_str))]
        input: Option<PathBuf>,

        /// Output file; defaults to stdout.
        #[structopt(short = "o", long, parse(from_os_str))]
        output: Option<PathBuf>,
    },

    /// Converts a message from wire form to JSON form.
    #[structopt(name = "decode", alias = "w2j")]
    Decode {
        /// Read the frame as a hex string rather than raw bytes.
        #[structopt(long)]
        hex: bool,

        /// Whether to pretty-print JSON output.
        #[structopt(long)]
        pretty: bool,

        /// Input file; defaults to stdin.
        #[structopt(short = "i", long, parse(from_os_str))]
        input: Option<PathBuf>,

        /// Output file; defaults to stdout.
        #[structopt(short = "o", long, parse(from_os_str))]
        output: Option<PathBuf>,
    },
}

impl Message {
    pub fn run(self) {
        match self {
            Self::Encode { hex, input, output } => {
                let (r, mut w) = crate::util::stdio(input, output);

                let json: Json = check!(
                    serde_json::from_reader(r),
                    "failed to deserialize message from JSON"
                );
                let msg = check!(json.to_message(), "invalid message");
                let frame = msg.encode();

                let r = match hex {
                    true => writeln!(w, "{}", hex::encode(&frame[..])),
                    false => w.write_all(&frame),
                };
                check!(r, "failed to write output");
            }
            Self::Decode {
                hex,
                pretty,
                input,
                output,
            } => {
                let (mut r, w) = crate::util::stdio(input, output);

                let mut read_buf = Vec::new();
                check!(
                    r.read_to_end(&mut read_buf),
                    "failed to read input to end",
                );
                if hex {
                    let text = String::from_utf8_lossy(&read_buf);
                    read_buf = check!(hex::decode(text.trim()), "invalid hex");
                }

                let msg = check!(
                    protocol::Message::decode(&read_buf),
                    "failed to decode message"
                );
                let json = Json::from_message(&msg);
                let r = match pretty {
                    true => serde_json::to_writer_pretty(w, &json),
                    false => serde_json::to_writer(w, &json),
                };
                check!(r, "failed to serialize message as JSON");
            }
        }
    }
}
