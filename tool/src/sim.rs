// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! An operator console for a Coordinator on a simulated bus.
//!
//! The system is described by a JSON file like this one:
//! ```text
//! {
//!   "pin": "12345678",
//!   "token": "0123456789abcdef",
//!   "mask": "5a172e904bd36108c47f33a91ee5826c",
//!   "final_mask": "930cb745fa286ed139845b02cf76a01d",
//!   "coordinator_share": "3c610fd8279a44b3701ce9568d02fb35",
//!   "component_share": "c30e927b14ad58e62fb1469c037ad568",
//!   "defaults": [286331168, 572662320],
//!   "components": [
//!     {"id": 286331168, "location": "Ithaca, NY", "date": "2023-04-01",
//!      "customer": "Acme Avionics", "boot_message": "A is up"}
//!   ]
//! }
//! ```

use std::cell::Cell;
use std::fs;
use std::io;
use std::io::BufRead as _;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use warden::client::coordinator;
use warden::client::coordinator::Coordinator;
use warden::client::coordinator::Timeouts;
use warden::crypto::aes::Aes128;
use warden::crypto::ring::csrng::Csrng;
use warden::hardware;
use warden::hardware::flash::Ram;
use warden::hardware::provisioning::FlashStore;
use warden::hardware::provisioning::RECORD_LEN;
use warden::net::device::DevicePort;
use warden::net::sim::SimBus;
use warden::protocol::attest::AttestationRecord;
use warden::protocol::DeviceId;
use warden::server::component;
use warden::server::component::Component;
use warden::session::key_sync::KeyShare;
use warden::session::key_sync::Masks;
use warden::session::key_sync::Role;

use crate::util::parse_hex;
use crate::util::parse_id;

/// Run an interactive Coordinator console against simulated Components.
#[derive(structopt::StructOpt)]
pub struct Sim {
    /// JSON description of the simulated system.
    #[structopt(short = "c", long, parse(from_os_str))]
    config: PathBuf,

    /// File backing the provisioning store; created if missing.
    ///
    /// Without it, the store starts blank on every run.
    #[structopt(short = "s", long, parse(from_os_str))]
    store: Option<PathBuf>,
}

#[derive(Deserialize)]
struct Config {
    pin: String,
    token: String,
    mask: String,
    final_mask: String,
    coordinator_share: String,
    component_share: String,
    #[serde(default = "default_role")]
    sync_role: Role,
    defaults: Vec<DeviceId>,
    components: Vec<ComponentConfig>,
}

fn default_role() -> Role {
    Role::Initiator
}

#[derive(Deserialize)]
struct ComponentConfig {
    id: DeviceId,
    location: String,
    date: String,
    customer: String,
    #[serde(default)]
    boot_message: String,
}

/// The hardware of a simulated Component.
struct Device {
    config: ComponentConfig,
    booted: Cell<bool>,
}

impl hardware::Identity for Device {
    fn device_id(&self) -> DeviceId {
        self.config.id
    }

    fn attestation(&self) -> AttestationRecord<'_> {
        AttestationRecord {
            location: &self.config.location,
            date: &self.config.date,
            customer: &self.config.customer,
        }
    }
}

impl hardware::Boot for Device {
    fn boot_message(&self) -> &[u8] {
        self.config.boot_message.as_bytes()
    }

    fn boot(&self) {
        log::info!("{} booted", self.config.id);
        self.booted.set(true);
    }
}

impl hardware::Mailbox for Device {
    fn exchange(&self, incoming: &[u8], reply: &mut [u8]) -> usize {
        let n = incoming.len().min(reply.len());
        reply[..n].copy_from_slice(&incoming[..n]);
        n
    }
}

type Store = FlashStore<Ram<Vec<u8>>>;

impl Sim {
    pub fn run(self) {
        let text = check!(fs::read_to_string(&self.config), "failed to read config");
        let config: Config = check!(serde_json::from_str(&text), "invalid config");

        let masks = Masks {
            mask: check!(parse_hex(&config.mask), "invalid mask"),
            final_mask: check!(parse_hex(&config.final_mask), "invalid final mask"),
        };
        let coordinator_share: [u8; 16] =
            check!(parse_hex(&config.coordinator_share), "invalid share");
        let component_share: [u8; 16] =
            check!(parse_hex(&config.component_share), "invalid share");

        let image = match &self.store {
            Some(path) if path.exists() => {
                check!(fs::read(path), "failed to read store")
            }
            _ => vec![0xff; RECORD_LEN],
        };

        let devices = config
            .components
            .into_iter()
            .map(|config| Device {
                config,
                booted: Cell::new(false),
            })
            .collect::<Vec<_>>();
        let mut rngs = devices.iter().map(|_| Csrng::new()).collect::<Vec<_>>();
        let cipher = Aes128::new();

        let mut bus = SimBus::new();
        for (device, rng) in devices.iter().zip(rngs.iter_mut()) {
            let component = Component::new(component::Options {
                identity: device,
                boot: device,
                mailbox: device,
                cipher: &cipher,
                rng,
                key_share: KeyShare::new(component_share),
                masks,
            });
            bus.attach(device.config.id.address(), component);
        }

        let mut rng = Csrng::new();
        let mut coordinator = check!(
            Coordinator::new(coordinator::Options {
                bus,
                store: FlashStore::new(Ram(image)),
                cipher: &cipher,
                rng: &mut rng,
                key_share: KeyShare::new(coordinator_share),
                masks,
                sync_role: config.sync_role,
                pin: config.pin.as_bytes(),
                token: config.token.as_bytes(),
                timeouts: Timeouts::default(),
                defaults: &config.defaults,
            }),
            "failed to start coordinator"
        );
        // A blank store was just seeded; keep it for the next run.
        if let Some(path) = &self.store {
            persist(path, &coordinator);
        }

        let stdin = io::stdin();
        let mut console = Console {
            lines: stdin.lock().lines(),
            store: self.store,
        };
        while let Some(line) = console.prompt("cmd") {
            match line.as_str() {
                "" => {}
                "list" => list(&mut coordinator),
                "boot" => boot(&mut coordinator),
                "replace" => console.replace(&mut coordinator),
                "attest" => console.attest(&mut coordinator),
                "send" => console.send(&mut coordinator),
                "quit" | "exit" => break,
                other => println!("unknown command: {}", other),
            }
        }

        for device in &devices {
            if device.booted.get() {
                log::info!("{} is running", device.config.id);
            }
        }
    }
}

/// Writes the Coordinator's provisioning store out to `path`.
fn persist<Bus: DevicePort>(path: &Path, c: &Coordinator<'_, Bus, Store>) {
    check!(
        fs::write(path, &c.store().flash().0),
        "failed to write store"
    );
}

fn list<Bus: DevicePort>(c: &mut Coordinator<'_, Bus, Store>) {
    let report = match c.scan() {
        Ok(report) => report,
        Err(e) => return println!("scan failed: {:?}", e),
    };
    for id in &report.provisioned {
        println!("P>{:#010x}", id.0);
    }
    for (_, id) in &report.found {
        println!("F>{:#010x}", id.0);
    }
    println!("List complete");
}

fn boot<Bus: DevicePort>(c: &mut Coordinator<'_, Bus, Store>) {
    match c.boot_all() {
        Ok(report) => {
            for (id, message) in &report.booted {
                println!(
                    "{:#010x}>{}",
                    id.0,
                    String::from_utf8_lossy(message.until_nul())
                );
            }
            println!("Boot");
        }
        Err(e) => println!("Boot failed: {:?}", e),
    }
}

struct Console<Lines> {
    lines: Lines,
    store: Option<PathBuf>,
}

impl<Lines: Iterator<Item = io::Result<String>>> Console<Lines> {
    fn prompt(&mut self, what: &str) -> Option<String> {
        print!("{}> ", what);
        let _ = io::stdout().flush();
        let line = self.lines.next()?.ok()?;
        Some(line.trim().to_string())
    }

    fn prompt_id(&mut self, what: &str) -> Option<DeviceId> {
        let line = self.prompt(what)?;
        match parse_id(&line) {
            Ok(id) => Some(DeviceId(id)),
            Err(e) => {
                println!("invalid id: {}", e);
                None
            }
        }
    }

    fn replace<Bus: DevicePort>(&mut self, c: &mut Coordinator<'_, Bus, Store>) {
        let token = match self.prompt("token") {
            Some(token) => token,
            None => return,
        };
        let old = match self.prompt_id("out") {
            Some(id) => id,
            None => return,
        };
        let new = match self.prompt_id("in") {
            Some(id) => id,
            None => return,
        };

        match c.replace(token.as_bytes(), old, new) {
            Ok(()) => {
                println!("Replaced {:#010x} with {:#010x}", old.0, new.0);
                if let Some(path) = &self.store {
                    persist(path, c);
                }
            }
            Err(e) => println!("Replace failed: {:?}", e),
        }
    }

    fn attest<Bus: DevicePort>(&mut self, c: &mut Coordinator<'_, Bus, Store>) {
        let pin = match self.prompt("pin") {
            Some(pin) => pin,
            None => return,
        };
        if let Err(e) = c.check_pin(pin.as_bytes()) {
            return println!("Attest failed: {:?}", e);
        }
        let id = match self.prompt_id("id") {
            Some(id) => id,
            None => return,
        };

        match c.attest(id) {
            Ok(report) => {
                print!("{}", String::from_utf8_lossy(report.text()));
                println!("Attest");
            }
            Err(e) => println!("Attest failed: {:?}", e),
        }
    }

    fn send<Bus: DevicePort>(&mut self, c: &mut Coordinator<'_, Bus, Store>) {
        let id = match self.prompt_id("id") {
            Some(id) => id,
            None => return,
        };
        let data = match self.prompt("data") {
            Some(data) => data,
            None => return,
        };

        match c.secure_send(id, data.as_bytes()) {
            Ok(reply) => println!("{:#010x}>{}", id.0, String::from_utf8_lossy(&reply)),
            Err(e) => println!("Send failed: {:?}", e),
        }
    }
}
