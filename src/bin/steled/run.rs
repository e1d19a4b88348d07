// Copyright 2023 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Implements running the server: startup, signal handling, and
//! shutdown.

use std::fmt::Write;
use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use env_logger::Env;
use log::{error, info};
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

use stele::io::TokioIoProvider;
use stele::server::Server;
use stele::zone::Catalog;
use stele::zone_file;

use crate::args::{resolve_listen_addr, Args, Family};

/// Runs the server.
pub fn run(args: Args) {
    env_logger::init_from_env(Env::new().default_filter_or("info"));

    if let Err(e) = try_running(args) {
        let mut message = String::from("Failed to run:");
        for (i, cause) in e.chain().enumerate() {
            write!(message, "\n[{}] {}", i + 1, cause).unwrap();
        }
        message.push_str("\nExiting with failure.");
        error!("{}", message);
        process::exit(1);
    }
    info!("Exiting with success.");
}

fn try_running(args: Args) -> Result<()> {
    info!(
        "Stele daemon v{}.{}.{} starting.",
        env!("CARGO_PKG_VERSION_MAJOR"),
        env!("CARGO_PKG_VERSION_MINOR"),
        env!("CARGO_PKG_VERSION_PATCH"),
    );

    let zone_path = match args.zone {
        Some(ref path) => path,
        None => bail!("a zone file is required (--zone)"),
    };
    let v4_addr = resolve_listen_addr(&args.listen_v4, Family::V4)
        .context("invalid IPv4 listen address")?;
    let v6_addr = resolve_listen_addr(&args.listen_v6, Family::V6)
        .context("invalid IPv6 listen address")?;
    if v4_addr.is_none() && v6_addr.is_none() {
        bail!("both listen addresses are empty; nothing to serve on");
    }

    // Load the zone.
    info!("Loading the zone from {}.", zone_path.display());
    let zone = zone_file::load_path(zone_path).context("failed to load the zone file")?;
    info!("Loaded zone {}.", zone.origin());
    let catalog = Catalog::new();
    catalog.insert(Arc::new(zone));
    let server = Arc::new(Server::new(catalog));

    // Set up signal handling before serving starts.
    let mut signals = set_up_signal_handling().context("failed to set up signal handling")?;

    // Bind the sockets and start the receive loops.
    let runtime = tokio::runtime::Runtime::new().context("failed to start the Tokio runtime")?;
    let provider = runtime
        .block_on(TokioIoProvider::bind(v4_addr.into_iter().chain(v6_addr)))
        .context("failed to bind sockets")?;
    let controller = {
        let _guard = runtime.enter();
        provider.start(&server)
    };
    info!("Set-up is complete; serving queries.");

    // Wait for a termination signal.
    for signal in signals.forever() {
        match signal {
            s @ (SIGINT | SIGTERM) => {
                let name = match s {
                    SIGINT => "SIGINT",
                    SIGTERM => "SIGTERM",
                    _ => unreachable!(),
                };
                info!("Received {}; shutting down.", name);
                break;
            }
            _ => unreachable!(),
        }
    }

    // Shut down the receive loops and report the counters.
    controller.blocking_shut_down();
    info!("Statistics: {}.", server.stats());
    Ok(())
}

fn set_up_signal_handling() -> Result<Signals> {
    let term_signals = &[SIGINT, SIGTERM];
    let already_terminating = Arc::new(AtomicBool::new(false));

    // A second termination signal arriving before shutdown completes
    // exits the process immediately.
    for sig in term_signals {
        signal_hook::flag::register_conditional_shutdown(*sig, 1, already_terminating.clone())?;
        signal_hook::flag::register(*sig, already_terminating.clone())?;
    }

    Signals::new(term_signals).map_err(|e| e.into())
}
