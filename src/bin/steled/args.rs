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

//! Implements command-line argument parsing.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;

/// Parses the command-line arguments.
pub fn parse() -> Args {
    Args::parse()
}

/// The Stele authoritative DNS server
#[derive(Debug, Parser)]
#[command(author, version)]
pub struct Args {
    /// Zone file to load
    #[arg(short = 'z', long, value_name = "FILE")]
    pub zone: Option<PathBuf>,

    /// IPv4 listen address (host:port; empty to disable)
    #[arg(short = '4', long = "listen-v4", value_name = "ADDR", default_value = ":5353")]
    pub listen_v4: String,

    /// IPv6 listen address (host:port; empty to disable)
    #[arg(
        short = '6',
        long = "listen-v6",
        value_name = "ADDR",
        default_value = "[::]:5353"
    )]
    pub listen_v6: String,
}

/// The address family of a listen address.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Family {
    V4,
    V6,
}

/// Resolves a listen-address string to a socket address. The empty
/// string means the family is disabled; a bare `:port` binds the
/// family's wildcard address.
pub fn resolve_listen_addr(addr: &str, family: Family) -> Result<Option<SocketAddr>> {
    if addr.is_empty() {
        return Ok(None);
    }
    if let Some(port) = addr.strip_prefix(':') {
        let port = port
            .parse()
            .map_err(|_| anyhow!("invalid port in listen address {:?}", addr))?;
        let wildcard = match family {
            Family::V4 => SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            Family::V6 => SocketAddr::from((Ipv6Addr::UNSPECIFIED, port)),
        };
        return Ok(Some(wildcard));
    }
    let socket_addr: SocketAddr = addr
        .parse()
        .map_err(|_| anyhow!("invalid listen address {:?}", addr))?;
    let family_matches = match family {
        Family::V4 => socket_addr.is_ipv4(),
        Family::V6 => socket_addr.is_ipv6(),
    };
    if !family_matches {
        return Err(anyhow!(
            "listen address {:?} does not match its address family",
            addr
        ));
    }
    Ok(Some(socket_addr))
}
