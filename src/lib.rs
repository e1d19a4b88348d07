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

//! The Stele authoritative DNS server.
//!
//! Stele serves BIND-style zone files over UDP (IPv4 and IPv6). The
//! crate is organized as follows:
//!
//! * [`name`] implements dotted-string domain names and their
//!   on-the-wire codec, including decompression of compressed names;
//! * [`message`] implements parsing ([`message::Message::parse`]) and
//!   building ([`message::Writer`]) of DNS messages;
//! * [`rr`] provides resource records with a typed RDATA
//!   representation, along with the RR [`Type`](rr::Type) and
//!   [`Ttl`](rr::Ttl) types;
//! * [`class`] provides the DNS [`Class`](class::Class) type;
//! * [`zone`] implements the in-memory authoritative store
//!   ([`zone::Zone`]) and the collection of zones served
//!   ([`zone::Catalog`]);
//! * [`zone_file`] loads BIND-style zone files into [`zone::Zone`]s;
//! * [`server`] implements query processing over a [`zone::Catalog`];
//!   and
//! * [`io`] provides the Tokio-based UDP I/O layer that drives a
//!   [`server::Server`].

pub mod class;
pub mod io;
pub mod message;
pub mod name;
pub mod rr;
pub mod server;
pub mod zone;
pub mod zone_file;
