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

//! DNS resource records.
//!
//! A [`Record`] pairs the common RR header fields (owner name, type,
//! class, TTL) with a typed [`Rdata`] payload. Using a tagged variant
//! for the RDATA means a record cannot hold a payload whose shape is
//! valid only for some other type; the compiler rules that out.

use std::net::{Ipv4Addr, Ipv6Addr};

mod rr_type;
mod ttl;

pub use rr_type::Type;
pub use ttl::Ttl;

use crate::class::Class;

////////////////////////////////////////////////////////////////////////
// RESOURCE RECORDS                                                   //
////////////////////////////////////////////////////////////////////////

/// A DNS resource record.
///
/// The owner `name` is fully qualified, stored lowercased and without
/// a trailing dot. The `class` is always [`Class::IN`] for records
/// held in a [`Zone`](crate::zone::Zone).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    pub name: String,
    pub rr_type: Type,
    pub class: Class,
    pub ttl: Ttl,
    pub rdata: Rdata,
}

impl Record {
    /// Creates a record, normalizing the owner name and deriving the
    /// type code from the payload.
    pub fn new(name: &str, ttl: u32, rdata: Rdata) -> Self {
        Self {
            name: crate::name::normalize(name),
            rr_type: rdata.rr_type(),
            class: Class::IN,
            ttl: Ttl::from(ttl),
            rdata,
        }
    }

    /// Creates an A record.
    pub fn a(name: &str, ttl: u32, address: Ipv4Addr) -> Self {
        Self::new(name, ttl, Rdata::A(address))
    }

    /// Creates an AAAA record.
    pub fn aaaa(name: &str, ttl: u32, address: Ipv6Addr) -> Self {
        Self::new(name, ttl, Rdata::Aaaa(address))
    }

    /// Creates a CNAME record.
    pub fn cname(name: &str, ttl: u32, target: &str) -> Self {
        Self::new(name, ttl, Rdata::Cname(crate::name::normalize(target)))
    }

    /// Creates an NS record.
    pub fn ns(name: &str, ttl: u32, target: &str) -> Self {
        Self::new(name, ttl, Rdata::Ns(crate::name::normalize(target)))
    }

    /// Creates an MX record.
    pub fn mx(name: &str, ttl: u32, preference: u16, exchange: &str) -> Self {
        Self::new(
            name,
            ttl,
            Rdata::Mx {
                preference,
                exchange: crate::name::normalize(exchange),
            },
        )
    }

    /// Creates a TXT record.
    pub fn txt(name: &str, ttl: u32, strings: Vec<String>) -> Self {
        Self::new(name, ttl, Rdata::Txt(strings))
    }

    /// Creates an SOA record.
    pub fn soa(name: &str, ttl: u32, soa: Soa) -> Self {
        Self::new(name, ttl, Rdata::Soa(soa))
    }
}

////////////////////////////////////////////////////////////////////////
// RDATA                                                              //
////////////////////////////////////////////////////////////////////////

/// The typed RDATA payload of a [`Record`].
///
/// The [`Other`](Rdata::Other) arm holds the raw RDATA of types the
/// server does not interpret; such records parse off the wire but are
/// never loaded into a zone.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Rdata {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Cname(String),
    Ns(String),
    Mx { preference: u16, exchange: String },
    Txt(Vec<String>),
    Soa(Soa),
    Other(Vec<u8>),
}

impl Rdata {
    /// Returns the RR type code this payload belongs to. For
    /// [`Other`](Rdata::Other) payloads, which do not carry their own
    /// type code, this returns type 0; callers constructing such
    /// records must set the type themselves.
    pub fn rr_type(&self) -> Type {
        match self {
            Self::A(_) => Type::A,
            Self::Aaaa(_) => Type::AAAA,
            Self::Cname(_) => Type::CNAME,
            Self::Ns(_) => Type::NS,
            Self::Mx { .. } => Type::MX,
            Self::Txt(_) => Type::TXT,
            Self::Soa(_) => Type::SOA,
            Self::Other(_) => Type::from(0),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// SOA DATA                                                           //
////////////////////////////////////////////////////////////////////////

/// The payload of an SOA record (RFC 1035 § 3.3.13).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Soa {
    pub mname: String,
    pub rname: String,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
