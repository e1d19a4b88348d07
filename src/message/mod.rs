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

//! DNS messages: parsing and building.
//!
//! [`Message::parse`] converts one received datagram into a
//! [`Message`]; [`Writer`] builds response datagrams. See the
//! [`reader`] and [`writer`] submodules for the details of each
//! direction.

use crate::class::Class;
use crate::rr::{Record, Type};

pub mod constants;
pub mod reader;
pub mod writer;

mod rcode;

pub use rcode::Rcode;
pub use writer::Writer;

use constants::*;

////////////////////////////////////////////////////////////////////////
// MESSAGES                                                           //
////////////////////////////////////////////////////////////////////////

/// A parsed DNS message.
///
/// The header's four section counts are not stored; they are implied
/// by the section vectors. The `flags` field holds the raw 16-bit
/// flags word, with accessors for the individual bits.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    pub id: u16,
    pub flags: u16,
    pub questions: Vec<Question>,
    pub answers: Vec<Record>,
    pub authority: Vec<Record>,
    pub additional: Vec<Record>,
}

impl Message {
    /// Returns whether the QR (query response) bit is set.
    pub fn qr(&self) -> bool {
        self.flags & FLAG_QR != 0
    }

    /// Returns whether the AA (authoritative answer) bit is set.
    pub fn aa(&self) -> bool {
        self.flags & FLAG_AA != 0
    }

    /// Returns whether the TC (truncation) bit is set.
    pub fn tc(&self) -> bool {
        self.flags & FLAG_TC != 0
    }

    /// Returns whether the RD (recursion desired) bit is set.
    pub fn rd(&self) -> bool {
        self.flags & FLAG_RD != 0
    }

    /// Returns whether the RA (recursion available) bit is set.
    pub fn ra(&self) -> bool {
        self.flags & FLAG_RA != 0
    }

    /// Returns the RCODE of the message.
    pub fn rcode(&self) -> Rcode {
        Rcode::from((self.flags & RCODE_MASK) as u8)
    }
}

////////////////////////////////////////////////////////////////////////
// QUESTIONS                                                          //
////////////////////////////////////////////////////////////////////////

/// The question of a DNS query (RFC 1035 § 4.1.2).
///
/// The `name` preserves the case in which it arrived, so that
/// responses echo the queried case; zone lookups lowercase their
/// probe instead.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Question {
    pub name: String,
    pub qtype: Type,
    pub qclass: Class,
}
