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

//! Parsing of on-the-wire DNS messages.
//!
//! [`Message::parse`] is the entry point. A [`Reader`] keeps a single
//! cursor into the datagram and reads the header, questions, and
//! resource records sequentially. Type-specific RDATA decoding may
//! follow compression pointers elsewhere in the message; the cursor
//! is restored to the end of the RDATA afterwards, so record
//! boundaries are always determined by RDLENGTH.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str;

use super::constants::*;
use super::{Message, Question};
use crate::class::Class;
use crate::name;
use crate::rr::{Rdata, Record, Soa, Ttl, Type};

////////////////////////////////////////////////////////////////////////
// MESSAGE PARSING                                                    //
////////////////////////////////////////////////////////////////////////

impl Message {
    /// Parses a complete DNS message from one datagram.
    ///
    /// All four sections are parsed according to the header counts. A
    /// count that runs past the end of the buffer is an error; a
    /// malformed message is never partially returned.
    pub fn parse(octets: &[u8]) -> Result<Self> {
        if octets.len() < HEADER_SIZE {
            return Err(Error {
                section: Section::Header,
                offset: 0,
                kind: ErrorKind::HeaderTooShort,
            });
        }

        let id = read_header_u16(octets, ID_START);
        let flags = read_header_u16(octets, FLAGS_START);
        let qdcount = read_header_u16(octets, QDCOUNT_START);
        let ancount = read_header_u16(octets, ANCOUNT_START);
        let nscount = read_header_u16(octets, NSCOUNT_START);
        let arcount = read_header_u16(octets, ARCOUNT_START);

        let mut reader = Reader {
            octets,
            cursor: HEADER_SIZE,
        };

        let mut questions = Vec::with_capacity(qdcount as usize);
        for _ in 0..qdcount {
            let offset = reader.cursor;
            let question = reader
                .read_question()
                .map_err(|kind| Error::at(Section::Question, offset, kind))?;
            questions.push(question);
        }
        let mut answers = Vec::with_capacity(ancount as usize);
        for _ in 0..ancount {
            let offset = reader.cursor;
            let record = reader
                .read_rr()
                .map_err(|kind| Error::at(Section::Answer, offset, kind))?;
            answers.push(record);
        }
        let mut authority = Vec::with_capacity(nscount as usize);
        for _ in 0..nscount {
            let offset = reader.cursor;
            let record = reader
                .read_rr()
                .map_err(|kind| Error::at(Section::Authority, offset, kind))?;
            authority.push(record);
        }
        let mut additional = Vec::with_capacity(arcount as usize);
        for _ in 0..arcount {
            let offset = reader.cursor;
            let record = reader
                .read_rr()
                .map_err(|kind| Error::at(Section::Additional, offset, kind))?;
            additional.push(record);
        }

        Ok(Self {
            id,
            flags,
            questions,
            answers,
            authority,
            additional,
        })
    }
}

/// Reads a big-endian `u16` from a fixed header position. The caller
/// has already checked that a full header is present.
fn read_header_u16(octets: &[u8], start: usize) -> u16 {
    u16::from_be_bytes([octets[start], octets[start + 1]])
}

////////////////////////////////////////////////////////////////////////
// READER                                                             //
////////////////////////////////////////////////////////////////////////

/// A cursor over a DNS message buffer.
struct Reader<'a> {
    octets: &'a [u8],
    cursor: usize,
}

impl<'a> Reader<'a> {
    fn read_u16(&mut self) -> Result<u16, ErrorKind> {
        let octets = self
            .octets
            .get(self.cursor..self.cursor + 2)
            .ok_or(ErrorKind::UnexpectedEom)?;
        self.cursor += 2;
        Ok(u16::from_be_bytes([octets[0], octets[1]]))
    }

    fn read_u32(&mut self) -> Result<u32, ErrorKind> {
        let octets = self
            .octets
            .get(self.cursor..self.cursor + 4)
            .ok_or(ErrorKind::UnexpectedEom)?;
        self.cursor += 4;
        Ok(u32::from_be_bytes([octets[0], octets[1], octets[2], octets[3]]))
    }

    fn read_name(&mut self) -> Result<String, ErrorKind> {
        let (name, len) =
            name::parse_compressed(self.octets, self.cursor).map_err(ErrorKind::Name)?;
        self.cursor += len;
        Ok(name)
    }

    /// Reads a question starting at the current cursor.
    fn read_question(&mut self) -> Result<Question, ErrorKind> {
        let name = self.read_name()?;
        let qtype = Type::from(self.read_u16()?);
        let qclass = Class::from(self.read_u16()?);
        Ok(Question {
            name,
            qtype,
            qclass,
        })
    }

    /// Reads a resource record starting at the current cursor.
    fn read_rr(&mut self) -> Result<Record, ErrorKind> {
        let name = self.read_name()?;
        let rr_type = Type::from(self.read_u16()?);
        let class = Class::from(self.read_u16()?);
        let ttl = Ttl::from(self.read_u32()?);
        let rdlength = self.read_u16()? as usize;
        let rdata_start = self.cursor;
        let rdata_end = rdata_start + rdlength;
        if rdata_end > self.octets.len() {
            return Err(ErrorKind::UnexpectedEom);
        }
        let rdata = self.read_rdata(rr_type, rdata_start, rdlength)?;
        // Type-specific decoding may have jumped through compression
        // pointers; the next record starts after RDLENGTH octets.
        self.cursor = rdata_end;
        Ok(Record {
            name,
            rr_type,
            class,
            ttl,
            rdata,
        })
    }

    /// Interprets the RDATA of a record according to its type. Name-
    /// bearing types (CNAME, NS, MX, SOA) may contain compression
    /// pointers into the enclosing message, so names are parsed
    /// against the whole buffer, not the RDATA slice in isolation.
    fn read_rdata(&self, rr_type: Type, start: usize, rdlength: usize) -> Result<Rdata, ErrorKind> {
        let rdata = &self.octets[start..start + rdlength];
        match rr_type {
            Type::A => {
                let octets: [u8; 4] = rdata
                    .try_into()
                    .map_err(|_| ErrorKind::BadRdataLength(rr_type))?;
                Ok(Rdata::A(Ipv4Addr::from(octets)))
            }
            Type::AAAA => {
                let octets: [u8; 16] = rdata
                    .try_into()
                    .map_err(|_| ErrorKind::BadRdataLength(rr_type))?;
                Ok(Rdata::Aaaa(Ipv6Addr::from(octets)))
            }
            Type::CNAME | Type::NS => {
                let (target, _) =
                    name::parse_compressed(self.octets, start).map_err(ErrorKind::Name)?;
                if rr_type == Type::CNAME {
                    Ok(Rdata::Cname(target))
                } else {
                    Ok(Rdata::Ns(target))
                }
            }
            Type::MX => {
                if rdlength < 3 {
                    return Err(ErrorKind::BadRdataLength(rr_type));
                }
                let preference = u16::from_be_bytes([rdata[0], rdata[1]]);
                let (exchange, _) =
                    name::parse_compressed(self.octets, start + 2).map_err(ErrorKind::Name)?;
                Ok(Rdata::Mx {
                    preference,
                    exchange,
                })
            }
            Type::TXT => read_txt_rdata(rdata).map(Rdata::Txt),
            Type::SOA => {
                let (mname, mname_len) =
                    name::parse_compressed(self.octets, start).map_err(ErrorKind::Name)?;
                let (rname, rname_len) =
                    name::parse_compressed(self.octets, start + mname_len)
                        .map_err(ErrorKind::Name)?;
                let fixed_start = mname_len + rname_len;
                if fixed_start + 20 > rdlength {
                    return Err(ErrorKind::BadRdataLength(rr_type));
                }
                let mut fields = [0; 5];
                for (i, field) in fields.iter_mut().enumerate() {
                    let at = fixed_start + 4 * i;
                    *field = u32::from_be_bytes([
                        rdata[at],
                        rdata[at + 1],
                        rdata[at + 2],
                        rdata[at + 3],
                    ]);
                }
                Ok(Rdata::Soa(Soa {
                    mname,
                    rname,
                    serial: fields[0],
                    refresh: fields[1],
                    retry: fields[2],
                    expire: fields[3],
                    minimum: fields[4],
                }))
            }
            _ => Ok(Rdata::Other(rdata.to_vec())),
        }
    }
}

/// Reads the `<length><bytes>` character strings of a TXT RDATA. A
/// character string running past RDLENGTH, or one that is not valid
/// UTF-8, is an error.
fn read_txt_rdata(rdata: &[u8]) -> Result<Vec<String>, ErrorKind> {
    let mut strings = Vec::new();
    let mut pos = 0;
    while pos < rdata.len() {
        let len = rdata[pos] as usize;
        pos += 1;
        let octets = rdata
            .get(pos..pos + len)
            .ok_or(ErrorKind::BadTxtRdata)?;
        let string = str::from_utf8(octets).map_err(|_| ErrorKind::BadTxtRdata)?;
        strings.push(string.to_owned());
        pos += len;
    }
    Ok(strings)
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// The section of a message in which parsing failed.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Section {
    Header,
    Question,
    Answer,
    Authority,
    Additional,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::Header => f.write_str("header"),
            Self::Question => f.write_str("question section"),
            Self::Answer => f.write_str("answer section"),
            Self::Authority => f.write_str("authority section"),
            Self::Additional => f.write_str("additional section"),
        }
    }
}

/// An error signaling that a message could not be parsed, tagged with
/// the section and the offset of the element at which parsing failed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Error {
    pub section: Section,
    pub offset: usize,
    pub kind: ErrorKind,
}

impl Error {
    /// Tags `kind` with the section and the offset at which the
    /// failing element began.
    fn at(section: Section, offset: usize, kind: ErrorKind) -> Self {
        Self {
            section,
            offset,
            kind,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} at offset {}: {}", self.section, self.offset, self.kind)
    }
}

impl std::error::Error for Error {}

/// The reason a message could not be parsed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    HeaderTooShort,
    UnexpectedEom,
    Name(name::Error),
    BadRdataLength(Type),
    BadTxtRdata,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::HeaderTooShort => f.write_str("header too short"),
            Self::UnexpectedEom => f.write_str("unexpected end of message"),
            Self::Name(err) => write!(f, "invalid name: {}", err),
            Self::BadRdataLength(rr_type) => {
                write!(f, "bad RDATA length for {} record", rr_type)
            }
            Self::BadTxtRdata => f.write_str("malformed TXT RDATA"),
        }
    }
}

/// The type returned by fallible parsing functions.
pub type Result<T, E = Error> = std::result::Result<T, E>;

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
