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

//! Loading of BIND-style zone files.
//!
//! [`load`] reads a zone file from any [`io::Read`] stream and
//! produces a populated [`Zone`]. The accepted subset of the BIND
//! master-file format comprises the `$ORIGIN` and `$TTL` directives
//! and records of type A, AAAA, CNAME, NS, MX, TXT, and SOA. `;`
//! starts a comment; `@` stands for the current origin; a line whose
//! first field is a TTL, class, or type token inherits the previous
//! record's owner name. Parenthesized records may span several
//! physical lines and are joined into one logical line before
//! parsing, so the customary multi-line SOA form loads correctly.
//!
//! The loader is permissive about record lines: a line it cannot
//! parse is skipped (and logged at debug level), and the zone
//! contains whatever valid records remained. I/O errors, invalid
//! directives, and a record appearing before any `$ORIGIN` fail the
//! load as a whole.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines, Read};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::Path;
use std::str::FromStr;

use log::debug;

use crate::class::Class;
use crate::name;
use crate::rr::{Rdata, Record, Soa, Ttl, Type};
use crate::zone::Zone;

////////////////////////////////////////////////////////////////////////
// LOADING                                                            //
////////////////////////////////////////////////////////////////////////

/// Loads a zone from the file at `path`.
pub fn load_path<P: AsRef<Path>>(path: P) -> Result<Zone> {
    load(File::open(path)?)
}

/// Loads a zone from `stream`.
///
/// The zone's origin is taken from the first `$ORIGIN` directive,
/// which must precede the first record.
pub fn load<S: Read>(stream: S) -> Result<Zone> {
    let mut lines = LogicalLines::new(BufReader::new(stream));
    let mut zone: Option<Zone> = None;
    let mut origin: Option<String> = None;
    let mut default_ttl = 3600;
    let mut current_name = String::new();

    while let Some((line_number, logical)) = lines.next_logical_line()? {
        let trimmed = logical.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(rest) = strip_directive(trimmed, "$ORIGIN") {
            let rest = rest.trim();
            if rest.is_empty() {
                return Err(Error::InvalidDirective {
                    line: line_number,
                    reason: "$ORIGIN requires a name",
                });
            }
            let new_origin = name::normalize(rest);
            if zone.is_none() {
                zone = Some(Zone::new(&new_origin));
            }
            origin = Some(new_origin);
            continue;
        }

        if let Some(rest) = strip_directive(trimmed, "$TTL") {
            default_ttl = parse_duration(rest.trim()).map_err(|_| Error::InvalidDirective {
                line: line_number,
                reason: "$TTL requires a duration",
            })?;
            continue;
        }

        if trimmed.starts_with('$') {
            debug!("line {}: skipping unsupported directive", line_number);
            continue;
        }

        // A record line. The origin (and hence the zone) must be
        // known by now.
        let (zone, origin) = match (&zone, &origin) {
            (Some(zone), Some(origin)) => (zone, origin),
            _ => return Err(Error::NoOrigin { line: line_number }),
        };
        match parse_record_line(trimmed, origin, &current_name, default_ttl) {
            Ok(record) => {
                current_name = record.name.clone();
                zone.add(record);
            }
            Err(reason) => {
                debug!("line {}: skipping record: {}", line_number, reason);
            }
        }
    }

    zone.ok_or(Error::NoOrigin { line: 0 })
}

/// Strips a directive keyword (matched case-insensitively) from the
/// start of `line`, returning the remainder.
fn strip_directive<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    if line.len() >= keyword.len() && line[..keyword.len()].eq_ignore_ascii_case(keyword) {
        let rest = &line[keyword.len()..];
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            return Some(rest);
        }
    }
    None
}

////////////////////////////////////////////////////////////////////////
// LOGICAL LINES                                                      //
////////////////////////////////////////////////////////////////////////

/// Produces logical lines from a zone-file stream: comments are
/// stripped, and parenthesized records are joined into a single line.
struct LogicalLines<S> {
    lines: Lines<BufReader<S>>,
    line_number: usize,
}

impl<S: Read> LogicalLines<S> {
    fn new(reader: BufReader<S>) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
        }
    }

    /// Returns the next physical line with its comment removed, or
    /// `None` at end-of-file.
    fn next_line(&mut self) -> Result<Option<String>> {
        match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                Ok(Some(strip_comment(&line?)))
            }
            None => Ok(None),
        }
    }

    /// Returns the next logical line and the number of the physical
    /// line on which it starts. A line containing `(` is extended
    /// with subsequent lines until the matching `)` appears; both
    /// parentheses are replaced by spaces.
    fn next_logical_line(&mut self) -> Result<Option<(usize, String)>> {
        let mut logical = match self.next_line()? {
            Some(line) => line,
            None => return Ok(None),
        };
        let start = self.line_number;

        if find_unquoted(&logical, '(').is_some() {
            while find_unquoted(&logical, ')').is_none() {
                match self.next_line()? {
                    Some(continuation) => {
                        logical.push(' ');
                        logical.push_str(&continuation);
                    }
                    None => break, // Unterminated; record parsing will reject it.
                }
            }
            logical = blank_unquoted_parens(&logical);
        }

        Ok(Some((start, logical)))
    }
}

/// Returns the byte index of the first `needle` in `line` that lies
/// outside a quoted string, so that `;` and parentheses in TXT data
/// are not mistaken for syntax.
fn find_unquoted(line: &str, needle: char) -> Option<usize> {
    let mut in_quotes = false;
    for (index, c) in line.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == needle && !in_quotes {
            return Some(index);
        }
    }
    None
}

/// Removes a `;` comment from `line`. A `;` inside a quoted string
/// (TXT data) does not start a comment.
fn strip_comment(line: &str) -> String {
    match find_unquoted(line, ';') {
        Some(index) => line[..index].to_owned(),
        None => line.to_owned(),
    }
}

/// Replaces the grouping parentheses of a joined logical line with
/// spaces. Parentheses inside a quoted string are data, not grouping,
/// and are kept.
fn blank_unquoted_parens(line: &str) -> String {
    let mut blanked = String::with_capacity(line.len());
    let mut in_quotes = false;
    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                blanked.push(c);
            }
            '(' | ')' if !in_quotes => blanked.push(' '),
            _ => blanked.push(c),
        }
    }
    blanked
}

////////////////////////////////////////////////////////////////////////
// RECORD LINES                                                       //
////////////////////////////////////////////////////////////////////////

/// Parses one logical record line. The returned record's owner name
/// becomes the "current name" inherited by subsequent lines.
fn parse_record_line(
    line: &str,
    origin: &str,
    current_name: &str,
    default_ttl: u32,
) -> std::result::Result<Record, &'static str> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let mut index = 0;

    // The first field is the owner name unless it reads as a TTL,
    // class, or type, in which case the previous owner carries over.
    let first = *fields.first().ok_or("empty line")?;
    let owner = if !is_class_or_type(first) && parse_duration(first).is_err() {
        index += 1;
        qualify(first, origin)
    } else if current_name.is_empty() {
        return Err("no previous owner name to inherit");
    } else {
        current_name.to_owned()
    };

    // Optional TTL.
    let mut ttl = default_ttl;
    if let Some(parsed) = fields.get(index).and_then(|f| parse_duration(f).ok()) {
        ttl = parsed;
        index += 1;
    }

    // Optional class. Only IN data is stored; the token is otherwise
    // ignored.
    if fields
        .get(index)
        .map_or(false, |f| Class::from_str(f).is_ok())
    {
        index += 1;
    }

    let rr_type = fields
        .get(index)
        .ok_or("missing type")?
        .parse::<Type>()
        .map_err(|_| "unknown type")?;
    index += 1;

    let rdata_fields = &fields[index..];
    let rdata = parse_rdata(rr_type, rdata_fields, origin)?;
    Ok(Record {
        name: owner,
        rr_type,
        class: Class::IN,
        ttl: Ttl::from(ttl),
        rdata,
    })
}

/// Parses the type-specific RDATA fields of a record line.
fn parse_rdata(
    rr_type: Type,
    fields: &[&str],
    origin: &str,
) -> std::result::Result<Rdata, &'static str> {
    match rr_type {
        Type::A => {
            let address: Ipv4Addr = fields
                .first()
                .ok_or("missing address")?
                .parse()
                .map_err(|_| "invalid IPv4 address")?;
            Ok(Rdata::A(address))
        }
        Type::AAAA => {
            let address: Ipv6Addr = fields
                .first()
                .ok_or("missing address")?
                .parse()
                .map_err(|_| "invalid IPv6 address")?;
            if address.to_ipv4_mapped().is_some() {
                return Err("IPv4-mapped address in AAAA record");
            }
            Ok(Rdata::Aaaa(address))
        }
        Type::CNAME | Type::NS => {
            let target = qualify(fields.first().ok_or("missing target")?, origin);
            if rr_type == Type::CNAME {
                Ok(Rdata::Cname(target))
            } else {
                Ok(Rdata::Ns(target))
            }
        }
        Type::MX => {
            if fields.len() < 2 {
                return Err("MX needs a preference and a target");
            }
            let preference = fields[0].parse().map_err(|_| "invalid MX preference")?;
            Ok(Rdata::Mx {
                preference,
                exchange: qualify(fields[1], origin),
            })
        }
        Type::TXT => {
            let text = fields.join(" ");
            if text.is_empty() {
                return Err("missing text");
            }
            Ok(Rdata::Txt(vec![unquote(&text).to_owned()]))
        }
        Type::SOA => {
            if fields.len() < 7 {
                return Err("SOA needs seven fields");
            }
            Ok(Rdata::Soa(Soa {
                mname: qualify(fields[0], origin),
                rname: qualify(fields[1], origin),
                serial: fields[2].parse().map_err(|_| "invalid SOA serial")?,
                refresh: parse_duration(fields[3]).map_err(|_| "invalid SOA refresh")?,
                retry: parse_duration(fields[4]).map_err(|_| "invalid SOA retry")?,
                expire: parse_duration(fields[5]).map_err(|_| "invalid SOA expire")?,
                minimum: parse_duration(fields[6]).map_err(|_| "invalid SOA minimum")?,
            }))
        }
        _ => Err("unsupported type"),
    }
}

/// Returns whether `token` reads as a class or RR type mnemonic.
fn is_class_or_type(token: &str) -> bool {
    Class::from_str(token).is_ok() || token.parse::<Type>().is_ok()
}

/// Turns a zone-file name token into a fully qualified, normalized
/// name: `@` is the origin, a name with a trailing dot is already
/// qualified, and anything else is suffixed with the origin.
fn qualify(token: &str, origin: &str) -> String {
    if token == "@" {
        origin.to_owned()
    } else if token.ends_with('.') {
        name::normalize(token)
    } else {
        name::normalize(&format!("{}.{}", token, origin))
    }
}

/// Strips one surrounding pair of double quotes, if present.
fn unquote(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|text| text.strip_suffix('"'))
        .unwrap_or(text)
}

////////////////////////////////////////////////////////////////////////
// DURATIONS                                                          //
////////////////////////////////////////////////////////////////////////

/// Parses a zone-file duration: a bare number of seconds, or a number
/// with one of the case-insensitive suffixes `s`, `m`, `h`, `d`, `w`.
pub fn parse_duration(text: &str) -> std::result::Result<u32, &'static str> {
    let lower = text.to_ascii_lowercase();
    let (digits, multiplier) = if let Some(digits) = lower.strip_suffix('w') {
        (digits, 604_800)
    } else if let Some(digits) = lower.strip_suffix('d') {
        (digits, 86_400)
    } else if let Some(digits) = lower.strip_suffix('h') {
        (digits, 3_600)
    } else if let Some(digits) = lower.strip_suffix('m') {
        (digits, 60)
    } else if let Some(digits) = lower.strip_suffix('s') {
        (digits, 1)
    } else {
        (lower.as_str(), 1)
    };
    digits
        .parse::<u32>()
        .ok()
        .and_then(|value| value.checked_mul(multiplier))
        .ok_or("invalid duration")
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that a zone file could not be loaded.
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    /// A record line appeared before any `$ORIGIN` directive (or the
    /// file contained no `$ORIGIN` at all, in which case `line` is 0).
    NoOrigin {
        line: usize,
    },
    InvalidDirective {
        line: usize,
        reason: &'static str,
    },
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error: {}", err),
            Self::NoOrigin { line: 0 } => f.write_str("no $ORIGIN directive in zone file"),
            Self::NoOrigin { line } => {
                write!(f, "line {}: record before any $ORIGIN directive", line)
            }
            Self::InvalidDirective { line, reason } => write!(f, "line {}: {}", line, reason),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

/// The type returned by loading functions.
pub type Result<T, E = Error> = std::result::Result<T, E>;

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
