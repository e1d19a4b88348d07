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

//! Domain names as dotted strings, and their on-the-wire codec.
//!
//! Names are held in memory as dotted strings without the trailing
//! dot; the root name is the empty string. Comparisons and storage
//! keys use the lowercased form (domain names are ASCII-case-
//! insensitive per RFC 1035 § 2.3.3), which [`normalize`] produces.
//!
//! On the wire, a name is a sequence of length-prefixed labels
//! terminated by a null label, where any label may instead be a
//! compression pointer into the enclosing message (RFC 1035 § 4.1.4).
//! [`parse_compressed`] decompresses such names; [`emit_uncompressed`]
//! writes names without compression, which is always valid output (if
//! somewhat larger).

use std::collections::HashSet;
use std::fmt;
use std::str;

////////////////////////////////////////////////////////////////////////
// LIMITS                                                             //
////////////////////////////////////////////////////////////////////////

/// The maximum length of a label (RFC 1035 § 2.3.4).
pub const MAX_LABEL_LEN: usize = 63;

/// The maximum length of the on-the-wire representation of a name
/// (RFC 1035 § 2.3.4).
pub const MAX_WIRE_LEN: usize = 255;

////////////////////////////////////////////////////////////////////////
// NORMALIZATION                                                      //
////////////////////////////////////////////////////////////////////////

/// Normalizes a name for storage and comparison: one trailing dot is
/// stripped, and ASCII letters are lowercased. The root name (`"."`)
/// normalizes to the empty string.
pub fn normalize(name: &str) -> String {
    let name = name.strip_suffix('.').unwrap_or(name);
    name.to_ascii_lowercase()
}

////////////////////////////////////////////////////////////////////////
// PARSING OF (POSSIBLY COMPRESSED) ON-THE-WIRE NAMES                 //
////////////////////////////////////////////////////////////////////////

/// Parses a possibly compressed name starting at index `start` of
/// `octets`. Pointer offsets are treated as indices of `octets`, so
/// the intention is for the entire DNS message to be passed in.
///
/// On success, this returns the name as a dotted string (label case
/// preserved) and the length that the name occupies in the message at
/// `start`, i.e. up to and including the null label or the first
/// pointer. Pointers are followed iteratively; an offset visited a
/// second time fails with [`Error::PointerLoop`], so a malicious
/// pointer cycle terminates rather than hanging the parser.
pub fn parse_compressed(octets: &[u8], start: usize) -> Result<(String, usize), Error> {
    let mut labels: Vec<&str> = Vec::new();
    let mut visited: HashSet<usize> = HashSet::new();
    let mut index = start;
    let mut first_chunk_len = None;
    let mut uncompressed_len = 0;

    loop {
        let len = *octets.get(index).ok_or(Error::UnexpectedEom)?;
        if len & 0xc0 == 0xc0 {
            let next = *octets.get(index + 1).ok_or(Error::UnexpectedEom)?;
            let offset = (u16::from_be_bytes([len, next]) & 0x3fff) as usize;
            first_chunk_len.get_or_insert(index + 2 - start);
            if !visited.insert(offset) {
                return Err(Error::PointerLoop);
            }
            index = offset;
        } else if len & 0xc0 != 0 {
            // The 01 and 10 label types are reserved (RFC 1035
            // § 4.1.4).
            return Err(Error::ReservedLabelType);
        } else if len == 0 {
            first_chunk_len.get_or_insert(index + 1 - start);
            break;
        } else {
            let end_of_label = index + 1 + len as usize;
            let label = octets
                .get(index + 1..end_of_label)
                .ok_or(Error::UnexpectedEom)?;
            uncompressed_len += len as usize + 1;
            if uncompressed_len + 1 > MAX_WIRE_LEN {
                return Err(Error::NameTooLong);
            }
            if !label.is_ascii() {
                return Err(Error::InvalidLabel);
            }
            labels.push(str::from_utf8(label).unwrap());
            index = end_of_label;
        }
    }

    Ok((labels.join("."), first_chunk_len.unwrap()))
}

////////////////////////////////////////////////////////////////////////
// EMISSION OF UNCOMPRESSED ON-THE-WIRE NAMES                         //
////////////////////////////////////////////////////////////////////////

/// Appends the uncompressed on-the-wire representation of `name` to
/// `buf`. The empty name and `"."` encode as a single null label.
/// Labels longer than [`MAX_LABEL_LEN`] are truncated rather than
/// producing an invalid length octet.
pub fn emit_uncompressed(name: &str, buf: &mut Vec<u8>) {
    let name = name.strip_suffix('.').unwrap_or(name);
    if !name.is_empty() {
        for label in name.split('.') {
            let label = label.as_bytes();
            let label = &label[..label.len().min(MAX_LABEL_LEN)];
            buf.push(label.len() as u8);
            buf.extend_from_slice(label);
        }
    }
    buf.push(0);
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that an on-the-wire name could not be parsed.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Error {
    UnexpectedEom,
    ReservedLabelType,
    PointerLoop,
    NameTooLong,
    InvalidLabel,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::UnexpectedEom => f.write_str("name extends past the end of the message"),
            Self::ReservedLabelType => f.write_str("reserved label type"),
            Self::PointerLoop => f.write_str("compression pointer loop"),
            Self::NameTooLong => f.write_str("name exceeds 255 octets"),
            Self::InvalidLabel => f.write_str("label contains a non-ASCII octet"),
        }
    }
}

impl std::error::Error for Error {}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_one_trailing_dot_and_lowercases() {
        assert_eq!(normalize("Example.COM."), "example.com");
        assert_eq!(normalize("example.com"), "example.com");
        assert_eq!(normalize("."), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn parse_accepts_uncompressed_names() {
        let octets = b"junk\x07example\x03com\x00junk";
        assert_eq!(
            parse_compressed(octets, 4),
            Ok(("example.com".to_owned(), 13))
        );
    }

    #[test]
    fn parse_preserves_label_case() {
        let octets = b"\x07eXaMpLe\x03CoM\x00";
        assert_eq!(
            parse_compressed(octets, 0),
            Ok(("eXaMpLe.CoM".to_owned(), 13))
        );
    }

    #[test]
    fn parse_parses_the_root_name() {
        assert_eq!(parse_compressed(b"\x00", 0), Ok((String::new(), 1)));
    }

    #[test]
    fn parse_follows_pointers() {
        let octets = b"junk\x03com\x00junk\x07example\xc0\x04junk";
        assert_eq!(
            parse_compressed(octets, 13),
            Ok(("example.com".to_owned(), 10))
        );
    }

    #[test]
    fn parse_splices_labels_across_pointer_chains() {
        // www -> (pointer) example -> (pointer) com -> null
        let octets = b"\x03com\x00\x07example\xc0\x00\x03www\xc0\x05";
        assert_eq!(
            parse_compressed(octets, 15),
            Ok(("www.example.com".to_owned(), 6))
        );
    }

    #[test]
    fn parse_rejects_a_self_referencing_pointer() {
        assert_eq!(parse_compressed(b"\xc0\x00", 0), Err(Error::PointerLoop));
    }

    #[test]
    fn parse_rejects_pointer_cycles() {
        // The name at offset 2 points to offset 0, whose labels run
        // back into the pointer at offset 2.
        let octets = b"\x01a\xc0\x00";
        assert_eq!(parse_compressed(octets, 2), Err(Error::PointerLoop));
    }

    #[test]
    fn parse_rejects_reserved_label_types() {
        assert_eq!(
            parse_compressed(b"\x41x\x00", 0),
            Err(Error::ReservedLabelType)
        );
        assert_eq!(
            parse_compressed(b"\x81x\x00", 0),
            Err(Error::ReservedLabelType)
        );
    }

    #[test]
    fn parse_rejects_truncated_names() {
        assert_eq!(
            parse_compressed(b"\x07exam", 0),
            Err(Error::UnexpectedEom)
        );
        assert_eq!(parse_compressed(b"\x07example", 0), Err(Error::UnexpectedEom));
        assert_eq!(parse_compressed(b"\xc0", 0), Err(Error::UnexpectedEom));
        assert_eq!(parse_compressed(b"", 0), Err(Error::UnexpectedEom));
    }

    #[test]
    fn parse_rejects_names_over_255_octets() {
        // 128 labels of "x" occupy 256 octets once the null label is
        // counted, one over the limit.
        let mut octets = Vec::new();
        for _ in 0..128 {
            octets.extend_from_slice(b"\x01x");
        }
        octets.push(0);
        assert_eq!(parse_compressed(&octets, 0), Err(Error::NameTooLong));
    }

    #[test]
    fn parse_rejects_non_ascii_labels() {
        assert_eq!(
            parse_compressed(b"\x02\xc3\xa9\x00", 0),
            Err(Error::InvalidLabel)
        );
    }

    #[test]
    fn emit_encodes_labels_with_length_prefixes() {
        let mut buf = Vec::new();
        emit_uncompressed("example.com", &mut buf);
        assert_eq!(buf, b"\x07example\x03com\x00");
    }

    #[test]
    fn emit_encodes_the_root_as_a_null_label() {
        for root in ["", "."] {
            let mut buf = Vec::new();
            emit_uncompressed(root, &mut buf);
            assert_eq!(buf, b"\x00");
        }
    }

    #[test]
    fn emit_strips_a_trailing_dot() {
        let mut buf = Vec::new();
        emit_uncompressed("example.com.", &mut buf);
        assert_eq!(buf, b"\x07example\x03com\x00");
    }

    #[test]
    fn emit_truncates_oversized_labels() {
        let label = "x".repeat(70);
        let mut buf = Vec::new();
        emit_uncompressed(&label, &mut buf);
        assert_eq!(buf[0], MAX_LABEL_LEN as u8);
        assert_eq!(buf.len(), 1 + MAX_LABEL_LEN + 1);
    }

    #[test]
    fn emitted_names_parse_back() {
        let mut buf = Vec::new();
        emit_uncompressed("www.example.com", &mut buf);
        assert_eq!(
            parse_compressed(&buf, 0),
            Ok(("www.example.com".to_owned(), buf.len()))
        );
    }
}
