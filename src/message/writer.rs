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

//! Building of on-the-wire DNS response messages.
//!
//! The [`Writer`] builds responses to a parsed query. Names are
//! emitted uncompressed, which is always valid output; the supported
//! zones produce responses well within the 512-octet UDP limit, so
//! neither compression nor the TC bit is needed. RDLENGTH is always
//! computed from the RDATA actually emitted.

use super::constants::*;
use super::{Message, Question, Rcode};
use crate::name;
use crate::rr::{Rdata, Record};

////////////////////////////////////////////////////////////////////////
// WRITER                                                             //
////////////////////////////////////////////////////////////////////////

/// Builds DNS response datagrams.
pub struct Writer {
    octets: Vec<u8>,
}

impl Writer {
    /// Builds a response to `query`. The question section and the RD
    /// flag are echoed from the query; QR and AA are set; RA and TC
    /// are clear; the RCODE is NOERROR. The additional section is
    /// always empty.
    pub fn build_response(query: &Message, answers: &[Record], authority: &[Record]) -> Vec<u8> {
        let mut writer = Self::new();
        writer.write_header(
            query,
            Rcode::NOERROR,
            answers.len() as u16,
            authority.len() as u16,
        );
        for question in &query.questions {
            writer.write_question(question);
        }
        for record in answers {
            writer.write_record(record);
        }
        for record in authority {
            writer.write_record(record);
        }
        writer.octets
    }

    /// Builds a header-only error response to `query` carrying
    /// `rcode`: the question section is echoed and the answer,
    /// authority, and additional sections are empty.
    pub fn build_error_response(query: &Message, rcode: Rcode) -> Vec<u8> {
        let mut writer = Self::new();
        writer.write_header(query, rcode, 0, 0);
        for question in &query.questions {
            writer.write_question(question);
        }
        writer.octets
    }

    fn new() -> Self {
        Self {
            octets: Vec::with_capacity(512),
        }
    }

    fn write_header(&mut self, query: &Message, rcode: Rcode, ancount: u16, nscount: u16) {
        let flags = FLAG_QR | FLAG_AA | (query.flags & FLAG_RD) | u16::from(u8::from(rcode));
        self.write_u16(query.id);
        self.write_u16(flags);
        self.write_u16(query.questions.len() as u16);
        self.write_u16(ancount);
        self.write_u16(nscount);
        self.write_u16(0); // ARCOUNT
    }

    fn write_question(&mut self, question: &Question) {
        self.write_name(&question.name);
        self.write_u16(question.qtype.into());
        self.write_u16(question.qclass.into());
    }

    fn write_record(&mut self, record: &Record) {
        self.write_name(&record.name);
        self.write_u16(record.rr_type.into());
        self.write_u16(record.class.into());
        self.write_u32(record.ttl.into());
        let rdata = build_rdata(&record.rdata);
        self.write_u16(rdata.len() as u16);
        self.octets.extend_from_slice(&rdata);
    }

    fn write_name(&mut self, name: &str) {
        name::emit_uncompressed(name, &mut self.octets);
    }

    fn write_u16(&mut self, value: u16) {
        self.octets.extend_from_slice(&value.to_be_bytes());
    }

    fn write_u32(&mut self, value: u32) {
        self.octets.extend_from_slice(&value.to_be_bytes());
    }
}

////////////////////////////////////////////////////////////////////////
// RDATA EMISSION                                                     //
////////////////////////////////////////////////////////////////////////

/// Builds the on-the-wire RDATA for a payload. TXT character strings
/// longer than 255 octets are truncated rather than producing an
/// invalid length octet.
fn build_rdata(rdata: &Rdata) -> Vec<u8> {
    let mut octets = Vec::new();
    match rdata {
        Rdata::A(address) => octets.extend_from_slice(&address.octets()),
        Rdata::Aaaa(address) => octets.extend_from_slice(&address.octets()),
        Rdata::Cname(target) | Rdata::Ns(target) => name::emit_uncompressed(target, &mut octets),
        Rdata::Mx {
            preference,
            exchange,
        } => {
            octets.extend_from_slice(&preference.to_be_bytes());
            name::emit_uncompressed(exchange, &mut octets);
        }
        Rdata::Txt(strings) => {
            for string in strings {
                let string = string.as_bytes();
                let string = &string[..string.len().min(255)];
                octets.push(string.len() as u8);
                octets.extend_from_slice(string);
            }
        }
        Rdata::Soa(soa) => {
            name::emit_uncompressed(&soa.mname, &mut octets);
            name::emit_uncompressed(&soa.rname, &mut octets);
            octets.extend_from_slice(&soa.serial.to_be_bytes());
            octets.extend_from_slice(&soa.refresh.to_be_bytes());
            octets.extend_from_slice(&soa.retry.to_be_bytes());
            octets.extend_from_slice(&soa.expire.to_be_bytes());
            octets.extend_from_slice(&soa.minimum.to_be_bytes());
        }
        Rdata::Other(raw) => octets.extend_from_slice(raw),
    }
    octets
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Class;
    use crate::message::constants::FLAG_RD;
    use crate::rr::{Soa, Ttl, Type};

    /// A query for the given name and type, as the parser would
    /// produce it.
    fn query(name: &str, qtype: Type) -> Message {
        Message {
            id: 0x1234,
            flags: FLAG_RD,
            questions: vec![Question {
                name: name.to_owned(),
                qtype,
                qclass: Class::IN,
            }],
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
        }
    }

    /// Builds a response carrying `record` as the only answer, parses
    /// it back, and returns the parsed record.
    fn round_trip(record: Record) -> Record {
        let query = query(&record.name, record.rr_type);
        let response = Writer::build_response(&query, &[record], &[]);
        let parsed = Message::parse(&response).unwrap();
        assert_eq!(parsed.answers.len(), 1);
        parsed.answers.into_iter().next().unwrap()
    }

    #[test]
    fn responses_echo_id_question_and_rd() {
        let query = query("example.com", Type::A);
        let response = Writer::build_response(&query, &[], &[]);
        let parsed = Message::parse(&response).unwrap();
        assert_eq!(parsed.id, 0x1234);
        assert!(parsed.qr());
        assert!(parsed.aa());
        assert!(parsed.rd());
        assert!(!parsed.ra());
        assert!(!parsed.tc());
        assert_eq!(parsed.rcode(), Rcode::NOERROR);
        assert_eq!(parsed.questions, query.questions);
    }

    #[test]
    fn responses_do_not_mirror_a_clear_rd() {
        let mut query = query("example.com", Type::A);
        query.flags = 0;
        let response = Writer::build_response(&query, &[], &[]);
        assert!(!Message::parse(&response).unwrap().rd());
    }

    #[test]
    fn questions_echo_the_queried_case() {
        let query = query("ExAmPlE.CoM", Type::A);
        let response = Writer::build_response(&query, &[], &[]);
        let parsed = Message::parse(&response).unwrap();
        assert_eq!(parsed.questions[0].name, "ExAmPlE.CoM");
    }

    #[test]
    fn a_records_round_trip() {
        let record = round_trip(Record::a("example.com", 3600, "93.184.216.34".parse().unwrap()));
        assert_eq!(record.rr_type, Type::A);
        assert_eq!(record.ttl, Ttl::from(3600));
        assert_eq!(record.rdata, Rdata::A("93.184.216.34".parse().unwrap()));
    }

    #[test]
    fn aaaa_records_round_trip() {
        let address = "2606:2800:220:1:248:1893:25c8:1946".parse().unwrap();
        let record = round_trip(Record::aaaa("example.com", 3600, address));
        assert_eq!(record.rdata, Rdata::Aaaa(address));
    }

    #[test]
    fn cname_and_ns_records_round_trip() {
        let record = round_trip(Record::cname("www.example.com", 3600, "example.com"));
        assert_eq!(record.rdata, Rdata::Cname("example.com".to_owned()));
        let record = round_trip(Record::ns("example.com", 3600, "ns1.example.com"));
        assert_eq!(record.rdata, Rdata::Ns("ns1.example.com".to_owned()));
    }

    #[test]
    fn mx_records_round_trip() {
        let record = round_trip(Record::mx("example.com", 3600, 10, "mail.example.com"));
        assert_eq!(
            record.rdata,
            Rdata::Mx {
                preference: 10,
                exchange: "mail.example.com".to_owned(),
            }
        );
    }

    #[test]
    fn txt_records_round_trip() {
        let strings = vec!["v=spf1 mx -all".to_owned()];
        let record = round_trip(Record::txt("example.com", 3600, strings.clone()));
        assert_eq!(record.rdata, Rdata::Txt(strings));
    }

    #[test]
    fn soa_records_round_trip() {
        let soa = Soa {
            mname: "ns1.example.com".to_owned(),
            rname: "hostmaster.example.com".to_owned(),
            serial: 2023010101,
            refresh: 7200,
            retry: 3600,
            expire: 1209600,
            minimum: 3600,
        };
        let record = round_trip(Record::soa("example.com", 3600, soa.clone()));
        assert_eq!(record.rdata, Rdata::Soa(soa));
    }

    #[test]
    fn txt_character_strings_are_truncated_to_255_octets() {
        let record = Record::txt("example.com", 3600, vec!["x".repeat(300)]);
        let parsed = round_trip(record);
        assert_eq!(parsed.rdata, Rdata::Txt(vec!["x".repeat(255)]));
    }

    #[test]
    fn authority_records_land_in_the_authority_section() {
        let query = query("example.com", Type::A);
        let answer = Record::a("example.com", 3600, "93.184.216.34".parse().unwrap());
        let ns = Record::ns("example.com", 3600, "ns1.example.com");
        let response = Writer::build_response(&query, &[answer], &[ns.clone()]);
        let parsed = Message::parse(&response).unwrap();
        assert_eq!(parsed.answers.len(), 1);
        assert_eq!(parsed.authority, vec![ns]);
    }

    #[test]
    fn error_responses_carry_the_rcode_and_no_records() {
        let query = query("nonexistent.example.com", Type::A);
        let response = Writer::build_error_response(&query, Rcode::NXDOMAIN);
        let parsed = Message::parse(&response).unwrap();
        assert_eq!(parsed.id, 0x1234);
        assert!(parsed.qr());
        assert!(parsed.aa());
        assert_eq!(parsed.rcode(), Rcode::NXDOMAIN);
        assert_eq!(parsed.questions, query.questions);
        assert!(parsed.answers.is_empty());
        assert!(parsed.authority.is_empty());
        assert!(parsed.additional.is_empty());
    }
}
