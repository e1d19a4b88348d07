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

//! The query-processing logic of the authoritative server.
//!
//! The [`Server`] structure is independent of any underlying network
//! I/O: the I/O layer (see [`io`](crate::io)) receives datagrams and
//! submits each one to [`Server::handle_query`], which returns the
//! response datagram to send, if any. This keeps the decision tree —
//! zone selection, lookup, response composition — testable without
//! sockets.

use log::debug;

use crate::message::{Message, Rcode, Writer};
use crate::rr::Type;
use crate::zone::Catalog;

mod stats;

pub use stats::Stats;

////////////////////////////////////////////////////////////////////////
// SERVER                                                             //
////////////////////////////////////////////////////////////////////////

/// An authoritative DNS server, abstracted from network I/O.
pub struct Server {
    catalog: Catalog,
    stats: Stats,
}

impl Server {
    /// Creates a new `Server` serving the zones in `catalog`.
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            stats: Stats::new(),
        }
    }

    /// Returns the server's counters.
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Handles one received datagram, returning the response datagram
    /// to send back, or `None` when no reply is owed.
    ///
    /// A datagram that cannot be parsed is counted in `errors` and
    /// dropped without a reply; there is not enough structure in a
    /// malformed message to answer it. A query with an empty question
    /// section is likewise dropped. A query outside every configured
    /// zone is answered with REFUSED, and a name not present in its
    /// zone with NXDOMAIN. Everything else gets the matching records
    /// in the answer section and the zone's apex NS records in the
    /// authority section; a name that exists without records of the
    /// requested type yields a NOERROR response with an empty answer
    /// section.
    pub fn handle_query(&self, octets: &[u8]) -> Option<Vec<u8>> {
        self.stats.inc_queries();

        let query = match Message::parse(octets) {
            Ok(query) => query,
            Err(err) => {
                debug!("dropping unparseable datagram: {}", err);
                self.stats.inc_errors();
                return None;
            }
        };

        let question = query.questions.first()?;
        debug!("query: {} {}", question.name, question.qtype);

        let zone = match self.catalog.find(&question.name) {
            Some(zone) => zone,
            None => {
                debug!("-> REFUSED (not authoritative)");
                return Some(Writer::build_error_response(&query, Rcode::REFUSED));
            }
        };

        let records = zone.lookup(&question.name, question.qtype);
        if records.is_empty() && !zone.has_name(&question.name) {
            debug!("-> NXDOMAIN");
            self.stats.inc_nxdomain();
            return Some(Writer::build_error_response(&query, Rcode::NXDOMAIN));
        }

        if records.is_empty() {
            debug!("-> NODATA");
        } else {
            debug!("-> {} record(s)", records.len());
        }
        self.stats.inc_answers();
        let authority = zone.lookup(zone.origin(), Type::NS);
        Some(Writer::build_response(&query, &records, &authority))
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use super::*;
    use crate::name;
    use crate::rr::Rdata;
    use crate::zone_file;

    const EXAMPLE_COM_ZONE: &str = "$ORIGIN example.com.\n\
                                    $TTL 3600\n\
                                    @    IN A    93.184.216.34\n\
                                    @    IN AAAA 2606:2800:220:1:248:1893:25c8:1946\n\
                                    www  IN CNAME @\n\
                                    @    IN NS   ns1\n\
                                    @    IN MX   10 mail\n\
                                    @    IN TXT  \"v=spf1 mx -all\"\n";

    fn example_server() -> Server {
        let catalog = Catalog::new();
        catalog.insert(Arc::new(
            zone_file::load(Cursor::new(EXAMPLE_COM_ZONE)).unwrap(),
        ));
        Server::new(catalog)
    }

    /// Builds a query datagram for `(name, qtype)` with ID 0x1234 and
    /// RD set.
    fn query_bytes(name: &str, qtype: Type) -> Vec<u8> {
        let mut octets = vec![
            0x12, 0x34, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        name::emit_uncompressed(name, &mut octets);
        octets.extend_from_slice(&u16::from(qtype).to_be_bytes());
        octets.extend_from_slice(&1u16.to_be_bytes());
        octets
    }

    fn ask(server: &Server, name: &str, qtype: Type) -> Message {
        let response = server.handle_query(&query_bytes(name, qtype)).unwrap();
        Message::parse(&response).unwrap()
    }

    fn assert_authority_has_apex_ns(response: &Message) {
        assert!(response
            .authority
            .iter()
            .any(|record| record.name == "example.com"
                && record.rdata == Rdata::Ns("ns1.example.com".to_owned())));
    }

    #[test]
    fn answers_an_a_query_with_the_address_and_apex_ns() {
        let server = example_server();
        let response = ask(&server, "example.com", Type::A);

        assert_eq!(response.id, 0x1234);
        assert!(response.qr());
        assert!(response.aa());
        assert_eq!(response.rcode(), Rcode::NOERROR);
        assert_eq!(response.answers.len(), 1);
        let answer = &response.answers[0];
        assert_eq!(answer.rdata, Rdata::A("93.184.216.34".parse().unwrap()));
        assert_eq!(u32::from(answer.ttl), 3600);
        assert_authority_has_apex_ns(&response);
        assert_eq!(server.stats().answers(), 1);
    }

    #[test]
    fn answers_an_aaaa_query() {
        let server = example_server();
        let response = ask(&server, "example.com", Type::AAAA);
        assert_eq!(response.answers.len(), 1);
        assert_eq!(
            response.answers[0].rdata,
            Rdata::Aaaa("2606:2800:220:1:248:1893:25c8:1946".parse().unwrap())
        );
    }

    #[test]
    fn answers_an_aliased_a_query_with_the_cname() {
        let server = example_server();
        let response = ask(&server, "www.example.com", Type::A);

        // The alias is returned unchased; the client follows it.
        assert_eq!(response.answers.len(), 1);
        let answer = &response.answers[0];
        assert_eq!(answer.rr_type, Type::CNAME);
        assert_eq!(answer.rdata, Rdata::Cname("example.com".to_owned()));
    }

    #[test]
    fn answers_a_missing_name_with_nxdomain() {
        let server = example_server();
        let response = ask(&server, "nonexistent.example.com", Type::A);

        assert_eq!(response.rcode(), Rcode::NXDOMAIN);
        assert!(response.answers.is_empty());
        assert_eq!(server.stats().nxdomain(), 1);
        assert_eq!(server.stats().answers(), 0);
    }

    #[test]
    fn refuses_a_query_outside_every_zone() {
        let server = example_server();
        let response = ask(&server, "other.com", Type::A);

        assert_eq!(response.rcode(), Rcode::REFUSED);
        assert!(response.answers.is_empty());
    }

    #[test]
    fn answers_an_mx_query() {
        let server = example_server();
        let response = ask(&server, "example.com", Type::MX);
        assert_eq!(response.answers.len(), 1);
        assert_eq!(
            response.answers[0].rdata,
            Rdata::Mx {
                preference: 10,
                exchange: "mail.example.com".to_owned(),
            }
        );
    }

    #[test]
    fn answers_a_txt_query() {
        let server = example_server();
        let response = ask(&server, "example.com", Type::TXT);
        assert_eq!(response.answers.len(), 1);
        assert_eq!(
            response.answers[0].rdata,
            Rdata::Txt(vec!["v=spf1 mx -all".to_owned()])
        );
    }

    #[test]
    fn answers_nodata_with_noerror_and_no_answers() {
        let server = example_server();
        // www.example.com exists (it has a CNAME) but has no MX.
        let response = ask(&server, "www.example.com", Type::MX);

        assert_eq!(response.rcode(), Rcode::NOERROR);
        assert!(response.answers.is_empty());
        assert_authority_has_apex_ns(&response);
        assert_eq!(server.stats().answers(), 1);
    }

    #[test]
    fn lookups_are_case_insensitive_and_echo_the_queried_case() {
        let server = example_server();
        let response = ask(&server, "EXAMPLE.COM", Type::A);
        assert_eq!(response.answers.len(), 1);
        assert_eq!(response.questions[0].name, "EXAMPLE.COM");
        assert_eq!(response.answers[0].name, "example.com");
    }

    #[test]
    fn drops_an_unparseable_datagram() {
        let server = example_server();
        assert!(server.handle_query(b"\x12\x34\x01\x00").is_none());
        assert_eq!(server.stats().errors(), 1);
        assert_eq!(server.stats().queries(), 1);
    }

    #[test]
    fn drops_a_query_with_no_question() {
        let server = example_server();
        let octets = vec![0; 12];
        assert!(server.handle_query(&octets).is_none());
        assert_eq!(server.stats().errors(), 0);
    }

    #[test]
    fn counts_every_received_datagram() {
        let server = example_server();
        let _ = server.handle_query(&query_bytes("example.com", Type::A));
        let _ = server.handle_query(&query_bytes("nonexistent.example.com", Type::A));
        let _ = server.handle_query(b"junk");
        assert_eq!(server.stats().queries(), 3);
        assert_eq!(server.stats().answers(), 1);
        assert_eq!(server.stats().nxdomain(), 1);
        assert_eq!(server.stats().errors(), 1);
    }
}
