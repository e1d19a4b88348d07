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

//! The in-memory authoritative zone store.
//!
//! A [`Zone`] maps `(lowercased owner name, RR type)` to the ordered
//! list of records at that key. The map is guarded by a reader-writer
//! lock: the zone-file loader writes at startup, and query handlers
//! read concurrently thereafter. The lock (rather than a frozen map)
//! is kept so that a future hot-reload path can swap in new contents
//! without changing the reader side.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::name;
use crate::rr::{Rdata, Record, Soa, Type};

mod catalog;

pub use catalog::Catalog;

////////////////////////////////////////////////////////////////////////
// ZONES                                                              //
////////////////////////////////////////////////////////////////////////

/// A DNS zone: an origin name and the records hanging below it.
#[derive(Debug)]
pub struct Zone {
    origin: String,
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<String, Vec<Record>>,
    soa: Option<Soa>,
}

impl Zone {
    /// Creates a new, empty zone with the given origin. The origin is
    /// normalized (trailing dot stripped, lowercased) for storage.
    pub fn new(origin: &str) -> Self {
        Self {
            origin: name::normalize(origin),
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Returns the zone's origin (lowercased, no trailing dot).
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Adds a record to the zone, appending it to the list at its
    /// `(name, type)` key. If the record is an SOA, the zone's cached
    /// SOA payload is replaced.
    pub fn add(&self, record: Record) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Rdata::Soa(ref soa) = record.rdata {
            inner.soa = Some(soa.clone());
        }
        let key = key(&record.name, record.rr_type);
        inner.records.entry(key).or_default().push(record);
    }

    /// Looks up the records at `(name, rr_type)`, in insertion order.
    ///
    /// If the direct probe is empty and the requested type is A or
    /// AAAA, the CNAME records at `name` (if any) are returned
    /// instead: a CNAME at a name stands in for the address records
    /// the name does not have. The lookup is case-insensitive.
    pub fn lookup(&self, qname: &str, rr_type: Type) -> Vec<Record> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let qname = name::normalize(qname);

        if let Some(records) = inner.records.get(&key(&qname, rr_type)) {
            return records.clone();
        }

        if rr_type == Type::A || rr_type == Type::AAAA {
            if let Some(cnames) = inner.records.get(&key(&qname, Type::CNAME)) {
                return cnames.clone();
            }
        }

        Vec::new()
    }

    /// Returns whether the zone holds any record whose owner is
    /// `qname` (of any type). This distinguishes NODATA (the name
    /// exists, the requested type does not) from NXDOMAIN.
    pub fn has_name(&self, qname: &str) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let prefix = format!("{}:", name::normalize(qname));
        inner.records.keys().any(|key| key.starts_with(&prefix))
    }

    /// Returns whether this zone is authoritative for `qname`: the
    /// name equals the origin or lies below it.
    pub fn is_authoritative(&self, qname: &str) -> bool {
        let qname = name::normalize(qname);
        qname == self.origin || qname.ends_with(&format!(".{}", self.origin))
    }

    /// Returns the SOA payload of the most recently added SOA record,
    /// if any.
    pub fn soa(&self) -> Option<Soa> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.soa.clone()
    }
}

/// Computes the storage key for `(name, rr_type)`.
fn key(name: &str, rr_type: Type) -> String {
    format!("{}:{}", name, u16::from(rr_type))
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rr::Ttl;

    #[test]
    fn add_and_lookup_work() {
        let zone = Zone::new("example.com");
        zone.add(Record::a("example.com", 3600, "93.184.216.34".parse().unwrap()));

        let records = zone.lookup("example.com", Type::A);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ttl, Ttl::from(3600));
        assert_eq!(records[0].rdata, Rdata::A("93.184.216.34".parse().unwrap()));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let zone = Zone::new("Example.COM");
        zone.add(Record::a("WWW.Example.COM", 3600, "192.0.2.1".parse().unwrap()));

        for probe in ["www.example.com", "WWW.EXAMPLE.COM", "wWw.eXaMpLe.cOm"] {
            assert_eq!(zone.lookup(probe, Type::A).len(), 1, "probe {}", probe);
        }
    }

    #[test]
    fn address_lookups_fall_back_to_cname() {
        let zone = Zone::new("example.com");
        zone.add(Record::cname("www.example.com", 3600, "example.com"));

        for rr_type in [Type::A, Type::AAAA] {
            let records = zone.lookup("www.example.com", rr_type);
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].rr_type, Type::CNAME);
            assert_eq!(records[0].rdata, Rdata::Cname("example.com".to_owned()));
        }
    }

    #[test]
    fn direct_records_win_over_cname_fallback() {
        let zone = Zone::new("example.com");
        zone.add(Record::a("www.example.com", 3600, "192.0.2.1".parse().unwrap()));
        zone.add(Record::cname("www.example.com", 3600, "example.com"));

        let records = zone.lookup("www.example.com", Type::A);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rr_type, Type::A);
    }

    #[test]
    fn cname_fallback_does_not_apply_to_other_types() {
        let zone = Zone::new("example.com");
        zone.add(Record::cname("www.example.com", 3600, "example.com"));
        assert!(zone.lookup("www.example.com", Type::MX).is_empty());
    }

    #[test]
    fn has_name_distinguishes_nodata_from_nxdomain() {
        let zone = Zone::new("example.com");
        zone.add(Record::a("www.example.com", 3600, "192.0.2.1".parse().unwrap()));

        assert!(zone.has_name("www.example.com"));
        assert!(zone.has_name("WWW.EXAMPLE.COM"));
        assert!(!zone.has_name("ftp.example.com"));
    }

    #[test]
    fn is_authoritative_matches_the_origin_and_names_below_it() {
        let zone = Zone::new("example.com");
        assert!(zone.is_authoritative("example.com"));
        assert!(zone.is_authoritative("EXAMPLE.COM"));
        assert!(zone.is_authoritative("www.example.com"));
        assert!(zone.is_authoritative("sub.domain.example.com"));
        assert!(!zone.is_authoritative("other.com"));
        assert!(!zone.is_authoritative("exampleXcom"));
        assert!(!zone.is_authoritative("notexample.com"));
    }

    #[test]
    fn records_are_returned_in_insertion_order() {
        let zone = Zone::new("example.com");
        zone.add(Record::a("example.com", 3600, "192.0.2.1".parse().unwrap()));
        zone.add(Record::a("example.com", 3600, "192.0.2.2".parse().unwrap()));
        zone.add(Record::a("example.com", 3600, "192.0.2.3".parse().unwrap()));

        let records = zone.lookup("example.com", Type::A);
        let addresses: Vec<_> = records
            .iter()
            .map(|record| match record.rdata {
                Rdata::A(address) => address,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(
            addresses,
            ["192.0.2.1", "192.0.2.2", "192.0.2.3"]
                .map(|a| a.parse::<std::net::Ipv4Addr>().unwrap())
        );
    }

    #[test]
    fn adding_an_soa_caches_its_payload() {
        let zone = Zone::new("example.com");
        assert!(zone.soa().is_none());

        let soa = Soa {
            mname: "ns1.example.com".to_owned(),
            rname: "hostmaster.example.com".to_owned(),
            serial: 1,
            refresh: 7200,
            retry: 3600,
            expire: 1209600,
            minimum: 3600,
        };
        zone.add(Record::soa("example.com", 3600, soa.clone()));
        assert_eq!(zone.soa(), Some(soa));
    }
}
