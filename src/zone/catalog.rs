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

//! Implementation of the [`Catalog`] structure.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::Zone;
use crate::name;

/// The collection of zones served by a server.
///
/// Zones are keyed by their lowercased origin. [`Catalog::find`]
/// selects the zone responsible for a queried name by longest-suffix
/// match, so the most specific configured zone wins.
#[derive(Default)]
pub struct Catalog {
    zones: RwLock<HashMap<String, Arc<Zone>>>,
}

impl Catalog {
    /// Creates a new, initially empty `Catalog`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `zone` to the catalog, replacing and returning any
    /// preexisting zone with the same origin.
    pub fn insert(&self, zone: Arc<Zone>) -> Option<Arc<Zone>> {
        let mut zones = self.zones.write().unwrap_or_else(PoisonError::into_inner);
        zones.insert(zone.origin().to_owned(), zone)
    }

    /// Finds the zone responsible for `qname` by longest-suffix
    /// match: for `a.b.example.com`, the probes are
    /// `a.b.example.com`, `b.example.com`, `example.com`, `com`, and
    /// finally the root (the empty name), returning the first hit.
    pub fn find(&self, qname: &str) -> Option<Arc<Zone>> {
        let zones = self.zones.read().unwrap_or_else(PoisonError::into_inner);
        let qname = name::normalize(qname);
        let labels: Vec<&str> = if qname.is_empty() {
            Vec::new()
        } else {
            qname.split('.').collect()
        };

        for start in 0..=labels.len() {
            let suffix = labels[start..].join(".");
            if let Some(zone) = zones.get(&suffix) {
                return Some(zone.clone());
            }
        }
        None
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
