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

//! Server statistics.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters recording server activity.
///
/// The counters are observational: they are updated with relaxed
/// atomic increments, so reads across counters may be slightly
/// skewed relative to each other. They are read once at shutdown for
/// the summary line.
#[derive(Debug, Default)]
pub struct Stats {
    /// Datagrams received.
    queries: AtomicU64,

    /// Responses sent with records looked up (including NODATA).
    answers: AtomicU64,

    /// NXDOMAIN responses sent.
    nxdomain: AtomicU64,

    /// Datagrams dropped because they could not be parsed.
    errors: AtomicU64,
}

impl Stats {
    /// Creates a new set of counters, all zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_queries(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_answers(&self) {
        self.answers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_nxdomain(&self) {
        self.nxdomain.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn queries(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    pub fn answers(&self) -> u64 {
        self.answers.load(Ordering::Relaxed)
    }

    pub fn nxdomain(&self) -> u64 {
        self.nxdomain.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "queries={} answers={} nxdomain={} errors={}",
            self.queries(),
            self.answers(),
            self.nxdomain(),
            self.errors(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Stats;

    #[test]
    fn increments_are_visible() {
        let stats = Stats::new();
        stats.inc_queries();
        stats.inc_queries();
        stats.inc_errors();
        assert_eq!(stats.queries(), 2);
        assert_eq!(stats.errors(), 1);
        assert_eq!(stats.answers(), 0);
        assert_eq!(
            stats.to_string(),
            "queries=2 answers=0 nxdomain=0 errors=1"
        );
    }
}
