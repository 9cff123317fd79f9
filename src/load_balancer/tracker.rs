//! Connection accounting.
//!
//! # Responsibilities
//! - Count in-flight requests per backend address
//! - Release counts exactly once through an RAII guard
//!
//! # Design Decisions
//! - One mutex guards the whole map; it is held for a single update only,
//!   never across probes or forwarding
//! - Decrement floors at zero
//! - Counts for addresses dropped by a reload stay until their last guard drops

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::observability::metrics;

#[derive(Debug, Default)]
struct Counts {
    in_flight: HashMap<String, usize>,
    /// Addresses of the current pool. Others are dropped once idle.
    members: HashSet<String>,
}

/// Shared in-flight request counts, keyed by backend address.
#[derive(Debug, Default)]
pub struct ConnectionTracker {
    counts: Mutex<Counts>,
}

impl ConnectionTracker {
    /// Create a tracker with a zero count for each address.
    pub fn new<'a>(addresses: impl IntoIterator<Item = &'a str>) -> Self {
        let tracker = Self::default();
        tracker.retain(addresses);
        tracker
    }

    fn lock(&self) -> MutexGuard<'_, Counts> {
        // A panic can't leave a count half-written, so a poisoned map is still valid.
        self.counts.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record the start of a request to `address`.
    pub fn increment(&self, address: &str) {
        let current = {
            let mut counts = self.lock();
            let count = counts.in_flight.entry(address.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        metrics::record_active_connections(address, current);
    }

    /// Record the end of a request to `address`. Never goes below zero.
    ///
    /// An address no longer in the pool is forgotten when it reaches zero.
    pub fn decrement(&self, address: &str) {
        let current = {
            let mut guard = self.lock();
            let counts = &mut *guard;
            let current = match counts.in_flight.get_mut(address) {
                Some(count) => {
                    *count = count.saturating_sub(1);
                    *count
                }
                None => 0,
            };
            if current == 0 && !counts.members.contains(address) {
                counts.in_flight.remove(address);
            }
            current
        };
        metrics::record_active_connections(address, current);
    }

    /// Increment `address` and return a guard that decrements it on drop.
    pub fn track(self: &Arc<Self>, address: &str) -> ConnectionGuard {
        self.increment(address);
        ConnectionGuard {
            tracker: Arc::clone(self),
            address: address.to_string(),
        }
    }

    /// Current count for `address` (0 if unknown).
    pub fn count(&self, address: &str) -> usize {
        self.lock().in_flight.get(address).copied().unwrap_or(0)
    }

    /// Consistent copy of all counts, taken under one lock.
    pub fn snapshot(&self) -> HashMap<String, usize> {
        self.lock().in_flight.clone()
    }

    /// Make `addresses` the pool: seed them with zero and forget idle
    /// addresses not among them.
    pub fn retain<'a>(&self, addresses: impl IntoIterator<Item = &'a str>) {
        let mut guard = self.lock();
        let counts = &mut *guard;
        counts.members = addresses.into_iter().map(str::to_string).collect();

        let members = &counts.members;
        counts
            .in_flight
            .retain(|address, count| *count > 0 || members.contains(address));
        for address in members {
            counts.in_flight.entry(address.clone()).or_insert(0);
        }
    }
}

/// Releases one in-flight count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    tracker: Arc<ConnectionTracker>,
    address: String,
}

impl ConnectionGuard {
    /// Address this guard accounts for.
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.tracker.decrement(&self.address);
    }
}
