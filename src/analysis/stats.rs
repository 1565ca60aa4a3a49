//! In-memory statistics mirror.
//!
//! The durable `statistics` table is authoritative. The mirror only gives a cheap view of the
//! current day and of event totals; it is rebuilt from the store when the analyzer starts and
//! its request counters start over when the UTC date changes.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use serde::Serialize;

use crate::storage::types::StatCounters;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub requests: StatCounters,
    pub events_received: u64,
    pub attack_events: u64,
}

#[derive(Debug)]
pub struct StatsMirror {
    inner: Mutex<MemoryStats>,
}

impl StatsMirror {
    pub fn new(snapshot: MemoryStats) -> Self {
        Self {
            inner: Mutex::new(snapshot),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryStats> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_request(&self, date: NaiveDate, delta: &StatCounters) {
        let mut stats = self.lock();
        if date < stats.date {
            // A late request from a previous day only counts in the durable row
            return;
        }
        if date > stats.date {
            stats.date = date;
            stats.requests = StatCounters::default();
        }
        stats.requests.add(delta);
    }

    pub fn record_event(&self, is_attack: bool) {
        let mut stats = self.lock();
        stats.events_received += 1;
        if is_attack {
            stats.attack_events += 1;
        }
    }

    pub fn snapshot(&self) -> MemoryStats {
        *self.lock()
    }
}
