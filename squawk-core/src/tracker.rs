//! Emergency alert tracker with per-aircraft dedup.
//!
//! Pure logic, no I/O. Holds the set of aircraft currently in emergency and
//! turns each cycle's classifier output into `AlertEvent` deltas: one
//! `Raised` when an aircraft enters the set, one `Cleared` when it leaves,
//! nothing while it stays.
//!
//! For use across tasks, `AlertTracker::shared()` splits the tracker into a
//! single `TrackerWriter` (the only handle able to call `update`) and any
//! number of read-only `EmergencyView`s.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::types::{AlertEvent, StateVector};

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// The emergency set plus delta computation. Not thread-safe by itself.
#[derive(Debug, Default)]
pub struct AlertTracker {
    emergencies: HashMap<String, StateVector>,

    // Counters
    pub raised_total: u64,
    pub cleared_total: u64,
}

impl AlertTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the current cycle's emergencies. Returns the resulting events.
    ///
    /// Duplicate ICAO24s in the input are collapsed, last one wins.
    pub fn update(&mut self, current: Vec<StateVector>) -> Vec<AlertEvent> {
        let mut current: HashMap<String, StateVector> = current
            .into_iter()
            .map(|sv| (sv.icao24.clone(), sv))
            .collect();

        let mut events = Vec::new();

        // Leavers first, so `current` can be drained afterwards
        let gone: Vec<String> = self
            .emergencies
            .keys()
            .filter(|k| !current.contains_key(*k))
            .cloned()
            .collect();
        for icao24 in gone {
            if let Some(last) = self.emergencies.remove(&icao24) {
                self.cleared_total += 1;
                events.push(AlertEvent::cleared(last));
            }
        }

        for (icao24, sv) in current.drain() {
            match self.emergencies.get_mut(&icao24) {
                Some(stored) => *stored = sv,
                None => {
                    self.raised_total += 1;
                    events.push(AlertEvent::raised(sv.clone()));
                    self.emergencies.insert(icao24, sv);
                }
            }
        }

        events
    }

    pub fn contains(&self, icao24: &str) -> bool {
        self.emergencies.contains_key(icao24)
    }

    pub fn len(&self) -> usize {
        self.emergencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emergencies.is_empty()
    }

    /// Copy of the current emergency set, sorted by ICAO24.
    pub fn snapshot(&self) -> Vec<StateVector> {
        let mut out: Vec<StateVector> = self.emergencies.values().cloned().collect();
        out.sort_by(|a, b| a.icao24.cmp(&b.icao24));
        out
    }

    /// Split into the single writer and a read-only view.
    pub fn shared(self) -> (TrackerWriter, EmergencyView) {
        let inner = Arc::new(RwLock::new(self));
        (
            TrackerWriter {
                inner: Arc::clone(&inner),
            },
            EmergencyView { inner },
        )
    }
}

// ---------------------------------------------------------------------------
// Shared handles
// ---------------------------------------------------------------------------

/// Exclusive write capability. Deliberately not `Clone`.
#[derive(Debug)]
pub struct TrackerWriter {
    inner: Arc<RwLock<AlertTracker>>,
}

impl TrackerWriter {
    /// Run `AlertTracker::update` under the write lock.
    pub fn update(&mut self, current: Vec<StateVector>) -> Vec<AlertEvent> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .update(current)
    }

    pub fn view(&self) -> EmergencyView {
        EmergencyView {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Read-only access to the emergency set.
#[derive(Debug, Clone)]
pub struct EmergencyView {
    inner: Arc<RwLock<AlertTracker>>,
}

impl EmergencyView {
    /// Copy of the current emergencies, taken under a short read lock.
    pub fn snapshot(&self) -> Vec<StateVector> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    pub fn contains(&self, icao24: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(icao24)
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(raised_total, cleared_total)`.
    pub fn totals(&self) -> (u64, u64) {
        let t = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        (t.raised_total, t.cleared_total)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
