//! `FlightSchedule`: time-ordered spawn queue.
//!
//! `BTreeMap` keeps ticks sorted, so draining "everything due" is a walk
//! over the smallest keys and the spawn order is reproducible: ascending
//! tick, then insertion order within a tick.

use std::collections::BTreeMap;

use gm_core::{FlightRole, Priority, Tick};

/// One aircraft to be spawned.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlightRequest {
    pub role:     FlightRole,
    /// `None` means "use the configured default priority".
    pub priority: Option<Priority>,
}

impl FlightRequest {
    pub fn arrival() -> Self {
        Self { role: FlightRole::Arrival, priority: None }
    }

    pub fn departure() -> Self {
        Self { role: FlightRole::Departure, priority: None }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }
}

#[derive(Default, Debug, Clone)]
pub struct FlightSchedule {
    inner: BTreeMap<Tick, Vec<FlightRequest>>,
    total: usize,
}

impl FlightSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tick: Tick, request: FlightRequest) {
        self.inner.entry(tick).or_default().push(request);
        self.total += 1;
    }

    /// Re-queue `request` for the tick after `now`.
    pub fn defer(&mut self, now: Tick, request: FlightRequest) {
        self.push(now.next(), request);
    }

    /// Remove and return every request due at or before `now`.
    pub fn drain_due(&mut self, now: Tick) -> Vec<FlightRequest> {
        let mut due = Vec::new();
        while let Some(entry) = self.inner.first_entry() {
            if *entry.key() > now {
                break;
            }
            due.extend(entry.remove());
        }
        self.total -= due.len();
        due
    }

    /// The earliest tick with a queued request.
    pub fn next_tick(&self) -> Option<Tick> {
        self.inner.keys().next().copied()
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Number of distinct ticks with at least one request.
    pub fn tick_count(&self) -> usize {
        self.inner.len()
    }
}

impl FromIterator<(Tick, FlightRequest)> for FlightSchedule {
    fn from_iter<I: IntoIterator<Item = (Tick, FlightRequest)>>(iter: I) -> Self {
        let mut s = FlightSchedule::new();
        for (tick, request) in iter {
            s.push(tick, request);
        }
        s
    }
}
