//! Lockable resources and the reservations placed on them.

use std::fmt;

use gm_core::{AircraftId, NodeId, Priority, Tick};
use gm_topology::EdgeKey;

/// Lease length meaning "until explicitly released".  The window end
/// saturates to [`Tick::NEVER`].
pub const HOLD_UNTIL_RELEASED: u64 = u64::MAX;

// ── Section ───────────────────────────────────────────────────────────────────

/// Coarse area locks that serialise whole phases of ground movement.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Section {
    Apron,
    Taxiway,
    /// The route from a runway exit back onto the taxiway system.
    TaxiwayOutbound,
}

impl Section {
    pub fn as_str(self) -> &'static str {
        match self {
            Section::Apron           => "apron",
            Section::Taxiway         => "taxiway",
            Section::TaxiwayOutbound => "taxiway_outbound",
        }
    }
}

// ── Resource ──────────────────────────────────────────────────────────────────

/// Anything an aircraft can hold exclusively for a window of ticks.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Resource {
    Node(NodeId),
    /// Canonical unordered key, so both travel directions share one lock.
    Edge(EdgeKey),
    /// Aggregate lock on the whole runway zone.
    Runway,
    Section(Section),
}

impl Resource {
    #[inline]
    pub fn edge(a: NodeId, b: NodeId) -> Resource {
        Resource::Edge(EdgeKey::new(a, b))
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Node(n)    => write!(f, "node {n}"),
            Resource::Edge(k)    => write!(f, "edge {k}"),
            Resource::Runway     => f.write_str("runway"),
            Resource::Section(s) => write!(f, "section {}", s.as_str()),
        }
    }
}

// ── Reservation ───────────────────────────────────────────────────────────────

/// A granted hold on one resource over the half-open window `[start, end)`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reservation {
    pub resource: Resource,
    pub holder:   AircraftId,
    pub start:    Tick,
    pub end:      Tick,
    pub priority: Priority,
}

impl Reservation {
    #[inline]
    pub fn overlaps(&self, start: Tick, end: Tick) -> bool {
        windows_overlap(self.start, self.end, start, end)
    }

    #[inline]
    pub fn is_active(&self, now: Tick) -> bool {
        self.start <= now && now < self.end
    }

    #[inline]
    pub fn is_expired(&self, now: Tick) -> bool {
        self.end <= now
    }
}

/// `[a, b)` and `[c, d)` share at least one tick.
#[inline]
pub fn windows_overlap(a: Tick, b: Tick, c: Tick, d: Tick) -> bool {
    a < d && c < b
}

/// The window a lease of `duration` ticks starting at `now` covers.  Zero
/// durations are widened to one tick so `end > start` always holds.
#[inline]
pub fn lease_window(now: Tick, duration: u64) -> (Tick, Tick) {
    (now, now.offset(duration.max(1)))
}

// ── Occupancy ─────────────────────────────────────────────────────────────────

/// Where an aircraft physically is, as last reported to the manager.
///
/// Reservations say what an aircraft is *allowed* to use; occupancy says
/// what it is actually standing on.  The runway check consults both.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Occupancy {
    #[default]
    Airborne,
    At(NodeId),
    Transit { from: NodeId, to: NodeId },
}

impl Occupancy {
    pub fn node(self) -> Option<NodeId> {
        match self {
            Occupancy::At(n) => Some(n),
            _ => None,
        }
    }
}
