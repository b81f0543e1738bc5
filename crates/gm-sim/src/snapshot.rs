//! Point-in-time view of the traffic, handed to observers and renderers.

use gm_core::{AircraftId, FlightRole, NodeId, Point2, Priority, Tick};

use crate::Phase;

/// One aircraft as it should be drawn.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AircraftSnapshot {
    pub id:          AircraftId,
    pub role:        FlightRole,
    pub phase:       Phase,
    pub colour:      &'static str,
    pub position:    Point2,
    /// Node the aircraft last stood on; `None` while airborne.
    pub node:        Option<NodeId>,
    /// Nearest graph node to `position`.
    pub nearest:     Option<NodeId>,
    /// Hop progress in `[0, 1]`; zero when not moving.
    pub progress:    f32,
    pub priority:    Priority,
    pub wait_ticks:  u32,
    /// Ticks spent in a timed phase (landing, at stand, departing).
    pub phase_timer: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TrafficSnapshot {
    pub tick:            Tick,
    pub unix_secs:       i64,
    pub runway_busy:     bool,
    pub landing_queue:   usize,
    pub departure_queue: usize,
    /// Ascending by id.
    pub aircraft:        Vec<AircraftSnapshot>,
}

impl TrafficSnapshot {
    pub fn active(&self) -> usize {
        self.aircraft.len()
    }

    pub fn count_in(&self, phase: Phase) -> usize {
        self.aircraft.iter().filter(|a| a.phase == phase).count()
    }

    pub fn get(&self, id: AircraftId) -> Option<&AircraftSnapshot> {
        self.aircraft.iter().find(|a| a.id == id)
    }
}
