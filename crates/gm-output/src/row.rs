//! Flat row types shared by all backends.

use gm_sim::{AircraftSnapshot, TrafficSnapshot};

/// Stands in for a missing node id in the integer columns.
pub const NO_NODE: u32 = u32::MAX;

/// One aircraft at one snapshot tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AircraftSnapshotRow {
    pub tick:        u64,
    pub aircraft_id: u32,
    pub role:        &'static str,
    pub phase:       &'static str,
    pub colour:      &'static str,
    pub x:           f32,
    pub y:           f32,
    /// [`NO_NODE`] while airborne.
    pub node:        u32,
    pub nearest:     u32,
    pub progress:    f32,
    pub priority:    u8,
    pub wait_ticks:  u32,
    pub phase_timer: u32,
}

impl AircraftSnapshotRow {
    pub fn from_snapshot(tick: u64, a: &AircraftSnapshot) -> Self {
        Self {
            tick,
            aircraft_id: a.id.0,
            role:        a.role.as_str(),
            phase:       a.phase.as_str(),
            colour:      a.colour,
            x:           a.position.x,
            y:           a.position.y,
            node:        a.node.map_or(NO_NODE, |n| n.0),
            nearest:     a.nearest.map_or(NO_NODE, |n| n.0),
            progress:    a.progress,
            priority:    a.priority,
            wait_ticks:  a.wait_ticks,
            phase_timer: a.phase_timer,
        }
    }
}

/// Airport-wide counters at one snapshot tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSummaryRow {
    pub tick:            u64,
    pub unix_time_secs:  i64,
    pub active_aircraft: u64,
    pub runway_busy:     bool,
    pub landing_queue:   u32,
    pub departure_queue: u32,
    /// Phase transitions since the previous summary.
    pub phase_changes:   u64,
    /// Aircraft removed since the previous summary.
    pub departed:        u64,
}

impl TickSummaryRow {
    pub fn from_snapshot(s: &TrafficSnapshot, phase_changes: u64, departed: u64) -> Self {
        Self {
            tick:            s.tick.0,
            unix_time_secs:  s.unix_secs,
            active_aircraft: s.aircraft.len() as u64,
            runway_busy:     s.runway_busy,
            landing_queue:   s.landing_queue as u32,
            departure_queue: s.departure_queue as u32,
            phase_changes,
            departed,
        }
    }
}
