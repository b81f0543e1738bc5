//! Run-level and control-level configuration.
//!
//! `SimConfig` describes one run (seed, length, reporting cadence).
//! `ControlConfig` holds the tunables of the ground-control logic; every value
//! that shapes contention behaviour is a named field here rather than a
//! literal in the state machine.

use crate::{GmError, GmResult, Priority, SimClock, Tick};

// ── Policies ─────────────────────────────────────────────────────────────────

/// Which runway queue the controller serves when both have a ready head.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RunwayPolicy {
    /// Landings always go first; departures only use a runway no landing
    /// can take this tick.
    #[default]
    LandingFirst,
    /// Mirror image of `LandingFirst`.
    DepartureFirst,
    /// Serve the opposite queue from the one served last.
    Alternate,
    /// Serve whichever head was enqueued earliest.
    Fifo,
}

/// What a blocked aircraft does once its wait counter passes
/// [`ControlConfig::max_wait_ticks`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EscalationPolicy {
    /// Search for an alternate path first; fall back to arbitration.
    #[default]
    RerouteThenArbitrate,
    /// Only ever reroute.
    Reroute,
    /// Only ever ask the controller to arbitrate.
    Arbitrate,
}

// ── ControlConfig ─────────────────────────────────────────────────────────────

/// Ground-control tunables shared by every aircraft and the runway
/// controller.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ControlConfig {
    /// Fraction of a hop an aircraft may complete while its destination node
    /// is contested before it holds in place.  Must be in `(0, 1]`.
    pub hold_progress_threshold: f32,

    /// Consecutive denied ticks tolerated before escalating.
    pub max_wait_ticks: u32,

    /// Consecutive denied ticks after which a negotiation proposal is sent to
    /// the blocking aircraft.  `0` disables negotiation.
    pub negotiation_after_ticks: u32,

    /// Ticks a landing aircraft keeps the runway before handing it back.
    pub landing_ticks: u32,

    /// Ticks of turnaround service at the stand.
    pub stand_service_ticks: u32,

    /// Nominal take-off roll budget, reported alongside the departure timer.
    pub departure_ticks: u32,

    /// Ticks an aircraft yields after accepting a `wait` proposal.
    pub yield_ticks: u32,

    pub runway_policy: RunwayPolicy,

    pub escalation: EscalationPolicy,

    /// Upper bound on candidate paths examined when rerouting.
    pub max_alternate_paths: usize,

    /// Priority given to spawned aircraft that do not specify one.
    pub default_priority: Priority,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            hold_progress_threshold: 0.85,
            max_wait_ticks:          5,
            negotiation_after_ticks: 2,
            landing_ticks:           3,
            stand_service_ticks:     10,
            departure_ticks:         3,
            yield_ticks:             2,
            runway_policy:           RunwayPolicy::default(),
            escalation:              EscalationPolicy::default(),
            max_alternate_paths:     8,
            default_priority:        1,
        }
    }
}

impl ControlConfig {
    pub fn validate(&self) -> GmResult<()> {
        if !(self.hold_progress_threshold > 0.0 && self.hold_progress_threshold <= 1.0) {
            return Err(GmError::Config(format!(
                "hold_progress_threshold must be in (0, 1], got {}",
                self.hold_progress_threshold
            )));
        }
        if self.landing_ticks == 0 {
            return Err(GmError::Config("landing_ticks must be at least 1".into()));
        }
        if self.max_alternate_paths == 0
            && self.escalation != EscalationPolicy::Arbitrate
        {
            return Err(GmError::Config(
                "max_alternate_paths must be positive when rerouting is enabled".into(),
            ));
        }
        Ok(())
    }
}

// ── SimConfig ─────────────────────────────────────────────────────────────────

/// Top-level simulation configuration.
///
/// Typically built in code or loaded from JSON by the driver (with the
/// `serde` feature) and handed to the simulation builder.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimConfig {
    /// Master RNG seed.  The same seed always produces identical results.
    pub seed: u64,

    /// Ticks simulated by `Sim::run`.
    pub total_ticks: u64,

    /// Unix timestamp of tick 0 (reporting only).
    pub start_unix_secs: i64,

    /// Seconds per tick (reporting only).
    pub tick_duration_secs: u32,

    /// Emit a traffic snapshot every N ticks.  `0` disables snapshots.
    pub output_interval_ticks: u64,

    /// Per-tick probability of a random arrival being spawned.
    pub arrival_rate: f64,

    pub control: ControlConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed:                  42,
            total_ticks:           300,
            start_unix_secs:       0,
            tick_duration_secs:    10,
            output_interval_ticks: 1,
            arrival_rate:          0.0,
            control:               ControlConfig::default(),
        }
    }
}

impl SimConfig {
    /// The tick at which `Sim::run` stops (exclusive).
    #[inline]
    pub fn end_tick(&self) -> Tick {
        Tick(self.total_ticks)
    }

    pub fn make_clock(&self) -> SimClock {
        SimClock::new(self.start_unix_secs, self.tick_duration_secs)
    }

    pub fn validate(&self) -> GmResult<()> {
        if self.tick_duration_secs == 0 {
            return Err(GmError::Config("tick_duration_secs must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.arrival_rate) {
            return Err(GmError::Config(format!(
                "arrival_rate must be a probability, got {}",
                self.arrival_rate
            )));
        }
        self.control.validate()
    }
}
