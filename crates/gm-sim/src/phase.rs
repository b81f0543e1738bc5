//! Aircraft phases and the transition table.
//!
//! Every transition is named by a [`PhaseEvent`].  Each event has exactly
//! one source and one target phase, both given by exhaustive matches, so
//! adding a phase or an event does not compile until the table is updated.
//!
//! ```text
//! WaitingLanding ─LandingClearance→ Landing ─Touchdown→ TaxiingToExit
//!   ─ExitReached→ AtExit ─StandAssigned→ TaxiingToStand ─StandReached→ AtStand
//!   ─ServiceComplete→ PushbackPending ─PushbackApproved→ Pushback
//!   ─EntryReached→ WaitingDeparture ─TakeoffClearance→ Departing
//!   ─Airborne→ Departed
//! ```

use std::fmt;

use gm_core::{AircraftId, Tick};
use gm_motion::MovementClass;

// ── Phase ─────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Phase {
    WaitingLanding,
    Landing,
    TaxiingToExit,
    AtExit,
    TaxiingToStand,
    AtStand,
    PushbackPending,
    Pushback,
    WaitingDeparture,
    Departing,
    /// Terminal; the aircraft is removed at the end of the tick.
    Departed,
}

impl Phase {
    /// Every phase in lifecycle order.
    pub const LIFECYCLE: [Phase; 11] = [
        Phase::WaitingLanding,
        Phase::Landing,
        Phase::TaxiingToExit,
        Phase::AtExit,
        Phase::TaxiingToStand,
        Phase::AtStand,
        Phase::PushbackPending,
        Phase::Pushback,
        Phase::WaitingDeparture,
        Phase::Departing,
        Phase::Departed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::WaitingLanding   => "waiting_landing",
            Phase::Landing          => "landing",
            Phase::TaxiingToExit    => "taxiing_to_exit",
            Phase::AtExit           => "at_exit",
            Phase::TaxiingToStand   => "taxiing_to_stand",
            Phase::AtStand          => "at_stand",
            Phase::PushbackPending  => "pushback_pending",
            Phase::Pushback         => "pushback",
            Phase::WaitingDeparture => "waiting_departure",
            Phase::Departing        => "departing",
            Phase::Departed         => "departed",
        }
    }

    /// Display colour used by renderers.
    pub fn colour(self) -> &'static str {
        match self {
            Phase::WaitingLanding   => "blue",
            Phase::Landing          => "red",
            Phase::TaxiingToExit    => "gold",
            Phase::AtExit           => "khaki",
            Phase::TaxiingToStand   => "orange",
            Phase::AtStand          => "green",
            Phase::PushbackPending  => "teal",
            Phase::Pushback         => "cyan",
            Phase::WaitingDeparture => "purple",
            Phase::Departing        => "magenta",
            Phase::Departed         => "gray",
        }
    }

    /// Position in [`Phase::LIFECYCLE`].
    pub fn ordinal(self) -> usize {
        match self {
            Phase::WaitingLanding   => 0,
            Phase::Landing          => 1,
            Phase::TaxiingToExit    => 2,
            Phase::AtExit           => 3,
            Phase::TaxiingToStand   => 4,
            Phase::AtStand          => 5,
            Phase::PushbackPending  => 6,
            Phase::Pushback         => 7,
            Phase::WaitingDeparture => 8,
            Phase::Departing        => 9,
            Phase::Departed         => 10,
        }
    }

    /// Phases in which the aircraft refuses to hold still or give up its
    /// priority for someone else.
    pub fn is_departure_critical(self) -> bool {
        matches!(self, Phase::Landing | Phase::WaitingDeparture | Phase::Departing)
    }

    /// Ground phases that follow a routed path and can take a detour.
    pub fn is_taxiing(self) -> bool {
        matches!(self, Phase::TaxiingToExit | Phase::TaxiingToStand | Phase::Pushback)
    }

    /// Apply `event`; `None` if the event does not leave this phase.
    pub fn apply(self, event: PhaseEvent) -> Option<Phase> {
        (event.source() == self).then(|| event.target())
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Movement class an aircraft uses off the runway in `phase`.
///
/// Runway edges override this: they are rolled at departing speed while
/// departing and at landing speed otherwise.
pub fn class_for(phase: Phase) -> MovementClass {
    match phase {
        Phase::Landing => MovementClass::Landing,
        Phase::Departing => MovementClass::Departing,
        Phase::TaxiingToExit | Phase::TaxiingToStand | Phase::Pushback => MovementClass::Taxi,
        Phase::AtStand => MovementClass::AtStand,
        Phase::WaitingLanding
        | Phase::AtExit
        | Phase::PushbackPending
        | Phase::WaitingDeparture
        | Phase::Departed => MovementClass::Holding,
    }
}

// ── PhaseEvent ────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PhaseEvent {
    LandingClearance,
    Touchdown,
    ExitReached,
    StandAssigned,
    StandReached,
    ServiceComplete,
    PushbackApproved,
    EntryReached,
    TakeoffClearance,
    Airborne,
}

impl PhaseEvent {
    pub fn source(self) -> Phase {
        match self {
            PhaseEvent::LandingClearance => Phase::WaitingLanding,
            PhaseEvent::Touchdown        => Phase::Landing,
            PhaseEvent::ExitReached      => Phase::TaxiingToExit,
            PhaseEvent::StandAssigned    => Phase::AtExit,
            PhaseEvent::StandReached     => Phase::TaxiingToStand,
            PhaseEvent::ServiceComplete  => Phase::AtStand,
            PhaseEvent::PushbackApproved => Phase::PushbackPending,
            PhaseEvent::EntryReached     => Phase::Pushback,
            PhaseEvent::TakeoffClearance => Phase::WaitingDeparture,
            PhaseEvent::Airborne         => Phase::Departing,
        }
    }

    pub fn target(self) -> Phase {
        match self {
            PhaseEvent::LandingClearance => Phase::Landing,
            PhaseEvent::Touchdown        => Phase::TaxiingToExit,
            PhaseEvent::ExitReached      => Phase::AtExit,
            PhaseEvent::StandAssigned    => Phase::TaxiingToStand,
            PhaseEvent::StandReached     => Phase::AtStand,
            PhaseEvent::ServiceComplete  => Phase::PushbackPending,
            PhaseEvent::PushbackApproved => Phase::Pushback,
            PhaseEvent::EntryReached     => Phase::WaitingDeparture,
            PhaseEvent::TakeoffClearance => Phase::Departing,
            PhaseEvent::Airborne         => Phase::Departed,
        }
    }
}

// ── PhaseChange ───────────────────────────────────────────────────────────────

/// One recorded transition, forwarded to observers.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhaseChange {
    pub aircraft: AircraftId,
    pub from:     Phase,
    pub to:       Phase,
    pub tick:     Tick,
}
