//! The one capability shared by everything the tick loop advances.
//!
//! Aircraft and the runway controller each implement [`Steppable`] with their
//! own context type.  A context borrows exactly the shared state the entity
//! may touch during its turn; nothing else is reachable, so an aircraft
//! cannot mutate another aircraft.

use std::collections::BTreeMap;

use gm_core::{AircraftId, ControlConfig, NodeId, SimRng, Tick};
use gm_motion::TimingTable;
use gm_reservation::ReservationManager;
use gm_topology::{AirportGraph, Router};

use crate::{Phase, RunwayController};

/// Advance one tick.
pub trait Steppable {
    type Ctx<'a>;
    type Output;

    fn step(&mut self, ctx: &mut Self::Ctx<'_>) -> Self::Output;
}

// ── Contexts ──────────────────────────────────────────────────────────────────

/// What an aircraft may read and write during its turn.
pub struct AircraftCtx<'a> {
    pub now:          Tick,
    pub graph:        &'a AirportGraph,
    pub router:       &'a dyn Router,
    pub timing:       &'a TimingTable,
    pub control:      &'a ControlConfig,
    pub reservations: &'a mut ReservationManager,
    pub runway:       &'a mut RunwayController,
    /// Read-only view of the other aircraft as of their last turn.
    pub fleet:        &'a FleetView,
    pub rng:          &'a mut SimRng,
}

/// What the runway controller may touch during its turn.
pub struct RunwayCtx<'a> {
    pub now:          Tick,
    pub reservations: &'a mut ReservationManager,
}

// ── FleetView ─────────────────────────────────────────────────────────────────

/// Public facts about one aircraft.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct AircraftView {
    pub phase:  Phase,
    pub node:   Option<NodeId>,
    /// The node it is moving to or will request next.
    pub next:   Option<NodeId>,
    pub target: Option<NodeId>,
}

/// The fleet as seen by a single aircraft.  The sim refreshes an entry right
/// after that aircraft's turn, so later aircraft in the same tick see
/// earlier ones' decisions.
#[derive(Clone, Debug, Default)]
pub struct FleetView {
    entries: BTreeMap<AircraftId, AircraftView>,
}

impl FleetView {
    pub fn update(&mut self, id: AircraftId, view: AircraftView) {
        self.entries.insert(id, view);
    }

    pub fn remove(&mut self, id: AircraftId) {
        self.entries.remove(&id);
    }

    pub fn get(&self, id: AircraftId) -> Option<&AircraftView> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `true` if some aircraft other than `except` is parked on `stand`, is
    /// about to push back from it, or is taxiing towards it.
    pub fn stand_taken(&self, stand: NodeId, except: AircraftId) -> bool {
        self.entries.iter().any(|(&id, v)| {
            id != except
                && match v.phase {
                    Phase::AtStand | Phase::PushbackPending => v.node == Some(stand),
                    Phase::TaxiingToStand => v.target == Some(stand),
                    _ => false,
                }
        })
    }

    /// Number of aircraft currently in `phase`.
    pub fn count_in(&self, phase: Phase) -> usize {
        self.entries.values().filter(|v| v.phase == phase).count()
    }
}
