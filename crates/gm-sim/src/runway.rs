//! The runway controller.
//!
//! Owns the landing and departure queues and the busy flag.  Once per tick,
//! after every aircraft has moved, it tries to hand the runway to the head of
//! one queue.  A head is *ready* only if its clearance group (the aggregate
//! runway lock plus the threshold node) can be reserved right now; if the
//! preferred queue's head is not ready the other queue is tried.
//!
//! The controller never moves aircraft.  It returns a [`Clearance`] and the
//! sim hands it to the aircraft.

use std::collections::VecDeque;

use tracing::{debug, info, trace};

use gm_core::{AircraftId, NodeId, RunwayPolicy, Tick};
use gm_reservation::{ReservationManager, Resource, HOLD_UNTIL_RELEASED};
use gm_topology::AirportGraph;

use crate::step::{RunwayCtx, Steppable};

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RunwayUse {
    Landing,
    Departure,
}

/// Permission for one aircraft to use the runway, starting at `threshold`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Clearance {
    pub aircraft:   AircraftId,
    pub runway_use: RunwayUse,
    pub threshold:  NodeId,
    pub tick:       Tick,
}

#[derive(Copy, Clone, Debug)]
struct Queued {
    aircraft: AircraftId,
    /// Global enqueue sequence, for the FIFO policy.
    seq:      u64,
}

pub struct RunwayController {
    policy:      RunwayPolicy,
    threshold:   Option<NodeId>,
    landing:     VecDeque<Queued>,
    departure:   VecDeque<Queued>,
    busy:        bool,
    current:     Option<(AircraftId, RunwayUse)>,
    last_served: Option<RunwayUse>,
    next_seq:    u64,
    landings:    u64,
    departures:  u64,
}

impl RunwayController {
    pub fn new(policy: RunwayPolicy, threshold: Option<NodeId>) -> Self {
        Self {
            policy,
            threshold,
            landing:     VecDeque::new(),
            departure:   VecDeque::new(),
            busy:        false,
            current:     None,
            last_served: None,
            next_seq:    0,
            landings:    0,
            departures:  0,
        }
    }

    /// Controller for the first runway threshold of `graph`.
    pub fn for_graph(graph: &AirportGraph, policy: RunwayPolicy) -> Self {
        Self::new(policy, graph.runway_thresholds().first().copied())
    }

    pub fn threshold(&self) -> Option<NodeId> {
        self.threshold
    }

    pub fn policy(&self) -> RunwayPolicy {
        self.policy
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// The aircraft the runway was last handed to, while busy.
    pub fn current(&self) -> Option<(AircraftId, RunwayUse)> {
        self.current
    }

    pub fn landing_queue_len(&self) -> usize {
        self.landing.len()
    }

    pub fn departure_queue_len(&self) -> usize {
        self.departure.len()
    }

    pub fn landing_queue(&self) -> Vec<AircraftId> {
        self.landing.iter().map(|q| q.aircraft).collect()
    }

    pub fn departure_queue(&self) -> Vec<AircraftId> {
        self.departure.iter().map(|q| q.aircraft).collect()
    }

    /// Completed clearances as `(landings, departures)`.
    pub fn served(&self) -> (u64, u64) {
        (self.landings, self.departures)
    }

    fn is_known(&self, id: AircraftId) -> bool {
        self.landing.iter().chain(&self.departure).any(|q| q.aircraft == id)
            || self.current.is_some_and(|(c, _)| c == id)
    }

    fn push(&mut self, id: AircraftId, runway_use: RunwayUse) -> bool {
        if self.is_known(id) {
            return false;
        }
        let entry = Queued { aircraft: id, seq: self.next_seq };
        self.next_seq += 1;
        match runway_use {
            RunwayUse::Landing   => self.landing.push_back(entry),
            RunwayUse::Departure => self.departure.push_back(entry),
        }
        debug!(aircraft = %id, ?runway_use, "queued for runway");
        true
    }

    /// Add `id` to the landing queue.  `false` if it was already queued.
    pub fn enqueue_landing(&mut self, id: AircraftId) -> bool {
        self.push(id, RunwayUse::Landing)
    }

    pub fn enqueue_departure(&mut self, id: AircraftId) -> bool {
        self.push(id, RunwayUse::Departure)
    }

    /// Drop `id` from both queues (aircraft removed).
    pub fn remove(&mut self, id: AircraftId) {
        self.landing.retain(|q| q.aircraft != id);
        self.departure.retain(|q| q.aircraft != id);
        if self.current.is_some_and(|(c, _)| c == id) {
            self.current = None;
            self.busy = false;
        }
    }

    /// The landing aircraft hands the runway back.
    pub fn finish_landing(&mut self, id: AircraftId, reservations: &mut ReservationManager, now: Tick) {
        self.finish(id, RunwayUse::Landing, reservations, now);
    }

    pub fn finish_departure(&mut self, id: AircraftId, reservations: &mut ReservationManager, now: Tick) {
        self.finish(id, RunwayUse::Departure, reservations, now);
    }

    fn finish(&mut self, id: AircraftId, runway_use: RunwayUse, reservations: &mut ReservationManager, now: Tick) {
        reservations.release(Resource::Runway, id, now);
        match self.current {
            Some((c, u)) if c == id && u == runway_use => {
                self.current = None;
                self.busy = false;
                match runway_use {
                    RunwayUse::Landing   => self.landings += 1,
                    RunwayUse::Departure => self.departures += 1,
                }
                debug!(aircraft = %id, ?runway_use, tick = %now, "runway handed back");
            }
            _ => debug!(aircraft = %id, ?runway_use, "finish from an aircraft not holding the runway"),
        }
    }

    /// Queues to try this tick, in order.
    fn service_order(&self) -> [RunwayUse; 2] {
        use RunwayUse::{Departure, Landing};
        match self.policy {
            RunwayPolicy::LandingFirst   => [Landing, Departure],
            RunwayPolicy::DepartureFirst => [Departure, Landing],
            RunwayPolicy::Alternate => match self.last_served {
                Some(Landing) => [Departure, Landing],
                _             => [Landing, Departure],
            },
            RunwayPolicy::Fifo => {
                let l = self.landing.front().map(|q| q.seq);
                let d = self.departure.front().map(|q| q.seq);
                match (l, d) {
                    (Some(l), Some(d)) if d < l => [Departure, Landing],
                    (None, Some(_))             => [Departure, Landing],
                    _                           => [Landing, Departure],
                }
            }
        }
    }
}

impl Steppable for RunwayController {
    type Ctx<'a> = RunwayCtx<'a>;
    type Output = Option<Clearance>;

    fn step(&mut self, ctx: &mut RunwayCtx<'_>) -> Option<Clearance> {
        if self.busy {
            return None;
        }
        let threshold = self.threshold?;
        let group = [Resource::Runway, Resource::Node(threshold)];

        for runway_use in self.service_order() {
            let queue = match runway_use {
                RunwayUse::Landing   => &mut self.landing,
                RunwayUse::Departure => &mut self.departure,
            };
            let Some(head) = queue.front().map(|q| q.aircraft) else {
                continue;
            };
            match ctx.reservations.request_section_group(&group, head, HOLD_UNTIL_RELEASED, ctx.now) {
                Ok(_) => {
                    queue.pop_front();
                    self.busy = true;
                    self.current = Some((head, runway_use));
                    self.last_served = Some(runway_use);
                    info!(aircraft = %head, ?runway_use, threshold = %threshold, tick = %ctx.now, "runway cleared");
                    return Some(Clearance { aircraft: head, runway_use, threshold, tick: ctx.now });
                }
                Err(denied) => {
                    trace!(aircraft = %head, ?runway_use, blocker = %denied.blocker, "queue head not ready");
                }
            }
        }
        None
    }
}
