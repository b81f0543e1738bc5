//! The `Sim` struct and its tick loop.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use gm_core::{AircraftId, FlightRole, NodeId, Point2, Priority, SimClock, SimConfig, SimRng, Tick};
use gm_motion::TimingTable;
use gm_reservation::{Occupancy, ReservationManager, Resource, HOLD_UNTIL_RELEASED};
use gm_schedule::{FlightRequest, FlightSchedule, TrafficSource};
use gm_topology::{AirportGraph, Router, TopologyError};

use crate::step::{AircraftCtx, RunwayCtx, Steppable};
use crate::{
    Aircraft, AircraftSnapshot, FleetView, PhaseChange, RunwayController, SimError, SimObserver,
    SimResult, TrafficSnapshot,
};

// ── Sim ───────────────────────────────────────────────────────────────────────

/// The simulation runner.
///
/// One tick:
///
/// 1. **Expire**: lapsed reservations are purged.
/// 2. **Spawn**: due schedule entries plus generated traffic.  A departure
///    with no free stand is deferred to the next tick.
/// 3. **Aircraft**: each aircraft takes one turn, highest priority first,
///    ties by registration order.  Each turn sees the fleet as updated by
///    the turns before it.
/// 4. **Runway**: the controller may clear one queue head.
/// 5. **Remove**: departed aircraft are dropped and forgotten.
///
/// Nothing here is parallel; a seed fixes the whole run.
///
/// Create via [`SimBuilder`][crate::SimBuilder].
pub struct Sim<R: Router> {
    pub config:       SimConfig,
    pub clock:        SimClock,
    pub graph:        AirportGraph,
    pub router:       R,
    pub timing:       TimingTable,
    pub reservations: ReservationManager,
    pub runway:       RunwayController,

    pub(crate) aircraft: BTreeMap<AircraftId, Aircraft>,
    pub(crate) fleet:    FleetView,
    pub(crate) schedule: FlightSchedule,
    pub(crate) traffic:  Box<dyn TrafficSource>,
    pub(crate) rng:      SimRng,
    pub(crate) next_id:  u32,
    pub(crate) departed: u64,
}

impl<R: Router> Sim<R> {
    // ── Public API ────────────────────────────────────────────────────────

    /// Run from the current tick to `config.end_tick()`.
    pub fn run<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        while self.clock.current_tick < self.config.end_tick() {
            self.step(observer)?;
        }
        observer.on_sim_end(self.clock.current_tick);
        info!(
            tick = %self.clock.current_tick,
            active = self.aircraft.len(),
            departed = self.departed,
            "simulation finished"
        );
        Ok(())
    }

    /// Run exactly `n` ticks from the current position (ignores `end_tick`).
    pub fn run_ticks<O: SimObserver>(&mut self, n: u64, observer: &mut O) -> SimResult<()> {
        for _ in 0..n {
            self.step(observer)?;
        }
        Ok(())
    }

    /// Advance one tick.  Returns the number of aircraft still active.
    pub fn step<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<usize> {
        let now = self.clock.current_tick;
        observer.on_tick_start(now);
        self.process_tick(now, observer)?;
        let active = self.aircraft.len();
        observer.on_tick_end(now, active);

        let interval = self.config.output_interval_ticks;
        if interval > 0 && now.0 % interval == 0 {
            observer.on_snapshot(&self.snapshot());
        }
        self.clock.advance();
        Ok(active)
    }

    /// Spawn one aircraft right now, outside the schedule.
    pub fn spawn(&mut self, request: FlightRequest) -> SimResult<AircraftId> {
        let now = self.clock.current_tick;
        match request.role {
            FlightRole::Arrival => Ok(self.spawn_arrival(request, now)),
            FlightRole::Departure => {
                let stand = self
                    .free_stand()
                    .ok_or_else(|| SimError::StandUnavailable(NodeId::INVALID))?;
                self.spawn_at_stand(stand, request.priority)
            }
        }
    }

    /// Place a departure on a specific stand.
    pub fn spawn_at_stand(&mut self, stand: NodeId, priority: Option<Priority>) -> SimResult<AircraftId> {
        let pos = self.graph.position(stand).ok_or(TopologyError::NodeNotFound(stand))?;
        if !self.stand_is_free(stand) {
            return Err(SimError::StandUnavailable(stand));
        }
        let now = self.clock.current_tick;
        let priority = priority.unwrap_or(self.config.control.default_priority);
        let id = self.allocate_id();

        self.reservations.register(id, priority);
        if let Err(denied) = self.reservations.request_node(stand, id, HOLD_UNTIL_RELEASED, now) {
            self.reservations.forget(id, now);
            debug!(stand = %stand, blocker = %denied.blocker, "stand lock refused");
            return Err(SimError::StandUnavailable(stand));
        }
        self.reservations.report_occupancy(id, Occupancy::At(stand));

        let aircraft = Aircraft::departure(id, priority, stand, pos, now);
        self.fleet.update(id, aircraft.view());
        self.aircraft.insert(id, aircraft);
        info!(aircraft = %id, stand = %stand, priority, tick = %now, "departure spawned");
        Ok(id)
    }

    pub fn aircraft(&self, id: AircraftId) -> Option<&Aircraft> {
        self.aircraft.get(&id)
    }

    /// All live aircraft, ascending by id.
    pub fn fleet(&self) -> impl Iterator<Item = &Aircraft> + '_ {
        self.aircraft.values()
    }

    pub fn active_count(&self) -> usize {
        self.aircraft.len()
    }

    pub fn departed_count(&self) -> u64 {
        self.departed
    }

    /// Spawn requests not yet due.
    pub fn pending_spawns(&self) -> usize {
        self.schedule.len()
    }

    pub fn now(&self) -> Tick {
        self.clock.current_tick
    }

    /// State as of the end of the last completed tick.
    pub fn snapshot(&self) -> TrafficSnapshot {
        let tick = self.clock.current_tick;
        let aircraft = self
            .aircraft
            .values()
            .map(|a| AircraftSnapshot {
                id:          a.id,
                role:        a.role,
                phase:       a.phase(),
                colour:      a.phase().colour(),
                position:    a.position(),
                node:        a.current_node,
                nearest:     self.graph.snap_to_node(a.position()),
                progress:    a.hop().map_or(0.0, |h| h.progress),
                priority:    a.priority,
                wait_ticks:  a.wait_ticks(),
                phase_timer: a.phase_timer(),
            })
            .collect();
        TrafficSnapshot {
            tick,
            unix_secs:       self.clock.unix_secs_at(tick),
            runway_busy:     self.runway.is_busy(),
            landing_queue:   self.runway.landing_queue_len(),
            departure_queue: self.runway.departure_queue_len(),
            aircraft,
        }
    }

    // ── Core tick processing ──────────────────────────────────────────────

    fn process_tick<O: SimObserver>(&mut self, now: Tick, observer: &mut O) -> SimResult<()> {
        // ── 1. Expire ─────────────────────────────────────────────────────
        let purged = self.reservations.purge_expired(now);
        if purged > 0 {
            debug!(tick = %now, purged, "expired reservations purged");
        }

        // ── 2. Spawn ──────────────────────────────────────────────────────
        let mut requests = self.schedule.drain_due(now);
        requests.extend(self.traffic.generate(now, &mut self.rng));
        for request in requests {
            match request.role {
                FlightRole::Arrival => {
                    self.spawn_arrival(request, now);
                }
                FlightRole::Departure => {
                    let spawned = match self.free_stand() {
                        Some(stand) => self.spawn_at_stand(stand, request.priority),
                        None => Err(SimError::StandUnavailable(NodeId::INVALID)),
                    };
                    if let Err(err) = spawned {
                        debug!(tick = %now, %err, "departure deferred");
                        self.schedule.defer(now, request);
                    }
                }
            }
        }

        // ── 3. Aircraft turns ─────────────────────────────────────────────
        let order = self.turn_order();
        let mut changes: Vec<PhaseChange> = Vec::new();
        let mut removals: Vec<AircraftId> = Vec::new();
        {
            // Explicit field borrows so the borrow checker sees disjoint access.
            let graph        = &self.graph;
            let router: &dyn Router = &self.router;
            let timing       = &self.timing;
            let control      = &self.config.control;
            let reservations = &mut self.reservations;
            let runway       = &mut self.runway;
            let fleet        = &mut self.fleet;
            let rng          = &mut self.rng;

            for id in order {
                let Some(aircraft) = self.aircraft.get_mut(&id) else {
                    continue;
                };
                let mut ctx = AircraftCtx {
                    now,
                    graph,
                    router,
                    timing,
                    control,
                    reservations: &mut *reservations,
                    runway:       &mut *runway,
                    fleet:        &*fleet,
                    rng:          &mut *rng,
                };
                if let Some(change) = aircraft.step(&mut ctx) {
                    changes.push(change);
                }
                fleet.update(id, aircraft.view());
                if aircraft.is_departed() {
                    removals.push(id);
                }
            }

            // ── 4. Runway controller ──────────────────────────────────────
            let mut rctx = RunwayCtx { now, reservations: &mut *reservations };
            if let Some(clearance) = runway.step(&mut rctx) {
                match self.aircraft.get_mut(&clearance.aircraft) {
                    Some(aircraft) => {
                        let mut ctx = AircraftCtx {
                            now,
                            graph,
                            router,
                            timing,
                            control,
                            reservations: &mut *reservations,
                            runway:       &mut *runway,
                            fleet:        &*fleet,
                            rng:          &mut *rng,
                        };
                        if let Some(change) = aircraft.apply_clearance(clearance, &mut ctx) {
                            changes.push(change);
                        }
                        fleet.update(clearance.aircraft, aircraft.view());
                    }
                    None => {
                        warn!(aircraft = %clearance.aircraft, "clearance for an unknown aircraft");
                        runway.remove(clearance.aircraft);
                        reservations.release_all(clearance.aircraft, now);
                    }
                }
            }
        }
        for change in &changes {
            observer.on_phase_change(change);
        }

        // ── 5. Remove ─────────────────────────────────────────────────────
        for id in removals {
            self.aircraft.remove(&id);
            self.reservations.forget(id, now);
            self.runway.remove(id);
            self.fleet.remove(id);
            self.departed += 1;
            observer.on_aircraft_removed(id, now);
            info!(aircraft = %id, tick = %now, "aircraft removed");
        }
        Ok(())
    }

    /// Highest priority first; ties by registration order, then id.
    fn turn_order(&self) -> Vec<AircraftId> {
        let mut ids: Vec<AircraftId> = self.aircraft.keys().copied().collect();
        ids.sort_by_key(|&id| {
            (
                Reverse(self.reservations.priority_of(id).unwrap_or(0)),
                self.reservations.registration_order(id).unwrap_or(u64::MAX),
                id,
            )
        });
        ids
    }

    // ── Spawning ──────────────────────────────────────────────────────────

    fn allocate_id(&mut self) -> AircraftId {
        let id = AircraftId(self.next_id);
        self.next_id += 1;
        id
    }

    fn spawn_arrival(&mut self, request: FlightRequest, now: Tick) -> AircraftId {
        let priority = request.priority.unwrap_or(self.config.control.default_priority);
        let id = self.allocate_id();
        let approach = self
            .runway
            .threshold()
            .and_then(|t| self.graph.position(t))
            .unwrap_or(Point2::ORIGIN);

        self.reservations.register(id, priority);
        self.reservations.report_occupancy(id, Occupancy::Airborne);
        let aircraft = Aircraft::arrival(id, priority, approach, now);
        self.fleet.update(id, aircraft.view());
        self.aircraft.insert(id, aircraft);
        info!(aircraft = %id, priority, tick = %now, "arrival spawned");
        id
    }

    fn stand_is_free(&self, stand: NodeId) -> bool {
        let now = self.clock.current_tick;
        !self.fleet.stand_taken(stand, AircraftId::INVALID)
            && self.reservations.holder_of(Resource::Node(stand), now).is_none()
            && self.reservations.occupant_of(stand).is_none()
    }

    fn free_stand(&mut self) -> Option<NodeId> {
        let free: Vec<NodeId> = self
            .graph
            .stand_candidates()
            .into_iter()
            .filter(|&s| self.stand_is_free(s))
            .collect();
        self.rng.choose(&free).copied()
    }
}
