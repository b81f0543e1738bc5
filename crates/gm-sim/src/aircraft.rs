//! The aircraft state machine.
//!
//! # Turn structure
//!
//! ```text
//! step(ctx):
//!   ① sync priority from the reservation manager
//!   ② answer proposals addressed to us, collect verdicts on ours
//!   ③ run the handler for the current phase (exactly one)
//! ```
//!
//! # Shared movement routine
//!
//! Every moving phase calls [`Aircraft::drive`]:
//!
//! - mid-hop: advance progress; if the destination node is no longer ours,
//!   advance only up to `hold_progress_threshold` and try again next tick;
//! - otherwise route to `target_node` if no path is queued (an unreachable
//!   target parks the aircraft, retried every tick);
//! - otherwise request the next hop as a no-passing node+edge pair.  On
//!   denial the wait counter grows: at `negotiation_after_ticks` a proposal
//!   goes to the blocker, past `max_wait_ticks` the aircraft escalates
//!   (reroute and/or controller arbitration, per `EscalationPolicy`).
//!
//! Completing a hop releases the edge and the node left behind.
//!
//! # Reservations held per phase
//!
//! | Phase              | Held beyond the current node / hop             |
//! |--------------------|------------------------------------------------|
//! | `taxiing_to_exit`  | `Section(TaxiwayOutbound)` once an exit is chosen |
//! | `taxiing_to_stand` | `Section(Taxiway)`, `Section(Apron)`           |
//! | `pushback`         | both sections + the runway-entry edge          |
//! | `waiting_departure`| the runway-entry edge                          |
//! | `landing`, `departing` | `Runway` (granted by the controller)       |

use std::collections::VecDeque;

use tracing::{debug, info, trace};

use gm_core::{AircraftId, EscalationPolicy, FlightRole, NodeId, Point2, Priority, Tick};
use gm_motion::{HopState, MovementClass};
use gm_reservation::{
    Denied, Occupancy, ProposalKind, ProposalParams, ReservationManager, Resource, Section,
    HOLD_UNTIL_RELEASED,
};
use gm_topology::{EdgeKey, Route};

use crate::phase::{class_for, Phase, PhaseChange, PhaseEvent};
use crate::runway::{Clearance, RunwayUse};
use crate::step::{AircraftCtx, AircraftView, Steppable};

const STAND_SECTIONS: [Resource; 2] = [
    Resource::Section(Section::Taxiway),
    Resource::Section(Section::Apron),
];

/// Outcome of one call to [`Aircraft::drive`].
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Drive {
    /// Nothing to do: no target, or already there.
    Idle,
    /// A new hop was granted this tick.
    Started,
    /// Mid-hop.
    Moving,
    /// Finished a hop onto this node.
    Arrived(NodeId),
    /// The next hop was refused.
    Blocked(Denied),
    /// Holding still after accepting a `wait` proposal.
    Yielding,
    /// The target cannot be reached from here.
    NoRoute,
}

/// Outcome of the last arbitration this aircraft asked for.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Arbitration {
    pub resource: Resource,
    pub against:  AircraftId,
    pub winner:   AircraftId,
    pub tick:     Tick,
}

// ── Aircraft ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Aircraft {
    pub id:           AircraftId,
    pub role:         FlightRole,
    phase:            Phase,
    pub priority:     Priority,
    pub current_node: Option<NodeId>,
    pub target_node:  Option<NodeId>,
    path:             VecDeque<NodeId>,
    hop:              Option<HopState>,
    position:         Point2,
    wait_ticks:       u32,
    waiting_on:       Option<Resource>,
    yield_until:      Tick,
    in_queue:         bool,
    landing_timer:    u32,
    service_timer:    u32,
    departure_timer:  u32,
    stalled_since:    Option<Tick>,
    last_arbitration: Option<Arbitration>,
    spawned:          Tick,
    history:          Vec<(Tick, Phase)>,
}

impl Aircraft {
    fn with_phase(id: AircraftId, role: FlightRole, phase: Phase, priority: Priority, now: Tick) -> Self {
        Self {
            id,
            role,
            phase,
            priority,
            current_node:     None,
            target_node:      None,
            path:             VecDeque::new(),
            hop:              None,
            position:         Point2::ORIGIN,
            wait_ticks:       0,
            waiting_on:       None,
            yield_until:      Tick::ZERO,
            in_queue:         false,
            landing_timer:    0,
            service_timer:    0,
            departure_timer:  0,
            stalled_since:    None,
            last_arbitration: None,
            spawned:          now,
            history:          vec![(now, phase)],
        }
    }

    /// An arrival on approach, drawn at `approach` until cleared to land.
    pub fn arrival(id: AircraftId, priority: Priority, approach: Point2, now: Tick) -> Self {
        let mut a = Self::with_phase(id, FlightRole::Arrival, Phase::WaitingLanding, priority, now);
        a.position = approach;
        a
    }

    /// A departure parked on `stand`, starting its turnaround.
    pub fn departure(id: AircraftId, priority: Priority, stand: NodeId, pos: Point2, now: Tick) -> Self {
        let mut a = Self::with_phase(id, FlightRole::Departure, Phase::AtStand, priority, now);
        a.current_node = Some(stand);
        a.position = pos;
        a
    }

    /// A ground aircraft dropped straight into `phase` on `node`.
    #[cfg(test)]
    pub(crate) fn placed(
        id: AircraftId,
        phase: Phase,
        priority: Priority,
        node: NodeId,
        pos: Point2,
        target: Option<NodeId>,
        now: Tick,
    ) -> Self {
        let role = if phase >= Phase::AtStand { FlightRole::Departure } else { FlightRole::Arrival };
        let mut a = Self::with_phase(id, role, phase, priority, now);
        a.current_node = Some(node);
        a.target_node = target;
        a.position = pos;
        a
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Interpolated drawing position.
    pub fn position(&self) -> Point2 {
        self.position
    }

    pub fn hop(&self) -> Option<&HopState> {
        self.hop.as_ref()
    }

    /// Nodes still to visit after the current one (or after the current hop).
    pub fn path(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.path.iter().copied()
    }

    pub fn wait_ticks(&self) -> u32 {
        self.wait_ticks
    }

    /// First tick at which an accepted `wait` proposal stops holding us.
    pub fn yield_until(&self) -> Tick {
        self.yield_until
    }

    /// The resource the last refused request was for, while still waiting.
    pub fn waiting_on(&self) -> Option<Resource> {
        self.waiting_on
    }

    pub fn is_queued(&self) -> bool {
        self.in_queue
    }

    pub fn landing_timer(&self) -> u32 {
        self.landing_timer
    }

    pub fn service_timer(&self) -> u32 {
        self.service_timer
    }

    pub fn departure_timer(&self) -> u32 {
        self.departure_timer
    }

    /// The timer driving the current phase: landing roll, turnaround or
    /// take-off run.  Zero in untimed phases.
    pub fn phase_timer(&self) -> u32 {
        match self.phase {
            Phase::Landing   => self.landing_timer,
            Phase::AtStand   => self.service_timer,
            Phase::Departing => self.departure_timer,
            _                => 0,
        }
    }

    /// Tick since which the aircraft has found no route to its target.
    pub fn stalled_since(&self) -> Option<Tick> {
        self.stalled_since
    }

    pub fn last_arbitration(&self) -> Option<Arbitration> {
        self.last_arbitration
    }

    pub fn spawned(&self) -> Tick {
        self.spawned
    }

    /// Every phase entered, with the tick it was entered.
    pub fn history(&self) -> &[(Tick, Phase)] {
        &self.history
    }

    pub fn is_departed(&self) -> bool {
        self.phase == Phase::Departed
    }

    /// Resources this aircraft currently holds.
    pub fn held(&self, reservations: &ReservationManager) -> Vec<Resource> {
        reservations.held_by(self.id).into_iter().collect()
    }

    pub fn view(&self) -> AircraftView {
        AircraftView {
            phase:  self.phase,
            node:   self.current_node,
            next:   self.hop.as_ref().map(|h| h.to).or_else(|| self.path.front().copied()),
            target: self.target_node,
        }
    }

    // ── Transitions ───────────────────────────────────────────────────────

    fn fire(&mut self, event: PhaseEvent, now: Tick) -> Option<PhaseChange> {
        let Some(next) = self.phase.apply(event) else {
            debug!(aircraft = %self.id, phase = %self.phase, ?event, "event does not apply");
            return None;
        };
        let change = PhaseChange { aircraft: self.id, from: self.phase, to: next, tick: now };
        self.phase = next;
        self.wait_ticks = 0;
        self.waiting_on = None;
        self.history.push((now, next));
        debug!(aircraft = %self.id, from = %change.from, to = %next, tick = %now, "phase change");
        Some(change)
    }

    /// Take the runway as granted by the controller.
    pub fn apply_clearance(&mut self, clearance: Clearance, ctx: &mut AircraftCtx<'_>) -> Option<PhaseChange> {
        let thr = clearance.threshold;
        let roll = ctx.graph.runway_path(thr);
        self.in_queue = false;
        self.path.clear();
        self.target_node = roll.last().copied();

        match clearance.runway_use {
            RunwayUse::Landing => {
                self.current_node = Some(thr);
                self.position = ctx.graph.position(thr).unwrap_or(self.position);
                ctx.reservations.report_occupancy(self.id, Occupancy::At(thr));
                self.path.extend(roll.iter().skip(1));
                self.landing_timer = 0;
                self.fire(PhaseEvent::LandingClearance, clearance.tick)
            }
            RunwayUse::Departure => {
                self.path.extend(roll.iter().copied().filter(|&n| Some(n) != self.current_node));
                self.departure_timer = 0;
                self.fire(PhaseEvent::TakeoffClearance, clearance.tick)
            }
        }
    }

    // ── Phase handlers ────────────────────────────────────────────────────

    fn wait_for_landing(&mut self, ctx: &mut AircraftCtx<'_>) -> Option<PhaseChange> {
        if !self.in_queue {
            ctx.runway.enqueue_landing(self.id);
            self.in_queue = true;
        }
        None
    }

    fn land(&mut self, ctx: &mut AircraftCtx<'_>) -> Option<PhaseChange> {
        self.drive(ctx);
        self.landing_timer += 1;
        if self.landing_timer < ctx.control.landing_ticks {
            return None;
        }
        ctx.runway.finish_landing(self.id, ctx.reservations, ctx.now);
        // The roll-out continues under taxiing_to_exit towards a chosen exit.
        self.path.clear();
        self.target_node = None;
        self.fire(PhaseEvent::Touchdown, ctx.now)
    }

    fn taxi_to_exit(&mut self, ctx: &mut AircraftCtx<'_>) -> Option<PhaseChange> {
        if self.target_node.is_none() && self.hop.is_none() {
            let outbound = Resource::Section(Section::TaxiwayOutbound);
            if ctx.reservations.request(outbound, self.id, HOLD_UNTIL_RELEASED, ctx.now).is_err() {
                return None;
            }
            match self.choose_exit(ctx) {
                Some(route) => {
                    self.target_node = route.nodes.last().copied();
                    self.path = route.after_start().iter().copied().collect();
                }
                None => {
                    ctx.reservations.release(outbound, self.id, ctx.now);
                    self.note_stall(ctx.now, "no runway exit reachable");
                    return None;
                }
            }
        }
        self.drive(ctx);
        if !self.reached_target() {
            return None;
        }
        ctx.reservations.release(Resource::Section(Section::TaxiwayOutbound), self.id, ctx.now);
        self.target_node = None;
        self.path.clear();
        self.fire(PhaseEvent::ExitReached, ctx.now)
    }

    fn wait_for_stand(&mut self, ctx: &mut AircraftCtx<'_>) -> Option<PhaseChange> {
        if ctx
            .reservations
            .request_section_group(&STAND_SECTIONS, self.id, HOLD_UNTIL_RELEASED, ctx.now)
            .is_err()
        {
            return None;
        }
        match self.choose_stand(ctx) {
            Some(route) => {
                self.target_node = route.nodes.last().copied();
                self.path = route.after_start().iter().copied().collect();
                self.fire(PhaseEvent::StandAssigned, ctx.now)
            }
            None => {
                for r in STAND_SECTIONS {
                    ctx.reservations.release(r, self.id, ctx.now);
                }
                None
            }
        }
    }

    fn taxi_to_stand(&mut self, ctx: &mut AircraftCtx<'_>) -> Option<PhaseChange> {
        self.drive(ctx);
        if !self.reached_target() {
            return None;
        }
        for r in STAND_SECTIONS {
            ctx.reservations.release(r, self.id, ctx.now);
        }
        self.target_node = None;
        self.service_timer = 0;
        self.fire(PhaseEvent::StandReached, ctx.now)
    }

    fn service(&mut self, ctx: &mut AircraftCtx<'_>) -> Option<PhaseChange> {
        self.service_timer += 1;
        if self.service_timer < ctx.control.stand_service_ticks {
            return None;
        }
        self.path.clear();
        self.target_node = None;
        self.fire(PhaseEvent::ServiceComplete, ctx.now)
    }

    fn request_pushback(&mut self, ctx: &mut AircraftCtx<'_>) -> Option<PhaseChange> {
        let (Some(threshold), Some(current)) = (ctx.runway.threshold(), self.current_node) else {
            return None;
        };
        for entry in ctx.graph.runway_entries(threshold) {
            let group = [
                Resource::Section(Section::Apron),
                Resource::Section(Section::Taxiway),
                Resource::Edge(entry.key()),
            ];
            match ctx.reservations.request_section_group(&group, self.id, HOLD_UNTIL_RELEASED, ctx.now) {
                Ok(grant) => match ctx.router.shortest_path(ctx.graph, current, entry.holding) {
                    Ok(route) => {
                        self.stalled_since = None;
                        self.target_node = Some(entry.holding);
                        self.path = route.after_start().iter().copied().collect();
                        return self.fire(PhaseEvent::PushbackApproved, ctx.now);
                    }
                    Err(err) => {
                        for r in grant.acquired {
                            ctx.reservations.release(r, self.id, ctx.now);
                        }
                        self.note_stall(ctx.now, &err.to_string());
                    }
                },
                // Sections are shared by every entry; no point trying the rest.
                Err(Denied { resource: Resource::Section(_), .. }) => return None,
                Err(_) => {}
            }
        }
        None
    }

    fn push_back(&mut self, ctx: &mut AircraftCtx<'_>) -> Option<PhaseChange> {
        self.drive(ctx);
        if !self.reached_target() {
            return None;
        }
        for r in STAND_SECTIONS {
            ctx.reservations.release(r, self.id, ctx.now);
        }
        self.target_node = None;
        self.fire(PhaseEvent::EntryReached, ctx.now)
    }

    fn wait_for_departure(&mut self, ctx: &mut AircraftCtx<'_>) -> Option<PhaseChange> {
        if !self.in_queue {
            ctx.runway.enqueue_departure(self.id);
            self.in_queue = true;
        }
        None
    }

    fn depart(&mut self, ctx: &mut AircraftCtx<'_>) -> Option<PhaseChange> {
        self.departure_timer += 1;
        self.drive(ctx);
        if !self.reached_target() {
            return None;
        }
        ctx.reservations.release_all(self.id, ctx.now);
        ctx.runway.finish_departure(self.id, ctx.reservations, ctx.now);
        ctx.reservations.report_occupancy(self.id, Occupancy::Airborne);
        info!(
            aircraft = %self.id,
            tick = %ctx.now,
            roll_ticks = self.departure_timer,
            budget = ctx.control.departure_ticks,
            "airborne"
        );
        self.current_node = None;
        self.target_node = None;
        self.fire(PhaseEvent::Airborne, ctx.now)
    }

    // ── Target selection ──────────────────────────────────────────────────

    /// Cheapest route from here to any runway exit.
    fn choose_exit(&self, ctx: &AircraftCtx<'_>) -> Option<Route> {
        let current = self.current_node?;
        let mut best: Option<Route> = None;
        for exit in ctx.graph.runway_exits() {
            if let Ok(route) = ctx.router.shortest_path(ctx.graph, current, exit) {
                if best.as_ref().is_none_or(|b| route.length < b.length) {
                    best = Some(route);
                }
            }
        }
        best
    }

    /// A random reachable stand nobody else is using or heading to.
    fn choose_stand(&mut self, ctx: &mut AircraftCtx<'_>) -> Option<Route> {
        let current = self.current_node?;
        let mut free: Vec<NodeId> = ctx
            .graph
            .stand_candidates()
            .into_iter()
            .filter(|&s| !ctx.fleet.stand_taken(s, self.id))
            .filter(|&s| ctx.reservations.holder_of(Resource::Node(s), ctx.now).is_none_or(|h| h == self.id))
            .collect();

        while !free.is_empty() {
            let idx = ctx.rng.gen_range(0..free.len());
            let stand = free.swap_remove(idx);
            if let Ok(route) = ctx.router.shortest_path(ctx.graph, current, stand) {
                debug!(aircraft = %self.id, stand = %stand, "stand assigned");
                return Some(route);
            }
        }
        None
    }

    // ── Movement ──────────────────────────────────────────────────────────

    fn reached_target(&self) -> bool {
        self.hop.is_none() && self.current_node.is_some() && self.current_node == self.target_node
    }

    fn note_stall(&mut self, now: Tick, why: &str) {
        if self.stalled_since.is_none() {
            self.stalled_since = Some(now);
            debug!(aircraft = %self.id, phase = %self.phase, tick = %now, reason = why, "stalled");
        }
    }

    /// Move one tick along the queued path.
    pub fn drive(&mut self, ctx: &mut AircraftCtx<'_>) -> Drive {
        if self.hop.is_some() {
            return self.continue_hop(ctx);
        }
        if ctx.now < self.yield_until {
            return Drive::Yielding;
        }
        let Some(current) = self.current_node else {
            return Drive::Idle;
        };

        if self.path.is_empty() {
            let Some(target) = self.target_node.filter(|&t| t != current) else {
                return Drive::Idle;
            };
            match ctx.router.shortest_path(ctx.graph, current, target) {
                Ok(route) => self.path = route.after_start().iter().copied().collect(),
                Err(err) => {
                    self.note_stall(ctx.now, &err.to_string());
                    return Drive::NoRoute;
                }
            }
        }
        self.stalled_since = None;

        let Some(&next) = self.path.front() else {
            return Drive::Idle;
        };
        match ctx.reservations.request_edge_no_passing(current, next, self.id, HOLD_UNTIL_RELEASED, ctx.now) {
            Ok(_) => {
                self.path.pop_front();
                self.begin_hop(current, next, ctx);
                Drive::Started
            }
            Err(denied) => {
                self.on_denied(denied, current, next, ctx);
                Drive::Blocked(denied)
            }
        }
    }

    fn begin_hop(&mut self, from: NodeId, to: NodeId, ctx: &mut AircraftCtx<'_>) {
        let class = if ctx.graph.is_runway_edge(from, to) {
            if self.phase == Phase::Departing { MovementClass::Departing } else { MovementClass::Landing }
        } else {
            class_for(self.phase)
        };
        let distance = ctx.graph.distance(from, to).unwrap_or(0.0);
        let hop = HopState::begin(from, to, distance, class, ctx.timing, ctx.now);
        trace!(aircraft = %self.id, from = %from, to = %to, ticks = hop.duration_ticks, "hop granted");
        self.hop = Some(hop);
        self.wait_ticks = 0;
        self.waiting_on = None;
        ctx.reservations.report_occupancy(self.id, Occupancy::Transit { from, to });
    }

    fn continue_hop(&mut self, ctx: &mut AircraftCtx<'_>) -> Drive {
        let Some(hop) = self.hop.as_mut() else {
            return Drive::Idle;
        };
        let (from, to) = (hop.from, hop.to);
        let dest = Resource::Node(to);
        let clear = ctx.reservations.holds(self.id, dest, ctx.now)
            || ctx.reservations.request(dest, self.id, HOLD_UNTIL_RELEASED, ctx.now).is_ok();
        let cap = if clear { 1.0 } else { ctx.control.hold_progress_threshold };

        let done = hop.advance(cap);
        if let (Some(a), Some(b)) = (ctx.graph.position(from), ctx.graph.position(to)) {
            self.position = hop.position(a, b);
        }
        if !clear {
            trace!(aircraft = %self.id, node = %to, progress = hop.progress, "holding short of contested node");
        }
        if !done {
            return Drive::Moving;
        }

        self.hop = None;
        self.current_node = Some(to);
        if let Some(p) = ctx.graph.position(to) {
            self.position = p;
        }
        ctx.reservations.release(Resource::edge(from, to), self.id, ctx.now);
        ctx.reservations.release(Resource::Node(from), self.id, ctx.now);
        ctx.reservations.report_occupancy(self.id, Occupancy::At(to));
        if !ctx.reservations.runway_zone().contains_node(to) {
            ctx.reservations.release(Resource::Runway, self.id, ctx.now);
        }
        Drive::Arrived(to)
    }

    // ── Contention ────────────────────────────────────────────────────────

    fn on_denied(&mut self, denied: Denied, current: NodeId, next: NodeId, ctx: &mut AircraftCtx<'_>) {
        self.wait_ticks += 1;
        self.waiting_on = Some(denied.resource);
        trace!(
            aircraft = %self.id,
            resource = %denied.resource,
            blocker = %denied.blocker,
            waited = self.wait_ticks,
            "hop refused"
        );

        let negotiate_at = ctx.control.negotiation_after_ticks;
        if negotiate_at > 0 && self.wait_ticks == negotiate_at {
            self.negotiate(denied, current, ctx);
        }
        if self.wait_ticks > ctx.control.max_wait_ticks {
            self.escalate(denied, current, next, ctx);
            self.wait_ticks = 0;
        }
    }

    fn negotiate(&mut self, denied: Denied, current: NodeId, ctx: &mut AircraftCtx<'_>) {
        let blocker = denied.blocker;
        let Some(view) = ctx.fleet.get(blocker) else {
            return;
        };
        let theirs = ctx.reservations.priority_of(blocker).unwrap_or(0);
        let (kind, params) = if view.next == Some(current) {
            // Head-on: ask them to route around where we stand.
            (ProposalKind::AlternativeRoute, ProposalParams { resource: Resource::Node(current), ticks: 0 })
        } else if self.priority < theirs {
            (ProposalKind::PrioritySwap, ProposalParams { resource: denied.resource, ticks: 0 })
        } else {
            (ProposalKind::Wait, ProposalParams { resource: denied.resource, ticks: ctx.control.yield_ticks })
        };
        ctx.reservations.create_conflict_proposal(self.id, blocker, kind, params, ctx.now);
    }

    fn escalate(&mut self, denied: Denied, current: NodeId, next: NodeId, ctx: &mut AircraftCtx<'_>) {
        let policy = ctx.control.escalation;
        let rerouted = match policy {
            EscalationPolicy::Reroute | EscalationPolicy::RerouteThenArbitrate => {
                let avoid = match denied.resource {
                    Resource::Node(n) => Some(n),
                    Resource::Edge(_) => Some(next),
                    Resource::Runway | Resource::Section(_) => None,
                };
                avoid.is_some_and(|n| self.reroute(current, n, ctx))
            }
            EscalationPolicy::Arbitrate => false,
        };
        if !rerouted && policy != EscalationPolicy::Reroute {
            self.arbitrate(denied, ctx);
        }
    }

    /// Replace the queued path from `origin` with one that avoids `avoid`.
    fn reroute(&mut self, origin: NodeId, avoid: NodeId, ctx: &mut AircraftCtx<'_>) -> bool {
        let Some(target) = self.target_node else {
            return false;
        };
        if avoid == target || avoid == origin {
            return false;
        }
        match ctx.router.path_avoiding(ctx.graph, origin, target, avoid, ctx.control.max_alternate_paths) {
            Some(route) => {
                self.path = route.after_start().iter().copied().collect();
                debug!(aircraft = %self.id, avoid = %avoid, hops = route.hop_count(), "rerouted");
                true
            }
            None => false,
        }
    }

    fn arbitrate(&mut self, denied: Denied, ctx: &mut AircraftCtx<'_>) {
        if !evictable(denied.resource, denied.blocker, ctx.reservations) {
            debug!(
                aircraft = %self.id,
                resource = %denied.resource,
                blocker = %denied.blocker,
                "blocker is physically in place; nothing to arbitrate"
            );
            return;
        }
        let winner =
            ctx.reservations.resolve_conflict_by_controller(denied.resource, self.id, denied.blocker, ctx.now);
        self.last_arbitration = Some(Arbitration {
            resource: denied.resource,
            against:  denied.blocker,
            winner,
            tick:     ctx.now,
        });
    }

    // ── Negotiation ───────────────────────────────────────────────────────

    fn answer_proposals(&mut self, ctx: &mut AircraftCtx<'_>) {
        for p in ctx.reservations.proposals_for(self.id) {
            let accept = match p.kind {
                ProposalKind::Wait | ProposalKind::PrioritySwap => !self.phase.is_departure_critical(),
                ProposalKind::AlternativeRoute => self.phase.is_taxiing() && self.avoid(p.params.resource, ctx),
            };
            if accept {
                ctx.reservations.accept(p.id);
                if p.kind == ProposalKind::Wait {
                    self.yield_until = self.yield_until.max(ctx.now + u64::from(p.params.ticks));
                }
            } else {
                ctx.reservations.reject(p.id);
            }
        }
    }

    /// Detour around `resource` from the end of the current hop.
    fn avoid(&mut self, resource: Resource, ctx: &mut AircraftCtx<'_>) -> bool {
        let Resource::Node(n) = resource else {
            return false;
        };
        let Some(origin) = self.hop.as_ref().map(|h| h.to).or(self.current_node) else {
            return false;
        };
        self.reroute(origin, n, ctx)
    }

    fn read_verdicts(&mut self, ctx: &mut AircraftCtx<'_>) {
        for v in ctx.reservations.take_verdicts(self.id) {
            debug!(aircraft = %self.id, proposal = %v.id, target = %v.target, ?v.kind, ?v.status, "verdict");
        }
    }
}

/// A reservation may be taken away only from an aircraft that is not
/// physically on it, and never inside the runway zone.
fn evictable(resource: Resource, blocker: AircraftId, reservations: &ReservationManager) -> bool {
    let zone = reservations.runway_zone();
    match (resource, reservations.occupancy_of(blocker)) {
        (Resource::Runway, _) => false,
        (Resource::Node(n), _) if zone.contains_node(n) => false,
        (Resource::Edge(k), _) if zone.contains_edge(k) => false,
        (Resource::Node(n), Occupancy::At(at)) => n != at,
        (Resource::Edge(k), Occupancy::Transit { from, to }) => EdgeKey::new(from, to) != k,
        _ => true,
    }
}

impl Steppable for Aircraft {
    type Ctx<'a> = AircraftCtx<'a>;
    type Output = Option<PhaseChange>;

    fn step(&mut self, ctx: &mut AircraftCtx<'_>) -> Option<PhaseChange> {
        if let Some(p) = ctx.reservations.priority_of(self.id) {
            self.priority = p;
        }
        self.answer_proposals(ctx);
        self.read_verdicts(ctx);

        match self.phase {
            Phase::WaitingLanding   => self.wait_for_landing(ctx),
            Phase::Landing          => self.land(ctx),
            Phase::TaxiingToExit    => self.taxi_to_exit(ctx),
            Phase::AtExit           => self.wait_for_stand(ctx),
            Phase::TaxiingToStand   => self.taxi_to_stand(ctx),
            Phase::AtStand          => self.service(ctx),
            Phase::PushbackPending  => self.request_pushback(ctx),
            Phase::Pushback         => self.push_back(ctx),
            Phase::WaitingDeparture => self.wait_for_departure(ctx),
            Phase::Departing        => self.depart(ctx),
            Phase::Departed         => None,
        }
    }
}
