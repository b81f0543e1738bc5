//! Unit and scenario tests for gm-sim.

use gm_core::{
    AircraftId, ControlConfig, EscalationPolicy, NodeId, Point2, Priority, RunwayPolicy, SimConfig, Tick,
};
use gm_reservation::{Occupancy, Resource, HOLD_UNTIL_RELEASED};
use gm_schedule::{FlightRequest, FlightSchedule};
use gm_topology::{AirportGraph, AirportGraphBuilder, DijkstraRouter, EdgeKey, EdgeKind, NodeKind};

use crate::{Aircraft, Phase, PhaseChange, Sim, SimBuilder, SimObserver, TrafficSnapshot};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// ```text
///   R0 ======= R1 ======= R2      runway (R0 is the active threshold)
///   |                     |
///   H0                    X       holding point / runway exit
///   |                     |
///   T0 ------- T1 ------- T2      taxiway
///              |
///              A                  apron
///             / \
///           S1   S2               stands
/// ```
pub struct Mini {
    pub graph: AirportGraph,
    pub r0: NodeId,
    pub s1: NodeId,
    pub s2: NodeId,
}

pub fn mini_airport() -> Mini {
    let mut b = AirportGraphBuilder::new();
    let r0 = b.add_node(NodeKind::RunwayThreshold, Point2::new(0.0, 0.0));
    let r1 = b.add_node(NodeKind::Connector, Point2::new(10.0, 0.0));
    let r2 = b.add_node(NodeKind::RunwayThreshold, Point2::new(20.0, 0.0));
    let h0 = b.add_node(NodeKind::Taxiway, Point2::new(0.0, 3.0));
    let x  = b.add_node(NodeKind::Taxiway, Point2::new(20.0, 3.0));
    let t0 = b.add_node(NodeKind::Taxiway, Point2::new(0.0, 6.0));
    let t1 = b.add_node(NodeKind::Taxiway, Point2::new(10.0, 6.0));
    let t2 = b.add_node(NodeKind::Taxiway, Point2::new(20.0, 6.0));
    let a  = b.add_node(NodeKind::Apron, Point2::new(10.0, 9.0));
    let s1 = b.add_node(NodeKind::Stand, Point2::new(8.0, 11.0));
    let s2 = b.add_node(NodeKind::Stand, Point2::new(12.0, 11.0));

    b.connect(r0, r1, EdgeKind::Runway);
    b.connect(r1, r2, EdgeKind::Runway);
    b.connect(h0, r0, EdgeKind::RunwayEntry);
    b.connect(r2, x, EdgeKind::RunwayExit);
    b.connect(h0, t0, EdgeKind::Taxiway);
    b.connect(t0, t1, EdgeKind::Taxiway);
    b.connect(t1, t2, EdgeKind::Taxiway);
    b.connect(t2, x, EdgeKind::Taxiway);
    b.connect(t1, a, EdgeKind::ApronLink);
    b.connect(a, s1, EdgeKind::StandLink);
    b.connect(a, s2, EdgeKind::StandLink);

    Mini { graph: b.build(), r0, s1, s2 }
}

/// Stand, apron, then two ways (short via Y, long via Z) to the holding
/// point of a one-edge runway.
///
/// ```text
///   R0 ==== R1
///   |
///   H
///   |
///   M
///  / \
/// Z   Y
///  \ /
///   A
///   |
///   S
/// ```
pub struct Diamond {
    pub graph: AirportGraph,
    pub s: NodeId,
    pub y: NodeId,
    pub z: NodeId,
}

pub fn diamond() -> Diamond {
    let mut b = AirportGraphBuilder::new();
    let r0 = b.add_node(NodeKind::RunwayThreshold, Point2::new(0.0, 9.0));
    let r1 = b.add_node(NodeKind::Connector, Point2::new(10.0, 9.0));
    let h  = b.add_node(NodeKind::Taxiway, Point2::new(0.0, 7.0));
    let m  = b.add_node(NodeKind::Taxiway, Point2::new(0.0, 5.0));
    let y  = b.add_node(NodeKind::Taxiway, Point2::new(2.0, 3.0));
    let z  = b.add_node(NodeKind::Taxiway, Point2::new(-4.0, 3.0));
    let a  = b.add_node(NodeKind::Apron, Point2::new(0.0, 2.0));
    let s  = b.add_node(NodeKind::Stand, Point2::new(0.0, 0.0));

    b.connect(r0, r1, EdgeKind::Runway);
    b.connect(h, r0, EdgeKind::RunwayEntry);
    b.connect(h, m, EdgeKind::Taxiway);
    b.connect(m, y, EdgeKind::Taxiway);
    b.connect(m, z, EdgeKind::Taxiway);
    b.connect(y, a, EdgeKind::Taxiway);
    b.connect(z, a, EdgeKind::Taxiway);
    b.connect(a, s, EdgeKind::StandLink);

    Diamond { graph: b.build(), s, y, z }
}

/// A taxiway lane with a loop around `p2`, for two aircraft meeting.
///
/// ```text
///   R0 ==== R1
///   |
///   H
///   |
///   P0 -- P1 -- P2 -- P3 -- S
///          |           |
///          Q1 -------- Q2
/// ```
pub struct Lane {
    pub graph: AirportGraph,
    pub h:  NodeId,
    pub p1: NodeId,
    pub p2: NodeId,
    pub p3: NodeId,
    pub q1: NodeId,
    pub s:  NodeId,
}

pub fn lane() -> Lane {
    let mut b = AirportGraphBuilder::new();
    let r0 = b.add_node(NodeKind::RunwayThreshold, Point2::new(0.0, 0.0));
    let r1 = b.add_node(NodeKind::Connector, Point2::new(10.0, 0.0));
    let h  = b.add_node(NodeKind::Taxiway, Point2::new(0.0, 3.0));
    let p0 = b.add_node(NodeKind::Taxiway, Point2::new(0.0, 6.0));
    let p1 = b.add_node(NodeKind::Taxiway, Point2::new(4.0, 6.0));
    let p2 = b.add_node(NodeKind::Taxiway, Point2::new(8.0, 6.0));
    let p3 = b.add_node(NodeKind::Taxiway, Point2::new(12.0, 6.0));
    let q1 = b.add_node(NodeKind::Taxiway, Point2::new(4.0, 10.0));
    let q2 = b.add_node(NodeKind::Taxiway, Point2::new(12.0, 10.0));
    let s  = b.add_node(NodeKind::Stand, Point2::new(16.0, 6.0));

    b.connect(r0, r1, EdgeKind::Runway);
    b.connect(h, r0, EdgeKind::RunwayEntry);
    b.connect(h, p0, EdgeKind::Taxiway);
    b.connect(p0, p1, EdgeKind::Taxiway);
    b.connect(p1, p2, EdgeKind::Taxiway);
    b.connect(p2, p3, EdgeKind::Taxiway);
    b.connect(p1, q1, EdgeKind::Taxiway);
    b.connect(q1, q2, EdgeKind::Taxiway);
    b.connect(q2, p3, EdgeKind::Taxiway);
    b.connect(p3, s, EdgeKind::StandLink);

    Lane { graph: b.build(), h, p1, p2, p3, q1, s }
}

/// Drop an aircraft onto `node` in `phase`, holding the node, as if it had
/// got there on its own.
pub fn place(
    sim: &mut Sim<DijkstraRouter>,
    id: u32,
    phase: Phase,
    node: NodeId,
    target: Option<NodeId>,
    priority: Priority,
) -> AircraftId {
    let id = AircraftId(id);
    let now = sim.now();
    let pos = sim.graph.position(node).unwrap();
    let a = Aircraft::placed(id, phase, priority, node, pos, target, now);
    sim.reservations.register(id, priority);
    sim.reservations.request_node(node, id, HOLD_UNTIL_RELEASED, now).unwrap();
    sim.reservations.report_occupancy(id, Occupancy::At(node));
    sim.fleet.update(id, a.view());
    sim.aircraft.insert(id, a);
    sim.next_id = sim.next_id.max(id.0 + 1);
    id
}

pub fn test_config(total_ticks: u64) -> SimConfig {
    SimConfig {
        seed: 7,
        total_ticks,
        output_interval_ticks: 1,
        control: ControlConfig {
            stand_service_ticks: 1,
            ..ControlConfig::default()
        },
        ..SimConfig::default()
    }
}

pub fn sim_on(graph: AirportGraph, config: SimConfig) -> Sim<DijkstraRouter> {
    SimBuilder::new(config, graph, DijkstraRouter).build().unwrap()
}

/// A holder that exists only in the reservation table.
pub const PHANTOM: AircraftId = AircraftId(9_000);

#[derive(Default)]
pub struct Recorder {
    pub changes:   Vec<PhaseChange>,
    pub snapshots: Vec<TrafficSnapshot>,
    pub removed:   Vec<(AircraftId, Tick)>,
    pub ticks:     Vec<(Tick, usize)>,
    pub ended:     Option<Tick>,
}

impl SimObserver for Recorder {
    fn on_tick_end(&mut self, tick: Tick, active: usize) {
        self.ticks.push((tick, active));
    }

    fn on_snapshot(&mut self, snapshot: &TrafficSnapshot) {
        self.snapshots.push(snapshot.clone());
    }

    fn on_phase_change(&mut self, change: &PhaseChange) {
        self.changes.push(*change);
    }

    fn on_aircraft_removed(&mut self, aircraft: AircraftId, tick: Tick) {
        self.removed.push((aircraft, tick));
    }

    fn on_sim_end(&mut self, final_tick: Tick) {
        self.ended = Some(final_tick);
    }
}

// ── Phases ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod phases {
    use crate::{class_for, Phase, PhaseEvent};
    use gm_motion::MovementClass;

    const EVENTS: [PhaseEvent; 10] = [
        PhaseEvent::LandingClearance,
        PhaseEvent::Touchdown,
        PhaseEvent::ExitReached,
        PhaseEvent::StandAssigned,
        PhaseEvent::StandReached,
        PhaseEvent::ServiceComplete,
        PhaseEvent::PushbackApproved,
        PhaseEvent::EntryReached,
        PhaseEvent::TakeoffClearance,
        PhaseEvent::Airborne,
    ];

    #[test]
    fn every_event_applies_only_from_its_source() {
        for event in EVENTS {
            for phase in Phase::LIFECYCLE {
                let expected = (phase == event.source()).then(|| event.target());
                assert_eq!(phase.apply(event), expected, "{phase} + {event:?}");
            }
        }
    }

    #[test]
    fn events_walk_the_lifecycle_in_order() {
        for (i, event) in EVENTS.iter().enumerate() {
            assert_eq!(event.source(), Phase::LIFECYCLE[i]);
            assert_eq!(event.target(), Phase::LIFECYCLE[i + 1]);
        }
    }

    #[test]
    fn ordinal_matches_lifecycle_index() {
        for (i, phase) in Phase::LIFECYCLE.iter().enumerate() {
            assert_eq!(phase.ordinal(), i);
        }
    }

    #[test]
    fn colours_are_distinct() {
        let mut colours: Vec<_> = Phase::LIFECYCLE.iter().map(|p| p.colour()).collect();
        colours.sort_unstable();
        colours.dedup();
        assert_eq!(colours.len(), Phase::LIFECYCLE.len());
        assert_eq!(Phase::Landing.colour(), "red");
        assert_eq!(Phase::AtStand.colour(), "green");
    }

    #[test]
    fn movement_class_by_phase() {
        assert_eq!(class_for(Phase::Landing), MovementClass::Landing);
        assert_eq!(class_for(Phase::Departing), MovementClass::Departing);
        assert_eq!(class_for(Phase::TaxiingToStand), MovementClass::Taxi);
        assert_eq!(class_for(Phase::Pushback), MovementClass::Taxi);
        assert_eq!(class_for(Phase::AtStand), MovementClass::AtStand);
        assert_eq!(class_for(Phase::PushbackPending), MovementClass::Holding);
    }

    #[test]
    fn critical_phases_refuse_to_yield() {
        assert!(Phase::Departing.is_departure_critical());
        assert!(Phase::WaitingDeparture.is_departure_critical());
        assert!(!Phase::TaxiingToStand.is_departure_critical());
    }
}

// ── Fleet view ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod fleet_view {
    use gm_core::{AircraftId, NodeId};

    use crate::{AircraftView, FleetView, Phase};

    fn view(phase: Phase, node: Option<u32>, target: Option<u32>) -> AircraftView {
        AircraftView { phase, node: node.map(NodeId), next: None, target: target.map(NodeId) }
    }

    #[test]
    fn parked_and_inbound_aircraft_take_the_stand() {
        let mut fleet = FleetView::default();
        fleet.update(AircraftId(0), view(Phase::AtStand, Some(5), None));
        fleet.update(AircraftId(1), view(Phase::TaxiingToStand, Some(2), Some(6)));
        fleet.update(AircraftId(2), view(Phase::Pushback, Some(7), Some(1)));

        assert!(fleet.stand_taken(NodeId(5), AircraftId(9)));
        assert!(fleet.stand_taken(NodeId(6), AircraftId(9)));
        assert!(!fleet.stand_taken(NodeId(7), AircraftId(9)), "pushing back releases the stand");
        assert!(!fleet.stand_taken(NodeId(5), AircraftId(0)), "own stand is not taken");
    }

    #[test]
    fn counts_and_removal() {
        let mut fleet = FleetView::default();
        fleet.update(AircraftId(0), view(Phase::WaitingLanding, None, None));
        fleet.update(AircraftId(1), view(Phase::WaitingLanding, None, None));
        assert_eq!(fleet.count_in(Phase::WaitingLanding), 2);
        fleet.remove(AircraftId(0));
        assert_eq!(fleet.len(), 1);
    }
}

// ── Runway controller ─────────────────────────────────────────────────────────

#[cfg(test)]
mod runway {
    use gm_core::{AircraftId, RunwayPolicy, Tick};
    use gm_reservation::{ReservationManager, Resource, HOLD_UNTIL_RELEASED};

    use super::mini_airport;
    use crate::{RunwayController, RunwayCtx, RunwayUse, Steppable};

    const L: AircraftId = AircraftId(0);
    const D: AircraftId = AircraftId(1);
    const OTHER: AircraftId = AircraftId(2);

    fn setup(policy: RunwayPolicy) -> (RunwayController, ReservationManager) {
        let m = mini_airport();
        let mut res = ReservationManager::for_graph(&m.graph);
        for id in [L, D, OTHER] {
            res.register(id, 1);
        }
        (RunwayController::for_graph(&m.graph, policy), res)
    }

    fn tick(rc: &mut RunwayController, res: &mut ReservationManager, now: u64) -> Option<(AircraftId, RunwayUse)> {
        let mut ctx = RunwayCtx { now: Tick(now), reservations: res };
        rc.step(&mut ctx).map(|c| (c.aircraft, c.runway_use))
    }

    /// Hand the runway back and clear the threshold node as a real aircraft
    /// would after leaving it.
    fn vacate(rc: &mut RunwayController, res: &mut ReservationManager, id: AircraftId, use_: RunwayUse, now: u64) {
        let thr = rc.threshold().unwrap();
        res.release(Resource::Node(thr), id, Tick(now));
        match use_ {
            RunwayUse::Landing   => rc.finish_landing(id, res, Tick(now)),
            RunwayUse::Departure => rc.finish_departure(id, res, Tick(now)),
        }
    }

    #[test]
    fn enqueue_is_idempotent_across_queues() {
        let (mut rc, _) = setup(RunwayPolicy::LandingFirst);
        assert!(rc.enqueue_landing(L));
        assert!(!rc.enqueue_landing(L));
        assert!(!rc.enqueue_departure(L));
        assert_eq!(rc.landing_queue_len(), 1);
        assert_eq!(rc.departure_queue_len(), 0);
    }

    #[test]
    fn landing_first_then_departure() {
        let (mut rc, mut res) = setup(RunwayPolicy::LandingFirst);
        rc.enqueue_departure(D);
        rc.enqueue_landing(L);

        assert_eq!(tick(&mut rc, &mut res, 0), Some((L, RunwayUse::Landing)));
        assert!(rc.is_busy());
        assert!(res.holds(L, Resource::Runway, Tick(0)));
        assert_eq!(tick(&mut rc, &mut res, 1), None, "busy runway clears nobody");

        vacate(&mut rc, &mut res, L, RunwayUse::Landing, 2);
        assert!(!rc.is_busy());
        assert_eq!(rc.served(), (1, 0));
        assert_eq!(tick(&mut rc, &mut res, 2), Some((D, RunwayUse::Departure)));
    }

    #[test]
    fn departure_first_policy() {
        let (mut rc, mut res) = setup(RunwayPolicy::DepartureFirst);
        rc.enqueue_landing(L);
        rc.enqueue_departure(D);
        assert_eq!(tick(&mut rc, &mut res, 0), Some((D, RunwayUse::Departure)));
    }

    #[test]
    fn alternate_policy_switches_queue() {
        let (mut rc, mut res) = setup(RunwayPolicy::Alternate);
        rc.enqueue_landing(L);
        rc.enqueue_landing(OTHER);
        rc.enqueue_departure(D);

        assert_eq!(tick(&mut rc, &mut res, 0), Some((L, RunwayUse::Landing)));
        vacate(&mut rc, &mut res, L, RunwayUse::Landing, 1);
        assert_eq!(tick(&mut rc, &mut res, 1), Some((D, RunwayUse::Departure)));
    }

    #[test]
    fn fifo_policy_serves_oldest_head() {
        let (mut rc, mut res) = setup(RunwayPolicy::Fifo);
        rc.enqueue_departure(D);
        rc.enqueue_landing(L);
        assert_eq!(tick(&mut rc, &mut res, 0), Some((D, RunwayUse::Departure)));
    }

    #[test]
    fn blocked_threshold_clears_nobody() {
        let (mut rc, mut res) = setup(RunwayPolicy::LandingFirst);
        let thr = rc.threshold().unwrap();
        res.request_node(thr, OTHER, HOLD_UNTIL_RELEASED, Tick(0)).unwrap();
        rc.enqueue_landing(L);
        rc.enqueue_departure(D);

        assert_eq!(tick(&mut rc, &mut res, 0), None);
        assert_eq!(rc.landing_queue_len(), 1);
        assert!(!res.holds(L, Resource::Runway, Tick(0)), "failed group leaves nothing behind");
    }

    #[test]
    fn removed_aircraft_frees_the_runway() {
        let (mut rc, mut res) = setup(RunwayPolicy::LandingFirst);
        rc.enqueue_landing(L);
        tick(&mut rc, &mut res, 0);
        rc.remove(L);
        assert!(!rc.is_busy());
        assert!(rc.current().is_none());
    }
}

// ── Builder & loop ────────────────────────────────────────────────────────────

#[cfg(test)]
mod builder {
    use gm_core::{GmError, Tick};

    use super::{mini_airport, sim_on, test_config, Recorder};
    use crate::{NoopObserver, SimBuilder, SimError};
    use gm_topology::DijkstraRouter;

    #[test]
    fn invalid_arrival_rate_is_rejected() {
        let mut config = test_config(10);
        config.arrival_rate = 1.5;
        let result = SimBuilder::new(config, mini_airport().graph, DijkstraRouter).build();
        assert!(matches!(result, Err(SimError::Core(GmError::Config(_)))));
    }

    #[test]
    fn run_stops_at_end_tick() {
        let mut sim = sim_on(mini_airport().graph, test_config(12));
        let mut rec = Recorder::default();
        sim.run(&mut rec).unwrap();
        assert_eq!(sim.now(), Tick(12));
        assert_eq!(rec.ticks.len(), 12);
        assert_eq!(rec.ended, Some(Tick(12)));
    }

    #[test]
    fn snapshots_follow_interval() {
        let mut config = test_config(10);
        config.output_interval_ticks = 4;
        let mut sim = sim_on(mini_airport().graph, config);
        let mut rec = Recorder::default();
        sim.run(&mut rec).unwrap();
        let ticks: Vec<u64> = rec.snapshots.iter().map(|s| s.tick.0).collect();
        assert_eq!(ticks, vec![0, 4, 8]);
        assert_eq!(rec.snapshots[1].unix_secs, 40);
    }

    #[test]
    fn run_ticks_ignores_end_tick() {
        let mut sim = sim_on(mini_airport().graph, test_config(2));
        sim.run_ticks(5, &mut NoopObserver).unwrap();
        assert_eq!(sim.now(), Tick(5));
    }
}

// ── Spawning ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod spawning {
    use gm_core::{NodeId, Tick};
    use gm_reservation::{Occupancy, Resource};
    use gm_schedule::FlightRequest;
    use gm_topology::TopologyError;

    use super::{mini_airport, sim_on, test_config};
    use crate::{NoopObserver, Phase, SimError};

    #[test]
    fn departure_locks_its_stand() {
        let m = mini_airport();
        let s1 = m.s1;
        let mut sim = sim_on(m.graph, test_config(10));
        let id = sim.spawn_at_stand(s1, Some(3)).unwrap();

        let a = sim.aircraft(id).unwrap();
        assert_eq!(a.phase(), Phase::AtStand);
        assert_eq!(a.priority, 3);
        assert_eq!(sim.reservations.holder_of(Resource::Node(s1), Tick(0)), Some(id));
        assert_eq!(sim.reservations.occupancy_of(id), Occupancy::At(s1));
    }

    #[test]
    fn occupied_stand_is_refused() {
        let m = mini_airport();
        let s1 = m.s1;
        let mut sim = sim_on(m.graph, test_config(10));
        sim.spawn_at_stand(s1, None).unwrap();
        assert!(matches!(sim.spawn_at_stand(s1, None), Err(SimError::StandUnavailable(n)) if n == s1));
    }

    #[test]
    fn unknown_stand_is_a_topology_error() {
        let mut sim = sim_on(mini_airport().graph, test_config(10));
        assert!(matches!(
            sim.spawn_at_stand(NodeId(999), None),
            Err(SimError::Topology(TopologyError::NodeNotFound(_)))
        ));
    }

    #[test]
    fn departure_without_free_stand_is_deferred() {
        let m = mini_airport();
        let (s1, s2) = (m.s1, m.s2);
        let mut sim = sim_on(m.graph, test_config(10));
        sim.spawn_at_stand(s1, None).unwrap();
        sim.spawn_at_stand(s2, None).unwrap();
        sim.schedule.push(Tick(0), FlightRequest::departure());

        sim.step(&mut NoopObserver).unwrap();
        assert_eq!(sim.active_count(), 2);
        assert_eq!(sim.pending_spawns(), 1);
        assert_eq!(sim.schedule.next_tick(), Some(Tick(1)));
    }

    #[test]
    fn arrival_waits_on_approach() {
        let m = mini_airport();
        let approach = m.graph.position(m.r0).unwrap();
        let mut sim = sim_on(m.graph, test_config(10));
        let id = sim.spawn(FlightRequest::arrival()).unwrap();
        let a = sim.aircraft(id).unwrap();
        assert_eq!(a.phase(), Phase::WaitingLanding);
        assert_eq!(a.position(), approach);
        assert!(a.current_node.is_none());
    }
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod scenarios {
    use gm_core::ProposalId;
    use gm_reservation::{ProposalKind, ProposalStatus};

    use super::*;
    use crate::NoopObserver;

    #[test]
    fn only_one_pushback_at_a_time() {
        let m = mini_airport();
        let (s1, s2) = (m.s1, m.s2);
        let mut sim = sim_on(m.graph, test_config(50));
        let first = sim.spawn_at_stand(s1, None).unwrap();
        let second = sim.spawn_at_stand(s2, None).unwrap();

        sim.run_ticks(2, &mut NoopObserver).unwrap();
        assert_eq!(sim.aircraft(first).unwrap().phase(), Phase::Pushback);
        assert_eq!(sim.aircraft(second).unwrap().phase(), Phase::PushbackPending);
        assert!(sim.reservations.holds(first, Resource::Section(gm_reservation::Section::Apron), sim.now()));
    }

    #[test]
    fn landing_queue_serialises_arrivals() {
        let m = mini_airport();
        let schedule: FlightSchedule = (0..4).map(|_| (Tick(0), FlightRequest::arrival())).collect();
        let mut sim = SimBuilder::new(test_config(200), m.graph, DijkstraRouter)
            .schedule(schedule)
            .build()
            .unwrap();
        let mut rec = Recorder::default();

        sim.step(&mut rec).unwrap();
        assert_eq!(sim.runway.landing_queue_len(), 3);
        assert_eq!(rec.snapshots[0].count_in(Phase::Landing), 1);

        sim.run_ticks(150, &mut rec).unwrap();
        for snap in &rec.snapshots {
            assert!(snap.count_in(Phase::Landing) <= 1, "two aircraft landing at {}", snap.tick);
        }
        let landings = rec.changes.iter().filter(|c| c.to == Phase::Landing).count();
        assert!(landings >= 2, "queue never advanced");
    }

    #[test]
    fn isolated_stand_never_pushes_back() {
        let mut b = AirportGraphBuilder::new();
        let r0 = b.add_node(NodeKind::RunwayThreshold, Point2::new(0.0, 0.0));
        let r1 = b.add_node(NodeKind::Connector, Point2::new(10.0, 0.0));
        let h = b.add_node(NodeKind::Taxiway, Point2::new(0.0, 3.0));
        let s = b.add_node(NodeKind::Stand, Point2::new(30.0, 30.0));
        b.connect(r0, r1, EdgeKind::Runway);
        b.connect(h, r0, EdgeKind::RunwayEntry);

        let mut sim = sim_on(b.build(), test_config(60));
        let id = sim.spawn_at_stand(s, None).unwrap();
        sim.run_ticks(50, &mut NoopObserver).unwrap();

        let a = sim.aircraft(id).unwrap();
        assert_eq!(a.phase(), Phase::PushbackPending);
        assert_eq!(a.current_node, Some(s));
        assert!(a.stalled_since().is_some());
        let held = a.held(&sim.reservations);
        assert_eq!(held, vec![Resource::Node(s)], "failed pushback keeps only the stand");
    }

    #[test]
    fn arbitration_evicts_lower_priority_phantom() {
        let d = diamond();
        let (s, y) = (d.s, d.y);
        let mut config = test_config(200);
        config.control.escalation = EscalationPolicy::Arbitrate;
        let mut sim = sim_on(d.graph, config);
        sim.reservations.register(PHANTOM, 0);
        sim.reservations.request_node(y, PHANTOM, HOLD_UNTIL_RELEASED, Tick(0)).unwrap();
        let id = sim.spawn_at_stand(s, Some(1)).unwrap();

        for _ in 0..200 {
            sim.step(&mut NoopObserver).unwrap();
            if sim.aircraft(id).is_none_or(|a| a.phase() >= Phase::WaitingDeparture) {
                break;
            }
        }
        let a = sim.aircraft(id).unwrap();
        assert!(a.phase() >= Phase::WaitingDeparture, "stuck in {}", a.phase());
        let arb = a.last_arbitration().expect("no arbitration happened");
        assert_eq!(arb.resource, Resource::Node(y));
        assert_eq!(arb.against, PHANTOM);
        assert_eq!(arb.winner, id);
        assert!(!sim.reservations.holds(PHANTOM, Resource::Node(y), sim.now()));
    }

    #[test]
    fn reroute_avoids_blocked_node() {
        let d = diamond();
        let (s, y, z) = (d.s, d.y, d.z);
        let mut config = test_config(200);
        config.control.escalation = EscalationPolicy::Reroute;
        let mut sim = sim_on(d.graph, config);
        sim.reservations.register(PHANTOM, 9);
        sim.reservations.request_node(y, PHANTOM, HOLD_UNTIL_RELEASED, Tick(0)).unwrap();
        let id = sim.spawn_at_stand(s, Some(1)).unwrap();

        let mut visited = Vec::new();
        for _ in 0..200 {
            sim.step(&mut NoopObserver).unwrap();
            let a = sim.aircraft(id).unwrap();
            if let Some(n) = a.current_node {
                if visited.last() != Some(&n) {
                    visited.push(n);
                }
            }
            if a.phase() >= Phase::WaitingDeparture {
                break;
            }
        }
        let a = sim.aircraft(id).unwrap();
        assert!(a.phase() >= Phase::WaitingDeparture, "stuck in {}", a.phase());
        assert!(visited.contains(&z), "detour not taken: {visited:?}");
        assert!(!visited.contains(&y));
        assert!(a.last_arbitration().is_none());
        assert!(sim.reservations.holds(PHANTOM, Resource::Node(y), sim.now()));
    }

    #[test]
    fn wait_refused_by_departure_critical_blocker() {
        let l = lane();
        let mut sim = sim_on(l.graph, test_config(50));
        sim.reservations.register(PHANTOM, 9);
        sim.reservations.request(Resource::Runway, PHANTOM, HOLD_UNTIL_RELEASED, Tick(0)).unwrap();
        let a = place(&mut sim, 0, Phase::TaxiingToStand, l.p1, Some(l.s), 1);
        let b = place(&mut sim, 1, Phase::WaitingDeparture, l.p2, None, 1);

        sim.run_ticks(2, &mut NoopObserver).unwrap();
        assert_eq!(sim.aircraft(a).unwrap().waiting_on(), Some(Resource::Node(l.p2)));
        let p = *sim.reservations.proposal(ProposalId(0)).expect("no proposal sent");
        assert_eq!((p.sender, p.target, p.kind), (a, b, ProposalKind::Wait));
        assert_eq!(p.status, ProposalStatus::Rejected);
        assert_eq!(sim.aircraft(b).unwrap().yield_until(), Tick::ZERO);
        assert_eq!(sim.aircraft(b).unwrap().phase(), Phase::WaitingDeparture);

        // The sender collects its verdict on its next turn.
        sim.step(&mut NoopObserver).unwrap();
        assert!(sim.reservations.proposal(ProposalId(0)).is_none());
    }

    #[test]
    fn wait_accepted_by_taxiing_blocker() {
        let l = lane();
        let config = test_config(50);
        let yield_ticks = u64::from(config.control.yield_ticks);
        let mut sim = sim_on(l.graph, config);
        sim.reservations.register(PHANTOM, 9);
        sim.reservations.request_node(l.p3, PHANTOM, HOLD_UNTIL_RELEASED, Tick(0)).unwrap();
        let a = place(&mut sim, 0, Phase::TaxiingToStand, l.p1, Some(l.s), 1);
        let b = place(&mut sim, 1, Phase::TaxiingToStand, l.p2, Some(l.s), 1);

        sim.step(&mut NoopObserver).unwrap();
        let answered_at = sim.now();
        sim.step(&mut NoopObserver).unwrap();

        let p = *sim.reservations.proposal(ProposalId(0)).expect("no proposal sent");
        assert_eq!((p.sender, p.target, p.kind), (a, b, ProposalKind::Wait));
        assert_eq!(p.status, ProposalStatus::Accepted);
        assert_eq!(p.params.ticks, yield_ticks as u32);
        assert_eq!(sim.aircraft(b).unwrap().yield_until(), answered_at + yield_ticks);

        // While yielding, the blocker makes no requests of its own.
        let waited = sim.aircraft(b).unwrap().wait_ticks();
        sim.step(&mut NoopObserver).unwrap();
        assert_eq!(sim.aircraft(b).unwrap().wait_ticks(), waited);
    }

    #[test]
    fn lower_priority_sender_swaps_priorities() {
        let l = lane();
        let mut sim = sim_on(l.graph, test_config(50));
        sim.reservations.register(PHANTOM, 9);
        sim.reservations.request_node(l.p3, PHANTOM, HOLD_UNTIL_RELEASED, Tick(0)).unwrap();
        let a = place(&mut sim, 0, Phase::TaxiingToStand, l.p1, Some(l.s), 1);
        let b = place(&mut sim, 1, Phase::TaxiingToStand, l.p2, Some(l.s), 3);

        sim.run_ticks(2, &mut NoopObserver).unwrap();
        let p = *sim.reservations.proposal(ProposalId(0)).expect("no proposal sent");
        assert_eq!(p.kind, ProposalKind::PrioritySwap);
        assert!(p.is_pending());

        sim.step(&mut NoopObserver).unwrap();
        assert_eq!(sim.reservations.priority_of(a), Some(3));
        assert_eq!(sim.reservations.priority_of(b), Some(1));
        assert_eq!(sim.aircraft(a).unwrap().priority, 3);
    }

    #[test]
    fn head_on_blocker_takes_alternative_route() {
        let l = lane();
        let mut sim = sim_on(l.graph, test_config(200));
        let a = place(&mut sim, 0, Phase::Pushback, l.p2, Some(l.h), 1);
        let b = place(&mut sim, 1, Phase::TaxiingToStand, l.p1, Some(l.s), 1);

        sim.run_ticks(2, &mut NoopObserver).unwrap();
        let p = *sim.reservations.proposal(ProposalId(0)).expect("no proposal sent");
        assert_eq!((p.sender, p.target, p.kind), (a, b, ProposalKind::AlternativeRoute));
        assert_eq!(p.params.resource, Resource::Node(l.p2));
        assert_eq!(p.status, ProposalStatus::Accepted);

        let ac = sim.aircraft(b).unwrap();
        assert_eq!(ac.hop().map(|h| h.to), Some(l.q1));
        assert!(ac.path().all(|n| n != l.p2), "detour still crosses the sender");

        let mut visited = vec![l.p1];
        let mut sender_moved = false;
        for _ in 0..100 {
            sim.step(&mut NoopObserver).unwrap();
            // The sender may depart and be removed before we are done.
            sender_moved |= sim.aircraft(a).is_none_or(|x| x.current_node != Some(l.p2));
            let ac = sim.aircraft(b).unwrap();
            if let Some(n) = ac.current_node {
                if visited.last() != Some(&n) {
                    visited.push(n);
                }
            }
            if ac.phase() >= Phase::AtStand {
                break;
            }
        }
        assert_eq!(sim.aircraft(b).unwrap().current_node, Some(l.s));
        assert!(!visited.contains(&l.p2), "went through the sender: {visited:?}");
        assert!(sender_moved, "sender never moved");
    }

    #[test]
    fn mid_hop_holds_short_of_evicted_node() {
        let l = lane();
        let config = test_config(200);
        let threshold = config.control.hold_progress_threshold;
        let mut sim = sim_on(l.graph, config);
        sim.reservations.register(PHANTOM, 9);
        let a = place(&mut sim, 0, Phase::TaxiingToStand, l.p1, Some(l.s), 1);

        sim.step(&mut NoopObserver).unwrap();
        assert_eq!(sim.aircraft(a).unwrap().hop().map(|h| (h.from, h.to)), Some((l.p1, l.p2)));

        let now = sim.now();
        let winner = sim.reservations.resolve_conflict_by_controller(Resource::Node(l.p2), PHANTOM, a, now);
        assert_eq!(winner, PHANTOM);
        sim.reservations.request_node(l.p2, PHANTOM, HOLD_UNTIL_RELEASED, now).unwrap();

        sim.run_ticks(20, &mut NoopObserver).unwrap();
        let ac = sim.aircraft(a).unwrap();
        let hop = ac.hop().expect("hop finished onto a node it does not hold");
        assert!((hop.progress - threshold).abs() < 1e-6, "progress {}", hop.progress);
        assert_eq!(ac.current_node, Some(l.p1));
        assert!(ac.position().x < 8.0);

        sim.reservations.release(Resource::Node(l.p2), PHANTOM, sim.now());
        for _ in 0..5 {
            sim.step(&mut NoopObserver).unwrap();
            if sim.aircraft(a).unwrap().hop().is_none_or(|h| h.to != l.p2) {
                break;
            }
        }
        let ac = sim.aircraft(a).unwrap();
        assert_eq!(ac.current_node, Some(l.p2));
        assert!(sim.reservations.holds(a, Resource::Node(l.p2), sim.now()));
    }

    #[test]
    fn arrival_completes_full_turnaround() {
        let m = mini_airport();
        let schedule: FlightSchedule = [(Tick(0), FlightRequest::arrival())].into_iter().collect();
        let mut sim = SimBuilder::new(test_config(600), m.graph, DijkstraRouter)
            .schedule(schedule)
            .build()
            .unwrap();
        let mut rec = Recorder::default();
        sim.run(&mut rec).unwrap();

        assert_eq!(sim.departed_count(), 1);
        assert_eq!(rec.removed.len(), 1);
        let phases: Vec<Phase> = rec.changes.iter().map(|c| c.to).collect();
        assert_eq!(phases, Phase::LIFECYCLE[1..].to_vec());
        // Nothing is left behind once the aircraft is gone.
        assert_eq!(sim.reservations.active_count(sim.now()), 0);
        assert!(!sim.reservations.is_registered(AircraftId(0)));
    }

    #[test]
    fn same_seed_same_run() {
        let run = || {
            let mut config = test_config(150);
            config.arrival_rate = 0.05;
            let mut sim = sim_on(mini_airport().graph, config);
            let mut rec = Recorder::default();
            sim.run(&mut rec).unwrap();
            rec.snapshots
        };
        assert_eq!(run(), run());
    }
}

// ── Safety properties over a busy run ────────────────────────────────────────

#[cfg(test)]
mod properties {
    use super::*;
    use crate::{NoopObserver, Phase};

    fn busy_sim(policy: RunwayPolicy) -> Sim<DijkstraRouter> {
        let mut config = test_config(500);
        config.arrival_rate = 0.02;
        config.control.runway_policy = policy;
        let schedule: FlightSchedule = [
            (Tick(0), FlightRequest::departure()),
            (Tick(3), FlightRequest::arrival()),
            (Tick(10), FlightRequest::departure()),
            (Tick(40), FlightRequest::arrival().with_priority(3)),
        ]
        .into_iter()
        .collect();
        SimBuilder::new(config, mini_airport().graph, DijkstraRouter)
            .schedule(schedule)
            .build()
            .unwrap()
    }

    fn in_zone(sim: &Sim<DijkstraRouter>, occ: Occupancy) -> bool {
        let zone = sim.graph.runway_zone();
        match occ {
            Occupancy::At(n) => zone.contains_node(n),
            Occupancy::Transit { from, to } => zone.contains_edge(EdgeKey::new(from, to)),
            Occupancy::Airborne => false,
        }
    }

    fn check(sim: &Sim<DijkstraRouter>, now: Tick) {
        for n in sim.graph.all_nodes() {
            let live = sim.reservations.reservations(Resource::Node(n)).iter().filter(|r| r.is_active(now)).count();
            assert!(live <= 1, "node {n} has {live} holders at {now}");
        }
        for e in &sim.graph.edges {
            let key = e.key();
            let live = sim.reservations.reservations(Resource::Edge(key)).iter().filter(|r| r.is_active(now)).count();
            assert!(live <= 1, "edge {key} has {live} holders at {now}");
        }
        let on_runway = sim
            .fleet()
            .filter(|a| in_zone(sim, sim.reservations.occupancy_of(a.id)))
            .count();
        assert!(on_runway <= 1, "{on_runway} aircraft on the runway at {now}");
        let landing_or_departing = sim
            .fleet()
            .filter(|a| matches!(a.phase(), Phase::Landing | Phase::Departing))
            .count();
        assert!(landing_or_departing <= 1, "runway cleared twice at {now}");
    }

    #[test]
    fn exclusion_holds_every_tick() {
        for policy in [RunwayPolicy::LandingFirst, RunwayPolicy::Alternate, RunwayPolicy::Fifo] {
            let mut sim = busy_sim(policy);
            for _ in 0..500 {
                let now = sim.now();
                sim.step(&mut NoopObserver).unwrap();
                check(&sim, now);
            }
        }
    }

    #[test]
    fn lifecycles_never_skip_or_reverse() {
        let mut sim = busy_sim(RunwayPolicy::LandingFirst);
        let mut rec = Recorder::default();
        sim.run(&mut rec).unwrap();

        assert!(!rec.changes.is_empty());
        for c in &rec.changes {
            assert_eq!(c.to.ordinal(), c.from.ordinal() + 1, "{c:?}");
        }
        for a in sim.fleet() {
            let ordinals: Vec<usize> = a.history().iter().map(|(_, p)| p.ordinal()).collect();
            assert!(ordinals.windows(2).all(|w| w[1] == w[0] + 1), "{}: {ordinals:?}", a.id);
        }
    }

    #[test]
    fn release_after_departure_is_a_no_op() {
        let mut sim = busy_sim(RunwayPolicy::LandingFirst);
        let mut rec = Recorder::default();
        sim.run(&mut rec).unwrap();
        let (gone, _) = *rec.removed.first().expect("nobody departed");
        let now = sim.now();
        assert!(!sim.reservations.release(Resource::Runway, gone, now));
        assert!(!sim.reservations.release(Resource::Runway, gone, now));
        assert_eq!(sim.reservations.release_all(gone, now), 0);
    }
}
