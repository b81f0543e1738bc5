//! Fluent builder for constructing a [`Sim`].

use std::collections::BTreeMap;

use tracing::info;

use gm_core::{SimConfig, SimRng};
use gm_motion::TimingTable;
use gm_reservation::ReservationManager;
use gm_schedule::{FlightSchedule, NoTraffic, RandomArrivals, TrafficSource, TrafficSourceExt};
use gm_topology::{AirportGraph, Router};

use crate::{FleetView, RunwayController, Sim, SimResult};

/// Fluent builder for [`Sim<R>`].
///
/// # Optional inputs
///
/// | Method          | Default                                     |
/// |-----------------|---------------------------------------------|
/// | `.schedule(s)`  | empty schedule                              |
/// | `.traffic(t)`   | [`NoTraffic`]                               |
/// | `.timing(t)`    | [`TimingTable::default`]                    |
///
/// A positive `config.arrival_rate` appends a [`RandomArrivals`] source
/// after whatever `.traffic` supplied.
///
/// ```rust,ignore
/// let mut sim = SimBuilder::new(config, graph, DijkstraRouter)
///     .schedule(schedule)
///     .build()?;
/// sim.run(&mut NoopObserver)?;
/// ```
pub struct SimBuilder<R: Router> {
    config:   SimConfig,
    graph:    AirportGraph,
    router:   R,
    schedule: FlightSchedule,
    traffic:  Option<Box<dyn TrafficSource>>,
    timing:   TimingTable,
}

impl<R: Router> SimBuilder<R> {
    pub fn new(config: SimConfig, graph: AirportGraph, router: R) -> Self {
        Self {
            config,
            graph,
            router,
            schedule: FlightSchedule::default(),
            traffic:  None,
            timing:   TimingTable::default(),
        }
    }

    /// Fixed spawn requests keyed by tick.
    pub fn schedule(mut self, schedule: FlightSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Generated traffic consulted every tick.
    pub fn traffic(mut self, traffic: Box<dyn TrafficSource>) -> Self {
        self.traffic = Some(traffic);
        self
    }

    pub fn timing(mut self, timing: TimingTable) -> Self {
        self.timing = timing;
        self
    }

    /// Validate configuration and assemble a ready-to-run [`Sim`].
    pub fn build(self) -> SimResult<Sim<R>> {
        self.config.validate()?;
        self.timing.validate()?;

        let base = self.traffic.unwrap_or_else(|| Box::new(NoTraffic));
        let traffic: Box<dyn TrafficSource> = if self.config.arrival_rate > 0.0 {
            Box::new(base.then(RandomArrivals::new(self.config.arrival_rate)))
        } else {
            base
        };

        let reservations = ReservationManager::for_graph(&self.graph);
        let runway = RunwayController::for_graph(&self.graph, self.config.control.runway_policy);
        if runway.threshold().is_none() {
            info!("airport has no runway threshold; arrivals will hold indefinitely");
        }
        info!(
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            scheduled = self.schedule.len(),
            seed = self.config.seed,
            "simulation built"
        );

        Ok(Sim {
            clock:    self.config.make_clock(),
            rng:      SimRng::new(self.config.seed),
            config:   self.config,
            graph:    self.graph,
            router:   self.router,
            timing:   self.timing,
            reservations,
            runway,
            aircraft: BTreeMap::new(),
            fleet:    FleetView::default(),
            schedule: self.schedule,
            traffic,
            next_id:  0,
            departed: 0,
        })
    }
}
