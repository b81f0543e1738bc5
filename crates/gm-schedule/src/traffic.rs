//! `TrafficSource`: generated (unscheduled) traffic.
//!
//! The simulation asks its source once per tick for extra spawn requests on
//! top of the fixed [`FlightSchedule`](crate::FlightSchedule).  Sources are
//! composable: chain them with [`TrafficSourceExt::then`].

use gm_core::{Priority, SimRng, Tick};

use crate::FlightRequest;

// ── Trait ─────────────────────────────────────────────────────────────────────

/// Per-tick generator of spawn requests.
///
/// # Contract
///
/// - Must be deterministic given the same `rng` state.
/// - Must not block or perform I/O.
pub trait TrafficSource {
    fn generate(&self, now: Tick, rng: &mut SimRng) -> Vec<FlightRequest>;
}

impl<T: TrafficSource + ?Sized> TrafficSource for Box<T> {
    #[inline]
    fn generate(&self, now: Tick, rng: &mut SimRng) -> Vec<FlightRequest> {
        (**self).generate(now, rng)
    }
}

// ── No-op ─────────────────────────────────────────────────────────────────────

/// Never generates anything.  The default when only a schedule is used.
pub struct NoTraffic;

impl TrafficSource for NoTraffic {
    #[inline]
    fn generate(&self, _now: Tick, _rng: &mut SimRng) -> Vec<FlightRequest> {
        Vec::new()
    }
}

// ── Random arrivals ───────────────────────────────────────────────────────────

/// Spawns one arrival per tick with probability `rate`.
pub struct RandomArrivals {
    pub rate:     f64,
    pub priority: Option<Priority>,
}

impl RandomArrivals {
    pub fn new(rate: f64) -> Self {
        Self { rate, priority: None }
    }
}

impl TrafficSource for RandomArrivals {
    fn generate(&self, _now: Tick, rng: &mut SimRng) -> Vec<FlightRequest> {
        if self.rate > 0.0 && rng.gen_bool(self.rate) {
            vec![FlightRequest { priority: self.priority, ..FlightRequest::arrival() }]
        } else {
            Vec::new()
        }
    }
}

// ── Chaining ──────────────────────────────────────────────────────────────────

/// Concatenates the output of two sources; `first` draws from the RNG first.
pub struct ChainedSource<A: TrafficSource, B: TrafficSource> {
    first:  A,
    second: B,
}

impl<A: TrafficSource, B: TrafficSource> TrafficSource for ChainedSource<A, B> {
    fn generate(&self, now: Tick, rng: &mut SimRng) -> Vec<FlightRequest> {
        let mut out = self.first.generate(now, rng);
        out.extend(self.second.generate(now, rng));
        out
    }
}

pub trait TrafficSourceExt: TrafficSource + Sized {
    fn then<B: TrafficSource>(self, second: B) -> ChainedSource<Self, B> {
        ChainedSource { first: self, second }
    }
}

impl<T: TrafficSource> TrafficSourceExt for T {}
