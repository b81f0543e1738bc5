//! Hooks into the tick loop for progress reporting and data collection.

use gm_core::{AircraftId, Tick};

use crate::{PhaseChange, TrafficSnapshot};

/// Callbacks invoked by [`Sim::run`][crate::Sim::run] and
/// [`Sim::step`][crate::Sim::step].
///
/// Every method defaults to a no-op.
///
/// # Example: count landings
///
/// ```rust,ignore
/// struct Landings(u32);
///
/// impl SimObserver for Landings {
///     fn on_phase_change(&mut self, change: &PhaseChange) {
///         if change.to == Phase::Landing {
///             self.0 += 1;
///         }
///     }
/// }
/// ```
pub trait SimObserver {
    fn on_tick_start(&mut self, _tick: Tick) {}

    /// `active` is the number of aircraft left in the simulation after the
    /// tick's removals.
    fn on_tick_end(&mut self, _tick: Tick, _active: usize) {}

    /// Called every `config.output_interval_ticks` ticks with the state as of
    /// the end of the tick.
    fn on_snapshot(&mut self, _snapshot: &TrafficSnapshot) {}

    fn on_phase_change(&mut self, _change: &PhaseChange) {}

    /// An aircraft reached `departed` and was dropped at the end of `tick`.
    fn on_aircraft_removed(&mut self, _aircraft: AircraftId, _tick: Tick) {}

    fn on_sim_end(&mut self, _final_tick: Tick) {}
}

/// Ignores everything.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}

impl<O: SimObserver + ?Sized> SimObserver for &mut O {
    fn on_tick_start(&mut self, tick: Tick) {
        (**self).on_tick_start(tick)
    }

    fn on_tick_end(&mut self, tick: Tick, active: usize) {
        (**self).on_tick_end(tick, active)
    }

    fn on_snapshot(&mut self, snapshot: &TrafficSnapshot) {
        (**self).on_snapshot(snapshot)
    }

    fn on_phase_change(&mut self, change: &PhaseChange) {
        (**self).on_phase_change(change)
    }

    fn on_aircraft_removed(&mut self, aircraft: AircraftId, tick: Tick) {
        (**self).on_aircraft_removed(aircraft, tick)
    }

    fn on_sim_end(&mut self, final_tick: Tick) {
        (**self).on_sim_end(final_tick)
    }
}
