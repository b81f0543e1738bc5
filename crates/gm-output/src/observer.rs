//! `SimOutputObserver<W>`: feeds a `SimObserver` stream into an `OutputWriter`.

use gm_core::{AircraftId, Tick};
use gm_sim::{PhaseChange, SimObserver, TrafficSnapshot};
use tracing::warn;

use crate::row::{AircraftSnapshotRow, TickSummaryRow};
use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult};

/// A [`SimObserver`] that writes every snapshot to an [`OutputWriter`].
///
/// Each snapshot produces one row per aircraft plus one summary row.  The
/// summary carries the phase changes and removals counted since the previous
/// snapshot.
///
/// Observer hooks cannot fail, so the first write error is kept and later
/// ones are dropped.  Check [`take_error`][Self::take_error] after the run.
pub struct SimOutputObserver<W: OutputWriter> {
    writer:        W,
    phase_changes: u64,
    departed:      u64,
    last_error:    Option<OutputError>,
}

impl<W: OutputWriter> SimOutputObserver<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, phase_changes: 0, departed: 0, last_error: None }
    }

    /// The first write error, if any.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            if self.last_error.is_none() {
                warn!(error = %e, "output write failed; further errors suppressed");
                self.last_error = Some(e);
            }
        }
    }
}

impl<W: OutputWriter> SimObserver for SimOutputObserver<W> {
    fn on_snapshot(&mut self, snapshot: &TrafficSnapshot) {
        let tick = snapshot.tick.0;
        let rows: Vec<AircraftSnapshotRow> = snapshot
            .aircraft
            .iter()
            .map(|a| AircraftSnapshotRow::from_snapshot(tick, a))
            .collect();

        if !rows.is_empty() {
            let result = self.writer.write_snapshots(&rows);
            self.store_err(result);
        }

        let summary = TickSummaryRow::from_snapshot(snapshot, self.phase_changes, self.departed);
        let result = self.writer.write_tick_summary(&summary);
        self.store_err(result);

        self.phase_changes = 0;
        self.departed = 0;
    }

    fn on_phase_change(&mut self, _change: &PhaseChange) {
        self.phase_changes += 1;
    }

    fn on_aircraft_removed(&mut self, _aircraft: AircraftId, _tick: Tick) {
        self.departed += 1;
    }

    fn on_sim_end(&mut self, _final_tick: Tick) {
        let result = self.writer.finish();
        self.store_err(result);
    }
}
