//! The `OutputWriter` trait implemented by every backend.

use crate::{AircraftSnapshotRow, OutputResult, TickSummaryRow};

/// A sink for snapshot and summary rows.
///
/// The observer never sees these errors directly; it keeps the first one for
/// [`SimOutputObserver::take_error`](crate::SimOutputObserver::take_error).
pub trait OutputWriter {
    /// Write every aircraft row of one snapshot.
    fn write_snapshots(&mut self, rows: &[AircraftSnapshotRow]) -> OutputResult<()>;

    fn write_tick_summary(&mut self, row: &TickSummaryRow) -> OutputResult<()>;

    /// Flush and close.  Calling it twice is harmless.
    fn finish(&mut self) -> OutputResult<()>;
}
