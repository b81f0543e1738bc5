//! CSV output backend.
//!
//! Creates `aircraft_snapshots.csv` and `tick_summaries.csv` in the output
//! directory.  Missing nodes are written as empty fields.

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::row::NO_NODE;
use crate::writer::OutputWriter;
use crate::{AircraftSnapshotRow, OutputResult, TickSummaryRow};

pub const SNAPSHOT_HEADER: [&str; 13] = [
    "tick", "aircraft_id", "role", "phase", "colour", "x", "y", "node", "nearest",
    "progress", "priority", "wait_ticks", "phase_timer",
];

pub const SUMMARY_HEADER: [&str; 8] = [
    "tick", "unix_time_secs", "active_aircraft", "runway_busy", "landing_queue",
    "departure_queue", "phase_changes", "departed",
];

fn node_field(n: u32) -> String {
    if n == NO_NODE { String::new() } else { n.to_string() }
}

pub struct CsvWriter {
    snapshots: Writer<File>,
    summaries: Writer<File>,
    finished:  bool,
}

impl CsvWriter {
    /// Create both files in `dir` (truncating old ones) and write headers.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let mut snapshots = Writer::from_path(dir.join("aircraft_snapshots.csv"))?;
        snapshots.write_record(SNAPSHOT_HEADER)?;

        let mut summaries = Writer::from_path(dir.join("tick_summaries.csv"))?;
        summaries.write_record(SUMMARY_HEADER)?;

        Ok(Self { snapshots, summaries, finished: false })
    }
}

impl OutputWriter for CsvWriter {
    fn write_snapshots(&mut self, rows: &[AircraftSnapshotRow]) -> OutputResult<()> {
        for row in rows {
            self.snapshots.write_record(&[
                row.tick.to_string(),
                row.aircraft_id.to_string(),
                row.role.to_owned(),
                row.phase.to_owned(),
                row.colour.to_owned(),
                format!("{:.3}", row.x),
                format!("{:.3}", row.y),
                node_field(row.node),
                node_field(row.nearest),
                format!("{:.4}", row.progress),
                row.priority.to_string(),
                row.wait_ticks.to_string(),
                row.phase_timer.to_string(),
            ])?;
        }
        Ok(())
    }

    fn write_tick_summary(&mut self, row: &TickSummaryRow) -> OutputResult<()> {
        self.summaries.write_record(&[
            row.tick.to_string(),
            row.unix_time_secs.to_string(),
            row.active_aircraft.to_string(),
            (row.runway_busy as u8).to_string(),
            row.landing_queue.to_string(),
            row.departure_queue.to_string(),
            row.phase_changes.to_string(),
            row.departed.to_string(),
        ])?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.snapshots.flush()?;
        self.summaries.flush()?;
        Ok(())
    }
}
