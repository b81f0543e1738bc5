//! CSV schedule loader.
//!
//! # CSV format
//!
//! One row per aircraft.  `priority` may be left blank to use the
//! configured default.
//!
//! ```csv
//! tick,role,priority
//! 0,arrival,1
//! 0,departure,
//! 12,arrival,3
//! ```
//!
//! Rows need not be sorted; the schedule orders them by tick and keeps file
//! order within a tick.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use gm_core::{FlightRole, Priority, Tick};

use crate::{FlightRequest, FlightSchedule, ScheduleError};

#[derive(Deserialize)]
struct ScheduleRecord {
    tick:     u64,
    role:     String,
    #[serde(default)]
    priority: Option<Priority>,
}

/// Load a [`FlightSchedule`] from a CSV file.
pub fn load_schedule_csv(path: &Path) -> Result<FlightSchedule, ScheduleError> {
    let file = std::fs::File::open(path)?;
    let schedule = load_schedule_reader(file)?;
    info!(flights = schedule.len(), path = %path.display(), "schedule loaded");
    Ok(schedule)
}

/// Like [`load_schedule_csv`] but accepts any `Read` source.
pub fn load_schedule_reader<R: Read>(reader: R) -> Result<FlightSchedule, ScheduleError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut schedule = FlightSchedule::new();

    for (i, result) in csv_reader.deserialize::<ScheduleRecord>().enumerate() {
        let row = result?;
        let role: FlightRole = row
            .role
            .parse()
            .map_err(|source| ScheduleError::Role { line: i + 2, source })?;
        schedule.push(Tick(row.tick), FlightRequest { role, priority: row.priority });
    }

    Ok(schedule)
}
