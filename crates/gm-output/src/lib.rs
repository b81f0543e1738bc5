//! `gm-output`: snapshot writers for the ground-movement simulator.
//!
//! | Feature   | Backend | Files created                                             |
//! |-----------|---------|-----------------------------------------------------------|
//! | *(none)*  | CSV     | `aircraft_snapshots.csv`, `tick_summaries.csv`            |
//! | `sqlite`  | SQLite  | `output.db`                                               |
//! | `parquet` | Parquet | `aircraft_snapshots.parquet`, `tick_summaries.parquet`    |
//!
//! Every backend implements [`OutputWriter`]; [`SimOutputObserver`] drives
//! one from the simulator's observer hooks.
//!
//! ```rust,ignore
//! use gm_output::{CsvWriter, SimOutputObserver};
//!
//! let mut obs = SimOutputObserver::new(CsvWriter::new(Path::new("./output"))?);
//! sim.run(&mut obs)?;
//! if let Some(e) = obs.take_error() {
//!     eprintln!("output error: {e}");
//! }
//! ```

pub mod csv;
pub mod error;
pub mod observer;
pub mod row;
pub mod writer;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "parquet")]
pub mod parquet;

#[cfg(test)]
mod tests;

pub use csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use observer::SimOutputObserver;
pub use row::{AircraftSnapshotRow, TickSummaryRow, NO_NODE};
pub use writer::OutputWriter;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteWriter;

#[cfg(feature = "parquet")]
pub use parquet::ParquetWriter;
