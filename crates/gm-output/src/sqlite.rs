//! SQLite output backend (feature `sqlite`).
//!
//! One `output.db` with tables `aircraft_snapshots` and `tick_summaries`.
//! Missing nodes are stored as NULL.

use std::path::Path;

use rusqlite::Connection;

use crate::row::NO_NODE;
use crate::writer::OutputWriter;
use crate::{AircraftSnapshotRow, OutputResult, TickSummaryRow};

fn nullable(n: u32) -> Option<u32> {
    (n != NO_NODE).then_some(n)
}

pub struct SqliteWriter {
    conn:     Connection,
    finished: bool,
}

impl SqliteWriter {
    /// Open (or create) `output.db` in `dir` and create the schema.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let conn = Connection::open(dir.join("output.db"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             CREATE TABLE IF NOT EXISTS aircraft_snapshots (
                 tick        INTEGER NOT NULL,
                 aircraft_id INTEGER NOT NULL,
                 role        TEXT    NOT NULL,
                 phase       TEXT    NOT NULL,
                 colour      TEXT    NOT NULL,
                 x           REAL    NOT NULL,
                 y           REAL    NOT NULL,
                 node        INTEGER,
                 nearest     INTEGER,
                 progress    REAL    NOT NULL,
                 priority    INTEGER NOT NULL,
                 wait_ticks  INTEGER NOT NULL,
                 phase_timer INTEGER NOT NULL,
                 PRIMARY KEY (tick, aircraft_id)
             );
             CREATE TABLE IF NOT EXISTS tick_summaries (
                 tick            INTEGER PRIMARY KEY,
                 unix_time_secs  INTEGER NOT NULL,
                 active_aircraft INTEGER NOT NULL,
                 runway_busy     INTEGER NOT NULL,
                 landing_queue   INTEGER NOT NULL,
                 departure_queue INTEGER NOT NULL,
                 phase_changes   INTEGER NOT NULL,
                 departed        INTEGER NOT NULL
             );",
        )?;

        Ok(Self { conn, finished: false })
    }
}

impl OutputWriter for SqliteWriter {
    fn write_snapshots(&mut self, rows: &[AircraftSnapshotRow]) -> OutputResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO aircraft_snapshots \
                 (tick, aircraft_id, role, phase, colour, x, y, node, nearest, \
                  progress, priority, wait_ticks, phase_timer) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            )?;
            for row in rows {
                stmt.execute(rusqlite::params![
                    row.tick,
                    row.aircraft_id,
                    row.role,
                    row.phase,
                    row.colour,
                    row.x as f64,
                    row.y as f64,
                    nullable(row.node),
                    nullable(row.nearest),
                    row.progress as f64,
                    row.priority,
                    row.wait_ticks,
                    row.phase_timer,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write_tick_summary(&mut self, row: &TickSummaryRow) -> OutputResult<()> {
        self.conn.execute(
            "INSERT INTO tick_summaries \
             (tick, unix_time_secs, active_aircraft, runway_busy, landing_queue, \
              departure_queue, phase_changes, departed) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                row.tick,
                row.unix_time_secs,
                row.active_aircraft,
                row.runway_busy,
                row.landing_queue,
                row.departure_queue,
                row.phase_changes,
                row.departed,
            ],
        )?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}
