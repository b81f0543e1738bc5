//! Tests for gm-output.

#[cfg(test)]
mod helpers {
    use tempfile::TempDir;

    use crate::row::{AircraftSnapshotRow, TickSummaryRow, NO_NODE};

    pub fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    pub fn taxiing(aircraft_id: u32, tick: u64) -> AircraftSnapshotRow {
        AircraftSnapshotRow {
            tick,
            aircraft_id,
            role:        "arrival",
            phase:       "taxiing_to_stand",
            colour:      "cyan",
            x:           12.5,
            y:           -3.25,
            node:        aircraft_id + 10,
            nearest:     aircraft_id + 11,
            progress:    0.5,
            priority:    2,
            wait_ticks:  0,
            phase_timer: 0,
        }
    }

    pub fn airborne(aircraft_id: u32, tick: u64) -> AircraftSnapshotRow {
        AircraftSnapshotRow {
            phase: "waiting_landing",
            colour: "gray",
            node: NO_NODE,
            progress: 0.0,
            ..taxiing(aircraft_id, tick)
        }
    }

    pub fn summary(tick: u64) -> TickSummaryRow {
        TickSummaryRow {
            tick,
            unix_time_secs:  tick as i64 * 10,
            active_aircraft: 4,
            runway_busy:     true,
            landing_queue:   2,
            departure_queue: 1,
            phase_changes:   3,
            departed:        1,
        }
    }
}

// ── CSV ───────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod csv_tests {
    use super::helpers::{airborne, summary, taxiing, tmp};
    use crate::csv::{CsvWriter, SNAPSHOT_HEADER, SUMMARY_HEADER};
    use crate::writer::OutputWriter;

    #[test]
    fn headers_written_on_create() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.finish().unwrap();

        let mut rdr = csv::Reader::from_path(dir.path().join("aircraft_snapshots.csv")).unwrap();
        let headers: Vec<_> = rdr.headers().unwrap().iter().map(str::to_owned).collect();
        assert_eq!(headers, SNAPSHOT_HEADER);
        assert_eq!(rdr.records().count(), 0);

        let mut rdr = csv::Reader::from_path(dir.path().join("tick_summaries.csv")).unwrap();
        let headers: Vec<_> = rdr.headers().unwrap().iter().map(str::to_owned).collect();
        assert_eq!(headers, SUMMARY_HEADER);
    }

    #[test]
    fn snapshot_rows_in_order() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.write_snapshots(&[taxiing(0, 5), taxiing(1, 5), taxiing(2, 5)]).unwrap();
        w.finish().unwrap();

        let mut rdr = csv::Reader::from_path(dir.path().join("aircraft_snapshots.csv")).unwrap();
        let rows: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[0][0], "5");
        assert_eq!(&rows[0][1], "0");
        assert_eq!(&rows[2][1], "2");
        assert_eq!(&rows[1][2], "arrival");
        assert_eq!(&rows[1][3], "taxiing_to_stand");
        assert_eq!(&rows[1][4], "cyan");
        assert_eq!(&rows[1][7], "11");
        assert_eq!(&rows[1][8], "12");
        let x: f32 = rows[0][5].parse().unwrap();
        let y: f32 = rows[0][6].parse().unwrap();
        assert!((x - 12.5).abs() < 1e-3 && (y + 3.25).abs() < 1e-3);
    }

    #[test]
    fn missing_node_is_empty_field() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.write_snapshots(&[airborne(4, 0)]).unwrap();
        w.finish().unwrap();

        let mut rdr = csv::Reader::from_path(dir.path().join("aircraft_snapshots.csv")).unwrap();
        let row = rdr.records().next().unwrap().unwrap();
        assert_eq!(&row[7], "");
        assert_eq!(&row[8], "15", "nearest is still reported");
    }

    #[test]
    fn summary_row_fields() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.write_tick_summary(&summary(3)).unwrap();
        w.finish().unwrap();

        let mut rdr = csv::Reader::from_path(dir.path().join("tick_summaries.csv")).unwrap();
        let rows: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        let fields: Vec<&str> = rows[0].iter().collect();
        assert_eq!(fields, ["3", "30", "4", "1", "2", "1", "3", "1"]);
    }

    #[test]
    fn finish_twice_is_harmless() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.finish().unwrap();
        w.finish().unwrap();
    }

    #[test]
    fn empty_snapshot_ok() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.write_snapshots(&[]).unwrap();
    }

    #[test]
    fn missing_directory_fails() {
        let dir = tmp();
        let result = CsvWriter::new(&dir.path().join("does/not/exist"));
        assert!(result.is_err());
    }
}

// ── Observer ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod observer_tests {
    use std::io::Cursor;

    use gm_core::{AircraftId, SimConfig, Tick};
    use gm_schedule::{FlightRequest, FlightSchedule};
    use gm_sim::{Phase, PhaseChange, SimBuilder, SimObserver, TrafficSnapshot};
    use gm_topology::{load_readers, DijkstraRouter};

    use super::helpers::tmp;
    use crate::row::{AircraftSnapshotRow, TickSummaryRow};
    use crate::writer::OutputWriter;
    use crate::{CsvWriter, OutputError, OutputResult, SimOutputObserver};

    const NODES: &str = "\
id,type,name,x,y,notes
1,runway_thr,RWY07,0,0,
2,runway_thr,RWY25,20,0,
3,taxiway,A1,0,3,holding point
4,taxiway,A2,20,3,exit
5,apron,APR,10,6,
6,stand,S1,8,8,
7,stand,S2,12,8,
";

    const EDGES: &str = "\
from,to,type,length,bidirectional
1,2,runway,,true
3,1,runway_entry,,true
2,4,runway_exit,,true
3,5,taxiway,,true
4,5,taxiway,,true
5,6,stand_link,,true
5,7,stand_link,,true
";

    #[derive(Default)]
    struct MemoryWriter {
        snapshots: Vec<AircraftSnapshotRow>,
        summaries: Vec<TickSummaryRow>,
        finished:  u32,
    }

    impl OutputWriter for MemoryWriter {
        fn write_snapshots(&mut self, rows: &[AircraftSnapshotRow]) -> OutputResult<()> {
            self.snapshots.extend_from_slice(rows);
            Ok(())
        }

        fn write_tick_summary(&mut self, row: &TickSummaryRow) -> OutputResult<()> {
            self.summaries.push(*row);
            Ok(())
        }

        fn finish(&mut self) -> OutputResult<()> {
            self.finished += 1;
            Ok(())
        }
    }

    struct FailingWriter;

    impl OutputWriter for FailingWriter {
        fn write_snapshots(&mut self, _rows: &[AircraftSnapshotRow]) -> OutputResult<()> {
            Err(OutputError::Io(std::io::Error::other("disk full")))
        }

        fn write_tick_summary(&mut self, _row: &TickSummaryRow) -> OutputResult<()> {
            Err(OutputError::Io(std::io::Error::other("second failure")))
        }

        fn finish(&mut self) -> OutputResult<()> {
            Ok(())
        }
    }

    fn config() -> SimConfig {
        SimConfig {
            seed: 3,
            total_ticks: 6,
            start_unix_secs: 1_000,
            tick_duration_secs: 10,
            output_interval_ticks: 2,
            ..SimConfig::default()
        }
    }

    fn schedule() -> FlightSchedule {
        let mut s = FlightSchedule::new();
        s.push(Tick(0), FlightRequest::arrival());
        s
    }

    fn change(tick: u64) -> PhaseChange {
        PhaseChange {
            aircraft: AircraftId(0),
            from:     Phase::AtStand,
            to:       Phase::PushbackPending,
            tick:     Tick(tick),
        }
    }

    #[test]
    fn summaries_follow_snapshot_interval() {
        let graph = load_readers(Cursor::new(NODES), Cursor::new(EDGES)).unwrap();
        let mut sim = SimBuilder::new(config(), graph, DijkstraRouter)
            .schedule(schedule())
            .build()
            .unwrap();

        let mut obs = SimOutputObserver::new(MemoryWriter::default());
        sim.run(&mut obs).unwrap();
        assert!(obs.take_error().is_none());

        let w = obs.into_writer();
        let ticks: Vec<u64> = w.summaries.iter().map(|s| s.tick).collect();
        assert_eq!(ticks, [0, 2, 4]);
        assert_eq!(w.summaries[1].unix_time_secs, 1_020);
        assert_eq!(w.finished, 1);

        // The one arrival appears in every snapshot.
        assert!(!w.snapshots.is_empty());
        assert!(w.snapshots.iter().all(|r| r.aircraft_id == 0 && r.role == "arrival"));
        assert_eq!(w.snapshots[0].tick, 0);
    }

    #[test]
    fn counters_reset_after_each_summary() {
        let mut obs = SimOutputObserver::new(MemoryWriter::default());
        obs.on_phase_change(&change(0));
        obs.on_phase_change(&change(1));
        obs.on_aircraft_removed(AircraftId(0), Tick(1));
        obs.on_snapshot(&TrafficSnapshot { tick: Tick(2), ..TrafficSnapshot::default() });
        obs.on_snapshot(&TrafficSnapshot { tick: Tick(4), ..TrafficSnapshot::default() });

        let w = obs.into_writer();
        assert_eq!(w.summaries.len(), 2);
        assert_eq!((w.summaries[0].phase_changes, w.summaries[0].departed), (2, 1));
        assert_eq!((w.summaries[1].phase_changes, w.summaries[1].departed), (0, 0));
        assert!(w.snapshots.is_empty(), "empty airport writes no aircraft rows");
    }

    #[test]
    fn first_error_is_kept() {
        let graph = load_readers(Cursor::new(NODES), Cursor::new(EDGES)).unwrap();
        let mut sim = SimBuilder::new(config(), graph, DijkstraRouter)
            .schedule(schedule())
            .build()
            .unwrap();

        let mut obs = SimOutputObserver::new(FailingWriter);
        sim.run(&mut obs).unwrap();

        let err = obs.take_error().expect("write error recorded");
        assert!(err.to_string().contains("disk full"), "got {err}");
        assert!(obs.take_error().is_none());
    }

    #[test]
    fn csv_end_to_end() {
        let graph = load_readers(Cursor::new(NODES), Cursor::new(EDGES)).unwrap();
        let mut sim = SimBuilder::new(config(), graph, DijkstraRouter)
            .schedule(schedule())
            .build()
            .unwrap();

        let dir = tmp();
        let mut obs = SimOutputObserver::new(CsvWriter::new(dir.path()).unwrap());
        sim.run(&mut obs).unwrap();
        assert!(obs.take_error().is_none());

        let mut rdr = csv::Reader::from_path(dir.path().join("tick_summaries.csv")).unwrap();
        assert_eq!(rdr.records().count(), 3);

        let mut rdr = csv::Reader::from_path(dir.path().join("aircraft_snapshots.csv")).unwrap();
        let first = rdr.records().next().unwrap().unwrap();
        assert_eq!(&first[0], "0");
        assert_eq!(&first[1], "0");
        assert_eq!(&first[2], "arrival");
    }
}

// ── SQLite ────────────────────────────────────────────────────────────────────

#[cfg(all(test, feature = "sqlite"))]
mod sqlite_tests {
    use super::helpers::{airborne, summary, taxiing, tmp};
    use crate::sqlite::SqliteWriter;
    use crate::writer::OutputWriter;

    #[test]
    fn db_created() {
        let dir = tmp();
        let _w = SqliteWriter::new(dir.path()).unwrap();
        assert!(dir.path().join("output.db").exists());
    }

    #[test]
    fn snapshot_count_and_nulls() {
        let dir = tmp();
        let mut w = SqliteWriter::new(dir.path()).unwrap();
        w.write_snapshots(&[taxiing(0, 1), taxiing(1, 1), airborne(2, 1)]).unwrap();
        w.finish().unwrap();

        let conn = rusqlite::Connection::open(dir.path().join("output.db")).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM aircraft_snapshots", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 3);

        let node: Option<i64> = conn
            .query_row("SELECT node FROM aircraft_snapshots WHERE aircraft_id = 2", [], |r| r.get(0))
            .unwrap();
        assert_eq!(node, None);

        let phase: String = conn
            .query_row("SELECT phase FROM aircraft_snapshots WHERE aircraft_id = 0", [], |r| r.get(0))
            .unwrap();
        assert_eq!(phase, "taxiing_to_stand");
    }

    #[test]
    fn tick_summary_stored() {
        let dir = tmp();
        let mut w = SqliteWriter::new(dir.path()).unwrap();
        w.write_tick_summary(&summary(7)).unwrap();
        w.finish().unwrap();

        let conn = rusqlite::Connection::open(dir.path().join("output.db")).unwrap();
        let (unix, busy, landing): (i64, i64, i64) = conn
            .query_row(
                "SELECT unix_time_secs, runway_busy, landing_queue FROM tick_summaries WHERE tick = 7",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();
        assert_eq!((unix, busy, landing), (70, 1, 2));
    }
}

// ── Parquet ───────────────────────────────────────────────────────────────────

#[cfg(all(test, feature = "parquet"))]
mod parquet_tests {
    use arrow::array::{Array, UInt32Array};
    use arrow::datatypes::DataType;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    use super::helpers::{airborne, summary, taxiing, tmp};
    use crate::parquet::ParquetWriter;
    use crate::writer::OutputWriter;

    #[test]
    fn files_created() {
        let dir = tmp();
        let mut w = ParquetWriter::new(dir.path()).unwrap();
        w.finish().unwrap();
        assert!(dir.path().join("aircraft_snapshots.parquet").exists());
        assert!(dir.path().join("tick_summaries.parquet").exists());
    }

    #[test]
    fn snapshot_schema_and_nulls() {
        let dir = tmp();
        let mut w = ParquetWriter::new(dir.path()).unwrap();
        w.write_snapshots(&[taxiing(0, 2), airborne(1, 2)]).unwrap();
        w.finish().unwrap();

        let file = std::fs::File::open(dir.path().join("aircraft_snapshots.parquet")).unwrap();
        let builder = ParquetRecordBatchReaderBuilder::try_new(file).unwrap();
        let schema = builder.schema().clone();
        assert_eq!(*schema.field_with_name("phase").unwrap().data_type(), DataType::Utf8);
        assert!(schema.field_with_name("node").unwrap().is_nullable());

        let batches: Vec<_> = builder.build().unwrap().map(|b| b.unwrap()).collect();
        assert_eq!(batches.iter().map(|b| b.num_rows()).sum::<usize>(), 2);

        let nodes = batches[0]
            .column_by_name("node")
            .unwrap()
            .as_any()
            .downcast_ref::<UInt32Array>()
            .unwrap();
        assert_eq!(nodes.value(0), 10);
        assert!(nodes.is_null(1));
    }

    #[test]
    fn summaries_flushed_on_finish() {
        let dir = tmp();
        let mut w = ParquetWriter::new(dir.path()).unwrap();
        w.write_tick_summary(&summary(0)).unwrap();
        w.write_tick_summary(&summary(5)).unwrap();
        w.finish().unwrap();
        w.finish().unwrap();

        let file = std::fs::File::open(dir.path().join("tick_summaries.parquet")).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file).unwrap().build().unwrap();
        let rows: usize = reader.map(|b| b.unwrap().num_rows()).sum();
        assert_eq!(rows, 2);
    }

    #[test]
    fn unfinished_file_is_unreadable() {
        let dir = tmp();
        {
            let mut w = ParquetWriter::new(dir.path()).unwrap();
            w.write_snapshots(&[taxiing(0, 0)]).unwrap();
        }
        let file = std::fs::File::open(dir.path().join("aircraft_snapshots.parquet")).unwrap();
        assert!(ParquetRecordBatchReaderBuilder::try_new(file).is_err());
    }
}
