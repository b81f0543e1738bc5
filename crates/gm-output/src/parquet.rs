//! Parquet output backend (feature `parquet`).
//!
//! Creates `aircraft_snapshots.parquet` and `tick_summaries.parquet`.
//! Missing nodes are nulls.  Summary rows are buffered and written as one
//! batch on `finish()`.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    BooleanBuilder, Float32Builder, Int64Builder, StringBuilder, UInt32Builder, UInt64Builder,
    UInt8Builder,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::row::NO_NODE;
use crate::writer::OutputWriter;
use crate::{AircraftSnapshotRow, OutputResult, TickSummaryRow};

fn snapshot_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("tick",        DataType::UInt64,  false),
        Field::new("aircraft_id", DataType::UInt32,  false),
        Field::new("role",        DataType::Utf8,    false),
        Field::new("phase",       DataType::Utf8,    false),
        Field::new("colour",      DataType::Utf8,    false),
        Field::new("x",           DataType::Float32, false),
        Field::new("y",           DataType::Float32, false),
        Field::new("node",        DataType::UInt32,  true),
        Field::new("nearest",     DataType::UInt32,  true),
        Field::new("progress",    DataType::Float32, false),
        Field::new("priority",    DataType::UInt8,   false),
        Field::new("wait_ticks",  DataType::UInt32,  false),
        Field::new("phase_timer", DataType::UInt32,  false),
    ]))
}

fn summary_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("tick",            DataType::UInt64,  false),
        Field::new("unix_time_secs",  DataType::Int64,   false),
        Field::new("active_aircraft", DataType::UInt64,  false),
        Field::new("runway_busy",     DataType::Boolean, false),
        Field::new("landing_queue",   DataType::UInt32,  false),
        Field::new("departure_queue", DataType::UInt32,  false),
        Field::new("phase_changes",   DataType::UInt64,  false),
        Field::new("departed",        DataType::UInt64,  false),
    ]))
}

fn snappy_props() -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build()
}

fn append_node(b: &mut UInt32Builder, n: u32) {
    if n == NO_NODE { b.append_null() } else { b.append_value(n) }
}

/// `finish()` writes the Parquet footers; files are unreadable without it.
pub struct ParquetWriter {
    snapshots:   Option<ArrowWriter<File>>,
    summaries:   Option<ArrowWriter<File>>,
    snap_schema: Arc<Schema>,
    summ_schema: Arc<Schema>,
    pending:     Vec<TickSummaryRow>,
}

impl ParquetWriter {
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let snap_schema = snapshot_schema();
        let summ_schema = summary_schema();

        let snap_file = File::create(dir.join("aircraft_snapshots.parquet"))?;
        let snapshots = ArrowWriter::try_new(snap_file, Arc::clone(&snap_schema), Some(snappy_props()))?;

        let summ_file = File::create(dir.join("tick_summaries.parquet"))?;
        let summaries = ArrowWriter::try_new(summ_file, Arc::clone(&summ_schema), Some(snappy_props()))?;

        Ok(Self {
            snapshots: Some(snapshots),
            summaries: Some(summaries),
            snap_schema,
            summ_schema,
            pending: Vec::new(),
        })
    }

    fn flush_summaries(&mut self) -> OutputResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let Some(writer) = self.summaries.as_mut() else {
            return Ok(());
        };

        let mut ticks      = UInt64Builder::new();
        let mut unix_times = Int64Builder::new();
        let mut active     = UInt64Builder::new();
        let mut busy       = BooleanBuilder::new();
        let mut landing    = UInt32Builder::new();
        let mut departure  = UInt32Builder::new();
        let mut changes    = UInt64Builder::new();
        let mut departed   = UInt64Builder::new();

        for row in self.pending.drain(..) {
            ticks.append_value(row.tick);
            unix_times.append_value(row.unix_time_secs);
            active.append_value(row.active_aircraft);
            busy.append_value(row.runway_busy);
            landing.append_value(row.landing_queue);
            departure.append_value(row.departure_queue);
            changes.append_value(row.phase_changes);
            departed.append_value(row.departed);
        }

        let batch = RecordBatch::try_new(
            Arc::clone(&self.summ_schema),
            vec![
                Arc::new(ticks.finish()),
                Arc::new(unix_times.finish()),
                Arc::new(active.finish()),
                Arc::new(busy.finish()),
                Arc::new(landing.finish()),
                Arc::new(departure.finish()),
                Arc::new(changes.finish()),
                Arc::new(departed.finish()),
            ],
        )?;
        writer.write(&batch)?;
        Ok(())
    }
}

impl OutputWriter for ParquetWriter {
    fn write_snapshots(&mut self, rows: &[AircraftSnapshotRow]) -> OutputResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let Some(writer) = self.snapshots.as_mut() else {
            return Ok(());
        };

        let mut ticks    = UInt64Builder::new();
        let mut ids      = UInt32Builder::new();
        let mut roles    = StringBuilder::new();
        let mut phases   = StringBuilder::new();
        let mut colours  = StringBuilder::new();
        let mut xs       = Float32Builder::new();
        let mut ys       = Float32Builder::new();
        let mut nodes    = UInt32Builder::new();
        let mut nearest  = UInt32Builder::new();
        let mut progress = Float32Builder::new();
        let mut priority = UInt8Builder::new();
        let mut waits    = UInt32Builder::new();
        let mut timers   = UInt32Builder::new();

        for row in rows {
            ticks.append_value(row.tick);
            ids.append_value(row.aircraft_id);
            roles.append_value(row.role);
            phases.append_value(row.phase);
            colours.append_value(row.colour);
            xs.append_value(row.x);
            ys.append_value(row.y);
            append_node(&mut nodes, row.node);
            append_node(&mut nearest, row.nearest);
            progress.append_value(row.progress);
            priority.append_value(row.priority);
            waits.append_value(row.wait_ticks);
            timers.append_value(row.phase_timer);
        }

        let batch = RecordBatch::try_new(
            Arc::clone(&self.snap_schema),
            vec![
                Arc::new(ticks.finish()),
                Arc::new(ids.finish()),
                Arc::new(roles.finish()),
                Arc::new(phases.finish()),
                Arc::new(colours.finish()),
                Arc::new(xs.finish()),
                Arc::new(ys.finish()),
                Arc::new(nodes.finish()),
                Arc::new(nearest.finish()),
                Arc::new(progress.finish()),
                Arc::new(priority.finish()),
                Arc::new(waits.finish()),
                Arc::new(timers.finish()),
            ],
        )?;
        writer.write(&batch)?;
        Ok(())
    }

    fn write_tick_summary(&mut self, row: &TickSummaryRow) -> OutputResult<()> {
        self.pending.push(*row);
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        self.flush_summaries()?;
        if let Some(w) = self.snapshots.take() {
            w.close()?;
        }
        if let Some(w) = self.summaries.take() {
            w.close()?;
        }
        Ok(())
    }
}
