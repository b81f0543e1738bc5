//! balice: ground traffic at a Kraków-Balice-style airport.
//!
//! Runs the embedded layout for a fixed number of ticks with a short
//! scheduled bank of flights plus random arrivals, prints a status line
//! every few ticks and writes CSV snapshots to `output/balice/`.
//!
//! ```text
//! cargo run -p balice                      # built-in configuration
//! cargo run -p balice -- config.json       # SimConfig as JSON, missing keys default
//! RUST_LOG=gm_sim=debug cargo run -p balice
//! ```

mod network;

use std::io::Cursor;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use memory_stats::memory_stats;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gm_core::{AircraftId, SimConfig, Tick};
use gm_output::{CsvWriter, OutputWriter, SimOutputObserver};
use gm_schedule::load_schedule_reader;
use gm_sim::{Phase, PhaseChange, SimBuilder, SimObserver, TrafficSnapshot};
use gm_topology::DijkstraRouter;

use network::build_layout;

// ── Constants ─────────────────────────────────────────────────────────────────

const SEED:                  u64   = 42;
const TOTAL_TICKS:           u64   = 400;
const TICK_DURATION_SECS:    u32   = 10;
const OUTPUT_INTERVAL_TICKS: u64   = 5;
const ARRIVAL_RATE:          f64   = 0.02;
const STATUS_EVERY:          u64   = 20;
const OUTPUT_DIR:            &str  = "output/balice";

// Three arrivals inbound at start, then a departure bank from the stands.
const SCHEDULE_CSV: &str = "\
tick,role,priority
0,arrival,
0,arrival,
0,arrival,2
5,departure,
10,departure,
15,departure,1
60,arrival,3
90,departure,
";

fn phys_mem_mb() -> f64 {
    memory_stats()
        .map(|s| s.physical_mem as f64 / (1024.0 * 1024.0))
        .unwrap_or(0.0)
}

fn load_config() -> Result<SimConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {path}"))?;
            let config: SimConfig = serde_json::from_str(&text)
                .with_context(|| format!("parsing config {path}"))?;
            info!(%path, "configuration loaded");
            Ok(config)
        }
        None => Ok(SimConfig {
            seed:                  SEED,
            total_ticks:           TOTAL_TICKS,
            start_unix_secs:       1_700_000_000,
            tick_duration_secs:    TICK_DURATION_SECS,
            output_interval_ticks: OUTPUT_INTERVAL_TICKS,
            arrival_rate:          ARRIVAL_RATE,
            ..SimConfig::default()
        }),
    }
}

// ── Status observer ───────────────────────────────────────────────────────────

/// Forwards everything to the CSV observer and prints a status line every
/// `STATUS_EVERY` ticks.
struct StatusObserver<W: OutputWriter> {
    inner:         SimOutputObserver<W>,
    snapshot_rows: usize,
    summary_rows:  usize,
    phase_changes: u64,
    departed:      u64,
}

impl<W: OutputWriter> StatusObserver<W> {
    fn new(inner: SimOutputObserver<W>) -> Self {
        Self { inner, snapshot_rows: 0, summary_rows: 0, phase_changes: 0, departed: 0 }
    }
}

impl<W: OutputWriter> SimObserver for StatusObserver<W> {
    fn on_snapshot(&mut self, s: &TrafficSnapshot) {
        self.snapshot_rows += s.active();
        self.summary_rows += 1;
        if s.tick.0 % STATUS_EVERY == 0 {
            println!(
                "tick {:>4} | aircraft {:>2} | wait-land {} landing {} at-stand {} \
                 wait-dep {} departing {} | runway {} | queues L{} D{}",
                s.tick.0,
                s.active(),
                s.count_in(Phase::WaitingLanding),
                s.count_in(Phase::Landing),
                s.count_in(Phase::AtStand),
                s.count_in(Phase::WaitingDeparture),
                s.count_in(Phase::Departing),
                if s.runway_busy { "busy" } else { "free" },
                s.landing_queue,
                s.departure_queue,
            );
        }
        self.inner.on_snapshot(s);
    }

    fn on_phase_change(&mut self, change: &PhaseChange) {
        self.phase_changes += 1;
        self.inner.on_phase_change(change);
    }

    fn on_aircraft_removed(&mut self, aircraft: AircraftId, tick: Tick) {
        self.departed += 1;
        self.inner.on_aircraft_removed(aircraft, tick);
    }

    fn on_sim_end(&mut self, final_tick: Tick) {
        self.inner.on_sim_end(final_tick);
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== balice: airport ground movement ===");

    // 1. Layout.
    let graph = build_layout()?;
    println!("Layout: {} nodes, {} edges", graph.node_count(), graph.edge_count());

    // 2. Configuration and schedule.
    let config = load_config()?;
    let schedule = load_schedule_reader(Cursor::new(SCHEDULE_CSV))?;
    println!(
        "Sim: {} ticks x {} s, seed {}, arrival rate {}, {} scheduled flights, runway policy {:?}",
        config.total_ticks,
        config.tick_duration_secs,
        config.seed,
        config.arrival_rate,
        schedule.len(),
        config.control.runway_policy,
    );
    println!();

    // 3. Build.
    let mut sim = SimBuilder::new(config, graph, DijkstraRouter)
        .schedule(schedule)
        .build()?;

    // 4. Output.
    std::fs::create_dir_all(OUTPUT_DIR)?;
    let writer = CsvWriter::new(Path::new(OUTPUT_DIR))?;
    let mut obs = StatusObserver::new(SimOutputObserver::new(writer));

    // 5. Run.
    let t0 = Instant::now();
    sim.run(&mut obs)?;
    let elapsed = t0.elapsed();

    if let Some(e) = obs.inner.take_error() {
        eprintln!("output error: {e}");
    }

    // 6. Summary.
    let last = sim.snapshot();
    let (landings, departures) = sim.runway.served();
    let stats = sim.reservations.stats();

    println!();
    println!("Simulation complete in {:.3} s ({:.1} MB resident)", elapsed.as_secs_f64(), phys_mem_mb());
    println!("  phase changes       : {}", obs.phase_changes);
    println!("  landings / takeoffs : {landings} / {departures}");
    println!("  departed & removed  : {}", obs.departed);
    println!("  still active        : {}", last.active());
    println!("  deferred spawns     : {}", sim.pending_spawns());
    println!(
        "  reservations        : {} granted, {} denied, {} rolled back, {} evicted",
        stats.granted, stats.denied, stats.rolled_back, stats.evicted
    );
    println!("  runway              : {}", if last.runway_busy { "busy" } else { "free" });
    println!("  queues              : {} landing, {} departure", last.landing_queue, last.departure_queue);
    println!("  {OUTPUT_DIR}/aircraft_snapshots.csv : {} rows", obs.snapshot_rows);
    println!("  {OUTPUT_DIR}/tick_summaries.csv     : {} rows", obs.summary_rows);
    println!();

    println!("{:<6} {:<10} {:<18} {:<8} {:<6}", "Id", "Role", "Phase", "Node", "Wait");
    println!("{}", "-".repeat(52));
    for a in &last.aircraft {
        let node = a.node.map_or_else(|| "-".to_owned(), |n| n.to_string());
        println!(
            "{:<6} {:<10} {:<18} {:<8} {:<6}",
            a.id.to_string(),
            a.role.as_str(),
            a.phase.as_str(),
            node,
            a.wait_ticks,
        );
    }

    Ok(())
}
