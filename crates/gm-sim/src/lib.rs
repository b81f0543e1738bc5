//! `gm-sim`: aircraft phase machine, runway controller and tick loop.
//!
//! # Tick loop
//!
//! ```text
//! for tick in 0..config.total_ticks:
//!   ① Expire  : purge lapsed reservations
//!   ② Spawn   : due schedule entries + generated traffic
//!   ③ Turns   : every aircraft steps once, highest priority first
//!   ④ Runway  : the controller may clear one queue head
//!   ⑤ Remove  : departed aircraft are forgotten
//! ```
//!
//! # Modules
//!
//! | Module     | Contents                                              |
//! |------------|-------------------------------------------------------|
//! | `phase`    | `Phase`, `PhaseEvent`, transition table, colours      |
//! | `step`     | `Steppable`, per-entity contexts, `FleetView`         |
//! | `aircraft` | `Aircraft`: movement, contention, negotiation         |
//! | `runway`   | `RunwayController`: queues, policies, clearances      |
//! | `snapshot` | `TrafficSnapshot` handed to observers                 |
//! | `observer` | `SimObserver` hooks                                   |
//! | `builder`  | `SimBuilder`                                          |
//! | `sim`      | `Sim` and the tick loop                               |
//!
//! # Cargo features
//!
//! | Feature   | Effect                                                 |
//! |-----------|--------------------------------------------------------|
//! | `fx-hash` | FxHash in the reservation table                        |
//! | `serde`   | Serde derives on phases, config and snapshots          |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use gm_core::SimConfig;
//! use gm_sim::{NoopObserver, SimBuilder};
//! use gm_topology::{load_csv, DijkstraRouter};
//!
//! let graph = load_csv("nodes.csv".as_ref(), "edges.csv".as_ref())?;
//! let mut sim = SimBuilder::new(SimConfig::default(), graph, DijkstraRouter).build()?;
//! sim.run(&mut NoopObserver)?;
//! ```

pub mod aircraft;
pub mod builder;
pub mod error;
pub mod observer;
pub mod phase;
pub mod runway;
pub mod sim;
pub mod snapshot;
pub mod step;

#[cfg(test)]
mod tests;

pub use aircraft::{Aircraft, Arbitration, Drive};
pub use builder::SimBuilder;
pub use error::{SimError, SimResult};
pub use observer::{NoopObserver, SimObserver};
pub use phase::{class_for, Phase, PhaseChange, PhaseEvent};
pub use runway::{Clearance, RunwayController, RunwayUse};
pub use sim::Sim;
pub use snapshot::{AircraftSnapshot, TrafficSnapshot};
pub use step::{AircraftCtx, AircraftView, FleetView, RunwayCtx, Steppable};
