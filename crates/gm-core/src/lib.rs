//! `gm-core`: foundational types for the airside ground-movement simulator.
//!
//! Every other `gm-*` crate depends on this one.  It has no `gm-*`
//! dependencies and only `rand` and `thiserror` externally (plus optional
//! `serde`).
//!
//! # What lives here
//!
//! | Module      | Contents                                                  |
//! |-------------|-----------------------------------------------------------|
//! | [`ids`]     | `AircraftId`, `NodeId`, `ProposalId`                      |
//! | [`geo`]     | `Point2` planar coordinates, Euclidean distance           |
//! | [`time`]    | `Tick`, `SimClock`                                        |
//! | [`rng`]     | `SimRng` (seeded, deterministic)                          |
//! | [`role`]    | `FlightRole` (`Arrival` / `Departure`)                    |
//! | [`config`]  | `SimConfig`, `ControlConfig`, `RunwayPolicy`, `EscalationPolicy` |
//! | [`error`]   | `GmError`, `GmResult`                                     |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                    |
//! |---------|-----------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.       |

pub mod config;
pub mod error;
pub mod geo;
pub mod ids;
pub mod rng;
pub mod role;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{ControlConfig, EscalationPolicy, RunwayPolicy, SimConfig};
pub use error::{GmError, GmResult};
pub use geo::Point2;
pub use ids::{AircraftId, NodeId, ProposalId};
pub use rng::SimRng;
pub use role::FlightRole;
pub use time::{SimClock, Tick};

/// Relative importance of an aircraft when resources are contended.
/// Higher wins.
pub type Priority = u8;
