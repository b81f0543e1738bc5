//! `gm-topology`: the immutable airport graph and the route service over it.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                      |
//! |-------------|---------------------------------------------------------------|
//! | [`kind`]    | `NodeKind`, `EdgeKind`, `EdgeKey` (canonical unordered pair)  |
//! | [`network`] | `AirportGraph` (CSR + R-tree), `AirportGraphBuilder`, `RunwayZone` |
//! | [`router`]  | `Router` trait, `Route`, `DijkstraRouter`                     |
//! | [`loader`]  | `load_csv` / `load_readers` for the node and edge tables      |
//! | [`error`]   | `TopologyError`, `TopologyResult<T>`                          |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on public types.           |

pub mod error;
pub mod kind;
pub mod loader;
pub mod network;
pub mod router;


pub use error::{TopologyError, TopologyResult};
pub use kind::{EdgeKey, EdgeKind, NodeKind};
pub use loader::{load_csv, load_readers};
pub use network::{AirportGraph, AirportGraphBuilder, Edge, RunwayEntry, RunwayZone};
pub use router::{DijkstraRouter, Route, Router};
