//! `gm-schedule`: when aircraft enter the simulation.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                   |
//! |--------------|------------------------------------------------------------|
//! | [`schedule`] | `FlightRequest`, `FlightSchedule` (`BTreeMap<Tick, Vec<_>>`) |
//! | [`traffic`]  | `TrafficSource` trait, `NoTraffic`, `RandomArrivals`, `ChainedSource` |
//! | [`loader`]   | `load_schedule_csv`, `load_schedule_reader`                |
//! | [`error`]    | `ScheduleError`, `ScheduleResult<T>`                       |
//!
//! # Spawning model
//!
//! Each tick the simulation drains every request due at or before the
//! current tick from the [`FlightSchedule`], then asks its
//! [`TrafficSource`] for extra, randomly generated requests.  A departure
//! that cannot be placed (no free stand) is pushed back one tick with
//! [`FlightSchedule::defer`].

pub mod error;
pub mod loader;
pub mod schedule;
pub mod traffic;


pub use error::{ScheduleError, ScheduleResult};
pub use loader::{load_schedule_csv, load_schedule_reader};
pub use schedule::{FlightRequest, FlightSchedule};
pub use traffic::{ChainedSource, NoTraffic, RandomArrivals, TrafficSource, TrafficSourceExt};
