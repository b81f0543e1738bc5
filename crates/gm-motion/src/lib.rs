//! `gm-motion`: the movement timing model.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                   |
//! |------------|------------------------------------------------------------|
//! | [`timing`] | `MovementClass`, `ClassTiming`, `TimingTable`, `interpolate` |
//! | [`state`]  | `HopState`: progress of one node-to-node hop              |
//! | [`error`]  | `MotionError`, `MotionResult<T>`                           |
//!
//! # Movement model
//!
//! Aircraft move hop by hop between adjacent graph nodes.  When a hop is
//! granted its duration is fixed once:
//!
//! ```text
//! duration = max(min_ticks(class), ceil(distance / speed(class)))
//! ```
//!
//! and progress is the share of that duration actually moved.  The drawn position is
//! a linear blend of the endpoints.  Zero-speed classes (holding, at stand)
//! always take their minimum.
//!
//! Everything here is pure: no reservation or graph state is touched.

pub mod error;
pub mod state;
pub mod timing;


pub use error::{MotionError, MotionResult};
pub use state::HopState;
pub use timing::{interpolate, ClassTiming, MovementClass, TimingTable};
