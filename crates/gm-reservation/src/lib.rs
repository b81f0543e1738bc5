//! `gm-reservation`: the single owner of every resource-occupancy table.
//!
//! Aircraft and the runway controller never share mutable collections; all
//! acquisition goes through [`ReservationManager`]'s transactional API.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                     |
//! |--------------|--------------------------------------------------------------|
//! | [`resource`] | `Resource`, `Section`, `Reservation`, `Occupancy`, lease helpers |
//! | [`outcome`]  | `Grant`, `Denied`                                            |
//! | [`proposal`] | `ConflictProposal`, `ProposalKind`, `ProposalStatus`         |
//! | [`manager`]  | `ReservationManager`, `ReservationStats`                     |
//!
//! # Feature flags
//!
//! | Flag      | Effect                                                    |
//! |-----------|-----------------------------------------------------------|
//! | `fx-hash` | FxHash for the resource table instead of SipHash.         |
//! | `serde`   | Derives `Serialize`/`Deserialize` on public types.        |

pub mod manager;
pub mod outcome;
pub mod proposal;
pub mod resource;


pub use manager::{ReservationManager, ReservationStats};
pub use outcome::{Denied, Grant, RequestResult};
pub use proposal::{ConflictProposal, ProposalKind, ProposalParams, ProposalStatus};
pub use resource::{HOLD_UNTIL_RELEASED, Occupancy, Reservation, Resource, Section};
