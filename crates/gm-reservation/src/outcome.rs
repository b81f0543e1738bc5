//! Request outcomes.
//!
//! Denial is an expected, non-exceptional result.  It derives `Error` only so
//! callers that want to can propagate it with `?`.

use thiserror::Error;

use gm_core::AircraftId;

use crate::Resource;

/// Result of every `request_*` call.
pub type RequestResult = Result<Grant, Denied>;

/// A successful request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Grant {
    /// Resources newly acquired by this call, in acquisition order.
    /// Resources the holder already had are not listed.
    pub acquired: Vec<Resource>,
}

impl Grant {
    /// `true` if the holder already had everything it asked for.
    pub fn already_held(&self) -> bool {
        self.acquired.is_empty()
    }
}

/// A refused request: `resource` is held (or physically occupied) by
/// `blocker`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
#[error("{resource} is held by {blocker}")]
pub struct Denied {
    pub resource: Resource,
    pub blocker:  AircraftId,
}
