//! Negotiation channel between a blocked aircraft and its blocker.

use gm_core::{AircraftId, ProposalId, Tick};

use crate::Resource;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ProposalKind {
    /// The target should hold still for `params.ticks`.
    Wait,
    /// The target should route around `params.resource`.
    AlternativeRoute,
    /// The target should trade priorities with the sender.
    PrioritySwap,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ProposalStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProposalParams {
    /// The contested resource.
    pub resource: Resource,
    pub ticks:    u32,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConflictProposal {
    pub id:      ProposalId,
    pub sender:  AircraftId,
    pub target:  AircraftId,
    pub kind:    ProposalKind,
    pub params:  ProposalParams,
    pub created: Tick,
    pub status:  ProposalStatus,
}

impl ConflictProposal {
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.status == ProposalStatus::Pending
    }
}
