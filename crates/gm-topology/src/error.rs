//! Topology error type.

use thiserror::Error;

use gm_core::{GmError, NodeId};

/// Errors produced by `gm-topology`.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("no route from {from} to {to}")]
    NoRoute { from: NodeId, to: NodeId },

    #[error("node {0} not found in graph")]
    NodeNotFound(NodeId),

    /// An edge row referenced a node id absent from the node table.
    #[error("edge references unknown node id {0}")]
    UnknownNode(i64),

    #[error("duplicate node id {0}")]
    DuplicateNode(i64),

    #[error("topology parse error: {0}")]
    Parse(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] GmError),
}

pub type TopologyResult<T> = Result<T, TopologyError>;
