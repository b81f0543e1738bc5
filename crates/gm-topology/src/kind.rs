//! Node and edge categories, and the canonical unordered edge key.

use std::fmt;
use std::str::FromStr;

use gm_core::NodeId;

use crate::TopologyError;

// ── NodeKind ──────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum NodeKind {
    Stand,
    Apron,
    Taxiway,
    RunwayThreshold,
    Connector,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Stand           => "stand",
            NodeKind::Apron           => "apron",
            NodeKind::Taxiway         => "taxiway",
            NodeKind::RunwayThreshold => "runway_thr",
            NodeKind::Connector       => "connector",
        }
    }
}

impl FromStr for NodeKind {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stand"                           => Ok(NodeKind::Stand),
            "apron"                           => Ok(NodeKind::Apron),
            "taxiway"                         => Ok(NodeKind::Taxiway),
            "runway_thr" | "runway_threshold" => Ok(NodeKind::RunwayThreshold),
            "connector"                       => Ok(NodeKind::Connector),
            other => Err(TopologyError::Parse(format!("unknown node type {other:?}"))),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── EdgeKind ──────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EdgeKind {
    Runway,
    Taxiway,
    ApronLink,
    StandLink,
    RunwayEntry,
    RunwayExit,
    Connector,
}

impl EdgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::Runway      => "runway",
            EdgeKind::Taxiway     => "taxiway",
            EdgeKind::ApronLink   => "apron_link",
            EdgeKind::StandLink   => "stand_link",
            EdgeKind::RunwayEntry => "runway_entry",
            EdgeKind::RunwayExit  => "runway_exit",
            EdgeKind::Connector   => "connector",
        }
    }
}

impl FromStr for EdgeKind {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "runway"       => Ok(EdgeKind::Runway),
            "taxiway"      => Ok(EdgeKind::Taxiway),
            "apron_link"   => Ok(EdgeKind::ApronLink),
            "stand_link"   => Ok(EdgeKind::StandLink),
            "runway_entry" => Ok(EdgeKind::RunwayEntry),
            "runway_exit"  => Ok(EdgeKind::RunwayExit),
            "connector"    => Ok(EdgeKind::Connector),
            other => Err(TopologyError::Parse(format!("unknown edge type {other:?}"))),
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── EdgeKey ───────────────────────────────────────────────────────────────────

/// An unordered node pair, stored with the smaller id first so that `(a, b)`
/// and `(b, a)` name the same physical edge.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeKey {
    pub lo: NodeId,
    pub hi: NodeId,
}

impl EdgeKey {
    #[inline]
    pub fn new(a: NodeId, b: NodeId) -> Self {
        if a <= b { EdgeKey { lo: a, hi: b } } else { EdgeKey { lo: b, hi: a } }
    }

    #[inline]
    pub fn touches(self, n: NodeId) -> bool {
        self.lo == n || self.hi == n
    }

    /// The endpoint opposite `n`, or `None` if `n` is not an endpoint.
    #[inline]
    pub fn other(self, n: NodeId) -> Option<NodeId> {
        if self.lo == n {
            Some(self.hi)
        } else if self.hi == n {
            Some(self.lo)
        } else {
            None
        }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.lo, self.hi)
    }
}
