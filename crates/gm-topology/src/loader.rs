//! CSV topology loader.
//!
//! # CSV format
//!
//! Two tables, loaded once before the simulation starts.
//!
//! ```csv
//! id,type,name,x,y,notes
//! 1,runway_thr,RWY07,0,0,
//! 2,runway_thr,RWY25,24,0,
//! 3,taxiway,B1,4,1,holding point
//! ```
//!
//! ```csv
//! from,to,type,length,bidirectional
//! 1,2,runway,24,true
//! 3,1,runway_entry,4.1,yes
//! ```
//!
//! Node ids are arbitrary integers; they are mapped to dense `NodeId`s in
//! row order.  An empty `length` cell is replaced by the straight-line
//! distance between the endpoints.  `bidirectional` accepts
//! `true/false/1/0/yes/no` in any case and defaults to `true` when blank.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use gm_core::Point2;

use crate::kind::{EdgeKind, NodeKind};
use crate::network::{AirportGraph, AirportGraphBuilder};
use crate::{TopologyError, TopologyResult};

// ── CSV records ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct NodeRecord {
    id:    i64,
    #[serde(rename = "type")]
    kind:  String,
    #[serde(default)]
    name:  String,
    x:     f32,
    y:     f32,
    #[serde(default)]
    notes: String,
}

#[derive(Deserialize)]
struct EdgeRecord {
    from:          i64,
    to:            i64,
    #[serde(rename = "type")]
    kind:          String,
    #[serde(default)]
    length:        Option<f32>,
    #[serde(default)]
    bidirectional: String,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load an [`AirportGraph`] from a node table and an edge table on disk.
pub fn load_csv(nodes: &Path, edges: &Path) -> TopologyResult<AirportGraph> {
    let graph = load_readers(std::fs::File::open(nodes)?, std::fs::File::open(edges)?)?;
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        path = %nodes.display(),
        "topology loaded"
    );
    Ok(graph)
}

/// Like [`load_csv`] but accepts any `Read` sources (e.g. a `Cursor` over
/// an embedded string).
pub fn load_readers<N: Read, E: Read>(nodes: N, edges: E) -> TopologyResult<AirportGraph> {
    let mut builder = AirportGraphBuilder::new();

    // ── Nodes ─────────────────────────────────────────────────────────────
    let mut node_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(nodes);
    for row in node_reader.deserialize::<NodeRecord>() {
        let row = row?;
        let kind: NodeKind = row.kind.parse()?;
        builder.add_named_node(row.id, kind, row.name, Point2::new(row.x, row.y), row.notes)?;
    }

    // ── Edges ─────────────────────────────────────────────────────────────
    let mut edge_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(edges);
    for row in edge_reader.deserialize::<EdgeRecord>() {
        let row = row?;
        let from = builder
            .node_by_external(row.from)
            .ok_or(TopologyError::UnknownNode(row.from))?;
        let to = builder
            .node_by_external(row.to)
            .ok_or(TopologyError::UnknownNode(row.to))?;
        let kind: EdgeKind = row.kind.parse()?;
        let bidirectional = parse_flag(&row.bidirectional)?;
        let length = match row.length {
            Some(len) => len,
            None => match (builder.node_pos(from), builder.node_pos(to)) {
                (Some(a), Some(b)) => a.distance(b),
                _ => 0.0,
            },
        };
        builder.add_edge(from, to, kind, length, bidirectional);
    }

    Ok(builder.build())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn parse_flag(s: &str) -> TopologyResult<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "" | "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no"      => Ok(false),
        other => Err(TopologyError::Parse(format!(
            "invalid bidirectional flag {other:?}: expected true/false, 1/0 or yes/no"
        ))),
    }
}
