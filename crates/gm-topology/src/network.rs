//! Airport graph representation and builder.
//!
//! # Data layout
//!
//! Physical edges live in `edges`, one entry per CSV row.  Traversable
//! directions are stored separately as **arcs** in Compressed Sparse Row
//! form: a bidirectional edge contributes two arcs, a one-way edge one.
//! Given a `NodeId n`, its outgoing arcs occupy
//!
//! ```text
//! arc_to[ node_out_start[n] .. node_out_start[n+1] ]
//! ```
//!
//! and `arc_edge[i]` points back at the physical edge an arc belongs to.
//! Within a node's slice arcs are sorted by destination id, so neighbour
//! iteration (and everything built on it) is deterministic.
//!
//! # Runway zone
//!
//! Every node incident to a `runway` edge, plus the set of runway edge keys.
//! Computed once at build time; the reservation layer treats the whole zone
//! as a single exclusively-lockable resource.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) maps a plane position to the nearest `NodeId`.
//! Used to annotate interpolated aircraft positions in traffic snapshots.

use std::collections::{BTreeSet, HashMap};

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use tracing::debug;

use gm_core::{NodeId, Point2};

use crate::kind::{EdgeKey, EdgeKind, NodeKind};
use crate::{TopologyError, TopologyResult};

/// Expansion cap for the runway walk search.  Runway subgraphs are chains in
/// practice; the cap only matters for malformed inputs.
const RUNWAY_WALK_BUDGET: usize = 10_000;

// ── R-tree node entry ─────────────────────────────────────────────────────────

#[derive(Clone)]
struct NodeEntry {
    point: [f32; 2],
    id:    NodeId,
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f32; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for NodeEntry {
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

// ── Edge / zone types ─────────────────────────────────────────────────────────

/// One physical edge as declared in the topology input.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Edge {
    pub from:          NodeId,
    pub to:            NodeId,
    pub kind:          EdgeKind,
    pub length:        f32,
    pub bidirectional: bool,
}

impl Edge {
    #[inline]
    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.from, self.to)
    }
}

/// Nodes and edges that make up the runway.
#[derive(Clone, Debug, Default)]
pub struct RunwayZone {
    pub nodes: BTreeSet<NodeId>,
    pub edges: BTreeSet<EdgeKey>,
}

impl RunwayZone {
    #[inline]
    pub fn contains_node(&self, n: NodeId) -> bool {
        self.nodes.contains(&n)
    }

    #[inline]
    pub fn contains_edge(&self, key: EdgeKey) -> bool {
        self.edges.contains(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A way onto the runway: departing aircraft hold short at `holding`, then
/// are cleared onto `threshold`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct RunwayEntry {
    pub holding:   NodeId,
    pub threshold: NodeId,
}

impl RunwayEntry {
    #[inline]
    pub fn key(self) -> EdgeKey {
        EdgeKey::new(self.holding, self.threshold)
    }
}

// ── AirportGraph ──────────────────────────────────────────────────────────────

/// Immutable airport graph: node attributes, CSR arcs, physical edges and a
/// spatial index.
///
/// Do not construct directly; use [`AirportGraphBuilder`] or the CSV loader.
pub struct AirportGraph {
    // ── Node data (indexed by NodeId) ─────────────────────────────────────
    pub node_pos:      Vec<Point2>,
    pub node_kind:     Vec<NodeKind>,
    pub node_name:     Vec<String>,
    pub node_notes:    Vec<String>,
    /// Identifier the node carried in the input table.
    pub node_external: Vec<i64>,

    // ── CSR arcs ──────────────────────────────────────────────────────────
    /// Length = `node_count + 1`.
    pub node_out_start: Vec<u32>,
    pub arc_from:       Vec<NodeId>,
    pub arc_to:         Vec<NodeId>,
    /// Index into `edges` of the physical edge each arc traverses.
    pub arc_edge:       Vec<u32>,

    // ── Physical edges ────────────────────────────────────────────────────
    pub edges: Vec<Edge>,

    edge_index:     HashMap<EdgeKey, u32>,
    external_index: HashMap<i64, NodeId>,
    zone:           RunwayZone,
    spatial_idx:    RTree<NodeEntry>,
}

impl AirportGraph {
    /// A graph with no nodes.  Every route request against it fails with
    /// [`TopologyError::NoRoute`].
    pub fn empty() -> Self {
        AirportGraphBuilder::new().build()
    }

    // ── Dimensions ────────────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn arc_count(&self) -> usize {
        self.arc_to.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_pos.is_empty()
    }

    #[inline]
    pub fn contains(&self, n: NodeId) -> bool {
        n.index() < self.node_count()
    }

    // ── Node lookup ───────────────────────────────────────────────────────

    #[inline]
    pub fn position(&self, n: NodeId) -> Option<Point2> {
        self.node_pos.get(n.index()).copied()
    }

    #[inline]
    pub fn kind(&self, n: NodeId) -> Option<NodeKind> {
        self.node_kind.get(n.index()).copied()
    }

    pub fn name(&self, n: NodeId) -> Option<&str> {
        self.node_name.get(n.index()).map(String::as_str)
    }

    pub fn notes(&self, n: NodeId) -> Option<&str> {
        self.node_notes.get(n.index()).map(String::as_str)
    }

    pub fn external_id(&self, n: NodeId) -> Option<i64> {
        self.node_external.get(n.index()).copied()
    }

    /// Resolve an input-table identifier to the dense `NodeId`.
    pub fn node_by_external(&self, external: i64) -> Option<NodeId> {
        self.external_index.get(&external).copied()
    }

    /// Position lookup that reports missing nodes as an error.
    pub fn require_position(&self, n: NodeId) -> TopologyResult<Point2> {
        self.position(n).ok_or(TopologyError::NodeNotFound(n))
    }

    // ── Traversal ─────────────────────────────────────────────────────────

    /// Arc indices leaving `node`.  Empty for unknown nodes.
    #[inline]
    pub fn out_arcs(&self, node: NodeId) -> std::ops::Range<usize> {
        if !self.contains(node) {
            return 0..0;
        }
        let start = self.node_out_start[node.index()] as usize;
        let end   = self.node_out_start[node.index() + 1] as usize;
        start..end
    }

    /// Nodes reachable from `node` in one hop, ascending by id.
    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.out_arcs(node).map(move |i| self.arc_to[i])
    }

    pub fn out_degree(&self, node: NodeId) -> usize {
        self.out_arcs(node).len()
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> Vec<NodeId> {
        self.node_kind
            .iter()
            .enumerate()
            .filter(|(_, k)| **k == kind)
            .map(|(i, _)| NodeId(i as u32))
            .collect()
    }

    pub fn all_nodes(&self) -> Vec<NodeId> {
        (0..self.node_count() as u32).map(NodeId).collect()
    }

    // ── Edge lookup ───────────────────────────────────────────────────────

    /// The physical edge joining `a` and `b`, in either direction.
    pub fn edge_between(&self, a: NodeId, b: NodeId) -> Option<&Edge> {
        self.edge_index
            .get(&EdgeKey::new(a, b))
            .map(|&i| &self.edges[i as usize])
    }

    pub fn edge_kind(&self, a: NodeId, b: NodeId) -> Option<EdgeKind> {
        self.edge_between(a, b).map(|e| e.kind)
    }

    pub fn edge_length(&self, a: NodeId, b: NodeId) -> Option<f32> {
        self.edge_between(a, b).map(|e| e.length)
    }

    pub fn is_connected(&self, a: NodeId, b: NodeId) -> bool {
        self.edge_index.contains_key(&EdgeKey::new(a, b))
    }

    pub fn edges_of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter().filter(move |e| e.kind == kind)
    }

    #[inline]
    pub fn is_runway_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.zone.contains_edge(EdgeKey::new(a, b))
    }

    // ── Geometry ──────────────────────────────────────────────────────────

    /// `(min, max)` corners of the node bounding box; `None` when empty.
    pub fn bounds(&self) -> Option<(Point2, Point2)> {
        let first = *self.node_pos.first()?;
        let (lo, hi) = self.node_pos.iter().fold((first, first), |(lo, hi), p| {
            (
                Point2::new(lo.x.min(p.x), lo.y.min(p.y)),
                Point2::new(hi.x.max(p.x), hi.y.max(p.y)),
            )
        });
        Some((lo, hi))
    }

    /// Euclidean distance between two nodes; `None` if either is unknown.
    pub fn distance(&self, a: NodeId, b: NodeId) -> Option<f32> {
        Some(self.position(a)?.distance(self.position(b)?))
    }

    /// The node nearest to `pos`.  Returns `None` only for an empty graph.
    pub fn snap_to_node(&self, pos: Point2) -> Option<NodeId> {
        self.spatial_idx
            .nearest_neighbor(&pos.as_array())
            .map(|e| e.id)
    }

    /// Up to `k` nodes nearest to `pos`, by ascending distance.
    pub fn k_nearest_nodes(&self, pos: Point2, k: usize) -> Vec<NodeId> {
        self.spatial_idx
            .nearest_neighbor_iter(&pos.as_array())
            .take(k)
            .map(|e| e.id)
            .collect()
    }

    // ── Runway ────────────────────────────────────────────────────────────

    pub fn runway_zone(&self) -> &RunwayZone {
        &self.zone
    }

    /// Nodes an aircraft may park on: stands, else aprons, else every node.
    pub fn stand_candidates(&self) -> Vec<NodeId> {
        first_non_empty([
            self.nodes_of_kind(NodeKind::Stand),
            self.nodes_of_kind(NodeKind::Apron),
        ])
        .unwrap_or_else(|| self.all_nodes())
    }

    /// Runway ends: thresholds, else any runway-zone node, else taxiways,
    /// else every node.
    pub fn runway_thresholds(&self) -> Vec<NodeId> {
        first_non_empty([
            self.nodes_of_kind(NodeKind::RunwayThreshold),
            self.zone.nodes.iter().copied().collect(),
            self.nodes_of_kind(NodeKind::Taxiway),
        ])
        .unwrap_or_else(|| self.all_nodes())
    }

    /// Nodes where a landed aircraft leaves the runway.
    ///
    /// The off-runway end of each `runway_exit` edge; failing that, every
    /// non-zone node adjacent to the zone; failing that, taxiway nodes.
    pub fn runway_exits(&self) -> Vec<NodeId> {
        let outside_end = |e: &Edge| {
            if self.zone.contains_node(e.to) && !self.zone.contains_node(e.from) {
                e.from
            } else {
                e.to
            }
        };
        let declared: BTreeSet<NodeId> =
            self.edges_of_kind(EdgeKind::RunwayExit).map(outside_end).collect();
        let boundary: BTreeSet<NodeId> = self
            .edges
            .iter()
            .filter(|e| self.zone.contains_node(e.from) != self.zone.contains_node(e.to))
            .map(outside_end)
            .collect();

        first_non_empty([
            declared.into_iter().collect(),
            boundary.into_iter().collect(),
            self.nodes_of_kind(NodeKind::Taxiway),
        ])
        .unwrap_or_default()
    }

    /// Ways onto the runway at `threshold`.
    ///
    /// `runway_entry` edges touching the threshold; failing that, any
    /// non-runway edge joining it to a node outside the zone.  Sorted by
    /// holding-point id.
    pub fn runway_entries(&self, threshold: NodeId) -> Vec<RunwayEntry> {
        let touching = |e: &&Edge| e.from == threshold || e.to == threshold;
        let to_entry = |e: &Edge| RunwayEntry {
            holding: if e.from == threshold { e.to } else { e.from },
            threshold,
        };

        let mut declared: Vec<RunwayEntry> = self
            .edges_of_kind(EdgeKind::RunwayEntry)
            .filter(touching)
            .map(to_entry)
            .collect();
        if declared.is_empty() {
            declared = self
                .edges
                .iter()
                .filter(touching)
                .filter(|e| e.kind != EdgeKind::Runway)
                .map(to_entry)
                .filter(|en| !self.zone.contains_node(en.holding))
                .collect();
        }
        declared.sort_by_key(|en| en.holding);
        declared.dedup();
        declared
    }

    /// The longest simple walk along runway edges starting at `threshold`,
    /// threshold included.  Ties go to the walk visiting lower ids first.
    /// A threshold outside the zone yields just itself.
    pub fn runway_path(&self, threshold: NodeId) -> Vec<NodeId> {
        if !self.zone.contains_node(threshold) {
            return vec![threshold];
        }
        let mut best  = vec![threshold];
        let mut walk  = vec![threshold];
        let mut budget = RUNWAY_WALK_BUDGET;
        self.extend_runway_walk(&mut walk, &mut best, &mut budget);
        best
    }

    fn extend_runway_walk(&self, walk: &mut Vec<NodeId>, best: &mut Vec<NodeId>, budget: &mut usize) {
        if walk.len() > best.len() {
            best.clone_from(walk);
        }
        let Some(&tail) = walk.last() else { return };
        let mut next: Vec<NodeId> = self
            .zone
            .edges
            .iter()
            .filter_map(|k| k.other(tail))
            .filter(|n| !walk.contains(n))
            .collect();
        next.sort_unstable();
        for n in next {
            if *budget == 0 {
                return;
            }
            *budget -= 1;
            walk.push(n);
            self.extend_runway_walk(walk, best, budget);
            walk.pop();
        }
    }
}

fn first_non_empty<const N: usize>(candidates: [Vec<NodeId>; N]) -> Option<Vec<NodeId>> {
    candidates.into_iter().find(|v| !v.is_empty())
}

// ── AirportGraphBuilder ───────────────────────────────────────────────────────

/// Construct an [`AirportGraph`] incrementally, then call [`build`](Self::build).
///
/// # Example
///
/// ```
/// use gm_core::Point2;
/// use gm_topology::{AirportGraphBuilder, EdgeKind, NodeKind};
///
/// let mut b = AirportGraphBuilder::new();
/// let thr = b.add_node(NodeKind::RunwayThreshold, Point2::new(0.0, 0.0));
/// let end = b.add_node(NodeKind::RunwayThreshold, Point2::new(8.0, 0.0));
/// b.connect(thr, end, EdgeKind::Runway);
/// let g = b.build();
/// assert_eq!(g.arc_count(), 2); // bidirectional
/// assert_eq!(g.runway_path(thr), vec![thr, end]);
/// ```
pub struct AirportGraphBuilder {
    nodes:          Vec<RawNode>,
    raw_edges:      Vec<Edge>,
    external_index: HashMap<i64, NodeId>,
}

struct RawNode {
    external: i64,
    kind:     NodeKind,
    name:     String,
    pos:      Point2,
    notes:    String,
}

impl AirportGraphBuilder {
    pub fn new() -> Self {
        Self {
            nodes:          Vec::new(),
            raw_edges:      Vec::new(),
            external_index: HashMap::new(),
        }
    }

    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            nodes:          Vec::with_capacity(nodes),
            raw_edges:      Vec::with_capacity(edges),
            external_index: HashMap::with_capacity(nodes),
        }
    }

    /// Add an anonymous node; its external id equals its dense index.
    pub fn add_node(&mut self, kind: NodeKind, pos: Point2) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let external = id.0 as i64;
        self.nodes.push(RawNode { external, kind, name: String::new(), pos, notes: String::new() });
        self.external_index.insert(external, id);
        id
    }

    /// Add a node carrying its input-table identity.
    pub fn add_named_node(
        &mut self,
        external: i64,
        kind: NodeKind,
        name: impl Into<String>,
        pos: Point2,
        notes: impl Into<String>,
    ) -> TopologyResult<NodeId> {
        if self.external_index.contains_key(&external) {
            return Err(TopologyError::DuplicateNode(external));
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(RawNode { external, kind, name: name.into(), pos, notes: notes.into() });
        self.external_index.insert(external, id);
        Ok(id)
    }

    pub fn node_by_external(&self, external: i64) -> Option<NodeId> {
        self.external_index.get(&external).copied()
    }

    pub fn node_pos(&self, id: NodeId) -> Option<Point2> {
        self.nodes.get(id.index()).map(|n| n.pos)
    }

    /// Add a physical edge.  `bidirectional` edges are traversable both ways.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind, length: f32, bidirectional: bool) {
        self.raw_edges.push(Edge { from, to, kind, length, bidirectional });
    }

    /// Convenience: a bidirectional edge whose length is the straight-line
    /// distance between its endpoints.
    pub fn connect(&mut self, a: NodeId, b: NodeId, kind: EdgeKind) {
        let length = match (self.node_pos(a), self.node_pos(b)) {
            (Some(pa), Some(pb)) => pa.distance(pb),
            _ => 0.0,
        };
        self.add_edge(a, b, kind, length, true);
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn edge_count(&self) -> usize { self.raw_edges.len() }

    /// Consume the builder and produce an [`AirportGraph`].
    ///
    /// Edges referencing nodes that were never added are dropped with a
    /// debug log; the CSV loader rejects them before they get here.
    pub fn build(self) -> AirportGraph {
        let node_count = self.nodes.len();
        let in_range = |n: NodeId| n.index() < node_count;

        let edges: Vec<Edge> = self
            .raw_edges
            .into_iter()
            .filter(|e| {
                let ok = in_range(e.from) && in_range(e.to);
                if !ok {
                    debug!(from = %e.from, to = %e.to, "dropping edge with unknown endpoint");
                }
                ok
            })
            .collect();

        // ── Arcs ──────────────────────────────────────────────────────────
        let mut arcs: Vec<(NodeId, NodeId, u32)> = Vec::with_capacity(edges.len() * 2);
        let mut edge_index: HashMap<EdgeKey, u32> = HashMap::with_capacity(edges.len());
        let mut zone = RunwayZone::default();

        for (i, e) in edges.iter().enumerate() {
            let i = i as u32;
            arcs.push((e.from, e.to, i));
            if e.bidirectional && e.from != e.to {
                arcs.push((e.to, e.from, i));
            }
            edge_index.entry(e.key()).or_insert(i);
            if e.kind == EdgeKind::Runway {
                zone.nodes.insert(e.from);
                zone.nodes.insert(e.to);
                zone.edges.insert(e.key());
            }
        }
        arcs.sort_unstable_by_key(|&(from, to, edge)| (from, to, edge));

        let mut node_out_start = vec![0u32; node_count + 1];
        for &(from, _, _) in &arcs {
            node_out_start[from.index() + 1] += 1;
        }
        for i in 1..=node_count {
            node_out_start[i] += node_out_start[i - 1];
        }
        debug_assert_eq!(node_out_start[node_count] as usize, arcs.len());

        let arc_from = arcs.iter().map(|a| a.0).collect();
        let arc_to   = arcs.iter().map(|a| a.1).collect();
        let arc_edge = arcs.iter().map(|a| a.2).collect();

        // ── Nodes + spatial index ─────────────────────────────────────────
        let entries: Vec<NodeEntry> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| NodeEntry { point: n.pos.as_array(), id: NodeId(i as u32) })
            .collect();
        let spatial_idx = RTree::bulk_load(entries);

        let mut node_pos      = Vec::with_capacity(node_count);
        let mut node_kind     = Vec::with_capacity(node_count);
        let mut node_name     = Vec::with_capacity(node_count);
        let mut node_notes    = Vec::with_capacity(node_count);
        let mut node_external = Vec::with_capacity(node_count);
        for n in self.nodes {
            node_pos.push(n.pos);
            node_kind.push(n.kind);
            node_name.push(n.name);
            node_notes.push(n.notes);
            node_external.push(n.external);
        }

        debug!(
            nodes = node_count,
            edges = edges.len(),
            runway_nodes = zone.nodes.len(),
            "airport graph built"
        );

        AirportGraph {
            node_pos,
            node_kind,
            node_name,
            node_notes,
            node_external,
            node_out_start,
            arc_from,
            arc_to,
            arc_edge,
            edges,
            edge_index,
            external_index: self.external_index,
            zone,
            spatial_idx,
        }
    }
}

impl Default for AirportGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
