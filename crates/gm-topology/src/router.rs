//! Routing trait and default Dijkstra implementation.
//!
//! # Pluggability
//!
//! `gm-sim` calls routing through the [`Router`] trait, so a driver can swap
//! in a different engine (A*, a precomputed table) without touching the
//! aircraft state machine.
//!
//! # Cost units
//!
//! Edge costs are the declared edge length converted to integer
//! thousandths (`u64`), which keeps the heap ordering exact.  Ties between
//! equal-cost entries are broken by node id, so results are deterministic.
//!
//! # Alternate paths
//!
//! [`Router::all_paths`] returns up to `limit` loop-free paths ordered by
//! cost.  `DijkstraRouter` implements it with Yen's algorithm: each new path
//! deviates from an earlier one at some spur node, with the already-used
//! continuations banned.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashSet};

use gm_core::NodeId;

use crate::network::AirportGraph;
use crate::TopologyError;

// ── Route ─────────────────────────────────────────────────────────────────────

/// An ordered node sequence from source to destination, both included.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub nodes:  Vec<NodeId>,
    /// Sum of declared edge lengths along the route.
    pub length: f32,
}

impl Route {
    /// `true` if the source and destination are the same node.
    pub fn is_trivial(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn hop_count(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    /// The nodes still to visit once the aircraft is at the source.
    pub fn after_start(&self) -> &[NodeId] {
        self.nodes.get(1..).unwrap_or(&[])
    }

    pub fn avoids(&self, node: NodeId) -> bool {
        !self.nodes.contains(&node)
    }
}

// ── Router trait ──────────────────────────────────────────────────────────────

/// Pluggable route service.
pub trait Router {
    /// Cheapest route from `from` to `to`.
    ///
    /// `from == to` yields a trivial route rather than an error.  An
    /// unreachable destination is [`TopologyError::NoRoute`].
    fn shortest_path(
        &self,
        graph: &AirportGraph,
        from: NodeId,
        to: NodeId,
    ) -> Result<Route, TopologyError>;

    /// Up to `limit` distinct loop-free routes, cheapest first.  Empty when
    /// `to` is unreachable.
    fn all_paths(&self, graph: &AirportGraph, from: NodeId, to: NodeId, limit: usize) -> Vec<Route>;

    /// The cheapest of the first `limit` alternates that does not pass
    /// through `avoid`.
    fn path_avoiding(
        &self,
        graph: &AirportGraph,
        from: NodeId,
        to: NodeId,
        avoid: NodeId,
        limit: usize,
    ) -> Option<Route> {
        self.all_paths(graph, from, to, limit)
            .into_iter()
            .find(|r| r.avoids(avoid))
    }
}

// ── DijkstraRouter ────────────────────────────────────────────────────────────

/// Dijkstra over the CSR arcs, costed by declared edge length.
#[derive(Clone, Copy, Debug, Default)]
pub struct DijkstraRouter;

impl Router for DijkstraRouter {
    fn shortest_path(
        &self,
        graph: &AirportGraph,
        from: NodeId,
        to: NodeId,
    ) -> Result<Route, TopologyError> {
        if !graph.contains(from) {
            return Err(TopologyError::NodeNotFound(from));
        }
        if !graph.contains(to) {
            return Err(TopologyError::NodeNotFound(to));
        }
        dijkstra(graph, from, to, &Bans::default())
            .map(|(nodes, cost)| to_route(nodes, cost))
            .ok_or(TopologyError::NoRoute { from, to })
    }

    fn all_paths(&self, graph: &AirportGraph, from: NodeId, to: NodeId, limit: usize) -> Vec<Route> {
        if limit == 0 || !graph.contains(from) || !graph.contains(to) {
            return Vec::new();
        }
        yen(graph, from, to, limit)
            .into_iter()
            .map(|(nodes, cost)| to_route(nodes, cost))
            .collect()
    }
}

fn to_route(nodes: Vec<NodeId>, cost: u64) -> Route {
    Route { nodes, length: cost as f32 / 1_000.0 }
}

// ── Dijkstra internals ────────────────────────────────────────────────────────

#[derive(Default)]
struct Bans {
    nodes: HashSet<NodeId>,
    arcs:  HashSet<(NodeId, NodeId)>,
}

#[inline]
fn arc_cost(graph: &AirportGraph, arc: usize) -> u64 {
    let len = graph.edges[graph.arc_edge[arc] as usize].length;
    (len.max(0.0) * 1_000.0).round() as u64
}

fn dijkstra(graph: &AirportGraph, from: NodeId, to: NodeId, bans: &Bans) -> Option<(Vec<NodeId>, u64)> {
    if from == to {
        return Some((vec![from], 0));
    }

    let n = graph.node_count();
    let mut dist     = vec![u64::MAX; n];
    let mut prev_arc = vec![usize::MAX; n];

    dist[from.index()] = 0;

    // Secondary key NodeId ensures deterministic tie-breaking.
    let mut heap: BinaryHeap<Reverse<(u64, NodeId)>> = BinaryHeap::new();
    heap.push(Reverse((0, from)));

    while let Some(Reverse((cost, node))) = heap.pop() {
        if node == to {
            return Some((reconstruct(graph, &prev_arc, to), cost));
        }
        if cost > dist[node.index()] {
            continue;
        }

        for arc in graph.out_arcs(node) {
            let neighbor = graph.arc_to[arc];
            if bans.nodes.contains(&neighbor) || bans.arcs.contains(&(node, neighbor)) {
                continue;
            }
            let new_cost = cost.saturating_add(arc_cost(graph, arc));
            if new_cost < dist[neighbor.index()] {
                dist[neighbor.index()] = new_cost;
                prev_arc[neighbor.index()] = arc;
                heap.push(Reverse((new_cost, neighbor)));
            }
        }
    }

    None
}

fn reconstruct(graph: &AirportGraph, prev_arc: &[usize], to: NodeId) -> Vec<NodeId> {
    let mut nodes = vec![to];
    let mut cur = to;
    loop {
        let arc = prev_arc[cur.index()];
        if arc == usize::MAX {
            break;
        }
        cur = graph.arc_from[arc];
        nodes.push(cur);
    }
    nodes.reverse();
    nodes
}

fn path_cost(graph: &AirportGraph, nodes: &[NodeId]) -> u64 {
    nodes
        .windows(2)
        .map(|w| {
            graph
                .out_arcs(w[0])
                .filter(|&a| graph.arc_to[a] == w[1])
                .map(|a| arc_cost(graph, a))
                .min()
                .unwrap_or(0)
        })
        .sum()
}

// ── Yen's k-shortest loop-free paths ──────────────────────────────────────────

fn yen(graph: &AirportGraph, from: NodeId, to: NodeId, limit: usize) -> Vec<(Vec<NodeId>, u64)> {
    let Some(first) = dijkstra(graph, from, to, &Bans::default()) else {
        return Vec::new();
    };
    let mut accepted: Vec<(Vec<NodeId>, u64)> = vec![first];
    // Ordered by (cost, node sequence) so candidate selection is deterministic.
    let mut candidates: BTreeSet<(u64, Vec<NodeId>)> = BTreeSet::new();

    while accepted.len() < limit {
        let last = accepted[accepted.len() - 1].0.clone();

        for i in 0..last.len().saturating_sub(1) {
            let spur = last[i];
            let root = &last[..=i];

            let mut bans = Bans::default();
            for (p, _) in &accepted {
                if p.len() > i + 1 && &p[..=i] == root {
                    bans.arcs.insert((p[i], p[i + 1]));
                }
            }
            bans.nodes.extend(root[..i].iter().copied());

            if let Some((spur_path, _)) = dijkstra(graph, spur, to, &bans) {
                let mut total: Vec<NodeId> = root[..i].to_vec();
                total.extend(spur_path);
                if !accepted.iter().any(|(p, _)| *p == total) {
                    let cost = path_cost(graph, &total);
                    candidates.insert((cost, total));
                }
            }
        }

        match candidates.pop_first() {
            Some((cost, nodes)) => accepted.push((nodes, cost)),
            None => break,
        }
    }

    accepted
}
