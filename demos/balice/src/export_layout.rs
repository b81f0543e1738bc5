//! Export the embedded layout for a renderer.
//!
//! Writes two JSON files to `output/balice/`:
//!   - `layout_nodes.json`: `[{node_id, name, kind, x, y}, …]`
//!   - `layout_edges.json`: `[{from_node, to_node, kind, length, bidirectional}, …]`
//!
//! Run with: `cargo run -p balice --bin export_layout`

mod network;

use std::fs;

use anyhow::Result;
use serde_json::json;

use network::build_layout;

fn main() -> Result<()> {
    let graph = build_layout()?;

    fs::create_dir_all("output/balice")?;

    // ── layout_nodes.json ─────────────────────────────────────────────────────
    let nodes: Vec<serde_json::Value> = graph
        .all_nodes()
        .into_iter()
        .filter_map(|n| {
            let pos = graph.position(n)?;
            Some(json!({
                "node_id": n.0,
                "name":    graph.name(n).unwrap_or_default(),
                "kind":    graph.kind(n).map(|k| k.as_str()),
                "x":       pos.x,
                "y":       pos.y,
            }))
        })
        .collect();

    fs::write("output/balice/layout_nodes.json", serde_json::to_string_pretty(&nodes)?)?;
    println!("Wrote output/balice/layout_nodes.json ({} nodes)", nodes.len());

    // ── layout_edges.json ─────────────────────────────────────────────────────
    let edges: Vec<serde_json::Value> = graph
        .edges
        .iter()
        .map(|e| {
            json!({
                "from_node":     e.from.0,
                "to_node":       e.to.0,
                "kind":          e.kind.as_str(),
                "length":        e.length,
                "bidirectional": e.bidirectional,
            })
        })
        .collect();

    fs::write("output/balice/layout_edges.json", serde_json::to_string_pretty(&edges)?)?;
    println!("Wrote output/balice/layout_edges.json ({} edges)", edges.len());

    Ok(())
}
