//! Per-run latency accounting and coverage snapshot

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::observation::GraphSnapshot;

#[derive(Debug, Serialize)]
struct RunStats<'a> {
    system: &'a str,
    /// Integer milliseconds per phase, for easy CSV/plotting.
    latency_ms: BTreeMap<&'a str, u64>,
    nodes: usize,
    edges: usize,
    unresolved: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    coverage: Option<&'a scriptgraph_core::Coverage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unresolved_details: Option<Vec<&'a scriptgraph_core::Unresolved>>,
}

/// Write `run_stats.json` next to the other artifacts.
pub fn write_run_stats(
    out_dir: &Path,
    system: &str,
    latencies: &BTreeMap<String, u64>,
    snap: &GraphSnapshot,
) -> Result<()> {
    fs::create_dir_all(out_dir)?;
    let stats = RunStats {
        system,
        latency_ms: latencies.iter().map(|(k, v)| (k.as_str(), *v)).collect(),
        nodes: snap.graph.node_count(),
        edges: snap.graph.edge_count(),
        unresolved: snap.unresolved.len(),
        coverage: Some(&snap.coverage),
        unresolved_details: Some(snap.unresolved.iter().take(50).collect()),
    };
    fs::write(
        out_dir.join("run_stats.json"),
        serde_json::to_string_pretty(&stats)?,
    )?;
    Ok(())
}
