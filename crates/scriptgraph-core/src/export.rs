//! Deterministic artifact export and YAML re-import

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::bundle::is_windows_bundle;
use crate::graph::ScriptGraph;
use crate::model::{EdgeKind, ScriptEdge};
use crate::runlog::RunSink;

/// How much of the bundle a run actually looked at.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Coverage {
    pub touched: usize,
    pub total: usize,
}

/// A call site the resolver gave up on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unresolved {
    pub src: String,
    pub raw_target: String,
    pub reason: String,
}

/// Final canonical pass applied to every exported path: slashes, `./`,
/// root-relativization of absolute paths, case folding per platform.
fn canon_rel(p: &str, root: &Path, windows: bool) -> String {
    let mut s = p.trim().replace('\\', "/");
    if let Some(rest) = s.strip_prefix("./") {
        s = rest.to_string();
    }
    let root_s = root.to_string_lossy().replace('\\', "/");
    if let Some(rest) = s.strip_prefix(&format!("{}/", root_s.trim_end_matches('/'))) {
        s = rest.to_string();
    }
    if windows { s.to_lowercase() } else { s }
}

/// Render the graph file: sorted node list, then edges in stable order
/// with fixed field order and 3-decimal confidence.
pub fn render_yaml(graph: &ScriptGraph, root: &Path, windows: bool) -> String {
    let mut nodes: Vec<String> = graph
        .nodes()
        .map(|n| canon_rel(n, root, windows))
        .collect();
    nodes.sort();
    nodes.dedup();

    let mut out = String::from("nodes:\n");
    for n in &nodes {
        out.push_str(&format!("  - {n}\n"));
    }
    out.push_str("edges:\n");
    for e in graph.edges() {
        let src = canon_rel(&e.src, root, windows);
        let dst = canon_rel(&e.dst, root, windows);
        out.push_str(&format!("  - src: {src}\n"));
        out.push_str(&format!("    dst: {dst}\n"));
        out.push_str(&format!("    kind: {}\n", e.kind));
        if !e.command.is_empty() {
            out.push_str(&format!("    command: {}\n", e.command));
        }
        out.push_str(&format!("    dynamic: {}\n", e.dynamic));
        out.push_str(&format!("    resolved: {}\n", e.resolved));
        out.push_str(&format!("    confidence: {:.3}\n", e.confidence));
        if let Some(reason) = e.reason.as_deref().filter(|r| !r.is_empty()) {
            out.push_str(&format!("    reason: {reason}\n"));
        }
    }
    out
}

fn edge_color(e: &ScriptEdge) -> &'static str {
    if !e.resolved {
        "orange"
    } else if e.dynamic {
        "blue"
    } else {
        "black"
    }
}

/// DOT rendering: black = static-resolved, blue = dynamic-resolved,
/// orange = unresolved.
pub fn render_dot(graph: &ScriptGraph) -> String {
    let mut lines = vec!["digraph ScriptGraph {".to_string(), "  rankdir=LR;".to_string()];
    for n in graph.sorted_nodes() {
        lines.push(format!("  \"{n}\";"));
    }
    for e in graph.edges() {
        lines.push(format!(
            "  \"{}\" -> \"{}\" [label=\"{}\", color=\"{}\"];",
            e.src,
            e.dst,
            e.kind,
            edge_color(e)
        ));
    }
    lines.push("}".to_string());
    lines.join("\n")
}

/// Write the per-run artifacts: `predicted_graph.yaml`, `graph.dot`,
/// and `run_report.json`. Best-effort: callers already validated.
pub fn write_artifacts(
    root: &Path,
    out_dir: &Path,
    graph: &ScriptGraph,
    coverage: &Coverage,
    unresolved: &[Unresolved],
    sink: Option<&dyn RunSink>,
) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;
    let windows = is_windows_bundle(root);

    let yaml = render_yaml(graph, root, windows);
    fs::write(out_dir.join("predicted_graph.yaml"), yaml)?;
    fs::write(out_dir.join("graph.dot"), render_dot(graph))?;

    let report = serde_json::json!({
        "coverage": coverage,
        "unresolved": unresolved.iter().take(50).collect::<Vec<_>>(),
    });
    fs::write(
        out_dir.join("run_report.json"),
        serde_json::to_string_pretty(&report)?,
    )?;

    if let Some(sink) = sink {
        sink.log(
            "INFO",
            &format!(
                "Artifacts: {} ; {}",
                out_dir.join("predicted_graph.yaml").display(),
                out_dir.join("run_report.json").display()
            ),
        );
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct YamlEdge {
    src: String,
    dst: String,
    #[serde(default = "default_kind")]
    kind: EdgeKind,
    #[serde(default)]
    command: String,
    #[serde(default)]
    dynamic: bool,
    #[serde(default = "default_true")]
    resolved: bool,
    #[serde(default = "default_confidence")]
    confidence: f32,
    #[serde(default)]
    reason: Option<String>,
}

fn default_kind() -> EdgeKind {
    EdgeKind::Call
}

fn default_true() -> bool {
    true
}

fn default_confidence() -> f32 {
    0.9
}

#[derive(Debug, Deserialize)]
struct YamlGraph {
    #[serde(default)]
    nodes: Vec<String>,
    #[serde(default)]
    edges: Vec<YamlEdge>,
}

/// Parse a previously exported graph file back into a [`ScriptGraph`].
pub fn import_graph_yaml(text: &str) -> Result<ScriptGraph> {
    let data: YamlGraph = serde_yaml::from_str(text).context("parsing graph YAML")?;
    let mut g = ScriptGraph::new();
    for n in &data.nodes {
        g.add_node(n);
    }
    for e in data.edges {
        g.add_edge(ScriptEdge {
            src: e.src,
            dst: e.dst,
            kind: e.kind,
            command: e.command,
            dynamic: e.dynamic,
            resolved: e.resolved,
            confidence: e.confidence,
            reason: e.reason,
        });
    }
    Ok(g)
}
