//! Writer: dedupe, validate, apply nodes-policy, export artifacts

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::Result;
use scriptgraph_ai::{LlmClient, prompt::WRITER_PROMPT};
use scriptgraph_core::{RunSink, ScriptGraph, write_artifacts};

use crate::RoleContext;
use crate::observation::GraphSnapshot;

/// Which nodes survive export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodesPolicy {
    /// Keep only nodes referenced by an edge, plus unresolved sources.
    Participating,
    /// Keep every indexed node.
    All,
}

pub struct Writer<'a> {
    client: &'a LlmClient,
    sink: &'a dyn RunSink,
}

impl<'a> Writer<'a> {
    pub fn new(client: &'a LlmClient, sink: &'a dyn RunSink) -> Self {
        Self { client, sink }
    }

    /// Collapse duplicate edges under the set-semantics key.
    fn dedupe_edges(graph: &mut ScriptGraph) {
        let mut seen = HashSet::new();
        graph.retain_edges(|e| seen.insert(e.dedupe_key()));
    }

    fn validate(&self, graph: &ScriptGraph) {
        let nodes: HashSet<&str> = graph.nodes().collect();
        for e in graph.edges() {
            if !nodes.contains(e.src.as_str()) {
                self.sink
                    .log("WARN", &format!("edge src not in nodes: {}", e.src));
            }
            if !nodes.contains(e.dst.as_str()) {
                self.sink
                    .log("WARN", &format!("edge dst not in nodes: {}", e.dst));
            }
        }
    }

    fn apply_nodes_policy(snap: &mut GraphSnapshot, policy: NodesPolicy) {
        if policy == NodesPolicy::All {
            return;
        }
        let mut keep: HashSet<String> = HashSet::new();
        for e in snap.graph.edges() {
            keep.insert(e.src.clone());
            keep.insert(e.dst.clone());
        }
        for u in &snap.unresolved {
            keep.insert(u.src.clone());
        }
        snap.graph.retain_nodes(|p| keep.contains(p));
    }

    pub async fn run(
        &self,
        ctx: &RoleContext,
        out_dir: &Path,
        snap: &mut GraphSnapshot,
        policy: NodesPolicy,
    ) -> Result<()> {
        Self::dedupe_edges(&mut snap.graph);
        self.validate(&snap.graph);
        Self::apply_nodes_policy(snap, policy);

        write_artifacts(
            &ctx.root,
            out_dir,
            &snap.graph,
            &snap.coverage,
            &snap.unresolved,
            Some(self.sink),
        )?;

        if self.client.is_live() {
            self.write_summary_bullets(out_dir, snap).await;
        }
        Ok(())
    }

    /// Optional human-readable bullets; failures are logged and ignored.
    async fn write_summary_bullets(&self, out_dir: &Path, snap: &GraphSnapshot) {
        let summary = serde_json::json!({
            "nodes": snap.graph.node_count(),
            "edges": snap.graph.edge_count(),
            "unresolved": snap.unresolved.len(),
        })
        .to_string();
        match self.client.chat(WRITER_PROMPT, &summary).await {
            Ok((content, _meta)) => {
                if let Err(err) = fs::write(out_dir.join("report.md"), content.trim()) {
                    self.sink
                        .log("WARN", &format!("failed to write report.md: {err}"));
                }
            }
            Err(err) => {
                self.sink
                    .log("WARN", &format!("writer summary failed: {err}"));
            }
        }
    }
}
