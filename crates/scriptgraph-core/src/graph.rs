//! Graph wrapper using petgraph::StableDiGraph keyed by canonical path

use std::collections::HashMap;

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};

use crate::model::ScriptEdge;
use crate::paths::canon;

/// Node payload: the canonical bundle-relative path of a script file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptNode {
    pub path: String,
}

/// The script dependency graph.
///
/// Nodes are keyed by canonical path; edges keep their endpoint strings
/// in the weight so insertion order and raw-token destinations survive
/// round trips. Edge iteration order is insertion order.
#[derive(Debug, Clone, Default)]
pub struct ScriptGraph {
    inner: StableDiGraph<ScriptNode, ScriptEdge>,
    index: HashMap<String, NodeIndex>,
}

impl ScriptGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, canonicalizing the path. Idempotent.
    pub fn add_node(&mut self, path: &str) -> NodeIndex {
        let key = canon(path);
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.inner.add_node(ScriptNode { path: key.clone() });
        self.index.insert(key, idx);
        idx
    }

    /// Add an edge; both endpoints are canonicalized and ensured as nodes.
    pub fn add_edge(&mut self, mut edge: ScriptEdge) -> EdgeIndex {
        edge.src = canon(&edge.src);
        edge.dst = canon(&edge.dst);
        let a = self.add_node(&edge.src);
        let b = self.add_node(&edge.dst);
        self.inner.add_edge(a, b, edge)
    }

    pub fn has_node(&self, path: &str) -> bool {
        self.index.contains_key(&canon(path))
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Node paths in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.inner
            .node_indices()
            .filter_map(move |idx| self.inner.node_weight(idx))
            .map(|n| n.path.as_str())
    }

    /// Node paths sorted lexicographically, for deterministic export.
    pub fn sorted_nodes(&self) -> Vec<String> {
        let mut v: Vec<String> = self.nodes().map(str::to_string).collect();
        v.sort();
        v
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &ScriptEdge> {
        self.inner
            .edge_indices()
            .filter_map(move |idx| self.inner.edge_weight(idx))
    }

    /// Drop edges failing the predicate, preserving the order of the rest.
    pub fn retain_edges<F>(&mut self, mut keep: F)
    where
        F: FnMut(&ScriptEdge) -> bool,
    {
        let doomed: Vec<EdgeIndex> = self
            .inner
            .edge_indices()
            .filter(|&i| self.inner.edge_weight(i).is_some_and(|e| !keep(e)))
            .collect();
        for idx in doomed {
            self.inner.remove_edge(idx);
        }
    }

    /// Drop nodes failing the predicate. Incident edges are removed too,
    /// so callers filter edges first.
    pub fn retain_nodes<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        let doomed: Vec<String> = self
            .nodes()
            .filter(|p| !keep(p))
            .map(str::to_string)
            .collect();
        for path in doomed {
            if let Some(idx) = self.index.remove(&path) {
                self.inner.remove_node(idx);
            }
        }
    }
}
