//! Reader output and the resolver's result snapshot

use scriptgraph_core::{Coverage, EdgeKind, LanguageTag, ScriptGraph, Unresolved};

/// File metadata observed during the read pass.
#[derive(Debug, Clone)]
pub struct FileMeta {
    pub path: String,
    pub lang: LanguageTag,
    pub size: u64,
}

/// One variable binding, scoped to the file it appears in. Higher
/// precedence wins within a scope.
#[derive(Debug, Clone)]
pub struct EnvVar {
    pub scope: String,
    pub name: String,
    pub value: String,
    pub precedence: i32,
}

/// One observed invocation, target still unexpanded.
#[derive(Debug, Clone)]
pub struct CallSite {
    pub src: String,
    pub raw_target: String,
    pub command: String,
    pub kind: EdgeKind,
    pub dynamic: bool,
    pub confidence: f32,
}

/// Bundle-scoped observations, in stable parse order.
#[derive(Debug, Clone, Default)]
pub struct ObservationBatch {
    pub files: Vec<FileMeta>,
    pub env_vars: Vec<EnvVar>,
    pub call_sites: Vec<CallSite>,
}

/// The Mapper's result: final graph plus diagnostics.
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    pub graph: ScriptGraph,
    pub unresolved: Vec<Unresolved>,
    pub coverage: Coverage,
}
