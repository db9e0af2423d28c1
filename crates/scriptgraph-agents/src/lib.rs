//! Role-based resolution pipeline: Planner → Reader → Mapper → Writer

pub mod budget;
pub mod manifest;
pub mod mapper;
pub mod observation;
pub mod planner;
mod ps_join;
pub mod reader;
pub mod runner;
pub mod stats;
pub mod writer;

#[cfg(test)]
mod tests;

use std::path::PathBuf;

use scriptgraph_core::ScriptGraph;

pub use budget::{Budget, BudgetTracker};
pub use manifest::{DEFAULT_PEEK, PROMOTED_PEEK, PlannedFile, ReadManifest, ReadPolicy};
pub use observation::{CallSite, EnvVar, FileMeta, GraphSnapshot, ObservationBatch};
pub use runner::{AgentRunner, PipelineMode};
pub use writer::NodesPolicy;

/// Inputs shared by every role: the bundle root and the static baseline
/// graph (possibly empty in two-role runs without a prior scan).
#[derive(Debug, Clone)]
pub struct RoleContext {
    pub root: PathBuf,
    pub baseline: ScriptGraph,
}
