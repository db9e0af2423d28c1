//! Sequential pipeline driver for the two operational modes

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;

use anyhow::Result;
use scriptgraph_ai::{LlmClient, Redactor};
use scriptgraph_core::{RunSink, ScriptGraph, load_seeds, write_artifacts};
use scriptgraph_indexer::FileIndex;

use crate::RoleContext;
use crate::budget::{Budget, BudgetTracker};
use crate::manifest::{DEFAULT_PEEK, PlannedFile, ReadManifest, ReadPolicy};
use crate::mapper::Mapper;
use crate::observation::GraphSnapshot;
use crate::planner::Planner;
use crate::reader::Reader;
use crate::writer::{NodesPolicy, Writer};

/// Which role chain drives the run. Both yield the same artifact shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineMode {
    /// Reader → Mapper.
    TwoRole,
    /// Planner → Reader → Mapper → Writer.
    FourRole,
}

impl std::fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineMode::TwoRole => write!(f, "2R"),
            PipelineMode::FourRole => write!(f, "4R"),
        }
    }
}

impl FromStr for PipelineMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "2R" => Ok(PipelineMode::TwoRole),
            "4R" => Ok(PipelineMode::FourRole),
            other => anyhow::bail!("unknown pipeline mode: {other} (expected 2R or 4R)"),
        }
    }
}

pub struct AgentRunner<'a> {
    mode: PipelineMode,
    client: &'a LlmClient,
    sink: &'a dyn RunSink,
    log_prompts: bool,
    use_llm_reader_hints: bool,
    redactor: Redactor,
}

impl<'a> AgentRunner<'a> {
    pub fn new(mode: PipelineMode, client: &'a LlmClient, sink: &'a dyn RunSink) -> Self {
        Self {
            mode,
            client,
            sink,
            log_prompts: false,
            use_llm_reader_hints: false,
            redactor: Redactor::default(),
        }
    }

    pub fn with_privacy(mut self, log_prompts: bool, redactor: Redactor) -> Self {
        self.log_prompts = log_prompts;
        self.redactor = redactor;
        self
    }

    pub fn with_reader_hints(mut self, enabled: bool) -> Self {
        self.use_llm_reader_hints = enabled;
        self
    }

    /// Two-role mode plans trivially: every file at default peek, seeds
    /// at priority 500, no worklist.
    fn flat_manifest(&self, root: &Path, budget: Budget) -> Result<ReadManifest> {
        let index = FileIndex::scan(root)?;
        let seeds = load_seeds(root);
        let files = index
            .files()
            .iter()
            .map(|f| PlannedFile {
                path: f.path.clone(),
                priority: if seeds.contains(&f.path) { 500 } else { 10 },
                peek: DEFAULT_PEEK,
            })
            .collect();
        Ok(ReadManifest {
            files,
            policy: ReadPolicy::default(),
            budget,
            worklist: Vec::new(),
        })
    }

    /// Drive the pipeline over `root` with `baseline` as the static
    /// graph (may be empty). Emits artifacts into `out_dir` and returns
    /// the final snapshot.
    pub async fn run(
        &self,
        root: &Path,
        baseline: ScriptGraph,
        out_dir: &Path,
    ) -> Result<GraphSnapshot> {
        let ctx = RoleContext {
            root: root.to_path_buf(),
            baseline,
        };
        let budget = Budget::from_env();
        let mut latencies: BTreeMap<String, u64> = BTreeMap::new();
        let run_started = Instant::now();

        let reader = Reader::new(self.client, self.sink, self.log_prompts, &self.redactor);
        let mapper = Mapper::new(self.client, self.sink, self.log_prompts, &self.redactor);
        let mut tracker = BudgetTracker::new(budget.clone());

        let mut manifest = match self.mode {
            PipelineMode::FourRole => {
                let planner = Planner::new(self.client, self.sink);
                let t0 = Instant::now();
                let mut manifest = planner.run(&ctx, budget.clone()).await?;
                manifest.policy.llm_reader_hints = self.use_llm_reader_hints;
                let ms = t0.elapsed().as_millis() as u64;
                latencies.insert("Planner".to_string(), ms);
                self.sink.log_phase("Planner", ms);
                manifest
            }
            PipelineMode::TwoRole => self.flat_manifest(root, budget.clone())?,
        };

        let t0 = Instant::now();
        let obs = reader.run(&ctx, &manifest).await;
        let ms = t0.elapsed().as_millis() as u64;
        latencies.insert("Reader".to_string(), ms);
        self.sink.log_phase("Reader", ms);

        let t0 = Instant::now();
        let mut snap = mapper.run(&ctx, &obs, &mut tracker).await?;
        let ms = t0.elapsed().as_millis() as u64;
        latencies.insert("Mapper".to_string(), ms);
        self.sink.log_phase("Mapper", ms);

        // Bounded re-loop: promote unresolved sources to a deeper peek.
        if !snap.unresolved.is_empty() && manifest.budget.max_loops > 0 {
            manifest.budget.max_loops -= 1;
            let promote: HashSet<String> =
                snap.unresolved.iter().map(|u| u.src.clone()).collect();
            manifest.promote(&promote);

            let t0 = Instant::now();
            let obs2 = reader.run(&ctx, &manifest).await;
            let ms = t0.elapsed().as_millis() as u64;
            latencies.insert("Reader_loop2".to_string(), ms);
            self.sink.log_phase("Reader_loop2", ms);

            let t0 = Instant::now();
            snap = mapper.run(&ctx, &obs2, &mut tracker).await?;
            let ms = t0.elapsed().as_millis() as u64;
            latencies.insert("Mapper_loop2".to_string(), ms);
            self.sink.log_phase("Mapper_loop2", ms);
        }

        match self.mode {
            PipelineMode::FourRole => {
                let writer = Writer::new(self.client, self.sink);
                let t0 = Instant::now();
                writer
                    .run(&ctx, out_dir, &mut snap, NodesPolicy::Participating)
                    .await?;
                let ms = t0.elapsed().as_millis() as u64;
                latencies.insert("Writer".to_string(), ms);
                self.sink.log_phase("Writer", ms);
            }
            PipelineMode::TwoRole => {
                write_artifacts(
                    &ctx.root,
                    out_dir,
                    &snap.graph,
                    &snap.coverage,
                    &snap.unresolved,
                    Some(self.sink),
                )?;
            }
        }

        latencies.insert(
            "total".to_string(),
            run_started.elapsed().as_millis() as u64,
        );
        crate::stats::write_run_stats(out_dir, &self.mode.to_string(), &latencies, &snap)?;

        self.sink.log(
            "INFO",
            &format!(
                "agents {} finished; nodes={} edges={} unresolved={} tool_calls={}",
                self.mode,
                snap.graph.node_count(),
                snap.graph.edge_count(),
                snap.unresolved.len(),
                tracker.tool_calls()
            ),
        );
        Ok(snap)
    }
}
