//! Planner: builds the prioritized Read Manifest

use anyhow::Result;
use scriptgraph_ai::{LlmClient, PlannerReply, parse_reply, prompt::PLANNER_PROMPT};
use scriptgraph_core::{LlmCallRecord, RunSink, canon_case, load_seeds, snip};
use scriptgraph_indexer::FileIndex;

use crate::RoleContext;
use crate::budget::Budget;
use crate::manifest::{DEFAULT_PEEK, PlannedFile, ReadManifest, ReadPolicy};

/// Basenames that seed the worklist as likely entry points.
const ENTRY_BASENAMES: &[&str] = &["run.sh", "run.cmd", "run.bat", "start.cmd", "main.bat"];
/// Basenames that get elevated read priority.
const PRIORITY_BASENAMES: &[&str] = &["run.sh", "main.bat", "start.cmd"];

/// Worklist size cap: a planner shouldn't create a huge list.
const WORKLIST_CAP: usize = 200;

pub struct Planner<'a> {
    client: &'a LlmClient,
    sink: &'a dyn RunSink,
}

impl<'a> Planner<'a> {
    pub fn new(client: &'a LlmClient, sink: &'a dyn RunSink) -> Self {
        Self { client, sink }
    }

    fn basename(path: &str) -> &str {
        path.rsplit('/').next().unwrap_or(path)
    }

    /// Seeds ∪ entry points ∪ sources of dynamic-unresolved baseline
    /// edges, optionally re-ranked by the LLM. Only existing paths survive.
    async fn build_worklist(
        &self,
        ctx: &RoleContext,
        files: &[String],
        windowsish: bool,
    ) -> Vec<String> {
        // Map case-folded path → on-disk path so worklist entries always
        // match manifest paths.
        let by_fold: std::collections::HashMap<String, &String> = files
            .iter()
            .map(|f| (canon_case(f, windowsish), f))
            .collect();
        let resolve = |p: &str| by_fold.get(&canon_case(p, windowsish)).map(|f| (*f).clone());

        fn push(wl: &mut Vec<String>, p: String) {
            if !wl.contains(&p) {
                wl.push(p);
            }
        }
        let mut worklist: Vec<String> = Vec::new();

        for seed in load_seeds(&ctx.root) {
            if let Some(f) = resolve(&seed) {
                push(&mut worklist, f);
            }
        }
        for f in files {
            if ENTRY_BASENAMES.contains(&Self::basename(f).to_lowercase().as_str()) {
                push(&mut worklist, f.clone());
            }
        }
        let dynamic_unresolved: Vec<(&str, &str)> = ctx
            .baseline
            .edges()
            .filter(|e| e.dynamic && !e.resolved)
            .map(|e| (e.src.as_str(), e.command.as_str()))
            .collect();
        for (src, _) in &dynamic_unresolved {
            if let Some(f) = resolve(src) {
                push(&mut worklist, f);
            }
        }

        if self.client.is_live() && !dynamic_unresolved.is_empty() {
            let ordered = self.reorder_with_llm(&dynamic_unresolved).await;
            let ordered: Vec<String> = ordered.iter().filter_map(|s| resolve(s)).collect();
            if !ordered.is_empty() {
                let rest: Vec<String> = worklist
                    .iter()
                    .filter(|p| !ordered.contains(*p))
                    .cloned()
                    .collect();
                worklist = ordered;
                worklist.extend(rest);
            }
        }

        worklist.truncate(WORKLIST_CAP);
        worklist
    }

    async fn reorder_with_llm(&self, unresolved: &[(&str, &str)]) -> Vec<String> {
        let items: Vec<serde_json::Value> = unresolved
            .iter()
            .take(40)
            .map(|(src, command)| serde_json::json!({"src": src, "command": command}))
            .collect();
        let user = serde_json::json!({ "unresolved": items }).to_string();
        match self.client.chat(PLANNER_PROMPT, &user).await {
            Ok((content, meta)) => {
                let reply: PlannerReply = parse_reply(&content);
                self.sink.log_llm(LlmCallRecord {
                    role: "planner".to_string(),
                    model: meta.model,
                    endpoint: meta.endpoint,
                    prompt_chars: user.len(),
                    input_tokens: meta.prompt_tokens,
                    output_tokens: meta.completion_tokens,
                    total_tokens: meta.total_tokens,
                    latency_ms: meta.latency_ms,
                    status: "ok".to_string(),
                    targets_count: reply.worklist.len(),
                    reasoning: Some(snip(&reply.reasoning, 500).to_string()),
                    ..Default::default()
                });
                reply.worklist
            }
            Err(err) => {
                self.sink.log_llm(LlmCallRecord {
                    role: "planner".to_string(),
                    status: format!("error:{err}"),
                    ..Default::default()
                });
                Vec::new()
            }
        }
    }

    pub async fn run(&self, ctx: &RoleContext, budget: Budget) -> Result<ReadManifest> {
        let index = FileIndex::scan(&ctx.root)?;
        let windowsish = index.windowsish();
        let files: Vec<String> = index.files().iter().map(|f| f.path.clone()).collect();

        let seeds = load_seeds(&ctx.root);
        let seed_folds: std::collections::HashSet<String> = seeds
            .iter()
            .map(|s| canon_case(s, windowsish))
            .collect();

        let worklist = self.build_worklist(ctx, &files, windowsish).await;

        let planned: Vec<PlannedFile> = files
            .iter()
            .map(|f| {
                let base = Self::basename(f).to_lowercase();
                let priority = if seed_folds.contains(&canon_case(f, windowsish)) {
                    500
                } else if PRIORITY_BASENAMES.contains(&base.as_str()) {
                    100
                } else {
                    10
                };
                PlannedFile {
                    path: f.clone(),
                    priority,
                    peek: DEFAULT_PEEK,
                }
            })
            .collect();

        self.sink.log(
            "INFO",
            &format!(
                "Planner: indexed {} files; worklist={} budget={:?}",
                planned.len(),
                worklist.len(),
                budget
            ),
        );

        Ok(ReadManifest {
            files: planned,
            policy: ReadPolicy::default(),
            budget,
            worklist,
        })
    }
}
