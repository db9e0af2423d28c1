//! Mapper: merges observations with the static baseline and resolves
//! call sites against the allow-list
//!
//! Resolution order for a dynamic site: LLM pass constrained to the
//! allow-list, an observation-augmented retry, then heuristic variable
//! substitution. The resolver is conservative: no allow-list hit, no
//! edge.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::Result;
use regex::Regex;
use scriptgraph_ai::{LlmClient, MapperReply, Redactor, parse_reply, prompt::MAPPER_PROMPT};
use scriptgraph_core::{
    Coverage, EdgeKind, LlmCallRecord, RunSink, ScriptEdge, ScriptGraph, Unresolved, canon,
    canon_case, join_rel, parent_dir, snip, strip_quotes,
};
use scriptgraph_indexer::{AllowList, FileIndex, is_script_path};

use crate::RoleContext;
use crate::budget::BudgetTracker;
use crate::observation::{CallSite, EnvVar, GraphSnapshot, ObservationBatch};
use crate::ps_join::JoinPathEvaluator;

/// Command prefixes accepted by the static carry-over filter.
const ACCEPTED_PREFIXES: &[&str] = &[
    ". ", "source ", "& ", "call ", "start ", "bash ", "sh ", "ksh ", "python ", "python3 ",
    "perl ",
];

/// Per-directory cap on candidate listings shipped to the LLM.
const DIR_LISTING_CAP: usize = 50;

pub struct Mapper<'a> {
    client: &'a LlmClient,
    sink: &'a dyn RunSink,
    log_prompts: bool,
    redactor: &'a Redactor,
    direct_call: Regex,
    var_prefix: Regex,
    dir_literal: Regex,
    joins: JoinPathEvaluator,
}

/// Read-only resolution state shared across all call sites of one run.
struct ResolveState<'a> {
    root: &'a Path,
    windowsish: bool,
    allow: AllowList,
    allowed_paths: Vec<String>,
    /// fold(src) → statically dot-sourced destinations.
    static_sources: HashMap<String, Vec<String>>,
    /// src → locally observed dot-source call sites.
    source_calls: HashMap<String, Vec<CallSite>>,
    obs: &'a ObservationBatch,
}

impl<'a> ResolveState<'a> {
    fn fold(&self, p: &str) -> String {
        canon_case(p, self.windowsish)
    }

    fn has_entries_under(&self, dir: &str) -> bool {
        let prefix = format!("{dir}/");
        self.allow.paths().any(|p| p == dir || p.starts_with(&prefix))
    }
}

/// Case-insensitive literal replace; falls back to exact replace when
/// lowercasing would shift byte offsets (non-ASCII input).
fn replace_ci(hay: &str, needle: &str, rep: &str) -> String {
    if needle.is_empty() || !hay.is_ascii() || !needle.is_ascii() {
        return hay.replace(needle, rep);
    }
    let hay_l = hay.to_lowercase();
    let needle_l = needle.to_lowercase();
    let mut out = String::new();
    let mut i = 0;
    while let Some(pos) = hay_l[i..].find(&needle_l) {
        let at = i + pos;
        out.push_str(&hay[i..at]);
        out.push_str(rep);
        i = at + needle.len();
    }
    out.push_str(&hay[i..]);
    out
}

impl<'a> Mapper<'a> {
    pub fn new(
        client: &'a LlmClient,
        sink: &'a dyn RunSink,
        log_prompts: bool,
        redactor: &'a Redactor,
    ) -> Self {
        Self {
            client,
            sink,
            log_prompts,
            redactor,
            // direct script invocations: ./x.sh, x.sh, utils/x.sh, "utils/x.sh"
            direct_call: Regex::new(
                r#"(?i)^["']?(?:\./|\.\./|/)?[\w./-]+\.(?:sh|bash|ksh|bat|cmd|ps1|pl|py)(?:\s|["']?$)"#,
            )
            .unwrap(),
            var_prefix: Regex::new(r"\$\{?([A-Za-z_][A-Za-z0-9_]*)\}?/").unwrap(),
            dir_literal: Regex::new(r"([A-Za-z0-9_.-]+/)").unwrap(),
            joins: JoinPathEvaluator::new(),
        }
    }

    /// Five-pass fixed-point substitution: `%NAME%` and `!NAME!`
    /// case-insensitively, `${NAME}` and `$NAME` exactly.
    fn subst(&self, s: &str, env: &BTreeMap<String, String>) -> String {
        let mut out = strip_quotes(s).to_string();
        for _ in 0..5 {
            let prev = out.clone();
            for (name, value) in env {
                let vv = strip_quotes(value);
                out = replace_ci(&out, &format!("%{name}%"), vv);
                out = replace_ci(&out, &format!("!{name}!"), vv);
                out = out.replace(&format!("${{{name}}}"), vv);
                out = out.replace(&format!("${name}"), vv);
            }
            if out == prev {
                break;
            }
        }
        canon(&out)
    }

    /// Variable bindings for one scope, strongest first, stable.
    fn pairs_for<'b>(&self, st: &'b ResolveState<'_>, scope: &str) -> Vec<&'b EnvVar> {
        let fold = st.fold(scope);
        let mut pairs: Vec<&EnvVar> = st
            .obs
            .env_vars
            .iter()
            .filter(|v| st.fold(&v.scope) == fold)
            .collect();
        pairs.sort_by_key(|v| Reverse(v.precedence));
        pairs
    }

    /// Resolve a dot-sourced target with local substitution and
    /// caller-relative lookup. Works without a static baseline.
    fn resolve_sourced_target(
        &self,
        st: &ResolveState<'_>,
        src: &str,
        raw: &str,
    ) -> Option<String> {
        let mut local_env: BTreeMap<String, String> = BTreeMap::new();
        for v in st.obs.env_vars.iter().filter(|v| v.scope == src) {
            local_env.insert(v.name.clone(), v.value.clone());
        }
        let cand1 = self.subst(raw, &local_env);
        for tok in [cand1, canon(strip_quotes(raw))] {
            if tok.is_empty() {
                continue;
            }
            if st.allow.contains(&tok) {
                return Some(tok);
            }
            let rel = join_rel(parent_dir(src), &tok);
            if st.allow.contains(&rel) {
                return Some(rel);
            }
        }
        None
    }

    /// Scoped variable environment for `src`:
    /// 1. local bindings, higher precedence first;
    /// 2. one-hop fill-missing from statically dot-sourced files;
    /// 3. one-hop fill-missing from observed non-dynamic dot-sources;
    /// 4. `Join-Path` post-processing for PowerShell sources.
    fn env_for(&self, st: &ResolveState<'_>, src: &str) -> BTreeMap<String, String> {
        fn fill(env: &mut BTreeMap<String, String>, pairs: Vec<&EnvVar>) {
            for v in pairs {
                if !v.name.is_empty() && !v.value.is_empty() && !env.contains_key(&v.name) {
                    env.insert(v.name.clone(), v.value.clone());
                }
            }
        }
        let mut env: BTreeMap<String, String> = BTreeMap::new();

        fill(&mut env, self.pairs_for(st, src));

        if let Some(targets) = st.static_sources.get(&st.fold(src)) {
            for t in targets {
                fill(&mut env, self.pairs_for(st, t));
            }
        }

        if let Some(sites) = st.source_calls.get(src) {
            for cs in sites {
                if cs.dynamic {
                    continue;
                }
                if let Some(target) = self.resolve_sourced_target(st, src, &cs.raw_target) {
                    fill(&mut env, self.pairs_for(st, &target));
                }
            }
        }

        if src.to_lowercase().ends_with(".ps1") {
            if let Ok(bytes) = fs::read(st.root.join(src)) {
                let text = String::from_utf8_lossy(&bytes);
                self.joins.apply(&text, &mut env);
            }
        }
        env
    }

    /// Carry over baseline static edges whose destination exists and
    /// whose command looks like a real invocation. Filters spurious
    /// parser artifacts before resolution begins.
    fn carry_over(&self, st: &ResolveState<'_>, baseline: &ScriptGraph, g: &mut ScriptGraph) {
        for e in baseline.edges().filter(|e| !e.dynamic) {
            let dst = st.fold(&e.dst);
            if !st.allow.contains(&dst) {
                continue;
            }
            let cmd = e.command.trim().to_lowercase();
            if !cmd.is_empty()
                && !ACCEPTED_PREFIXES.iter().any(|p| cmd.starts_with(p))
                && !self.direct_call.is_match(&cmd)
            {
                continue;
            }
            g.add_edge(ScriptEdge {
                src: st.fold(&e.src),
                dst,
                ..e.clone()
            });
        }
    }

    /// Promising base directories for a second-pass dir listing.
    fn extract_dirs(
        &self,
        st: &ResolveState<'_>,
        src: &str,
        raw: &str,
        env: &BTreeMap<String, String>,
    ) -> Vec<String> {
        let mut dirs: BTreeSet<String> = BTreeSet::new();
        let parent = parent_dir(src);
        if !parent.is_empty() && parent != "." {
            dirs.insert(parent.to_string());
        }
        for value in env.values() {
            let v = strip_quotes(value).replace('\\', "/");
            if v.is_empty() {
                continue;
            }
            if v.contains('/') || v.starts_with('.') || st.has_entries_under(&v) {
                dirs.insert(v.trim_end_matches('/').to_string());
            }
        }
        for caps in self.dir_literal.captures_iter(raw) {
            dirs.insert(caps[1].trim_end_matches('/').to_string());
        }
        for caps in self.var_prefix.captures_iter(raw) {
            if let Some(value) = env.get(&caps[1]) {
                dirs.insert(strip_quotes(value).trim_end_matches('/').to_string());
            }
        }
        dirs.into_iter()
            .filter(|d| !d.is_empty() && st.has_entries_under(d))
            .collect()
    }

    fn list_candidates(
        &self,
        st: &ResolveState<'_>,
        dirs: &[String],
    ) -> BTreeMap<String, Vec<String>> {
        let mut out = BTreeMap::new();
        for d in dirs {
            let prefix = format!("{}/", d.trim_end_matches('/'));
            let files: Vec<String> = st
                .allow
                .paths()
                .filter(|p| p.starts_with(&prefix) && is_script_path(p))
                .take(DIR_LISTING_CAP)
                .map(str::to_string)
                .collect();
            if !files.is_empty() {
                out.insert(d.clone(), files);
            }
        }
        out
    }

    /// Observation payload for the second mapper pass: a short source
    /// snippet plus dir listings restricted to promising directories.
    fn make_observations(
        &self,
        st: &ResolveState<'_>,
        src: &str,
        raw: &str,
        env: &BTreeMap<String, String>,
    ) -> serde_json::Value {
        let snippet = fs::read(st.root.join(src))
            .map(|b| snip(&String::from_utf8_lossy(&b), 1000).to_string())
            .unwrap_or_default();
        let dirs = self.extract_dirs(st, src, raw, env);
        serde_json::json!({
            "src_snippet": snippet,
            "dir_listings": self.list_candidates(st, &dirs),
        })
    }

    fn filter_allowed(&self, st: &ResolveState<'_>, reply: &MapperReply) -> Vec<String> {
        reply
            .targets
            .iter()
            .map(|t| canon(strip_quotes(t)))
            .filter(|t| st.allow.contains(t))
            .collect()
    }

    fn log_pass(
        &self,
        meta: Option<scriptgraph_ai::ChatMeta>,
        status: String,
        user: &str,
        src: &str,
        cmd: &str,
        targets: usize,
        why: &str,
    ) {
        let meta = meta.unwrap_or_default();
        self.sink.log_llm(LlmCallRecord {
            role: "mapper".to_string(),
            model: meta.model,
            endpoint: meta.endpoint,
            prompt_chars: user.len(),
            input_tokens: meta.prompt_tokens,
            output_tokens: meta.completion_tokens,
            total_tokens: meta.total_tokens,
            latency_ms: meta.latency_ms,
            status,
            src: Some(src.to_string()),
            command_snippet: Some(snip(cmd, 200).to_string()),
            targets_count: targets,
            reasoning: Some(snip(why, 500).to_string()),
        });
        if self.log_prompts {
            self.sink
                .log_prompt("mapper", &self.redactor.redact(snip(user, 4000)));
        }
    }

    /// LLM pass 1 (allow-list constrained) and pass 2 (observations).
    async fn resolve_with_llm(
        &self,
        st: &ResolveState<'_>,
        src: &str,
        raw: &str,
        cmd: &str,
        env: &BTreeMap<String, String>,
        tracker: &mut BudgetTracker,
    ) -> (Vec<String>, String) {
        let mut targets = Vec::new();
        let mut why = String::new();
        if !self.client.is_live() {
            return (targets, why);
        }

        if tracker.try_tool_call() {
            let user = serde_json::json!({
                "root": st.root.to_string_lossy(),
                "src": src,
                "command": cmd,
                "hints": env,
                "allowed_paths": st.allowed_paths,
            })
            .to_string();
            match self.client.chat(MAPPER_PROMPT, &user).await {
                Ok((content, meta)) => {
                    let reply: MapperReply = parse_reply(&content);
                    targets = self.filter_allowed(st, &reply);
                    why = reply.reasoning.trim().to_string();
                    self.log_pass(
                        Some(meta),
                        "ok".to_string(),
                        &user,
                        src,
                        cmd,
                        targets.len(),
                        &why,
                    );
                }
                Err(err) => {
                    self.log_pass(None, format!("error:{err}"), &user, src, cmd, 0, "");
                }
            }
        }

        if targets.is_empty() && tracker.try_tool_call() {
            let observations = self.make_observations(st, src, raw, env);
            let empty = observations["src_snippet"].as_str().unwrap_or("").is_empty()
                && observations["dir_listings"]
                    .as_object()
                    .is_none_or(|m| m.is_empty());
            if !empty {
                let cmd2 = format!("{cmd} [loop2]");
                let user = serde_json::json!({
                    "root": st.root.to_string_lossy(),
                    "src": src,
                    "command": cmd,
                    "hints": env,
                    "allowed_paths": st.allowed_paths,
                    "observations": observations,
                })
                .to_string();
                match self.client.chat(MAPPER_PROMPT, &user).await {
                    Ok((content, meta)) => {
                        let reply: MapperReply = parse_reply(&content);
                        targets = self.filter_allowed(st, &reply);
                        let why2 = reply.reasoning.trim().to_string();
                        if !why2.is_empty() {
                            why = why2;
                        }
                        self.log_pass(
                            Some(meta),
                            "ok".to_string(),
                            &user,
                            src,
                            &cmd2,
                            targets.len(),
                            &why,
                        );
                    }
                    Err(err) => {
                        self.log_pass(None, format!("error:{err}"), &user, src, &cmd2, 0, "");
                    }
                }
            }
        }
        (targets, why)
    }

    pub async fn run(
        &self,
        ctx: &RoleContext,
        obs: &ObservationBatch,
        tracker: &mut BudgetTracker,
    ) -> Result<GraphSnapshot> {
        let index = FileIndex::scan(&ctx.root)?;
        let windowsish = index.windowsish();
        let allow = index.allow_list();
        let allowed_paths: Vec<String> = allow.paths().map(str::to_string).collect();

        let mut static_sources: HashMap<String, Vec<String>> = HashMap::new();
        for e in ctx.baseline.edges() {
            if !e.dynamic && e.kind == EdgeKind::Source {
                static_sources
                    .entry(canon_case(&e.src, windowsish))
                    .or_default()
                    .push(e.dst.clone());
            }
        }
        let mut source_calls: HashMap<String, Vec<CallSite>> = HashMap::new();
        for cs in &obs.call_sites {
            if cs.kind == EdgeKind::Source {
                source_calls.entry(cs.src.clone()).or_default().push(cs.clone());
            }
        }
        let st = ResolveState {
            root: &ctx.root,
            windowsish,
            allow,
            allowed_paths,
            static_sources,
            source_calls,
            obs,
        };

        let has_static_baseline = ctx.baseline.edges().any(|e| !e.dynamic);
        let mut graph = ScriptGraph::new();
        self.carry_over(&st, &ctx.baseline, &mut graph);

        let mut unresolved: Vec<Unresolved> = Vec::new();
        let mut seen: HashSet<(String, String, EdgeKind)> = HashSet::new();
        let mut resolved_count = 0usize;
        let total = obs.call_sites.len();

        for (idx, cs) in obs.call_sites.iter().enumerate() {
            let src = cs.src.as_str();
            let raw = cs.raw_target.as_str();
            let cmd = if cs.command.is_empty() {
                format!("{} {}", cs.kind, raw)
            } else {
                cs.command.clone()
            };
            let env = self.env_for(&st, src);
            let src_c = st.fold(src);

            if !cs.dynamic {
                if has_static_baseline {
                    // already carried over from the baseline
                    graph.add_node(&src_c);
                } else {
                    self.resolve_static_direct(&st, cs, &env, &cmd, &mut graph, &mut unresolved);
                }
                continue;
            }

            let (mut targets, mut why) = self
                .resolve_with_llm(&st, src, raw, &cmd, &env, tracker)
                .await;

            if targets.is_empty() {
                let t = self.subst(raw, &env);
                if t != canon(strip_quotes(raw)) && st.allow.contains(&t) {
                    targets = vec![t];
                    why = "local var substitution".to_string();
                }
            }

            if targets.is_empty() {
                graph.add_node(&src_c);
                unresolved.push(Unresolved {
                    src: src_c,
                    raw_target: raw.to_string(),
                    reason: "no-targets-from-LLM".to_string(),
                });
            } else {
                resolved_count += 1;
                for t in targets {
                    let dst = st.fold(&t);
                    let key = (src_c.clone(), dst.clone(), cs.kind);
                    if !seen.insert(key) {
                        continue;
                    }
                    graph.add_edge(ScriptEdge {
                        src: src_c.clone(),
                        dst,
                        kind: cs.kind,
                        command: cmd.clone(),
                        dynamic: true,
                        resolved: true,
                        confidence: 0.7,
                        reason: (!why.is_empty()).then(|| why.clone()),
                    });
                }
            }

            if (idx + 1) % 10 == 0 || idx + 1 == total {
                self.sink.log(
                    "INFO",
                    &format!(
                        "Mapper: processed {}/{total}; resolved={resolved_count} unresolved={}",
                        idx + 1,
                        unresolved.len()
                    ),
                );
            }
        }

        let touched: HashSet<&str> = obs.call_sites.iter().map(|c| c.src.as_str()).collect();
        Ok(GraphSnapshot {
            graph,
            unresolved,
            coverage: Coverage {
                touched: touched.len(),
                total: obs.files.len(),
            },
        })
    }

    /// Two-role mode: resolve non-dynamic sites directly since no
    /// baseline carried them over.
    fn resolve_static_direct(
        &self,
        st: &ResolveState<'_>,
        cs: &CallSite,
        env: &BTreeMap<String, String>,
        cmd: &str,
        graph: &mut ScriptGraph,
        unresolved: &mut Vec<Unresolved>,
    ) {
        let src = cs.src.as_str();
        let src_c = st.fold(src);
        let mut candidates: Vec<String> = Vec::new();
        let substituted = self.subst(cs.raw_target.as_str(), env);
        if !substituted.is_empty() && substituted != canon(strip_quotes(&cs.raw_target)) {
            candidates.push(substituted);
        }
        candidates.push(canon(strip_quotes(&cs.raw_target)));

        for t in candidates {
            let hit = if st.allow.contains(&t) {
                Some(t)
            } else {
                let rel = join_rel(parent_dir(src), &t);
                st.allow.contains(&rel).then_some(rel)
            };
            if let Some(dst) = hit {
                graph.add_edge(ScriptEdge {
                    src: src_c,
                    dst: st.fold(&dst),
                    kind: cs.kind,
                    command: cmd.to_string(),
                    dynamic: false,
                    resolved: true,
                    confidence: 0.9,
                    reason: Some("static-direct".to_string()),
                });
                return;
            }
        }
        graph.add_node(&src_c);
        unresolved.push(Unresolved {
            src: src_c,
            raw_target: cs.raw_target.clone(),
            reason: "non-dynamic-unresolved".to_string(),
        });
    }
}
