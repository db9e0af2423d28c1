//! Reader: re-scans the manifest's files into an Observation Batch

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};
use std::fs;

use regex::Regex;
use scriptgraph_ai::{LlmClient, ReaderReply, Redactor, parse_reply, prompt::READER_PROMPT};
use scriptgraph_core::{EdgeKind, LanguageTag, LlmCallRecord, RunSink, canon, snip, strip_quotes};
use scriptgraph_indexer::languages::{batch::BatchParser, plausible_target};

use crate::RoleContext;
use crate::manifest::ReadManifest;
use crate::observation::{CallSite, EnvVar, FileMeta, ObservationBatch};
use crate::ps_join::JoinPathEvaluator;

pub struct Reader<'a> {
    client: &'a LlmClient,
    sink: &'a dyn RunSink,
    log_prompts: bool,
    redactor: &'a Redactor,
    rx_env_sh: Regex,
    rx_call_sh: Regex,
    rx_call_sh_var: Regex,
    rx_call_sh_interp_var: Regex,
    rx_dyn_sh: Regex,
    rx_ps_assign_str: Regex,
    rx_call_ps1: Regex,
    rx_dyn_ps1: Regex,
    rx_safe_val: Regex,
    batch: BatchParser,
    joins: JoinPathEvaluator,
}

impl<'a> Reader<'a> {
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
            // conservative value grammar; command substitutions rejected below
            rx_env_sh: Regex::new(
                r#"(?m)^\s*(?:export\s+)?([A-Za-z_][A-Za-z0-9_]*)\s*=\s*["']?([A-Za-z0-9_./${}-]+)["']?\s*$"#,
            )
            .unwrap(),
            rx_call_sh: Regex::new(
                r"(?P<kind>(?:\.|source|bash|sh|ksh|python|python3|perl)\s+)(?P<target>[^\s;]+)",
            )
            .unwrap(),
            rx_call_sh_var: Regex::new(
                r#"^\s*(?P<target>["']?\$[A-Za-z_][A-Za-z0-9_]*(?:/[^\s;]*)?["']?)(?:\s|$)"#,
            )
            .unwrap(),
            rx_call_sh_interp_var: Regex::new(
                r#"^\s*\$[A-Za-z_][A-Za-z0-9_]*\s+(?P<target>["']?\$[A-Za-z_][A-Za-z0-9_]*["']?)"#,
            )
            .unwrap(),
            rx_dyn_sh: Regex::new(r"\$\{?[A-Za-z_][A-Za-z0-9_]*\}?|`|\$\(|\beval\b").unwrap(),
            rx_ps_assign_str: Regex::new(
                r#"^\s*\$([A-Za-z_]\w*)\s*=\s*['"]([A-Za-z0-9_./\\-]+)['"]\s*$"#,
            )
            .unwrap(),
            rx_call_ps1: Regex::new(r"(?:(?:^|\s)\.\s+(?P<dot>\S+)|(?:^|\s)&\s*(?P<amp>\S+))")
                .unwrap(),
            rx_dyn_ps1: Regex::new(
                r"\$[A-Za-z_]\w*|\$\(|Join-Path|Resolve-Path|Invoke-Expression",
            )
            .unwrap(),
            rx_safe_val: Regex::new(r"^[A-Za-z0-9_./-]+$").unwrap(),
            batch: BatchParser::new(),
            joins: JoinPathEvaluator::new(),
        }
    }

    /// Manifest order: worklist membership, then priority descending,
    /// then path, enforcing `max_files`.
    fn ordered_files(manifest: &ReadManifest) -> Vec<&crate::manifest::PlannedFile> {
        let wl: HashSet<&str> = manifest.worklist.iter().map(String::as_str).collect();
        let mut files: Vec<_> = manifest.files.iter().collect();
        files.sort_by_key(|f| {
            (
                if wl.contains(f.path.as_str()) { 0 } else { 1 },
                Reverse(f.priority),
                f.path.clone(),
            )
        });
        if manifest.budget.max_files > 0 {
            files.truncate(manifest.budget.max_files);
        }
        files
    }

    fn peek_text(ctx: &RoleContext, path: &str, peek: usize) -> String {
        match fs::read(ctx.root.join(path)) {
            Ok(mut bytes) => {
                bytes.truncate(peek);
                String::from_utf8_lossy(&bytes).into_owned()
            }
            Err(_) => String::new(),
        }
    }

    async fn llm_hints(&self, src: &str, text: &str) -> BTreeMap<String, String> {
        let snippet = self.redactor.redact(snip(text, 4000));
        let user = serde_json::json!({"source": src, "snippet": snippet}).to_string();
        match self.client.chat(READER_PROMPT, &user).await {
            Ok((content, meta)) => {
                let reply: ReaderReply = parse_reply(&content);
                let hints: BTreeMap<String, String> = reply
                    .hints
                    .into_iter()
                    .filter_map(|(k, v)| {
                        let vv = strip_quotes(&v).to_string();
                        (!k.is_empty() && self.rx_safe_val.is_match(&vv)).then_some((k, vv))
                    })
                    .collect();
                self.sink.log_llm(LlmCallRecord {
                    role: "reader".to_string(),
                    model: meta.model,
                    endpoint: meta.endpoint,
                    prompt_chars: user.len(),
                    input_tokens: meta.prompt_tokens,
                    output_tokens: meta.completion_tokens,
                    total_tokens: meta.total_tokens,
                    latency_ms: meta.latency_ms,
                    status: "ok".to_string(),
                    src: Some(src.to_string()),
                    command_snippet: Some("reader-hints".to_string()),
                    targets_count: hints.len(),
                    reasoning: Some(snip(&reply.reasoning, 500).to_string()),
                });
                if self.log_prompts {
                    self.sink.log_prompt("reader", snip(&user, 4000));
                }
                hints
            }
            Err(err) => {
                self.sink.log_llm(LlmCallRecord {
                    role: "reader".to_string(),
                    status: format!("error:{err}"),
                    src: Some(src.to_string()),
                    ..Default::default()
                });
                BTreeMap::new()
            }
        }
    }

    fn read_shell(&self, rel: &str, text: &str, out: &mut ObservationBatch) {
        for caps in self.rx_env_sh.captures_iter(text) {
            let value = &caps[2];
            if value.contains('(') || value.contains('`') {
                continue;
            }
            out.env_vars.push(EnvVar {
                scope: rel.to_string(),
                name: caps[1].to_string(),
                value: value.to_string(),
                precedence: 10,
            });
        }

        for caps in self.rx_call_sh.captures_iter(text) {
            let full = caps.get(0).unwrap().as_str().trim();
            let target = &caps["target"];
            if !plausible_target(target) {
                continue;
            }
            let kind_raw = caps["kind"].trim_start();
            let kind = if kind_raw.starts_with('.') || kind_raw.starts_with("source") {
                EdgeKind::Source
            } else {
                EdgeKind::Call
            };
            out.call_sites.push(CallSite {
                src: rel.to_string(),
                raw_target: target.to_string(),
                command: full.to_string(),
                kind,
                dynamic: self.rx_dyn_sh.is_match(full),
                confidence: 0.7,
            });
        }

        for line in text.lines() {
            // $INTERP "$TARGET": interpreter and target both variables
            if let Some(caps) = self.rx_call_sh_interp_var.captures(line) {
                let target = &caps["target"];
                if plausible_target(target) {
                    out.call_sites.push(CallSite {
                        src: rel.to_string(),
                        raw_target: target.to_string(),
                        command: line.trim().to_string(),
                        kind: EdgeKind::Call,
                        dynamic: true,
                        confidence: 0.7,
                    });
                }
            }
            // "$VAR" or "$VAR/path" at line start
            if let Some(caps) = self.rx_call_sh_var.captures(line) {
                let target = &caps["target"];
                if plausible_target(target) {
                    out.call_sites.push(CallSite {
                        src: rel.to_string(),
                        raw_target: target.to_string(),
                        command: line.trim().to_string(),
                        kind: EdgeKind::Call,
                        dynamic: true,
                        confidence: 0.7,
                    });
                }
            }
        }
    }

    fn read_cmd(&self, rel: &str, text: &str, out: &mut ObservationBatch) {
        let scan = self.batch.scan(rel, text);
        for (name, value) in scan.env_vars {
            out.env_vars.push(EnvVar {
                scope: rel.to_string(),
                name,
                value,
                precedence: 10,
            });
        }
        for edge in scan.edges {
            out.call_sites.push(CallSite {
                src: rel.to_string(),
                raw_target: edge.dst,
                command: edge.command,
                kind: edge.kind,
                dynamic: edge.dynamic,
                confidence: 0.7,
            });
        }
    }

    fn read_powershell(&self, rel: &str, text: &str, out: &mut ObservationBatch) {
        let mut locals: BTreeMap<String, String> = BTreeMap::new();
        for line in text.lines() {
            if let Some(caps) = self.rx_ps_assign_str.captures(line) {
                let value = canon(strip_quotes(&caps[2]));
                locals.insert(caps[1].to_string(), value.clone());
                out.env_vars.push(EnvVar {
                    scope: rel.to_string(),
                    name: caps[1].to_string(),
                    value,
                    precedence: 10,
                });
                continue;
            }
            if let Some((dest, a, b)) = self.joins.captures(line) {
                let (Some(a1), Some(b1)) =
                    (self.joins.token(a, &locals), self.joins.token(b, &locals))
                else {
                    continue;
                };
                let value = self.joins.join(&a1, &b1);
                locals.insert(dest.to_string(), value.clone());
                out.env_vars.push(EnvVar {
                    scope: rel.to_string(),
                    name: dest.to_string(),
                    value,
                    precedence: 9,
                });
            }
        }

        for caps in self.rx_call_ps1.captures_iter(text) {
            let full = caps.get(0).unwrap().as_str().trim();
            let (target, kind) = match (caps.name("dot"), caps.name("amp")) {
                (Some(m), _) => (m.as_str(), EdgeKind::Source),
                (None, Some(m)) => (m.as_str(), EdgeKind::Call),
                _ => continue,
            };
            if !plausible_target(target) {
                continue;
            }
            let dynamic =
                strip_quotes(target).starts_with('$') || self.rx_dyn_ps1.is_match(full);
            out.call_sites.push(CallSite {
                src: rel.to_string(),
                raw_target: target.to_string(),
                command: full.to_string(),
                kind,
                dynamic,
                confidence: 0.7,
            });
        }
    }

    pub async fn run(&self, ctx: &RoleContext, manifest: &ReadManifest) -> ObservationBatch {
        let mut out = ObservationBatch::default();
        let ordered = Self::ordered_files(manifest);
        let total = ordered.len();
        let use_hints = manifest.policy.llm_reader_hints && self.client.is_live();

        for (i, file) in ordered.iter().enumerate() {
            let rel = file.path.as_str();
            let lang = LanguageTag::from_path(rel);
            let text = Self::peek_text(ctx, rel, file.peek);
            let size = fs::metadata(ctx.root.join(rel)).map(|m| m.len()).unwrap_or(0);
            out.files.push(FileMeta {
                path: rel.to_string(),
                lang,
                size,
            });
            if i % 10 == 0 || i + 1 == total {
                self.sink
                    .log("INFO", &format!("Reader: {}/{} files peeked", i + 1, total));
            }

            match lang {
                LanguageTag::Sh => {
                    self.read_shell(rel, &text, &mut out);
                    if use_hints && !text.trim().is_empty() {
                        for (name, value) in self.llm_hints(rel, &text).await {
                            out.env_vars.push(EnvVar {
                                scope: rel.to_string(),
                                name,
                                value,
                                precedence: 5,
                            });
                        }
                    }
                }
                LanguageTag::Cmd => self.read_cmd(rel, &text, &mut out),
                LanguageTag::Ps1 => self.read_powershell(rel, &text, &mut out),
                // py/pl covered by the static scan; nothing scoped to read here
                _ => {}
            }
        }
        out
    }
}
