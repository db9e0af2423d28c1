//! Batch/CMD static parser
//!
//! CMD is order-sensitive: `set` mutations and FOR-loop bindings on
//! earlier lines affect expansion on later lines of the same file. The
//! scan keeps two tables — `env` (names upper-cased) and loop tokens —
//! and expands `%%X`, `!VAR!` and `%VAR%` to a fixed point in at most
//! four passes.

use std::collections::BTreeMap;

use regex::Regex;
use scriptgraph_core::{EdgeKind, ScriptEdge, strip_quotes};

use super::{ScriptParser, plausible_target, strip_comments};

/// Result of one order-sensitive pass over a CMD file.
#[derive(Debug, Default)]
pub struct BatchScan {
    pub edges: Vec<ScriptEdge>,
    /// Every `set NAME=value` event in file order, value fully expanded.
    pub env_vars: Vec<(String, String)>,
}

pub struct BatchParser {
    set_re: Regex,
    for_re: Regex,
    call_re: Regex,
    dyn_re: Regex,
    loop_tok: Regex,
}

impl BatchParser {
    pub fn new() -> Self {
        Self {
            // `set NAME=value` up to `&` or end of line; never matches `setlocal`.
            set_re: Regex::new(r"(?i)\bset\s+([A-Za-z_][A-Za-z0-9_]*)=(.+?)\s*(?:&|$)").unwrap(),
            for_re: Regex::new(r"(?i)\bfor\s+%%([A-Za-z])\s+in\s*\(([^)]+)\)").unwrap(),
            call_re: Regex::new(r"(?i)\b(call|start)\s+([^\s&]+)").unwrap(),
            dyn_re: Regex::new(r"%[A-Za-z_][A-Za-z0-9_]*%|![A-Za-z_][A-Za-z0-9_]*!").unwrap(),
            loop_tok: Regex::new(r"%%([A-Za-z])").unwrap(),
        }
    }

    /// Expand a CMD expression against the current tables:
    /// `%%F` → loop binding, `!VAR!` → delayed, `%VAR%` → immediate.
    fn expand_value(
        &self,
        s: &str,
        env: &[(String, String)],
        loop_vars: &BTreeMap<char, String>,
    ) -> String {
        let mut out = strip_quotes(s).to_string();
        for _ in 0..4 {
            let prev = out.clone();
            out = self
                .loop_tok
                .replace_all(&out, |caps: &regex::Captures<'_>| {
                    let key = caps[1].chars().next().unwrap().to_ascii_uppercase();
                    loop_vars
                        .get(&key)
                        .cloned()
                        .unwrap_or_else(|| caps[0].to_string())
                })
                .into_owned();
            for (name, value) in env {
                let vv = strip_quotes(value);
                out = out
                    .replace(&format!("%{name}%"), vv)
                    .replace(&format!("!{name}!"), vv);
            }
            if out == prev {
                break;
            }
        }
        out.replace('\\', "/")
    }

    /// Scan one file top-to-bottom, producing call edges and expanded
    /// `set` events.
    pub fn scan(&self, src: &str, text: &str) -> BatchScan {
        let mut result = BatchScan::default();
        // Assignment order matters for expansion; names stored upper-cased.
        let mut env: Vec<(String, String)> = Vec::new();
        let mut loop_vars: BTreeMap<char, String> = BTreeMap::new();

        for raw in text.lines() {
            let line = strip_comments(raw.trim_end_matches('\r'));
            if line.trim().is_empty() {
                continue;
            }

            if let Some(caps) = self.for_re.captures(line) {
                let var = caps[1].chars().next().unwrap().to_ascii_uppercase();
                loop_vars.insert(var, strip_quotes(&caps[2]).to_string());
            }

            for caps in self.set_re.captures_iter(line) {
                let name = caps[1].to_uppercase();
                let value = self.expand_value(&caps[2], &env, &loop_vars);
                match env.iter_mut().find(|(n, _)| *n == name) {
                    Some(slot) => slot.1 = value.clone(),
                    None => env.push((name.clone(), value.clone())),
                }
                result.env_vars.push((name, value));
            }

            let dynamic = self.dyn_re.is_match(line);
            for caps in self.call_re.captures_iter(line) {
                let target = &caps[2];
                if !plausible_target(target) {
                    continue;
                }
                result.edges.push(ScriptEdge {
                    src: src.to_string(),
                    dst: strip_quotes(target).to_string(),
                    kind: EdgeKind::Call,
                    command: caps[0].trim().to_string(),
                    dynamic,
                    resolved: !dynamic,
                    confidence: if dynamic { 0.5 } else { 0.9 },
                    reason: None,
                });
            }
        }
        result
    }
}

impl Default for BatchParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptParser for BatchParser {
    fn parse(&self, src: &str, text: &str) -> Vec<ScriptEdge> {
        self.scan(src, text).edges
    }
}
