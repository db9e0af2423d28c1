//! Shell (sh/bash/ksh) static parser

use regex::Regex;
use scriptgraph_core::{EdgeKind, ScriptEdge, strip_quotes};

use super::{ScriptParser, strip_comments};

pub struct ShellParser {
    call: Regex,
    var_hint: Regex,
}

impl ShellParser {
    pub fn new() -> Self {
        // Accept literal paths and $VAR/ or ${VAR}/ prefixes; quotes optional.
        let call = Regex::new(
            r#"(?x)
            (?:
              (?:bash|sh|ksh)\s+
              (?P<path1>["']?(?:\$\{?[A-Za-z_][A-Za-z0-9_]*\}?/)?[\w./-]+\.(?:sh|bash|ksh)["']?)
            )
            |
            (?:
              (?:\.|source)\s+
              (?P<path2>["']?(?:\$\{?[A-Za-z_][A-Za-z0-9_]*\}?/)?[\w./-]+\.(?:sh|bash|ksh)["']?)
            )
            |
            (?P<path3>["']?(?:\./)?[\w./-]+\.(?:sh|bash|ksh)["']?)
            "#,
        )
        .unwrap();
        let var_hint = Regex::new(r"\$\{?[A-Za-z_][A-Za-z0-9_]*\}?").unwrap();
        Self { call, var_hint }
    }

    fn destinations<'a>(&self, line: &'a str) -> Vec<&'a str> {
        let mut outs = Vec::new();
        for caps in self.call.captures_iter(line) {
            let m = caps
                .name("path1")
                .or_else(|| caps.name("path2"))
                .or_else(|| caps.name("path3"));
            let Some(m) = m else { continue };
            // Skip right-hand sides of assignments like FOO=./x.sh.
            let mut before = line[..m.start()].chars().rev();
            let prev = match before.next() {
                Some(c) if c == '"' || c == '\'' => before.next(),
                other => other,
            };
            if prev == Some('=') {
                continue;
            }
            outs.push(strip_quotes(m.as_str()));
        }
        outs
    }
}

impl Default for ShellParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptParser for ShellParser {
    fn parse(&self, src: &str, text: &str) -> Vec<ScriptEdge> {
        let mut edges = Vec::new();
        for raw in text.lines() {
            let line = strip_comments(raw.trim_end_matches('\r'));
            if line.trim().is_empty() {
                continue;
            }
            let dynamic = self.var_hint.is_match(line)
                || line.contains('`')
                || line.contains("$(")
                || line.contains("eval");
            let trimmed = line.trim_start();
            let kind = if trimmed.starts_with(". ") || trimmed.starts_with("source ") {
                EdgeKind::Source
            } else {
                EdgeKind::Call
            };
            for dst in self.destinations(line) {
                edges.push(ScriptEdge {
                    src: src.to_string(),
                    dst: dst.to_string(),
                    kind,
                    command: line.to_string(),
                    dynamic,
                    resolved: !dynamic,
                    confidence: if dynamic { 0.5 } else { 0.9 },
                    reason: None,
                });
            }
        }
        edges
    }
}
