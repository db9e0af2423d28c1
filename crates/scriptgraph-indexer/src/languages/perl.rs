//! Perl static parser

use regex::Regex;
use scriptgraph_core::{EdgeKind, ScriptEdge};

use super::{ScriptParser, strip_comments};

pub struct PerlParser {
    call: Regex,
    dynamic: Regex,
}

impl PerlParser {
    pub fn new() -> Self {
        Self {
            // system("…") / exec("…") with a literal ending in a script suffix
            call: Regex::new(r#"(?:system|exec)\s*\(\s*['"]([^'"]+\.(?:sh|pl|bat|cmd|ps1))['"]"#)
                .unwrap(),
            dynamic: Regex::new(r"\$[A-Za-z_]|`|\$\(").unwrap(),
        }
    }
}

impl Default for PerlParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptParser for PerlParser {
    fn parse(&self, src: &str, text: &str) -> Vec<ScriptEdge> {
        let mut edges = Vec::new();
        for raw in text.lines() {
            let line = strip_comments(raw.trim_end_matches('\r'));
            if line.trim().is_empty() {
                continue;
            }
            let dynamic = self.dynamic.is_match(line);
            for caps in self.call.captures_iter(line) {
                edges.push(ScriptEdge {
                    src: src.to_string(),
                    dst: caps[1].to_string(),
                    kind: EdgeKind::Call,
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
