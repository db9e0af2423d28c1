//! PowerShell static parser

use regex::Regex;
use scriptgraph_core::{EdgeKind, ScriptEdge, strip_quotes};

use super::{ScriptParser, strip_comments};

pub struct PowerShellParser {
    call: Regex,
    dotsrc: Regex,
    dynamic: Regex,
}

impl PowerShellParser {
    pub fn new() -> Self {
        Self {
            // & "./x.ps1", ./x.ps1, . .\x.ps1 (dot-sourcing)
            call: Regex::new(r#"(?:&\s+)?['"]?([\w./\\-]+\.ps1)['"]?"#).unwrap(),
            dotsrc: Regex::new(r#"^\s*\.\s+['"]?([\w./\\-]+\.ps1)['"]?"#).unwrap(),
            dynamic: Regex::new(
                r"\$[A-Za-z_][A-Za-z0-9_]*|\$\(|Join-Path|Resolve-Path|Invoke-Expression",
            )
            .unwrap(),
        }
    }
}

impl Default for PowerShellParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptParser for PowerShellParser {
    fn parse(&self, src: &str, text: &str) -> Vec<ScriptEdge> {
        let mut edges = Vec::new();
        for raw in text.lines() {
            let line = strip_comments(raw.trim_end_matches('\r'));
            if line.trim().is_empty() {
                continue;
            }
            let dynamic = self.dynamic.is_match(line);
            let kind = if self.dotsrc.is_match(line) {
                EdgeKind::Source
            } else {
                EdgeKind::Call
            };
            for caps in self.call.captures_iter(line) {
                edges.push(ScriptEdge {
                    src: src.to_string(),
                    dst: strip_quotes(&caps[1]).to_string(),
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
