//! Evaluation of simple PowerShell `Join-Path` assignments
//!
//! Handles `$dest = Join-Path A B` where A and B are quoted literals,
//! `$PSScriptRoot` (treated as `.`), or previously bound `$NAME`s.

use std::collections::BTreeMap;

use regex::Regex;
use scriptgraph_core::{canon, strip_quotes};

pub(crate) struct JoinPathEvaluator {
    rx: Regex,
}

impl JoinPathEvaluator {
    pub fn new() -> Self {
        Self {
            rx: Regex::new(r"(?im)^\s*\$([A-Za-z_]\w*)\s*=\s*Join-Path\s+([^\s;]+)\s+([^\s;]+)")
                .unwrap(),
        }
    }

    /// Resolve one operand against the current bindings.
    pub fn token(&self, t: &str, env: &BTreeMap<String, String>) -> Option<String> {
        let t = t.trim();
        if (t.starts_with('\'') || t.starts_with('"'))
            && (t.ends_with('\'') || t.ends_with('"'))
        {
            return Some(canon(strip_quotes(t)));
        }
        if let Some(name) = t.strip_prefix('$') {
            if name.eq_ignore_ascii_case("PSSCRIPTROOT") {
                return Some(".".to_string());
            }
            return env.get(name).cloned();
        }
        Some(canon(t))
    }

    pub fn join(&self, a: &str, b: &str) -> String {
        if a.is_empty() || a == "." {
            canon(b)
        } else {
            canon(&format!(
                "{}/{}",
                a.trim_end_matches('/'),
                b.trim_start_matches('/')
            ))
        }
    }

    /// One assignment on a single line, if present: (dest, a, b).
    pub fn captures<'t>(&self, line: &'t str) -> Option<(&'t str, &'t str, &'t str)> {
        let caps = self.rx.captures(line)?;
        Some((
            caps.get(1).unwrap().as_str(),
            caps.get(2).unwrap().as_str(),
            caps.get(3).unwrap().as_str(),
        ))
    }

    /// Evaluate every Join-Path assignment in `text` against (and into)
    /// `env`. Later assignments see earlier results.
    pub fn apply(&self, text: &str, env: &mut BTreeMap<String, String>) {
        for line in text.lines() {
            let Some((dest, a, b)) = self.captures(line) else {
                continue;
            };
            let (Some(a1), Some(b1)) = (self.token(a, env), self.token(b, env)) else {
                continue;
            };
            env.insert(dest.to_string(), self.join(&a1, &b1));
        }
    }
}
