//! Per-language static call-site parsers
//!
//! Each parser is a factory: regexes compile once in `new()` and the
//! parser is reused across files. Parsers emit [`ScriptEdge`] records
//! with raw (unexpanded) destinations; resolution happens downstream.

pub mod batch;
pub mod perl;
pub mod powershell;
pub mod python;
pub mod shell;

use std::sync::OnceLock;

use regex::Regex;
use scriptgraph_core::{ScriptEdge, strip_quotes};

/// A static parser for one language family.
pub trait ScriptParser: Send + Sync {
    /// Extract call edges from one file. `src` is the canonical relative
    /// path recorded on each edge; `text` is the decoded file content.
    fn parse(&self, src: &str, text: &str) -> Vec<ScriptEdge>;
}

/// Strip whole-line comments starting with `#` or `//`.
pub fn strip_comments(line: &str) -> &str {
    let t = line.trim_start();
    if t.starts_with('#') || t.starts_with("//") {
        ""
    } else {
        line
    }
}

/// Shared plausibility filter: a token can be a target iff it has a path
/// separator, a known script suffix, or is a pure variable reference.
pub fn plausible_target(tok: &str) -> bool {
    static VAR_REF: OnceLock<Regex> = OnceLock::new();
    let var_ref = VAR_REF.get_or_init(|| {
        Regex::new(
            r"^(\$[A-Za-z_][A-Za-z0-9_]*|\$\{[A-Za-z_][A-Za-z0-9_]*\}|%[A-Za-z_][A-Za-z0-9_]*%|![A-Za-z_][A-Za-z0-9_]*!)$",
        )
        .unwrap()
    });
    let t = strip_quotes(tok);
    if t.is_empty() {
        return false;
    }
    if t.contains('/') || t.contains('\\') || crate::index::is_script_path(t) {
        return true;
    }
    var_ref.is_match(t)
}
