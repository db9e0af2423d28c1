//! Core data structures for the script dependency graph

use std::fmt;

use serde::{Deserialize, Serialize};

/// How one script references another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// Plain invocation (`call x.cmd`, `bash x.sh`, `& x.ps1`).
    Call,
    /// Dot-sourcing into the caller's scope (`. x.sh`, `source x.sh`).
    Source,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Call => write!(f, "call"),
            EdgeKind::Source => write!(f, "source"),
        }
    }
}

/// Language classification by file suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageTag {
    Sh,
    Cmd,
    Ps1,
    Py,
    Pl,
    Other,
}

impl LanguageTag {
    /// Detect language from a (relative) path's extension.
    pub fn from_path(path: &str) -> Self {
        let lower = path.to_lowercase();
        match lower.rsplit('.').next() {
            Some("sh") | Some("bash") | Some("ksh") => LanguageTag::Sh,
            Some("bat") | Some("cmd") => LanguageTag::Cmd,
            Some("ps1") => LanguageTag::Ps1,
            Some("py") => LanguageTag::Py,
            Some("pl") => LanguageTag::Pl,
            _ => LanguageTag::Other,
        }
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LanguageTag::Sh => "sh",
            LanguageTag::Cmd => "cmd",
            LanguageTag::Ps1 => "ps1",
            LanguageTag::Py => "py",
            LanguageTag::Pl => "pl",
            LanguageTag::Other => "other",
        };
        write!(f, "{s}")
    }
}

/// A single invocation edge between two scripts.
///
/// `dst` may still be a raw variable token (`$TARGET`, `%D%/x.cmd`) for
/// dynamic edges that have not been resolved yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptEdge {
    pub src: String,
    pub dst: String,
    pub kind: EdgeKind,
    pub command: String,
    pub dynamic: bool,
    pub resolved: bool,
    pub confidence: f32,
    pub reason: Option<String>,
}

impl ScriptEdge {
    /// Set-semantics identity used by the exporter's dedupe pass.
    pub fn dedupe_key(&self) -> (String, String, EdgeKind, String, bool, bool) {
        (
            self.src.clone(),
            self.dst.clone(),
            self.kind,
            self.command.clone(),
            self.dynamic,
            self.resolved,
        )
    }
}
