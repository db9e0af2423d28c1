//! Python static parser using tree-sitter
//!
//! Walks the expression tree (no execution) looking for calls to
//! `run`, `Popen`, `call`, or `system`, then pulls script-suffixed
//! tokens out of the first argument (string literal or list of
//! literals).

use scriptgraph_core::{EdgeKind, ScriptEdge};
use tree_sitter::Node;

use super::ScriptParser;

const SHELL_EXTS: &[&str] = &[".sh", ".bash", ".ksh", ".cmd", ".bat", ".ps1"];
const SPAWN_FNS: &[&str] = &["run", "Popen", "call", "system"];

pub struct PythonParser;

impl PythonParser {
    pub fn new() -> Self {
        Self
    }

    /// The trailing name of the callable: `subprocess.run` → `run`.
    fn callee_name<'a>(node: Node<'_>, source: &'a [u8]) -> Option<&'a str> {
        let func = node.child_by_field_name("function")?;
        let name_node = match func.kind() {
            "attribute" => func.child_by_field_name("attribute")?,
            "identifier" => func,
            _ => return None,
        };
        name_node.utf8_text(source).ok()
    }

    /// Literal content of a string node, prefix and quotes excluded.
    fn string_content(node: Node<'_>, source: &[u8]) -> String {
        let mut cursor = node.walk();
        let mut out = String::new();
        for child in node.children(&mut cursor) {
            if child.kind() == "string_content" {
                if let Ok(text) = child.utf8_text(source) {
                    out.push_str(text);
                }
            }
        }
        out
    }

    /// Render the first call argument as a command string, if literal.
    fn first_arg_command(node: Node<'_>, source: &[u8]) -> Option<String> {
        let args = node.child_by_field_name("arguments")?;
        let mut cursor = args.walk();
        let first = args.named_children(&mut cursor).next()?;
        match first.kind() {
            "string" => Some(Self::string_content(first, source)),
            "list" => {
                let mut cursor = first.walk();
                let parts: Vec<String> = first
                    .named_children(&mut cursor)
                    .filter(|c| c.kind() == "string")
                    .map(|c| Self::string_content(c, source))
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join(" "))
                }
            }
            _ => None,
        }
    }

    fn collect_calls(node: Node<'_>, source: &[u8], commands: &mut Vec<String>) {
        if node.kind() == "call" {
            if let Some(name) = Self::callee_name(node, source) {
                if SPAWN_FNS.contains(&name) {
                    if let Some(cmd) = Self::first_arg_command(node, source) {
                        commands.push(cmd);
                    }
                }
            }
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            Self::collect_calls(child, source, commands);
        }
    }
}

impl Default for PythonParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptParser for PythonParser {
    fn parse(&self, src: &str, text: &str) -> Vec<ScriptEdge> {
        let mut parser = tree_sitter::Parser::new();
        if parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .is_err()
        {
            return Vec::new();
        }
        let Some(tree) = parser.parse(text, None) else {
            return Vec::new();
        };

        let mut commands = Vec::new();
        Self::collect_calls(tree.root_node(), text.as_bytes(), &mut commands);

        let mut edges = Vec::new();
        for cmd in commands {
            for tok in cmd.split_whitespace() {
                let lower = tok.to_lowercase();
                if SHELL_EXTS.iter().any(|ext| lower.ends_with(ext)) {
                    edges.push(ScriptEdge {
                        src: src.to_string(),
                        dst: tok.to_string(),
                        kind: EdgeKind::Call,
                        command: cmd.clone(),
                        dynamic: false,
                        resolved: true,
                        confidence: 0.9,
                        reason: None,
                    });
                }
            }
        }
        edges
    }
}
