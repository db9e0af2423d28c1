//! Static graph builder: crawl, parse, assemble the baseline graph

use std::fs;
use std::path::Path;

use scriptgraph_core::{Coverage, LanguageTag, ScriptGraph, canon_case, write_artifacts};

use crate::error::IndexError;
use crate::index::{FileIndex, SCRIPT_EXTENSIONS};
use crate::languages::{
    ScriptParser, batch::BatchParser, perl::PerlParser, powershell::PowerShellParser,
    python::PythonParser, shell::ShellParser,
};

/// Holds one instance of each language parser so regexes compile once.
pub struct Scanner {
    include_ext: Vec<String>,
    shell: ShellParser,
    batch: BatchParser,
    powershell: PowerShellParser,
    perl: PerlParser,
    python: PythonParser,
}

impl Scanner {
    pub fn new() -> Self {
        let exts = SCRIPT_EXTENSIONS.iter().map(|s| s.to_string()).collect();
        Self::with_extensions(exts)
    }

    pub fn with_extensions(include_ext: Vec<String>) -> Self {
        Self {
            include_ext,
            shell: ShellParser::new(),
            batch: BatchParser::new(),
            powershell: PowerShellParser::new(),
            perl: PerlParser::new(),
            python: PythonParser::new(),
        }
    }

    fn parser_for(&self, lang: LanguageTag) -> Option<&dyn ScriptParser> {
        match lang {
            LanguageTag::Sh => Some(&self.shell),
            LanguageTag::Cmd => Some(&self.batch),
            LanguageTag::Ps1 => Some(&self.powershell),
            LanguageTag::Pl => Some(&self.perl),
            LanguageTag::Py => Some(&self.python),
            LanguageTag::Other => None,
        }
    }

    /// Build the static baseline graph for a bundle.
    ///
    /// Every indexed file becomes a node. A file that fails to read or
    /// parse is skipped; the scan continues.
    pub fn scan(&self, root: &Path) -> Result<ScriptGraph, IndexError> {
        let index = FileIndex::scan_with(root, &self.include_ext)?;
        let windows = index.windowsish();
        let mut graph = ScriptGraph::new();

        for file in index.files() {
            let src = canon_case(&file.path, windows);
            graph.add_node(&src);
            let Some(parser) = self.parser_for(file.lang) else {
                continue;
            };
            let bytes = match fs::read(root.join(&file.path)) {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::debug!(path = %file.path, %err, "skipping unreadable file");
                    continue;
                }
            };
            let text = String::from_utf8_lossy(&bytes);
            for mut edge in parser.parse(&file.path, &text) {
                edge.src = src.clone();
                edge.dst = canon_case(&edge.dst, windows);
                graph.add_edge(edge);
            }
        }
        tracing::info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "static scan finished"
        );
        Ok(graph)
    }

    /// Static-only pipeline: scan and emit artifacts in the same shape
    /// the agent pipeline produces.
    pub fn scan_to_artifacts(&self, root: &Path, out_dir: &Path) -> anyhow::Result<ScriptGraph> {
        let graph = self.scan(root)?;
        let coverage = Coverage {
            touched: graph.node_count(),
            total: graph.node_count(),
        };
        write_artifacts(root, out_dir, &graph, &coverage, &[], None)?;
        Ok(graph)
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}
