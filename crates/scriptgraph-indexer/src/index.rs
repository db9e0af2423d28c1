//! Recursive bundle crawl and the candidate-target allow-list

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use scriptgraph_core::{LanguageTag, canon, is_windows_bundle};

use crate::error::IndexError;

/// Suffixes that classify a file as a script.
pub const SCRIPT_EXTENSIONS: &[&str] = &["sh", "bash", "ksh", "bat", "cmd", "ps1", "pl", "py"];

/// True iff the path's suffix is a known script extension.
pub fn is_script_path(path: &str) -> bool {
    let lower = path.to_lowercase();
    SCRIPT_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{ext}")))
}

/// One indexed script file, path in its on-disk case.
#[derive(Debug, Clone)]
pub struct IndexedFile {
    pub path: String,
    pub lang: LanguageTag,
    pub size: u64,
}

/// The bundle's file inventory.
#[derive(Debug, Clone)]
pub struct FileIndex {
    root: PathBuf,
    windowsish: bool,
    files: Vec<IndexedFile>,
}

impl FileIndex {
    /// Crawl the bundle with the default suffix set.
    pub fn scan(root: &Path) -> Result<Self, IndexError> {
        let exts: Vec<String> = SCRIPT_EXTENSIONS.iter().map(|s| s.to_string()).collect();
        Self::scan_with(root, &exts)
    }

    /// Crawl the bundle, keeping files whose suffix is in `include_ext`.
    ///
    /// Hidden files are included and gitignore rules disabled: a bundle
    /// is analyzed data, not a working tree.
    pub fn scan_with(root: &Path, include_ext: &[String]) -> Result<Self, IndexError> {
        std::fs::read_dir(root).map_err(|source| IndexError::RootUnreadable {
            root: root.to_path_buf(),
            source,
        })?;
        let include: BTreeSet<String> = include_ext
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();

        let mut files = Vec::new();
        let walker = WalkBuilder::new(root)
            .hidden(false)
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false)
            .build();
        for entry in walker {
            let Ok(entry) = entry else { continue };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(root) else {
                continue;
            };
            let rel = canon(&rel.to_string_lossy());
            let ext = rel.rsplit('.').next().unwrap_or("").to_lowercase();
            if !include.contains(&ext) {
                continue;
            }
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            files.push(IndexedFile {
                lang: LanguageTag::from_path(&rel),
                path: rel,
                size,
            });
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(FileIndex {
            windowsish: is_windows_bundle(root),
            root: root.to_path_buf(),
            files,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn windowsish(&self) -> bool {
        self.windowsish
    }

    pub fn files(&self) -> &[IndexedFile] {
        &self.files
    }

    /// Build the case-aware allow-list of candidate targets.
    pub fn allow_list(&self) -> AllowList {
        let set: BTreeSet<String> = self.files.iter().map(|f| f.path.clone()).collect();
        let lower = set.iter().map(|p| p.to_lowercase()).collect();
        AllowList {
            windowsish: self.windowsish,
            set,
            lower,
        }
    }
}

/// The set of canonical relative paths a resolved edge may point at.
#[derive(Debug, Clone)]
pub struct AllowList {
    windowsish: bool,
    set: BTreeSet<String>,
    lower: BTreeSet<String>,
}

impl AllowList {
    /// Case-aware membership: exact on POSIX bundles, folded on Windows.
    pub fn contains(&self, path: &str) -> bool {
        self.set.contains(path) || (self.windowsish && self.lower.contains(&path.to_lowercase()))
    }

    /// All allowed paths, sorted.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.set.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}
