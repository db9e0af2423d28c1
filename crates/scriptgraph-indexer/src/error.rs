//! Indexing errors

use std::path::PathBuf;

/// The only failure that escapes a pipeline phase: the bundle root
/// itself cannot be read. Everything else degrades per file.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("cannot read bundle root {root}: {source}")]
    RootUnreadable {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
