//! ScriptGraph Core — graph data model, path canonicalization, and export

pub mod bundle;
pub mod export;
pub mod graph;
pub mod model;
pub mod paths;
pub mod runlog;


pub use bundle::{is_windows_bundle, load_seeds};
pub use export::{Coverage, Unresolved, import_graph_yaml, render_dot, render_yaml, write_artifacts};
pub use graph::ScriptGraph;
pub use model::{EdgeKind, LanguageTag, ScriptEdge};
pub use paths::{canon, canon_case, join_rel, parent_dir, snip, strip_quotes};
pub use runlog::{LlmCallRecord, MemorySink, RunSink, SinkEvent, TracingSink};
