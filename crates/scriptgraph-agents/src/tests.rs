//! Unit tests for scriptgraph-agents

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use scriptgraph_ai::{LlmClient, Redactor};
use scriptgraph_core::{EdgeKind, MemorySink, ScriptEdge, ScriptGraph};
use tempfile::TempDir;

use crate::RoleContext;
use crate::budget::{Budget, BudgetTracker};
use crate::manifest::{DEFAULT_PEEK, PROMOTED_PEEK, PlannedFile, ReadManifest, ReadPolicy};
use crate::mapper::Mapper;
use crate::observation::{GraphSnapshot, ObservationBatch};
use crate::planner::Planner;
use crate::ps_join::JoinPathEvaluator;
use crate::reader::Reader;
use crate::writer::{NodesPolicy, Writer};

fn bundle(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (path, content) in files {
        let full = dir.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }
    dir
}

fn flat_manifest(root: &Path) -> ReadManifest {
    let index = scriptgraph_indexer::FileIndex::scan(root).unwrap();
    ReadManifest {
        files: index
            .files()
            .iter()
            .map(|f| PlannedFile {
                path: f.path.clone(),
                priority: 10,
                peek: DEFAULT_PEEK,
            })
            .collect(),
        policy: ReadPolicy::default(),
        budget: Budget::default(),
        worklist: Vec::new(),
    }
}

fn ctx(root: &Path, baseline: ScriptGraph) -> RoleContext {
    RoleContext {
        root: root.to_path_buf(),
        baseline,
    }
}

#[test]
fn budget_defaults() {
    let b = Budget::default();
    assert_eq!(b.max_tool_calls, 100);
    assert_eq!(b.max_latency_ms, 60_000);
    assert_eq!(b.max_loops, 1);
    assert_eq!(b.max_files, 60);
}

#[test]
fn budget_env_overrides() {
    unsafe {
        std::env::set_var("MAX_TOOL_CALLS", "7");
        std::env::set_var("MAX_FILES", "3");
    }
    let b = Budget::from_env();
    assert_eq!(b.max_tool_calls, 7);
    assert_eq!(b.max_files, 3);
    assert_eq!(b.max_loops, 1);
    unsafe {
        std::env::remove_var("MAX_TOOL_CALLS");
        std::env::remove_var("MAX_FILES");
    }
}

#[test]
fn tracker_caps_tool_calls() {
    let mut t = BudgetTracker::new(Budget {
        max_tool_calls: 2,
        ..Default::default()
    });
    assert!(t.try_tool_call());
    assert!(t.try_tool_call());
    assert!(!t.try_tool_call());
    assert_eq!(t.tool_calls(), 2);
}

#[test]
fn manifest_promotion_deepens_peek() {
    let mut manifest = ReadManifest {
        files: vec![
            PlannedFile {
                path: "run.sh".to_string(),
                priority: 10,
                peek: DEFAULT_PEEK,
            },
            PlannedFile {
                path: "other.sh".to_string(),
                priority: 10,
                peek: DEFAULT_PEEK,
            },
        ],
        policy: ReadPolicy::default(),
        budget: Budget::default(),
        worklist: Vec::new(),
    };
    let promote: HashSet<String> = ["run.sh".to_string()].into();
    manifest.promote(&promote);
    assert_eq!(manifest.files[0].peek, PROMOTED_PEEK);
    assert_eq!(manifest.files[0].priority, 200);
    assert_eq!(manifest.files[1].peek, DEFAULT_PEEK);
}

#[tokio::test]
async fn planner_prioritizes_seeds_and_entry_points() {
    let dir = bundle(&[
        ("run.sh", "echo hi\n"),
        ("lib/a.sh", "echo a\n"),
        ("lib/b.sh", "echo b\n"),
        ("seeds.txt", ""),
    ]);
    fs::write(dir.path().join("seeds.txt"), "lib/b.sh\n").unwrap();
    let client = LlmClient::disabled();
    let sink = MemorySink::new();
    let planner = Planner::new(&client, &sink);
    let manifest = planner
        .run(&ctx(dir.path(), ScriptGraph::new()), Budget::default())
        .await
        .unwrap();

    let prio: BTreeMap<&str, i32> = manifest
        .files
        .iter()
        .map(|f| (f.path.as_str(), f.priority))
        .collect();
    assert_eq!(prio["lib/b.sh"], 500);
    assert_eq!(prio["run.sh"], 100);
    assert_eq!(prio["lib/a.sh"], 10);
    assert!(manifest.worklist.contains(&"lib/b.sh".to_string()));
    assert!(manifest.worklist.contains(&"run.sh".to_string()));
}

#[tokio::test]
async fn planner_worklist_includes_dynamic_unresolved_sources() {
    let dir = bundle(&[("job.sh", "bash $X/y.sh\n"), ("y.sh", "")]);
    let mut baseline = ScriptGraph::new();
    baseline.add_edge(ScriptEdge {
        src: "job.sh".to_string(),
        dst: "$X/y.sh".to_string(),
        kind: EdgeKind::Call,
        command: "bash $X/y.sh".to_string(),
        dynamic: true,
        resolved: false,
        confidence: 0.5,
        reason: None,
    });
    let client = LlmClient::disabled();
    let sink = MemorySink::new();
    let manifest = Planner::new(&client, &sink)
        .run(&ctx(dir.path(), baseline), Budget::default())
        .await
        .unwrap();
    assert_eq!(manifest.worklist, vec!["job.sh".to_string()]);
}

#[tokio::test]
async fn reader_obeys_worklist_priority_lex_order() {
    let dir = bundle(&[("a.sh", ""), ("b.sh", ""), ("c.sh", ""), ("d.sh", "")]);
    let client = LlmClient::disabled();
    let sink = MemorySink::new();
    let redactor = Redactor::default();
    let reader = Reader::new(&client, &sink, false, &redactor);

    let mut manifest = flat_manifest(dir.path());
    for f in &mut manifest.files {
        if f.path == "c.sh" {
            f.priority = 100;
        }
    }
    manifest.worklist = vec!["d.sh".to_string()];

    let obs = reader.run(&ctx(dir.path(), ScriptGraph::new()), &manifest).await;
    let order: Vec<&str> = obs.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(order, vec!["d.sh", "c.sh", "a.sh", "b.sh"]);
}

#[tokio::test]
async fn reader_enforces_max_files() {
    let dir = bundle(&[("a.sh", ""), ("b.sh", ""), ("c.sh", "")]);
    let client = LlmClient::disabled();
    let sink = MemorySink::new();
    let redactor = Redactor::default();
    let reader = Reader::new(&client, &sink, false, &redactor);

    let mut manifest = flat_manifest(dir.path());
    manifest.budget.max_files = 2;
    let obs = reader.run(&ctx(dir.path(), ScriptGraph::new()), &manifest).await;
    assert_eq!(obs.files.len(), 2);
}

#[tokio::test]
async fn reader_extracts_shell_observations() {
    let text = "BASE=\"./lib\"\nNAME=\"load.sh\"\nTARGET=\"$BASE/$NAME\"\n\"$TARGET\" \"$TARGET\"\n. helpers/env.sh\n";
    let dir = bundle(&[("run.sh", text), ("helpers/env.sh", "")]);
    let client = LlmClient::disabled();
    let sink = MemorySink::new();
    let redactor = Redactor::default();
    let reader = Reader::new(&client, &sink, false, &redactor);
    let obs = reader
        .run(&ctx(dir.path(), ScriptGraph::new()), &flat_manifest(dir.path()))
        .await;

    let names: Vec<&str> = obs
        .env_vars
        .iter()
        .filter(|v| v.scope == "run.sh")
        .map(|v| v.name.as_str())
        .collect();
    assert_eq!(names, vec!["BASE", "NAME", "TARGET"]);
    assert!(obs.env_vars.iter().all(|v| v.precedence == 10));

    let var_site = obs
        .call_sites
        .iter()
        .find(|c| c.raw_target.contains("$TARGET"))
        .expect("variable call site");
    assert!(var_site.dynamic);
    assert_eq!(var_site.kind, EdgeKind::Call);

    let src_site = obs
        .call_sites
        .iter()
        .find(|c| c.raw_target == "helpers/env.sh")
        .expect("dot-source site");
    assert_eq!(src_site.kind, EdgeKind::Source);
    assert!(!src_site.dynamic);
}

#[tokio::test]
async fn reader_rejects_command_substitution_values() {
    let dir = bundle(&[("run.sh", "A=$(date)\nB=`hostname`\nC=./ok\n")]);
    let client = LlmClient::disabled();
    let sink = MemorySink::new();
    let redactor = Redactor::default();
    let reader = Reader::new(&client, &sink, false, &redactor);
    let obs = reader
        .run(&ctx(dir.path(), ScriptGraph::new()), &flat_manifest(dir.path()))
        .await;
    let names: Vec<&str> = obs.env_vars.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["C"]);
}

#[tokio::test]
async fn reader_tracks_cmd_delayed_expansion() {
    let text = "set D=bin\r\nfor %%F in (step.cmd) do set T=!D!\\%%F\r\ncall \"!T!\"\r\n";
    let dir = bundle(&[("Run.cmd", text), ("bin/step.cmd", "")]);
    let client = LlmClient::disabled();
    let sink = MemorySink::new();
    let redactor = Redactor::default();
    let reader = Reader::new(&client, &sink, false, &redactor);
    let obs = reader
        .run(&ctx(dir.path(), ScriptGraph::new()), &flat_manifest(dir.path()))
        .await;

    let t = obs
        .env_vars
        .iter()
        .find(|v| v.name == "T")
        .expect("T binding");
    assert_eq!(t.value, "bin/step.cmd");
    let site = obs.call_sites.iter().find(|c| c.src == "Run.cmd").unwrap();
    assert_eq!(site.raw_target, "!T!");
    assert!(site.dynamic);
}

#[tokio::test]
async fn reader_evaluates_powershell_assignments() {
    let text = "$base = './Lib'\n$m = Join-Path $PSScriptRoot 'Utils.ps1'\n. $m\n";
    let dir = bundle(&[("Run.ps1", text), ("Utils.ps1", "")]);
    let client = LlmClient::disabled();
    let sink = MemorySink::new();
    let redactor = Redactor::default();
    let reader = Reader::new(&client, &sink, false, &redactor);
    let obs = reader
        .run(&ctx(dir.path(), ScriptGraph::new()), &flat_manifest(dir.path()))
        .await;

    let base = obs.env_vars.iter().find(|v| v.name == "base").unwrap();
    assert_eq!(base.value, "Lib");
    assert_eq!(base.precedence, 10);
    let m = obs.env_vars.iter().find(|v| v.name == "m").unwrap();
    assert_eq!(m.value, "Utils.ps1");
    assert_eq!(m.precedence, 9);

    let site = obs
        .call_sites
        .iter()
        .find(|c| c.raw_target == "$m")
        .expect("dot-source site");
    assert_eq!(site.kind, EdgeKind::Source);
    assert!(site.dynamic);
}

#[test]
fn join_path_evaluator_chains_bindings() {
    let joins = JoinPathEvaluator::new();
    let mut env = BTreeMap::new();
    joins.apply(
        "$a = Join-Path $PSScriptRoot 'lib'\n$b = Join-Path $a 'inner.ps1'\n",
        &mut env,
    );
    assert_eq!(env["a"], "lib");
    assert_eq!(env["b"], "lib/inner.ps1");
}

#[tokio::test]
async fn mapper_substitutes_local_variables() {
    let text = "BASE=\"./lib\"\nNAME=\"load.sh\"\nTARGET=\"$BASE/$NAME\"\n\"$TARGET\" \"$TARGET\"\n";
    let dir = bundle(&[("run.sh", text), ("lib/load.sh", "")]);
    let client = LlmClient::disabled();
    let sink = MemorySink::new();
    let redactor = Redactor::default();
    let context = ctx(dir.path(), ScriptGraph::new());
    let reader = Reader::new(&client, &sink, false, &redactor);
    let obs = reader.run(&context, &flat_manifest(dir.path())).await;

    let mapper = Mapper::new(&client, &sink, false, &redactor);
    let mut tracker = BudgetTracker::new(Budget::default());
    let snap = mapper.run(&context, &obs, &mut tracker).await.unwrap();

    let edge = snap
        .graph
        .edges()
        .find(|e| e.dst == "lib/load.sh")
        .expect("resolved edge");
    assert_eq!(edge.src, "run.sh");
    assert!(edge.dynamic);
    assert!(edge.resolved);
    assert_eq!(edge.reason.as_deref(), Some("local var substitution"));
    assert_eq!(tracker.tool_calls(), 0, "disabled client issues no calls");
}

#[tokio::test]
async fn mapper_imports_variables_from_dot_sourced_file() {
    let dir = bundle(&[
        ("a.sh", ". ./b.sh\nbash \"$T\"\n"),
        ("b.sh", "T=lib/load.sh\n"),
        ("lib/load.sh", ""),
    ]);
    let client = LlmClient::disabled();
    let sink = MemorySink::new();
    let redactor = Redactor::default();
    let context = ctx(dir.path(), ScriptGraph::new());
    let reader = Reader::new(&client, &sink, false, &redactor);
    let obs = reader.run(&context, &flat_manifest(dir.path())).await;

    let mapper = Mapper::new(&client, &sink, false, &redactor);
    let mut tracker = BudgetTracker::new(Budget::default());
    let snap = mapper.run(&context, &obs, &mut tracker).await.unwrap();

    assert!(
        snap.graph
            .edges()
            .any(|e| e.src == "a.sh" && e.dst == "lib/load.sh" && e.dynamic && e.resolved),
        "one-hop import should resolve $T"
    );
}

#[tokio::test]
async fn mapper_local_bindings_beat_imported_ones() {
    let dir = bundle(&[
        ("a.sh", ". ./b.sh\nT=lib/mine.sh\nbash \"$T\"\n"),
        ("b.sh", "T=lib/other.sh\n"),
        ("lib/mine.sh", ""),
        ("lib/other.sh", ""),
    ]);
    let client = LlmClient::disabled();
    let sink = MemorySink::new();
    let redactor = Redactor::default();
    let context = ctx(dir.path(), ScriptGraph::new());
    let reader = Reader::new(&client, &sink, false, &redactor);
    let obs = reader.run(&context, &flat_manifest(dir.path())).await;
    let mapper = Mapper::new(&client, &sink, false, &redactor);
    let mut tracker = BudgetTracker::new(Budget::default());
    let snap = mapper.run(&context, &obs, &mut tracker).await.unwrap();

    assert!(snap.graph.edges().any(|e| e.dst == "lib/mine.sh"));
    assert!(!snap.graph.edges().any(|e| e.dst == "lib/other.sh" && e.dynamic));
}

#[tokio::test]
async fn mapper_carry_over_filters_spurious_edges() {
    let dir = bundle(&[("run.sh", ""), ("utils/prep.sh", "")]);
    let mut baseline = ScriptGraph::new();
    // legitimate direct call: kept
    baseline.add_edge(ScriptEdge {
        src: "run.sh".to_string(),
        dst: "utils/prep.sh".to_string(),
        kind: EdgeKind::Call,
        command: "./utils/prep.sh".to_string(),
        dynamic: false,
        resolved: true,
        confidence: 0.9,
        reason: None,
    });
    // destination not indexed: dropped
    baseline.add_edge(ScriptEdge {
        src: "run.sh".to_string(),
        dst: "gone/missing.sh".to_string(),
        kind: EdgeKind::Call,
        command: "bash gone/missing.sh".to_string(),
        dynamic: false,
        resolved: true,
        confidence: 0.9,
        reason: None,
    });
    // command text that is no invocation: dropped
    baseline.add_edge(ScriptEdge {
        src: "run.sh".to_string(),
        dst: "utils/prep.sh".to_string(),
        kind: EdgeKind::Call,
        command: "echo see utils/prep.sh for details".to_string(),
        dynamic: false,
        resolved: true,
        confidence: 0.9,
        reason: None,
    });
    // empty command with existing destination: kept (explicit policy)
    baseline.add_edge(ScriptEdge {
        src: "run.sh".to_string(),
        dst: "utils/prep.sh".to_string(),
        kind: EdgeKind::Source,
        command: String::new(),
        dynamic: false,
        resolved: true,
        confidence: 0.9,
        reason: None,
    });

    let client = LlmClient::disabled();
    let sink = MemorySink::new();
    let redactor = Redactor::default();
    let context = ctx(dir.path(), baseline);
    let mapper = Mapper::new(&client, &sink, false, &redactor);
    let mut tracker = BudgetTracker::new(Budget::default());
    let snap = mapper
        .run(&context, &ObservationBatch::default(), &mut tracker)
        .await
        .unwrap();

    let commands: Vec<&str> = snap.graph.edges().map(|e| e.command.as_str()).collect();
    assert_eq!(commands.len(), 2);
    assert!(commands.contains(&"./utils/prep.sh"));
    assert!(commands.contains(&""));
}

#[tokio::test]
async fn mapper_two_role_resolves_static_sites_directly() {
    let dir = bundle(&[
        ("run.sh", "bash utils/prep.sh\nbash lib/missing.sh\n"),
        ("utils/prep.sh", ""),
    ]);
    let client = LlmClient::disabled();
    let sink = MemorySink::new();
    let redactor = Redactor::default();
    let context = ctx(dir.path(), ScriptGraph::new());
    let reader = Reader::new(&client, &sink, false, &redactor);
    let obs = reader.run(&context, &flat_manifest(dir.path())).await;
    let mapper = Mapper::new(&client, &sink, false, &redactor);
    let mut tracker = BudgetTracker::new(Budget::default());
    let snap = mapper.run(&context, &obs, &mut tracker).await.unwrap();

    let edge = snap
        .graph
        .edges()
        .find(|e| e.dst == "utils/prep.sh")
        .expect("direct static edge");
    assert!(!edge.dynamic);
    assert!(edge.resolved);
    assert_eq!(edge.reason.as_deref(), Some("static-direct"));

    let miss = snap
        .unresolved
        .iter()
        .find(|u| u.raw_target == "lib/missing.sh")
        .expect("unresolved entry");
    assert_eq!(miss.reason, "non-dynamic-unresolved");
}

#[tokio::test]
async fn mapper_leaves_unknown_variables_unresolved() {
    let dir = bundle(&[("run.sh", "$UNKNOWN/foo.sh\n")]);
    let client = LlmClient::disabled();
    let sink = MemorySink::new();
    let redactor = Redactor::default();
    let context = ctx(dir.path(), ScriptGraph::new());
    let reader = Reader::new(&client, &sink, false, &redactor);
    let obs = reader.run(&context, &flat_manifest(dir.path())).await;
    let mapper = Mapper::new(&client, &sink, false, &redactor);
    let mut tracker = BudgetTracker::new(Budget::default());
    let snap = mapper.run(&context, &obs, &mut tracker).await.unwrap();

    assert!(!snap.graph.edges().any(|e| e.resolved && e.dynamic));
    let miss = snap.unresolved.first().expect("unresolved entry");
    assert_eq!(miss.src, "run.sh");
    assert_eq!(miss.raw_target, "$UNKNOWN/foo.sh");
    assert_eq!(miss.reason, "no-targets-from-LLM");
}

#[tokio::test]
async fn writer_dedupes_validates_and_prunes() {
    let dir = bundle(&[("run.sh", ""), ("utils/prep.sh", ""), ("lonely.sh", "")]);
    let mut graph = ScriptGraph::new();
    let edge = ScriptEdge {
        src: "run.sh".to_string(),
        dst: "utils/prep.sh".to_string(),
        kind: EdgeKind::Call,
        command: "bash utils/prep.sh".to_string(),
        dynamic: false,
        resolved: true,
        confidence: 0.9,
        reason: None,
    };
    graph.add_edge(edge.clone());
    graph.add_edge(edge);
    graph.add_node("lonely.sh");

    let mut snap = GraphSnapshot {
        graph,
        unresolved: Vec::new(),
        coverage: scriptgraph_core::Coverage {
            touched: 1,
            total: 3,
        },
    };
    let client = LlmClient::disabled();
    let sink = MemorySink::new();
    let writer = Writer::new(&client, &sink);
    let out = dir.path().join("out");
    writer
        .run(
            &ctx(dir.path(), ScriptGraph::new()),
            &out,
            &mut snap,
            NodesPolicy::Participating,
        )
        .await
        .unwrap();

    assert_eq!(snap.graph.edge_count(), 1, "duplicates collapse");
    assert!(!snap.graph.has_node("lonely.sh"), "participating prunes");
    let yaml = fs::read_to_string(out.join("predicted_graph.yaml")).unwrap();
    assert_eq!(yaml.matches("  - src: run.sh").count(), 1);
    assert!(!yaml.contains("lonely.sh"));
}
