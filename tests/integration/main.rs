//! End-to-end bundle scenarios
//!
//! Each test builds a small on-disk bundle, runs the static scan plus
//! the role pipeline (LLM disabled), and checks the exported artifacts.

use std::fs;
use std::path::Path;

use scriptgraph_agents::{AgentRunner, PipelineMode};
use scriptgraph_ai::LlmClient;
use scriptgraph_core::{EdgeKind, MemorySink, import_graph_yaml, render_yaml};
use scriptgraph_indexer::Scanner;
use tempfile::TempDir;

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

async fn run_pipeline(
    root: &Path,
    out: &Path,
    mode: PipelineMode,
) -> scriptgraph_agents::GraphSnapshot {
    let client = LlmClient::disabled();
    let sink = MemorySink::new();
    let baseline = Scanner::new().scan(root).unwrap();
    AgentRunner::new(mode, &client, &sink)
        .run(root, baseline, out)
        .await
        .unwrap()
}

#[tokio::test]
async fn linear_direct_call() {
    let dir = bundle(&[
        ("run.sh", "./utils/prep.sh\n"),
        ("utils/prep.sh", "echo prep\n"),
    ]);
    let out = dir.path().join("out");
    let snap = run_pipeline(dir.path(), &out, PipelineMode::FourRole).await;

    let edge = snap
        .graph
        .edges()
        .find(|e| e.src == "run.sh" && e.dst == "utils/prep.sh")
        .expect("static edge");
    assert_eq!(edge.kind, EdgeKind::Call);
    assert!(!edge.dynamic);
    assert!(edge.resolved);
    assert!(snap.unresolved.is_empty());

    let yaml = fs::read_to_string(out.join("predicted_graph.yaml")).unwrap();
    assert!(yaml.contains("    dst: utils/prep.sh\n"));
}

#[tokio::test]
async fn bash_variable_indirection() {
    let dir = bundle(&[
        (
            "run.sh",
            "BASE=\"./lib\"\nNAME=\"load.sh\"\nTARGET=\"$BASE/$NAME\"\n\"$TARGET\" \"$TARGET\"\n",
        ),
        ("lib/load.sh", "echo load\n"),
    ]);
    let out = dir.path().join("out");
    let snap = run_pipeline(dir.path(), &out, PipelineMode::FourRole).await;

    let edge = snap
        .graph
        .edges()
        .find(|e| e.src == "run.sh" && e.dst == "lib/load.sh")
        .expect("dynamic-resolved edge");
    assert!(edge.dynamic);
    assert!(edge.resolved);
    assert!(
        edge.reason
            .as_deref()
            .unwrap_or_default()
            .contains("local var substitution")
    );
}

#[tokio::test]
async fn cmd_delayed_expansion_with_for_loop() {
    let dir = bundle(&[
        (
            "Run.cmd",
            "set D=bin\r\nfor %%F in (step.cmd) do set T=!D!\\%%F\r\ncall \"!T!\"\r\n",
        ),
        ("bin/step.cmd", "echo step\r\n"),
        ("meta.json", r#"{"platform": "windows"}"#),
    ]);
    let out = dir.path().join("out");
    let snap = run_pipeline(dir.path(), &out, PipelineMode::FourRole).await;

    let edge = snap
        .graph
        .edges()
        .find(|e| e.dst == "bin/step.cmd")
        .expect("resolved CMD edge");
    assert_eq!(edge.src, "run.cmd", "windows bundles fold case");
    assert!(edge.dynamic);
    assert!(edge.resolved);

    let yaml = fs::read_to_string(out.join("predicted_graph.yaml")).unwrap();
    assert!(yaml.contains("  - run.cmd\n"));
    assert!(yaml.contains("  - bin/step.cmd\n"));
}

#[tokio::test]
async fn powershell_dot_source_via_join_path() {
    let dir = bundle(&[
        (
            "Run.ps1",
            "$m = Join-Path $PSScriptRoot 'Utils.ps1'\n. $m\n",
        ),
        ("Utils.ps1", "function Get-Thing {}\n"),
    ]);
    let out = dir.path().join("out");
    let snap = run_pipeline(dir.path(), &out, PipelineMode::FourRole).await;

    let edge = snap
        .graph
        .edges()
        .find(|e| e.src == "Run.ps1" && e.dst == "Utils.ps1")
        .expect("dot-source edge");
    assert_eq!(edge.kind, EdgeKind::Source);
    assert!(edge.dynamic);
    assert!(edge.resolved);
}

#[tokio::test]
async fn interpreter_hop_bash_to_python() {
    let dir = bundle(&[
        (
            "run.sh",
            "TARGET=\"./tools/worker.py\"\nINTERP=\"python\"\n$INTERP \"$TARGET\"\n",
        ),
        ("tools/worker.py", "print('work')\n"),
    ]);
    let out = dir.path().join("out");
    let snap = run_pipeline(dir.path(), &out, PipelineMode::FourRole).await;

    let edge = snap
        .graph
        .edges()
        .find(|e| e.src == "run.sh" && e.dst == "tools/worker.py")
        .expect("interpreter-hop edge");
    assert_eq!(edge.kind, EdgeKind::Call);
    assert!(edge.dynamic);
    assert!(edge.resolved);
}

#[tokio::test]
async fn unknown_variable_stays_unresolved() {
    let dir = bundle(&[("run.sh", "$UNKNOWN/foo.sh\n")]);
    let out = dir.path().join("out");
    let snap = run_pipeline(dir.path(), &out, PipelineMode::FourRole).await;

    assert!(
        !snap.graph.edges().any(|e| e.dst.contains("foo.sh") && e.resolved),
        "no edge may be invented"
    );
    let miss = snap
        .unresolved
        .iter()
        .find(|u| u.raw_target == "$UNKNOWN/foo.sh")
        .expect("unresolved diagnostic");
    assert_eq!(miss.src, "run.sh");
    assert_eq!(miss.reason, "no-targets-from-LLM");

    let report = fs::read_to_string(out.join("run_report.json")).unwrap();
    assert!(report.contains("$UNKNOWN/foo.sh"));
}

#[tokio::test]
async fn two_role_mode_matches_artifact_shape() {
    let dir = bundle(&[
        ("run.sh", "bash utils/prep.sh\n"),
        ("utils/prep.sh", "echo prep\n"),
    ]);
    let out = dir.path().join("out");
    let snap = run_pipeline(dir.path(), &out, PipelineMode::TwoRole).await;

    assert!(
        snap.graph
            .edges()
            .any(|e| e.src == "run.sh" && e.dst == "utils/prep.sh")
    );
    assert!(out.join("predicted_graph.yaml").exists());
    assert!(out.join("graph.dot").exists());
    assert!(out.join("run_report.json").exists());
    let stats = fs::read_to_string(out.join("run_stats.json")).unwrap();
    assert!(stats.contains("\"system\": \"2R\""));
    assert!(stats.contains("Reader"));
    assert!(stats.contains("Mapper"));
}

#[tokio::test]
async fn four_role_run_stats_cover_all_phases() {
    let dir = bundle(&[
        ("run.sh", "./utils/prep.sh\n"),
        ("utils/prep.sh", "echo prep\n"),
    ]);
    let out = dir.path().join("out");
    run_pipeline(dir.path(), &out, PipelineMode::FourRole).await;

    let stats = fs::read_to_string(out.join("run_stats.json")).unwrap();
    for phase in ["Planner", "Reader", "Mapper", "Writer", "total"] {
        assert!(stats.contains(phase), "missing phase {phase}");
    }
    assert!(stats.contains("\"system\": \"4R\""));
    assert!(stats.contains("\"coverage\""));
}

#[tokio::test]
async fn resolver_is_deterministic() {
    let files: &[(&str, &str)] = &[
        (
            "run.sh",
            "BASE=\"./lib\"\nTARGET=\"$BASE/load.sh\"\n\"$TARGET\"\nbash $MISSING/x.sh\n",
        ),
        ("lib/load.sh", "echo load\n"),
        ("lib/extra.sh", ". ../run.sh\n"),
    ];
    let dir = bundle(files);

    let out1 = dir.path().join("out1");
    let out2 = dir.path().join("out2");
    run_pipeline(dir.path(), &out1, PipelineMode::FourRole).await;
    run_pipeline(dir.path(), &out2, PipelineMode::FourRole).await;

    let yaml1 = fs::read(out1.join("predicted_graph.yaml")).unwrap();
    let yaml2 = fs::read(out2.join("predicted_graph.yaml")).unwrap();
    assert_eq!(yaml1, yaml2, "repeat runs must be byte-identical");
}

#[tokio::test]
async fn export_import_round_trip_is_identity() {
    let dir = bundle(&[
        ("run.sh", "./utils/prep.sh\nsource lib/env.sh\n"),
        ("utils/prep.sh", "echo prep\n"),
        ("lib/env.sh", "X=1\n"),
    ]);
    let out = dir.path().join("out");
    run_pipeline(dir.path(), &out, PipelineMode::FourRole).await;

    let yaml = fs::read_to_string(out.join("predicted_graph.yaml")).unwrap();
    let imported = import_graph_yaml(&yaml).unwrap();
    let re_rendered = render_yaml(&imported, dir.path(), false);
    assert_eq!(re_rendered, yaml);
}

#[tokio::test]
async fn dot_export_uses_color_semantics() {
    let dir = bundle(&[
        (
            "run.sh",
            "./utils/prep.sh\nB=\"./lib\"\nT=\"$B/load.sh\"\n\"$T\"\n",
        ),
        ("utils/prep.sh", "echo prep\n"),
        ("lib/load.sh", "echo load\n"),
    ]);
    let out = dir.path().join("out");
    run_pipeline(dir.path(), &out, PipelineMode::FourRole).await;

    let dot = fs::read_to_string(out.join("graph.dot")).unwrap();
    assert!(dot.contains("color=\"black\""), "static edge renders black");
    assert!(dot.contains("color=\"blue\""), "dynamic-resolved renders blue");
}

#[tokio::test]
async fn static_scan_artifacts_match_pipeline_shape() {
    let dir = bundle(&[
        ("run.sh", "./utils/prep.sh\n"),
        ("utils/prep.sh", "echo prep\n"),
    ]);
    let out = dir.path().join("out");
    Scanner::new().scan_to_artifacts(dir.path(), &out).unwrap();

    assert!(out.join("predicted_graph.yaml").exists());
    assert!(out.join("graph.dot").exists());
    assert!(out.join("run_report.json").exists());
}

#[tokio::test]
async fn unreadable_bundle_root_is_the_only_hard_failure() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");
    assert!(Scanner::new().scan(&missing).is_err());
}
