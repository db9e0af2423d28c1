//! CLI command implementations

use std::path::PathBuf;

use anyhow::Result;
use scriptgraph_agents::{AgentRunner, PipelineMode};
use scriptgraph_ai::LlmClient;
use scriptgraph_core::TracingSink;
use scriptgraph_indexer::Scanner;

use crate::config::Config;

/// Static-only pipeline: crawl, parse, export. Keeps every indexed
/// node.
pub async fn scan(bundle: PathBuf, out: PathBuf, config: PathBuf) -> Result<()> {
    let cfg = Config::load(&config)?;
    let scanner = Scanner::with_extensions(cfg.parsing.include_ext.clone());
    let graph = scanner.scan_to_artifacts(&bundle, &out)?;
    tracing::info!(
        bundle = %bundle.display(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "scan finished"
    );
    Ok(())
}

/// Full pipeline: static scan for the baseline, then the role chain.
pub async fn run(
    bundle: PathBuf,
    out: PathBuf,
    roles: PipelineMode,
    config: PathBuf,
) -> Result<()> {
    let cfg = Config::load(&config)?;
    let scanner = Scanner::with_extensions(cfg.parsing.include_ext.clone());
    let baseline = scanner.scan(&bundle)?;

    let client = LlmClient::from_config(&cfg.llm_config())?;
    tracing::info!(provider = client.provider_name(), roles = %roles, "starting agent pipeline");

    let sink = TracingSink;
    let runner = AgentRunner::new(roles, &client, &sink)
        .with_privacy(cfg.privacy.log_prompts, cfg.redactor())
        .with_reader_hints(cfg.agents.reader_hints);
    let snap = runner.run(&bundle, baseline, &out).await?;

    tracing::info!(
        nodes = snap.graph.node_count(),
        edges = snap.graph.edge_count(),
        unresolved = snap.unresolved.len(),
        out = %out.display(),
        "pipeline finished"
    );
    Ok(())
}
