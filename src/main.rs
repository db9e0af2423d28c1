//! scriptgraph CLI entry point

use clap::{Parser, Subcommand};
use scriptgraph_agents::PipelineMode;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "scriptgraph")]
#[command(about = "Reconstruct the call/source graph of a legacy script bundle", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Static scan: parse the bundle and export the baseline graph
    Scan {
        /// Bundle root directory
        bundle: PathBuf,

        /// Output directory
        #[arg(long, default_value = "./out")]
        out: PathBuf,

        /// Config file
        #[arg(long, default_value = "scriptgraph.yaml")]
        config: PathBuf,
    },
    /// Run the role pipeline (static scan + resolution)
    Run {
        /// Bundle root directory
        bundle: PathBuf,

        /// Role chain: 2R (Reader→Mapper) or 4R (Planner→Reader→Mapper→Writer)
        #[arg(long, default_value = "4R")]
        roles: PipelineMode,

        /// Output directory
        #[arg(long, default_value = "./out")]
        out: PathBuf,

        /// Config file
        #[arg(long, default_value = "scriptgraph.yaml")]
        config: PathBuf,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "scriptgraph={log_level}"
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Scan {
            bundle,
            out,
            config,
        } => commands::scan(bundle, out, config).await,
        Commands::Run {
            bundle,
            roles,
            out,
            config,
        } => commands::run(bundle, out, roles, config).await,
        Commands::Version => {
            println!("scriptgraph v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
