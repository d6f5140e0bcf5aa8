//! Hoist CLI
//!
//! Command-line entry point: validates and plans workflows, and runs them
//! in response to push events or manual dispatch.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hoist")]
#[command(about = "Build and publish container images from a declarative workflow", long_about = None)]
struct Cli {
    /// Workflow definition file
    #[arg(long, global = true, env = "HOIST_WORKFLOW", default_value = "hoist.lua")]
    workflow: PathBuf,

    /// Repository the checkout step clones (path or URL)
    #[arg(long, global = true, env = "HOIST_SOURCE", default_value = ".")]
    source: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hoist=info,hoist_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        workflow_path: cli.workflow,
        source: cli.source,
    };

    let exit_code = handle_command(cli.command, &config).await?;
    if exit_code != 0 {
        std::process::exit(exit_code);
    }

    Ok(())
}
