//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod plan;
mod run;
mod validate;

use anyhow::{Context, Result};
use clap::Subcommand;
use hoist_core::domain::workflow::WorkflowDefinition;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Handle a push event; runs the workflow if the branch is allow-listed
    Push {
        /// Pushed ref (`refs/heads/<branch>` or a branch name)
        #[arg(long = "ref", required_unless_present = "event", conflicts_with = "event")]
        git_ref: Option<String>,

        /// JSON push payload file containing a `ref` field
        #[arg(long)]
        event: Option<PathBuf>,

        /// Write a JSON run report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Run the workflow on operator request
    Dispatch {
        /// Write a JSON run report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Parse the workflow and print a summary
    Validate,
    /// Print the commands each step would run, without running them
    Plan {
        /// Branch to plan the checkout for
        #[arg(long)]
        branch: Option<String>,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Returns
/// The process exit code
pub async fn handle_command(command: Commands, config: &Config) -> Result<i32> {
    match command {
        Commands::Push {
            git_ref,
            event,
            report,
        } => run::handle_push(git_ref, event, report, config).await,
        Commands::Dispatch { report } => run::handle_dispatch(report, config).await,
        Commands::Validate => validate::handle_validate(config),
        Commands::Plan { branch } => plan::handle_plan(branch, config),
    }
}

/// Reads and parses the workflow file
fn load_workflow(path: &Path) -> Result<WorkflowDefinition> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read workflow file: {}", path.display()))?;

    let workflow = hoist_lua::parse_workflow(&source)
        .with_context(|| format!("Failed to parse workflow: {}", path.display()))?;

    debug!(
        "Loaded workflow '{}' from {} ({} steps)",
        workflow.name,
        path.display(),
        workflow.steps.len()
    );
    Ok(workflow)
}
