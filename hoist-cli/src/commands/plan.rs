//! Plan command handler
//!
//! Prints the commands a run would execute. Nothing is spawned and the
//! workspace is not created.

use anyhow::{Context, Result};
use colored::*;
use hoist_core::domain::run::PipelineRun;
use hoist_core::domain::trigger::TriggerSource;
use hoist_runner::{Credentials, EnvSecretStore, Secret, StepContext, StepPlanner};

use super::load_workflow;
use crate::config::Config;

/// Handle `hoist plan`
pub fn handle_plan(branch: Option<String>, config: &Config) -> Result<i32> {
    let workflow = load_workflow(&config.workflow_path)?;

    let runner_config = hoist_runner::Config::from_env().context("Invalid runner configuration")?;
    let planner = StepPlanner::from_config(&runner_config);

    if let Some(branch) = &branch {
        if !workflow.triggers.allows_branch(branch) {
            println!(
                "{}",
                format!("! Pushes to '{}' do not trigger this workflow", branch).yellow()
            );
        }
    }

    let trigger = if branch.is_some() {
        TriggerSource::Push
    } else {
        TriggerSource::Manual
    };
    let run = PipelineRun::new(&workflow, trigger, branch, config.source.as_str());
    let workspace = runner_config.workspace_base.join(run.id.to_string());

    // Real credentials when available so references match what a run pushes
    let credentials = Credentials::resolve(&EnvSecretStore, &run.credentials).unwrap_or_else(|_| {
        Credentials {
            username: format!("${}", run.credentials.username_secret),
            password: Secret::new(""),
        }
    });

    let ctx = StepContext {
        run: &run,
        workflow: &workflow,
        workspace: &workspace,
        credentials: Some(&credentials),
    };

    println!("{} {}", "Plan for".bold(), workflow.name.cyan().bold());
    for (idx, step) in workflow.steps.iter().enumerate() {
        println!(
            "{}",
            format!("{}. {} ({})", idx + 1, step.name, step.action.kind()).bold()
        );
        let commands = planner
            .plan(step, &ctx)
            .with_context(|| format!("Failed to plan step '{}'", step.name))?;
        for command in commands {
            println!("   $ {}", command.to_string().dimmed());
        }
    }

    Ok(0)
}
