//! Run command handlers
//!
//! Turns a push event or a manual request into a run, executes it and
//! reports the outcome.

use anyhow::{Context, Result};
use colored::*;
use hoist_core::domain::log::LogLevel;
use hoist_core::domain::step::StepStatus;
use hoist_core::domain::trigger::TriggerEvent;
use hoist_core::dto::report::RunReport;
use hoist_runner::trigger::read_event_payload;
use hoist_runner::{
    EnvSecretStore, ExecutionService, InMemoryLogBuffer, LogBufferService,
    StandardExecutionService, SystemCommandRunner, TriggerDispatcher,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::load_workflow;
use crate::config::Config;

/// Handle `hoist push`
pub async fn handle_push(
    git_ref: Option<String>,
    event_path: Option<PathBuf>,
    report: Option<PathBuf>,
    config: &Config,
) -> Result<i32> {
    let event = match (git_ref, event_path) {
        (Some(git_ref), _) => TriggerEvent::Push { git_ref },
        (None, Some(path)) => read_event_payload(&path)
            .with_context(|| format!("Failed to read event payload: {}", path.display()))?,
        (None, None) => anyhow::bail!("either --ref or --event is required"),
    };

    run_event(event, report.as_deref(), config).await
}

/// Handle `hoist dispatch`
pub async fn handle_dispatch(report: Option<PathBuf>, config: &Config) -> Result<i32> {
    run_event(TriggerEvent::Manual, report.as_deref(), config).await
}

async fn run_event(event: TriggerEvent, report: Option<&Path>, config: &Config) -> Result<i32> {
    let workflow = load_workflow(&config.workflow_path)?;

    let Some(mut run) = TriggerDispatcher::new(&workflow).dispatch(&event, &config.source) else {
        println!(
            "{} {}",
            "○".dimmed(),
            format!("Event does not trigger workflow '{}', nothing to run", workflow.name).dimmed()
        );
        return Ok(0);
    };

    let runner_config = hoist_runner::Config::from_env().context("Invalid runner configuration")?;
    runner_config
        .validate()
        .context("Invalid runner configuration")?;

    println!("{} {}", "▶ Running workflow".bold(), workflow.name.cyan().bold());
    println!("  Run:     {}", run.id.to_string().cyan());
    println!("  Trigger: {}", run.trigger.to_string().dimmed());
    if let Some(branch) = &run.branch {
        println!("  Branch:  {}", branch.dimmed());
    }
    println!("  Engine:  {}", runner_config.engine.to_string().dimmed());
    println!();

    let service = StandardExecutionService::new(
        runner_config,
        Arc::new(SystemCommandRunner),
        Arc::new(EnvSecretStore),
    );
    let log_buffer = InMemoryLogBuffer::new();

    let result = service
        .execute_run(&mut run, &workflow, Arc::new(log_buffer.clone()))
        .await
        .context("Run could not be started")?;

    let logs = log_buffer.drain();
    for entry in &logs {
        let line = format!("  {}", entry.message);
        match entry.level {
            LogLevel::Error => println!("{}", line.red()),
            LogLevel::Warning => println!("{}", line.yellow()),
            LogLevel::Info => println!("{}", line),
            LogLevel::Debug => println!("{}", line.dimmed()),
        }
    }
    println!();

    for step in &run.steps {
        let marker = match step.status {
            StepStatus::Succeeded => "✓".green(),
            StepStatus::Failed => "✗".red(),
            StepStatus::Skipped => "-".dimmed(),
            StepStatus::Pending | StepStatus::Running => "?".yellow(),
        };
        println!("  {} {}", marker, step.name);
    }
    println!(
        "  {}",
        format!("{} of {} steps executed", run.executed_steps().count(), run.steps.len()).dimmed()
    );
    println!();

    if !run.status.is_terminal() {
        anyhow::bail!("Run {} ended in non-terminal state {:?}", run.id, run.status);
    }

    if result.success {
        println!("{}", "✓ Workflow completed successfully!".green().bold());
    } else {
        println!(
            "{} {}",
            "✗ Workflow failed".red().bold(),
            result.error_message.as_deref().unwrap_or_default()
        );
    }

    let exit_code = result.exit_code;

    if let Some(path) = report {
        let report = RunReport { run, result, logs };
        let json = report.to_json().context("Failed to serialize run report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write run report: {}", path.display()))?;
        println!("  Report:  {}", path.display().to_string().dimmed());
    }

    Ok(exit_code)
}
