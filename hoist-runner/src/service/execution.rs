//! Execution service
//!
//! Runs a workflow's steps one after the other:
//! - Creating the run workspace
//! - Resolving registry credentials when a step first needs them
//! - Planning and running each step's commands
//! - Halting at the first failure and skipping everything after it

use async_trait::async_trait;
use hoist_core::domain::log::{LogEntry, LogLevel};
use hoist_core::domain::run::{PipelineRun, RunResult};
use hoist_core::domain::step::{StepDefinition, StepStatus};
use hoist_core::domain::workflow::WorkflowDefinition;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::command::{CommandOutput, CommandRunner, CommandSpec};
use crate::config::Config;
use crate::error::{Result, RunnerError};
use crate::planner::{StepContext, StepPlanner};
use crate::secrets::{Credentials, Secret, SecretStore, mask};
use crate::service::log_buffer::LogBufferService;
use crate::workspace::Workspace;

/// Service trait for executing pipeline runs
#[async_trait]
pub trait ExecutionService: Send + Sync {
    /// Executes `run` against `workflow`
    ///
    /// Step records and run status are updated in place. A failing step is
    /// reported through the returned `RunResult`; `Err` is reserved for
    /// failures to set the run up at all.
    async fn execute_run(
        &self,
        run: &mut PipelineRun,
        workflow: &WorkflowDefinition,
        log_buffer: Arc<dyn LogBufferService>,
    ) -> Result<RunResult>;
}

/// Why a step stopped the run
struct StepFailure {
    /// Exit status of the failing command, if one ran
    exit_code: Option<i32>,
    message: String,
}

/// Standard implementation of ExecutionService
pub struct StandardExecutionService {
    config: Config,
    planner: StepPlanner,
    runner: Arc<dyn CommandRunner>,
    secrets: Arc<dyn SecretStore>,
}

impl StandardExecutionService {
    pub fn new(
        config: Config,
        runner: Arc<dyn CommandRunner>,
        secrets: Arc<dyn SecretStore>,
    ) -> Self {
        let planner = StepPlanner::from_config(&config);
        Self {
            config,
            planner,
            runner,
            secrets,
        }
    }

    /// Plans and runs a single step
    async fn execute_step(
        &self,
        step: &StepDefinition,
        run: &PipelineRun,
        workflow: &WorkflowDefinition,
        workspace: &Workspace,
        credentials: &mut Option<Credentials>,
        log_buffer: &Arc<dyn LogBufferService>,
    ) -> std::result::Result<(), StepFailure> {
        if StepPlanner::needs_credentials(step, workflow) && credentials.is_none() {
            let resolved = Credentials::resolve(self.secrets.as_ref(), &run.credentials)
                .map_err(|e| StepFailure {
                    exit_code: None,
                    message: e.to_string(),
                })?;
            debug!("Resolved registry credentials for run {}", run.id);
            *credentials = Some(resolved);
        }

        let ctx = StepContext {
            run,
            workflow,
            workspace: workspace.path(),
            credentials: credentials.as_ref(),
        };

        let commands = self.planner.plan(step, &ctx).map_err(|e| StepFailure {
            exit_code: None,
            message: e.to_string(),
        })?;

        let secrets: Vec<_> = credentials.iter().map(|c| &c.password).collect();

        for command in &commands {
            log_buffer.add_entry(LogEntry::info(format!("$ {}", command)));

            let output = self
                .runner
                .run(command)
                .await
                .map_err(|e| StepFailure {
                    exit_code: None,
                    message: e.to_string(),
                })?;

            record_output(log_buffer.as_ref(), &output, &secrets);

            if !output.success() {
                return Err(StepFailure {
                    exit_code: Some(output.exit_code),
                    message: command_failure(command, &output),
                });
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ExecutionService for StandardExecutionService {
    async fn execute_run(
        &self,
        run: &mut PipelineRun,
        workflow: &WorkflowDefinition,
        log_buffer: Arc<dyn LogBufferService>,
    ) -> Result<RunResult> {
        info!(
            "Starting run {} of workflow '{}' ({} trigger)",
            run.id, workflow.name, run.trigger
        );

        if run.steps.len() != workflow.steps.len() {
            let err = RunnerError::StepMismatch {
                workflow: workflow.name.clone(),
                run_steps: run.steps.len(),
                workflow_steps: workflow.steps.len(),
            };
            error!("Refusing to execute run {}: {}", run.id, err);
            return Err(err);
        }

        run.start();
        log_buffer.add_entry(LogEntry::info(format!(
            "Starting workflow: {}",
            workflow.name
        )));

        let workspace = match Workspace::create(
            &self.config.workspace_base,
            run.id,
            self.config.keep_workspace,
        ) {
            Ok(workspace) => workspace,
            Err(e) => {
                error!("Failed to prepare workspace for run {}: {}", run.id, e);
                log_buffer.add_entry(LogEntry::error(format!(
                    "Failed to prepare workspace: {}",
                    e
                )));
                run.finish(false);
                return Err(e);
            }
        };

        let mut credentials: Option<Credentials> = None;
        let total = workflow.steps.len();

        for (idx, step) in workflow.steps.iter().enumerate() {
            info!("Executing step {}/{}: {}", idx + 1, total, step.name);
            log_buffer.add_entry(LogEntry::info(format!("Starting step: {}", step.name)));

            {
                let record = &mut run.steps[idx];
                record.status = StepStatus::Running;
                record.started_at = Some(chrono::Utc::now());
            }

            let outcome = self
                .execute_step(
                    step,
                    run,
                    workflow,
                    &workspace,
                    &mut credentials,
                    &log_buffer,
                )
                .await;

            let record = &mut run.steps[idx];
            record.completed_at = Some(chrono::Utc::now());

            match outcome {
                Ok(()) => {
                    record.status = StepStatus::Succeeded;
                    record.exit_code = Some(0);
                    log_buffer.add_entry(LogEntry::info(format!(
                        "Step '{}' completed",
                        step.name
                    )));
                }
                Err(failure) => {
                    record.status = StepStatus::Failed;
                    record.exit_code = failure.exit_code;
                    record.error = Some(failure.message.clone());

                    error!("Step '{}' failed: {}", step.name, failure.message);
                    log_buffer.add_entry(LogEntry::error(format!(
                        "Step '{}' failed: {}",
                        step.name, failure.message
                    )));

                    run.finish(false);
                    info!("Run {} failed at step '{}'", run.id, step.name);

                    return Ok(RunResult::failed(
                        step.name.clone(),
                        failure.exit_code.unwrap_or(1),
                        failure.message,
                    ));
                }
            }
        }

        run.finish(true);
        info!("Run {} completed successfully", run.id);
        log_buffer.add_entry(LogEntry::info("Workflow completed successfully"));

        Ok(RunResult::succeeded())
    }
}

/// Adds each non-empty output line to the log, with secrets masked
fn record_output(log_buffer: &dyn LogBufferService, output: &CommandOutput, secrets: &[&Secret]) {
    for line in output.stdout.lines().filter(|l| !l.trim().is_empty()) {
        log_buffer.add_entry(LogEntry::now(LogLevel::Info, mask(line, secrets)));
    }
    for line in output.stderr.lines().filter(|l| !l.trim().is_empty()) {
        log_buffer.add_entry(LogEntry::now(LogLevel::Warning, mask(line, secrets)));
    }
}

fn command_failure(command: &CommandSpec, output: &CommandOutput) -> String {
    format!("`{}` exited with status {}", command, output.exit_code)
}
