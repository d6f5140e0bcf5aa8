//! Step planner
//!
//! Translates a step definition into the ordered commands that carry it
//! out. Planning has no side effects, so the same plans back both run
//! execution and `hoist plan`.

use hoist_core::domain::run::PipelineRun;
use hoist_core::domain::step::{StepAction, StepDefinition};
use hoist_core::domain::workflow::WorkflowDefinition;
use std::path::Path;
use std::str::FromStr;

use crate::command::CommandSpec;
use crate::config::Config;
use crate::error::{Result, RunnerError};
use crate::secrets::Credentials;

/// Container engine CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Docker,
    Podman,
}

impl EngineKind {
    pub fn program(&self) -> &'static str {
        match self {
            EngineKind::Docker => "docker",
            EngineKind::Podman => "podman",
        }
    }
}

impl FromStr for EngineKind {
    type Err = RunnerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docker" => Ok(EngineKind::Docker),
            "podman" => Ok(EngineKind::Podman),
            other => Err(RunnerError::Config(format!(
                "unsupported container engine '{}' (expected docker or podman)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program())
    }
}

/// Everything a step plan may depend on
pub struct StepContext<'a> {
    pub run: &'a PipelineRun,
    pub workflow: &'a WorkflowDefinition,
    pub workspace: &'a Path,
    /// Resolved registry credentials, when the step needs them
    pub credentials: Option<&'a Credentials>,
}

/// Builds command plans for steps
#[derive(Debug, Clone)]
pub struct StepPlanner {
    engine: EngineKind,
    git_program: String,
}

impl StepPlanner {
    pub fn new(engine: EngineKind, git_program: impl Into<String>) -> Self {
        Self {
            engine,
            git_program: git_program.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.engine, config.git_program.clone())
    }

    /// Whether planning `step` requires resolved registry credentials
    pub fn needs_credentials(step: &StepDefinition, workflow: &WorkflowDefinition) -> bool {
        match step.action {
            StepAction::RegistryLogin => true,
            StepAction::Tag | StepAction::Push => workflow.image.needs_username(),
            _ => false,
        }
    }

    /// Returns the commands `step` runs, in order
    pub fn plan(&self, step: &StepDefinition, ctx: &StepContext<'_>) -> Result<Vec<CommandSpec>> {
        let engine = self.engine.program();

        let plan = match &step.action {
            StepAction::Checkout {
                repository,
                reference,
            } => {
                let source = repository.as_deref().unwrap_or(ctx.run.source.as_str());
                let branch = reference.as_deref().or(ctx.run.branch.as_deref());

                let mut clone = CommandSpec::new(&self.git_program).args(["clone", "--depth", "1"]);
                if let Some(branch) = branch {
                    clone = clone.args(["--branch", branch]);
                }
                let clone = clone
                    .arg(source)
                    .arg(ctx.workspace.to_string_lossy())
                    .env("GIT_TERMINAL_PROMPT", "0");

                vec![clone]
            }

            StepAction::SetupBuilder => match self.engine {
                EngineKind::Docker => vec![
                    CommandSpec::new(engine)
                        .args(["buildx", "inspect", "--bootstrap"])
                        .cwd(ctx.workspace),
                ],
                EngineKind::Podman => vec![CommandSpec::new(engine).arg("version").cwd(ctx.workspace)],
            },

            StepAction::RegistryLogin => {
                let credentials = require_credentials(ctx)?;
                vec![
                    CommandSpec::new(engine)
                        .args(["login", ctx.workflow.registry.host.as_str()])
                        .args(["--username", credentials.username.as_str()])
                        .arg("--password-stdin")
                        .stdin(credentials.password.clone())
                        .cwd(ctx.workspace),
                ]
            }

            StepAction::Build { context, file } => {
                let mut build = CommandSpec::new(engine)
                    .args(["build", "-t", ctx.run.image_name.as_str()])
                    .args(["-f", file.as_str()])
                    .arg(context.as_str())
                    .cwd(ctx.workspace);
                if self.engine == EngineKind::Docker {
                    build = build.env("DOCKER_BUILDKIT", "1");
                }
                vec![build]
            }

            StepAction::Tag => {
                let reference = publish_reference(ctx)?;
                vec![
                    CommandSpec::new(engine)
                        .args(["tag", ctx.run.image_name.as_str(), reference.as_str()])
                        .cwd(ctx.workspace),
                ]
            }

            StepAction::Push => {
                let reference = publish_reference(ctx)?;
                vec![
                    CommandSpec::new(engine)
                        .args(["push", reference.as_str()])
                        .cwd(ctx.workspace),
                ]
            }

            StepAction::Run { command } => {
                let mut shell = CommandSpec::new("sh")
                    .args(["-c", command.as_str()])
                    .cwd(ctx.workspace)
                    .env("HOIST_RUN_ID", ctx.run.id.to_string())
                    .env("HOIST_IMAGE", ctx.run.image_name.as_str())
                    .env("HOIST_TAG", ctx.run.tag.as_str());
                if let Some(branch) = &ctx.run.branch {
                    shell = shell.env("HOIST_BRANCH", branch.as_str());
                }
                vec![shell]
            }
        };

        Ok(plan)
    }
}

fn require_credentials<'a>(ctx: &StepContext<'a>) -> Result<&'a Credentials> {
    ctx.credentials
        .ok_or_else(|| RunnerError::MissingSecret(ctx.run.credentials.username_secret.clone()))
}

/// Reference the tag and push steps publish, carrying the literal run tag
fn publish_reference(ctx: &StepContext<'_>) -> Result<String> {
    let username = if ctx.workflow.image.needs_username() {
        Some(require_credentials(ctx)?.username.as_str())
    } else {
        None
    };

    Ok(ctx
        .workflow
        .image
        .publish_reference(&ctx.workflow.registry, username))
}
