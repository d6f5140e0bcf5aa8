//! Step domain types

use serde::{Deserialize, Serialize};

/// One entry of a workflow's ordered step list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub name: String,
    pub action: StepAction,
}

/// What a step does
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "uses", rename_all = "kebab-case")]
pub enum StepAction {
    /// Fetch repository contents into the run workspace
    Checkout {
        /// Repository to clone instead of the run source
        repository: Option<String>,
        /// Branch or tag to check out instead of the pushed branch
        reference: Option<String>,
    },
    /// Prepare the image-building toolchain
    SetupBuilder,
    /// Log in to the registry with the configured credentials
    RegistryLogin,
    /// Build the image from the workspace
    Build { context: String, file: String },
    /// Apply the configured tag label to the built image
    Tag,
    /// Publish the tagged image
    Push,
    /// Run a single shell command in the workspace
    Run { command: String },
}

impl StepAction {
    /// Identifier used in workflow files (`uses = "..."`)
    pub fn kind(&self) -> &'static str {
        match self {
            StepAction::Checkout { .. } => "checkout",
            StepAction::SetupBuilder => "setup-builder",
            StepAction::RegistryLogin => "registry-login",
            StepAction::Build { .. } => "build",
            StepAction::Tag => "tag",
            StepAction::Push => "push",
            StepAction::Run { .. } => "run",
        }
    }
}

/// Step execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    /// Not executed because an earlier step failed
    Skipped,
}

/// Execution record of a single step within a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub kind: String,
    pub status: StepStatus,
    pub exit_code: Option<i32>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub error: Option<String>,
}

impl StepRecord {
    pub fn pending(step: &StepDefinition) -> Self {
        Self {
            name: step.name.clone(),
            kind: step.action.kind().to_string(),
            status: StepStatus::Pending,
            exit_code: None,
            started_at: None,
            completed_at: None,
            error: None,
        }
    }
}
