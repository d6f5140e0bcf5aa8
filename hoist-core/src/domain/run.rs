//! Pipeline run domain types
//!
//! A run is created when a trigger matches, executes its steps in order and
//! ends at completion or at the first failure. It lives only in memory.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::step::{StepRecord, StepStatus};
use super::trigger::TriggerSource;
use super::workflow::WorkflowDefinition;

/// One execution instance of a workflow's step sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: Uuid,
    pub workflow: String,
    pub trigger: TriggerSource,
    /// Pushed branch; `None` for manual runs
    pub branch: Option<String>,
    /// Repository location the checkout step clones from
    pub source: String,
    pub credentials: CredentialRef,
    pub image_name: String,
    pub tag: String,
    pub status: RunStatus,
    pub steps: Vec<StepRecord>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl PipelineRun {
    /// Creates a pending run for `workflow`
    pub fn new(
        workflow: &WorkflowDefinition,
        trigger: TriggerSource,
        branch: Option<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow: workflow.name.clone(),
            trigger,
            branch,
            source: source.into(),
            credentials: CredentialRef {
                username_secret: workflow.registry.username_secret.clone(),
                password_secret: workflow.registry.password_secret.clone(),
            },
            image_name: workflow.image.name.clone(),
            tag: workflow.image.tag.clone(),
            status: RunStatus::Pending,
            steps: workflow.steps.iter().map(StepRecord::pending).collect(),
            created_at: chrono::Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Marks the run as running
    pub fn start(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Some(chrono::Utc::now());
    }

    /// Marks the run as finished and skips every step that never started
    pub fn finish(&mut self, success: bool) {
        for step in &mut self.steps {
            if step.status == StepStatus::Pending {
                step.status = StepStatus::Skipped;
            }
        }
        self.status = if success {
            RunStatus::Succeeded
        } else {
            RunStatus::Failed
        };
        self.completed_at = Some(chrono::Utc::now());
    }

    /// Records of steps that ran to completion or failure, in order
    pub fn executed_steps(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps
            .iter()
            .filter(|s| matches!(s.status, StepStatus::Succeeded | StepStatus::Failed))
    }
}

/// Names of the two secrets that make up the registry credential pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRef {
    pub username_secret: String,
    pub password_secret: String,
}

/// Run lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Succeeded | RunStatus::Failed)
    }
}

/// Result of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub success: bool,
    pub exit_code: i32,
    pub failed_step: Option<String>,
    pub error_message: Option<String>,
}

impl RunResult {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            exit_code: 0,
            failed_step: None,
            error_message: None,
        }
    }

    pub fn failed(step: impl Into<String>, exit_code: i32, error: impl Into<String>) -> Self {
        Self {
            success: false,
            // A failure must never surface as a zero exit status
            exit_code: if exit_code == 0 { 1 } else { exit_code },
            failed_step: Some(step.into()),
            error_message: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::step::{StepAction, StepDefinition};
    use crate::domain::workflow::{ImageConfig, RegistryConfig, TriggerConfig};

    fn workflow() -> WorkflowDefinition {
        WorkflowDefinition {
            name: "image".to_string(),
            description: None,
            triggers: TriggerConfig::default(),
            registry: RegistryConfig::default(),
            image: ImageConfig {
                name: "thunder".to_string(),
                repository: None,
                tag: "latest".to_string(),
            },
            steps: vec![
                StepDefinition {
                    name: "Build".to_string(),
                    action: StepAction::Build {
                        context: ".".to_string(),
                        file: "Dockerfile".to_string(),
                    },
                },
                StepDefinition {
                    name: "Push".to_string(),
                    action: StepAction::Push,
                },
            ],
        }
    }

    #[test]
    fn test_new_run_is_pending() {
        let run = PipelineRun::new(&workflow(), TriggerSource::Manual, None, ".");
        assert_eq!(run.status, RunStatus::Pending);
        assert_eq!(run.steps.len(), 2);
        assert!(run.steps.iter().all(|s| s.status == StepStatus::Pending));
        assert_eq!(run.credentials.username_secret, "REGISTRY_USERNAME");
        assert_eq!(run.tag, "latest");
    }

    #[test]
    fn test_finish_skips_unstarted_steps() {
        let mut run = PipelineRun::new(&workflow(), TriggerSource::Manual, None, ".");
        run.start();
        run.steps[0].status = StepStatus::Failed;
        run.finish(false);

        assert_eq!(run.status, RunStatus::Failed);
        assert!(run.status.is_terminal());
        assert_eq!(run.steps[1].status, StepStatus::Skipped);
        assert_eq!(run.executed_steps().count(), 1);
    }

    #[test]
    fn test_failed_result_never_zero() {
        let result = RunResult::failed("Build", 0, "boom");
        assert!(!result.success);
        assert_eq!(result.exit_code, 1);

        let result = RunResult::failed("Build", 125, "boom");
        assert_eq!(result.exit_code, 125);
    }
}
