//! Trigger dispatcher
//!
//! Decides whether an incoming event starts a run. A push starts a run
//! only when its branch is on the workflow's allow-list; a manual request
//! starts one when the workflow allows manual dispatch. A matching event
//! yields exactly one run.

use hoist_core::domain::run::PipelineRun;
use hoist_core::domain::trigger::{TriggerEvent, branch_from_ref};
use hoist_core::domain::workflow::WorkflowDefinition;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Result, RunnerError};

/// Matches events against a workflow's triggers
pub struct TriggerDispatcher<'a> {
    workflow: &'a WorkflowDefinition,
}

impl<'a> TriggerDispatcher<'a> {
    pub fn new(workflow: &'a WorkflowDefinition) -> Self {
        Self { workflow }
    }

    /// Returns the run `event` starts, or `None` if it does not trigger
    ///
    /// # Arguments
    /// * `event` - The incoming event
    /// * `source` - Repository location the checkout step clones from
    pub fn dispatch(&self, event: &TriggerEvent, source: &str) -> Option<PipelineRun> {
        let branch = match event {
            TriggerEvent::Push { git_ref } => {
                let Some(branch) = branch_from_ref(git_ref) else {
                    debug!("Ref '{}' is not a branch, ignoring push", git_ref);
                    return None;
                };

                if !self.workflow.triggers.allows_branch(branch) {
                    debug!(
                        "Branch '{}' is not in the allow-list of workflow '{}'",
                        branch, self.workflow.name
                    );
                    return None;
                }

                Some(branch.to_string())
            }
            TriggerEvent::Manual => {
                if !self.workflow.triggers.manual {
                    debug!(
                        "Workflow '{}' does not accept manual dispatch",
                        self.workflow.name
                    );
                    return None;
                }
                None
            }
        };

        let run = PipelineRun::new(self.workflow, event.source(), branch, source);
        info!(
            "Event {:?} triggered run {} of workflow '{}'",
            event, run.id, self.workflow.name
        );
        Some(run)
    }
}

/// Push payload as delivered by git hosting webhooks
#[derive(Debug, Deserialize)]
struct PushPayload {
    #[serde(rename = "ref")]
    git_ref: String,
}

/// Parses a push event payload (`{"ref": "refs/heads/main", ...}`)
///
/// Fields other than `ref` are ignored.
pub fn parse_event_payload(json: &str) -> Result<TriggerEvent> {
    let payload: PushPayload =
        serde_json::from_str(json).map_err(|e| RunnerError::InvalidEvent(e.to_string()))?;
    Ok(TriggerEvent::Push {
        git_ref: payload.git_ref,
    })
}

/// Reads and parses a push event payload file
pub fn read_event_payload(path: &Path) -> Result<TriggerEvent> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| RunnerError::InvalidEvent(format!("{}: {}", path.display(), e)))?;
    parse_event_payload(&json)
}
