//! Error types for the Hoist runner

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for runner operations
pub type Result<T> = std::result::Result<T, RunnerError>;

/// Errors raised while preparing or driving a run
///
/// A step exiting non-zero is not an error here; it is reported through
/// the run result.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// A secret the step needs is not present in the store
    #[error("Secret '{0}' is not available")]
    MissingSecret(String),

    /// A process could not be started or awaited
    #[error("Failed to run '{program}': {source}")]
    Process {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The run workspace could not be prepared
    #[error("Workspace error at {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid runner configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The run was created from a workflow with a different step list
    #[error("Run has {run_steps} step records but workflow '{workflow}' declares {workflow_steps} steps")]
    StepMismatch {
        workflow: String,
        run_steps: usize,
        workflow_steps: usize,
    },

    /// Event payload could not be understood
    #[error("Invalid event payload: {0}")]
    InvalidEvent(String),
}

impl RunnerError {
    pub fn process(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Process {
            program: program.into(),
            source,
        }
    }
}
