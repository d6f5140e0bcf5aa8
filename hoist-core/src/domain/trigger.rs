//! Trigger domain types

use serde::{Deserialize, Serialize};

const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// An incoming event that may start a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerEvent {
    /// A push to `git_ref` (`refs/heads/<branch>` or a bare branch name)
    Push { git_ref: String },
    /// Explicit operator request, carries no parameters
    Manual,
}

impl TriggerEvent {
    pub fn push(git_ref: impl Into<String>) -> Self {
        TriggerEvent::Push {
            git_ref: git_ref.into(),
        }
    }

    pub fn source(&self) -> TriggerSource {
        match self {
            TriggerEvent::Push { .. } => TriggerSource::Push,
            TriggerEvent::Manual => TriggerSource::Manual,
        }
    }
}

/// How a run was started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerSource {
    Push,
    Manual,
}

impl std::fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerSource::Push => write!(f, "push"),
            TriggerSource::Manual => write!(f, "manual"),
        }
    }
}

/// Extracts the branch name from a pushed ref
///
/// `refs/heads/main` and `main` both yield `main`. Any other `refs/`
/// namespace (tags, notes, pull refs) is not a branch and yields `None`.
pub fn branch_from_ref(git_ref: &str) -> Option<&str> {
    let branch = match git_ref.strip_prefix(BRANCH_REF_PREFIX) {
        Some(branch) => branch,
        None if git_ref.starts_with("refs/") => return None,
        None => git_ref,
    };

    if branch.is_empty() { None } else { Some(branch) }
}
