//! Runner configuration
//!
//! Where workspaces live, which container engine and git binary to call,
//! and whether workspaces survive the run.

use std::path::PathBuf;

use crate::error::{Result, RunnerError};
use crate::planner::EngineKind;

/// Runner configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory under which each run gets its own workspace
    pub workspace_base: PathBuf,

    /// Container engine used for builder setup, login, build, tag and push
    pub engine: EngineKind,

    /// Git executable used by the checkout step
    pub git_program: String,

    /// Keep the workspace after the run instead of deleting it
    pub keep_workspace: bool,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Recognized environment variables:
    /// - HOIST_WORKSPACE_BASE (optional, default: `<tmp>/hoist`)
    /// - HOIST_ENGINE (optional, `docker` or `podman`, default: docker)
    /// - HOIST_GIT (optional, default: git)
    /// - HOIST_KEEP_WORKSPACE (optional, `1`/`true`, default: false)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let workspace_base = lookup("HOIST_WORKSPACE_BASE")
            .map(PathBuf::from)
            .unwrap_or(defaults.workspace_base);

        let engine = match lookup("HOIST_ENGINE") {
            Some(value) => value.parse::<EngineKind>()?,
            None => defaults.engine,
        };

        let git_program = lookup("HOIST_GIT").unwrap_or(defaults.git_program);

        let keep_workspace = match lookup("HOIST_KEEP_WORKSPACE") {
            Some(value) => parse_flag(&value)?,
            None => defaults.keep_workspace,
        };

        Ok(Self {
            workspace_base,
            engine,
            git_program,
            keep_workspace,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.workspace_base.as_os_str().is_empty() {
            return Err(RunnerError::Config(
                "workspace_base cannot be empty".to_string(),
            ));
        }

        if self.git_program.trim().is_empty() {
            return Err(RunnerError::Config(
                "git_program cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_base: std::env::temp_dir().join("hoist"),
            engine: EngineKind::Docker,
            git_program: "git".to_string(),
            keep_workspace: false,
        }
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(RunnerError::Config(format!(
            "expected a boolean flag, got '{}'",
            other
        ))),
    }
}
