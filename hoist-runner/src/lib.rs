//! Hoist Runner
//!
//! Executes workflow runs on the local machine.
//!
//! Architecture:
//! - Configuration: settings from environment variables or defaults
//! - Trigger: decides whether an event starts a run
//! - Planner: turns each step into the commands it runs
//! - Services: sequential execution and log buffering
//! - Command: the single seam through which processes are spawned
//!
//! A run executes its steps strictly in order inside an ephemeral
//! workspace and stops at the first failing step.

pub mod command;
pub mod config;
pub mod error;
pub mod planner;
pub mod secrets;
pub mod service;
pub mod trigger;
pub mod workspace;

pub use command::{CommandOutput, CommandRunner, CommandSpec, SystemCommandRunner};
pub use config::Config;
pub use error::{Result, RunnerError};
pub use planner::{EngineKind, StepContext, StepPlanner};
pub use secrets::{Credentials, EnvSecretStore, Secret, SecretStore, StaticSecretStore};
pub use service::{ExecutionService, InMemoryLogBuffer, LogBufferService, StandardExecutionService};
pub use trigger::TriggerDispatcher;
pub use workspace::Workspace;
