//! Workflow domain types
//!
//! A workflow is the parsed form of a `hoist.lua` definition: which events
//! trigger it, where the image is published, and the ordered steps to run.

use serde::{Deserialize, Serialize};

use super::step::StepDefinition;

/// Registry host used when a workflow does not name one
pub const DEFAULT_REGISTRY_HOST: &str = "docker.io";

/// Secret name holding the registry username when none is configured
pub const DEFAULT_USERNAME_SECRET: &str = "REGISTRY_USERNAME";

/// Secret name holding the registry password when none is configured
pub const DEFAULT_PASSWORD_SECRET: &str = "REGISTRY_PASSWORD";

/// Complete workflow definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,
    pub description: Option<String>,
    pub triggers: TriggerConfig,
    pub registry: RegistryConfig,
    pub image: ImageConfig,
    pub steps: Vec<StepDefinition>,
}

/// Events that start a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Branch allow-list for push events (exact match)
    pub push_branches: Vec<String>,
    /// Whether an operator may start a run by hand
    pub manual: bool,
}

impl TriggerConfig {
    /// Returns true if a push to `branch` starts a run
    pub fn allows_branch(&self, branch: &str) -> bool {
        self.push_branches.iter().any(|b| b == branch)
    }
}

/// Remote registry and the names of the secrets used to log in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub host: String,
    pub username_secret: String,
    pub password_secret: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_REGISTRY_HOST.to_string(),
            username_secret: DEFAULT_USERNAME_SECRET.to_string(),
            password_secret: DEFAULT_PASSWORD_SECRET.to_string(),
        }
    }
}

impl RegistryConfig {
    /// Docker Hub accepts unqualified references
    pub fn is_default_host(&self) -> bool {
        self.host == DEFAULT_REGISTRY_HOST
    }
}

/// Image produced by the build step and published by the push step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Local image name produced by the build
    pub name: String,
    /// Fully qualified repository to publish to, if not derived from the username
    pub repository: Option<String>,
    /// Literal tag label applied before publishing
    pub tag: String,
}

impl ImageConfig {
    /// Whether the publish reference depends on the registry username
    pub fn needs_username(&self) -> bool {
        self.repository.is_none()
    }

    /// Reference the tag and push steps operate on
    ///
    /// An explicit repository wins. Otherwise the repository is
    /// `<username>/<name>`, qualified with the registry host unless it is
    /// Docker Hub.
    pub fn publish_reference(&self, registry: &RegistryConfig, username: Option<&str>) -> String {
        let repository = match (&self.repository, username) {
            (Some(repository), _) => repository.clone(),
            (None, Some(user)) if registry.is_default_host() => format!("{}/{}", user, self.name),
            (None, Some(user)) => format!("{}/{}/{}", registry.host, user, self.name),
            (None, None) => self.name.clone(),
        };
        format!("{}:{}", repository, self.tag)
    }
}
