//! Secrets and registry credentials
//!
//! Secret values come from a `SecretStore`, by default the process
//! environment. They never appear in `Debug` or `Display` output and are
//! masked in logged command output.

use hoist_core::domain::run::CredentialRef;
use std::collections::HashMap;

use crate::error::{Result, RunnerError};

const MASK: &str = "***";

/// A secret value
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw value
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret({})", MASK)
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", MASK)
    }
}

/// Source of secret values
pub trait SecretStore: Send + Sync {
    /// Looks up a secret by name
    fn get(&self, name: &str) -> Option<Secret>;

    /// Looks up a secret, failing when it is absent or empty
    fn require(&self, name: &str) -> Result<Secret> {
        match self.get(name) {
            Some(secret) if !secret.expose().is_empty() => Ok(secret),
            _ => Err(RunnerError::MissingSecret(name.to_string())),
        }
    }
}

/// Reads secrets from environment variables of the same name
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecretStore;

impl SecretStore for EnvSecretStore {
    fn get(&self, name: &str) -> Option<Secret> {
        std::env::var(name).ok().map(Secret::new)
    }
}

/// Fixed set of secrets held in memory
#[derive(Debug, Default, Clone)]
pub struct StaticSecretStore {
    secrets: HashMap<String, Secret>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), Secret::new(value));
        self
    }
}

impl SecretStore for StaticSecretStore {
    fn get(&self, name: &str) -> Option<Secret> {
        self.secrets.get(name).cloned()
    }
}

/// Registry credential pair
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: Secret,
}

impl Credentials {
    /// Resolves both halves of the pair from `store`
    pub fn resolve(store: &dyn SecretStore, reference: &CredentialRef) -> Result<Self> {
        let username = store.require(&reference.username_secret)?;
        let password = store.require(&reference.password_secret)?;

        Ok(Self {
            username: username.expose().to_string(),
            password,
        })
    }
}

/// Replaces every occurrence of each non-empty secret in `text`
pub fn mask(text: &str, secrets: &[&Secret]) -> String {
    let mut masked = text.to_string();
    for secret in secrets {
        let value = secret.expose();
        if !value.is_empty() {
            masked = masked.replace(value, MASK);
        }
    }
    masked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> CredentialRef {
        CredentialRef {
            username_secret: "DOCKER_USERNAME".to_string(),
            password_secret: "DOCKER_PASSWORD".to_string(),
        }
    }

    #[test]
    fn test_secret_is_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{}", secret), "***");
        assert!(!format!("{:?}", secret).contains("hunter2"));
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_resolve_credentials() {
        let store = StaticSecretStore::new()
            .with("DOCKER_USERNAME", "octo")
            .with("DOCKER_PASSWORD", "hunter2");

        let credentials = Credentials::resolve(&store, &reference()).unwrap();
        assert_eq!(credentials.username, "octo");
        assert_eq!(credentials.password.expose(), "hunter2");
    }

    #[test]
    fn test_resolve_missing_password() {
        let store = StaticSecretStore::new().with("DOCKER_USERNAME", "octo");

        let err = Credentials::resolve(&store, &reference()).unwrap_err();
        assert!(matches!(err, RunnerError::MissingSecret(ref name) if name == "DOCKER_PASSWORD"));
    }

    #[test]
    fn test_empty_secret_counts_as_missing() {
        let store = StaticSecretStore::new().with("TOKEN", "");
        assert!(store.require("TOKEN").is_err());
    }

    #[test]
    fn test_env_store_missing_variable() {
        let store = EnvSecretStore;
        assert!(store.get("HOIST_TEST_SECRET_THAT_IS_NEVER_SET").is_none());
    }

    #[test]
    fn test_mask() {
        let password = Secret::new("hunter2");
        let empty = Secret::new("");
        let masked = mask("login with hunter2 ok", &[&password, &empty]);
        assert_eq!(masked, "login with *** ok");
    }
}
