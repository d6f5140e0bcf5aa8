//! Ephemeral run workspace
//!
//! Each run gets `<base>/<run_id>`. The checkout step clones into it and
//! every later step runs with it as working directory. The directory is
//! removed when the workspace is dropped unless it is configured to stay.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, RunnerError};

/// Workspace directory owned by a single run
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    keep: bool,
}

impl Workspace {
    /// Creates an empty workspace for `run_id` under `base`
    pub fn create(base: &Path, run_id: Uuid, keep: bool) -> Result<Self> {
        let path = base.join(run_id.to_string());

        if path.exists() {
            std::fs::remove_dir_all(&path).map_err(|source| RunnerError::Workspace {
                path: path.clone(),
                source,
            })?;
        }

        std::fs::create_dir_all(&path).map_err(|source| RunnerError::Workspace {
            path: path.clone(),
            source,
        })?;

        info!("Created workspace {}", path.display());
        Ok(Self { path, keep })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.keep {
            info!("Keeping workspace {}", self.path.display());
            return;
        }

        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!("Removed workspace {}", self.path.display()),
            Err(e) => warn!("Failed to remove workspace {}: {}", self.path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_base() -> PathBuf {
        std::env::temp_dir().join(format!("hoist-ws-test-{}", Uuid::new_v4()))
    }

    #[test]
    fn test_workspace_is_removed_on_drop() {
        let base = test_base();
        let run_id = Uuid::new_v4();

        let path = {
            let workspace = Workspace::create(&base, run_id, false).unwrap();
            assert!(workspace.path().is_dir());
            assert_eq!(workspace.path(), base.join(run_id.to_string()));
            std::fs::write(workspace.path().join("Dockerfile"), "FROM scratch").unwrap();
            workspace.path().to_path_buf()
        };

        assert!(!path.exists());
        let _ = std::fs::remove_dir_all(&base);
    }

    #[test]
    fn test_workspace_can_be_kept() {
        let base = test_base();

        let path = {
            let workspace = Workspace::create(&base, Uuid::new_v4(), true).unwrap();
            workspace.path().to_path_buf()
        };

        assert!(path.is_dir());
        std::fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn test_workspace_starts_empty() {
        let base = test_base();
        let run_id = Uuid::new_v4();
        let stale = base.join(run_id.to_string());
        std::fs::create_dir_all(&stale).unwrap();
        std::fs::write(stale.join("leftover"), "x").unwrap();

        let workspace = Workspace::create(&base, run_id, false).unwrap();
        assert_eq!(std::fs::read_dir(workspace.path()).unwrap().count(), 0);

        drop(workspace);
        let _ = std::fs::remove_dir_all(&base);
    }
}
