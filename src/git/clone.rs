//! Clone-or-reuse factory for working directories.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::error::GitError;
use crate::external::{CommandExecutor, ProcessCommandExecutor};

use super::repository::Repository;

/// Settings the factory needs from the publish options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneOptions {
    /// Git executable.
    pub executable: String,
    /// Remote alias given to the clone's origin.
    pub remote: String,
    /// History depth for the shallow attempt.
    pub depth: u32,
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self {
            executable: "git".to_string(),
            remote: "origin".to_string(),
            depth: 1,
        }
    }
}

impl Repository {
    /// Obtain a working directory for `url` at `dir` using the real executor.
    pub async fn obtain(
        url: &str,
        dir: &Path,
        branch: &str,
        options: &CloneOptions,
    ) -> Result<Repository, GitError> {
        Self::obtain_with_executor(url, dir, branch, options, Arc::new(ProcessCommandExecutor::new()))
            .await
    }

    /// Reuse `dir` if it exists; otherwise clone `url` into it.
    ///
    /// A shallow single-branch clone is tried first. If it fails for any
    /// reason, exactly one full clone is attempted and its result is final.
    /// An existing directory is not checked for being the right repository.
    #[instrument(level = "debug", skip_all, fields(dir = %dir.display(), branch = %branch))]
    pub async fn obtain_with_executor(
        url: &str,
        dir: &Path,
        branch: &str,
        options: &CloneOptions,
        executor: Arc<dyn CommandExecutor>,
    ) -> Result<Repository, GitError> {
        let exists = tokio::fs::try_exists(dir).await.map_err(|source| GitError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        if exists {
            debug!("reusing existing working directory");
            return Ok(Repository::with_executor(dir, options.executable.clone(), executor));
        }

        let target = std::path::absolute(dir).map_err(|source| GitError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let parent = target.parent().map(Path::to_path_buf).unwrap_or_else(|| target.clone());
        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|source| GitError::Io {
                path: parent.clone(),
                source,
            })?;

        let target_arg = target.to_string_lossy().into_owned();
        let shallow = shallow_clone_args(url, &target_arg, branch, options);
        match executor.execute(&options.executable, &shallow, &parent).await {
            Ok(_) => info!("shallow clone complete"),
            Err(err) => {
                // The error text can embed the URL; keep it out of warn output.
                warn!("shallow clone failed, falling back to full clone");
                debug!(error = %err, "shallow clone error");
                let full = full_clone_args(url, &target_arg, options);
                executor.execute(&options.executable, &full, &parent).await?;
                info!("full clone complete");
            }
        }

        Ok(Repository::with_executor(
            target,
            options.executable.clone(),
            executor,
        ))
    }
}

fn shallow_clone_args(url: &str, dir: &str, branch: &str, options: &CloneOptions) -> Vec<String> {
    vec![
        "clone".to_string(),
        url.to_string(),
        dir.to_string(),
        "--branch".to_string(),
        branch.to_string(),
        "--single-branch".to_string(),
        "--origin".to_string(),
        options.remote.clone(),
        "--depth".to_string(),
        options.depth.to_string(),
    ]
}

fn full_clone_args(url: &str, dir: &str, options: &CloneOptions) -> Vec<String> {
    vec![
        "clone".to_string(),
        url.to_string(),
        dir.to_string(),
        "--origin".to_string(),
        options.remote.clone(),
    ]
}
