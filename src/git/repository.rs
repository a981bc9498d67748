//! Repository handle: one working directory, one git executable.
//!
//! Every operation issues exactly one `git` invocation (checkout and commit
//! issue a probe first) through the [`CommandExecutor`] seam. Operations that
//! mutate the working directory take `&mut self`, so a handle cannot run two
//! of them at once.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::error::{CommandError, GitError};
use crate::external::{CommandExecutor, ProcessCommandExecutor};

/// Exit status `git ls-remote --exit-code` uses for "no matching ref".
const LS_REMOTE_NO_MATCH: i32 = 2;

/// Result of probing for `<remote>/<branch>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefProbe {
    Found,
    NotFound,
}

/// How [`Repository::checkout`] acquired the branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkout {
    /// Checked out and hard-reset to the remote tip.
    Existing,
    /// Created as a new orphan branch.
    Orphan,
}

/// Whether the index differs from HEAD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Unchanged,
    Changed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// Nothing staged differed from HEAD, so no commit was made.
    Unchanged,
}

/// An ordered list of pathspecs. A single path converts to a one-element list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathList(Vec<String>);

impl PathList {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<&str> for PathList {
    fn from(path: &str) -> Self {
        Self(vec![path.to_string()])
    }
}

impl From<String> for PathList {
    fn from(path: String) -> Self {
        Self(vec![path])
    }
}

impl From<Vec<String>> for PathList {
    fn from(paths: Vec<String>) -> Self {
        Self(paths)
    }
}

impl From<Vec<&str>> for PathList {
    fn from(paths: Vec<&str>) -> Self {
        paths.into_iter().collect()
    }
}

impl From<&[&str]> for PathList {
    fn from(paths: &[&str]) -> Self {
        paths.iter().copied().collect()
    }
}

impl From<&[String]> for PathList {
    fn from(paths: &[String]) -> Self {
        Self(paths.to_vec())
    }
}

impl<const N: usize> From<[&str; N]> for PathList {
    fn from(paths: [&str; N]) -> Self {
        paths.into_iter().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for PathList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A git working directory bound to a git executable.
pub struct Repository {
    cwd: PathBuf,
    executable: String,
    executor: Arc<dyn CommandExecutor>,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("cwd", &self.cwd)
            .field("executable", &self.executable)
            .finish_non_exhaustive()
    }
}

impl Repository {
    /// Bind to `cwd`, running the real `executable` (e.g. `"git"`).
    pub fn new(cwd: impl Into<PathBuf>, executable: impl Into<String>) -> Self {
        Self::with_executor(cwd, executable, Arc::new(ProcessCommandExecutor::new()))
    }

    pub fn with_executor(
        cwd: impl Into<PathBuf>,
        executable: impl Into<String>,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self {
            cwd: cwd.into(),
            executable: executable.into(),
            executor,
        }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    async fn run(&self, args: Vec<String>) -> Result<String, CommandError> {
        self.executor
            .execute(&self.executable, &args, &self.cwd)
            .await
    }

    /// Run an arbitrary git subcommand and return its combined output.
    pub async fn exec<I, S>(&mut self, args: I) -> Result<String, GitError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args = args.into_iter().map(Into::into).collect();
        Ok(self.run(args).await?)
    }

    pub async fn init(&mut self) -> Result<&mut Self, GitError> {
        self.exec(["init"]).await?;
        Ok(self)
    }

    /// Remove untracked files and directories.
    pub async fn clean(&mut self) -> Result<&mut Self, GitError> {
        self.exec(["clean", "-f", "-d"]).await?;
        Ok(self)
    }

    /// Hard-reset to `<remote>/<branch>`, discarding local modifications.
    pub async fn reset(&mut self, remote: &str, branch: &str) -> Result<&mut Self, GitError> {
        self.exec(["reset".to_string(), "--hard".to_string(), format!("{remote}/{branch}")])
            .await?;
        Ok(self)
    }

    pub async fn fetch(&mut self, remote: &str) -> Result<&mut Self, GitError> {
        self.exec(["fetch", remote]).await?;
        Ok(self)
    }

    /// Probe whether `<remote>/<branch>` exists in the local repository.
    ///
    /// Exit status 2 means no such ref; every other failure is returned as an
    /// error.
    pub async fn probe_remote_branch(&self, remote: &str, branch: &str) -> Result<RefProbe, GitError> {
        let treeish = format!("{remote}/{branch}");
        let args = vec![
            "ls-remote".to_string(),
            "--exit-code".to_string(),
            ".".to_string(),
            treeish,
        ];
        match self.run(args).await {
            Ok(_) => Ok(RefProbe::Found),
            Err(CommandError::Failed(err)) if err.code == LS_REMOTE_NO_MATCH => {
                Ok(RefProbe::NotFound)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Check out `branch`, matching `<remote>/<branch>` exactly when it
    /// exists and starting an orphan branch with no history and an empty
    /// working tree when it does not.
    #[instrument(level = "debug", skip(self), fields(cwd = %self.cwd.display()))]
    pub async fn checkout(&mut self, remote: &str, branch: &str) -> Result<Checkout, GitError> {
        match self.probe_remote_branch(remote, branch).await? {
            RefProbe::Found => {
                debug!("remote branch exists, resetting to its tip");
                self.exec(["checkout", branch]).await?;
                self.clean().await?.reset(remote, branch).await?;
                Ok(Checkout::Existing)
            }
            RefProbe::NotFound => {
                info!(branch, "remote branch not found, creating orphan branch");
                self.exec(["checkout", "--orphan", branch]).await?;
                // The orphan keeps the previous index and tree; start it empty.
                self.rm(".").await?.clean().await?;
                Ok(Checkout::Orphan)
            }
        }
    }

    /// Stage removal of `files`. Unmatched paths are ignored.
    pub async fn rm(&mut self, files: impl Into<PathList>) -> Result<&mut Self, GitError> {
        let files = files.into();
        let mut args: Vec<String> = ["rm", "--ignore-unmatch", "-r", "-f", "--"]
            .into_iter()
            .map(String::from)
            .collect();
        args.extend(files.0);
        self.exec(args).await?;
        Ok(self)
    }

    pub async fn add(&mut self, files: impl Into<PathList>) -> Result<&mut Self, GitError> {
        let files = files.into();
        let mut args = vec!["add".to_string()];
        args.extend(files.0);
        self.exec(args).await?;
        Ok(self)
    }

    /// Compare the index against HEAD. A missing HEAD (fresh orphan branch)
    /// counts as changed.
    pub async fn index_state(&self) -> Result<IndexState, GitError> {
        let args = vec![
            "diff-index".to_string(),
            "--quiet".to_string(),
            "HEAD".to_string(),
        ];
        match self.run(args).await {
            Ok(_) => Ok(IndexState::Unchanged),
            Err(CommandError::Failed(_)) => Ok(IndexState::Changed),
            Err(err) => Err(err.into()),
        }
    }

    /// Commit staged changes, or do nothing if the index matches HEAD.
    #[instrument(level = "debug", skip(self, message), fields(cwd = %self.cwd.display()))]
    pub async fn commit(&mut self, message: &str) -> Result<CommitOutcome, GitError> {
        match self.index_state().await? {
            IndexState::Unchanged => {
                info!("no changes to commit");
                Ok(CommitOutcome::Unchanged)
            }
            IndexState::Changed => {
                self.exec(["commit", "-m", message]).await?;
                Ok(CommitOutcome::Committed)
            }
        }
    }

    pub async fn tag(&mut self, name: &str) -> Result<&mut Self, GitError> {
        self.exec(["tag", name]).await?;
        Ok(self)
    }

    /// Push `branch` and all tags to `remote`.
    #[instrument(level = "debug", skip(self), fields(cwd = %self.cwd.display()))]
    pub async fn push(&mut self, remote: &str, branch: &str, force: bool) -> Result<&mut Self, GitError> {
        self.exec(sync_args("push", remote, branch, force)).await?;
        Ok(self)
    }

    /// Pull `branch` and all tags from `remote`.
    pub async fn pull(&mut self, remote: &str, branch: &str, force: bool) -> Result<&mut Self, GitError> {
        self.exec(sync_args("pull", remote, branch, force)).await?;
        Ok(self)
    }

    /// Set a repository-local config value.
    pub async fn config(&mut self, key: &str, value: &str) -> Result<&mut Self, GitError> {
        self.exec(["config", key, value]).await?;
        Ok(self)
    }

    /// Read the URL configured for `remote` (first line of output).
    pub async fn get_remote_url(&self, remote: &str) -> Result<String, GitError> {
        let args = vec![
            "config".to_string(),
            "--get".to_string(),
            format!("remote.{remote}.url"),
        ];
        let missing = || GitError::RemoteUrlMissing {
            remote: remote.to_string(),
        };
        let output = match self.run(args).await {
            Ok(output) => output,
            Err(CommandError::Failed(_)) => return Err(missing()),
            Err(err) => return Err(err.into()),
        };

        output
            .split(['\n', '\r'])
            .next()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(String::from)
            .ok_or_else(missing)
    }

    /// Delete the local ref `refs/heads/<branch>` without touching the
    /// working tree.
    pub async fn delete_ref(&mut self, branch: &str) -> Result<&mut Self, GitError> {
        self.exec(["update-ref".to_string(), "-d".to_string(), format!("refs/heads/{branch}")])
            .await?;
        Ok(self)
    }
}

fn sync_args(subcommand: &str, remote: &str, branch: &str, force: bool) -> Vec<String> {
    let mut args = vec![
        subcommand.to_string(),
        "--tags".to_string(),
        remote.to_string(),
        branch.to_string(),
    ];
    if force {
        args.push("--force".to_string());
    }
    args
}
