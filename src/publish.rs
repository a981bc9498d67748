//! End-to-end publish workflow.
//!
//! Composes the repository operations in a fixed order: obtain working copy,
//! check out the target branch, replace its files, commit, tag, push. Each
//! step finishes before the next starts.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tracing::{info, info_span, Instrument};

use crate::cache::{cache_dir_for, CloneLock};
use crate::config::PublishOptions;
use crate::error::{io_err, GitError, PublishError};
use crate::external::{CommandExecutor, ProcessCommandExecutor};
use crate::files::{copy_files, removal_targets, select_files};
use crate::git::{Checkout, CommitOutcome, Repository};
use crate::telemetry::generate_correlation_id;

pub type HookFuture<'a> = Pin<Box<dyn Future<Output = Result<(), GitError>> + Send + 'a>>;

/// Callback run with the live repository after files are copied and before
/// they are staged.
pub type BeforeAddHook = Box<dyn for<'a> FnOnce(&'a mut Repository) -> HookFuture<'a> + Send>;

/// Box a closure as a [`BeforeAddHook`].
///
/// ```no_run
/// use branch_publish::error::GitError;
/// use branch_publish::publish::before_add;
///
/// let hook = before_add(|repo| {
///     Box::pin(async move {
///         repo.rm("drafts").await?;
///         Ok::<(), GitError>(())
///     })
/// });
/// ```
pub fn before_add<F>(hook: F) -> BeforeAddHook
where
    F: for<'a> FnOnce(&'a mut Repository) -> HookFuture<'a> + Send + 'static,
{
    Box::new(hook)
}

/// What a publish run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub clone_dir: PathBuf,
    pub checkout: Checkout,
    pub commit: CommitOutcome,
    pub tagged: bool,
    pub pushed: bool,
}

pub struct Publisher {
    options: PublishOptions,
    cwd: PathBuf,
    executor: Arc<dyn CommandExecutor>,
}

impl Publisher {
    /// `cwd` is where the repository URL is looked up when `repo` is unset,
    /// and what a relative `clone_dir` is resolved against.
    pub fn new(options: PublishOptions, cwd: impl Into<PathBuf>) -> Self {
        let executor = Arc::new(
            ProcessCommandExecutor::with_timeout(options.timeout()).redact_args(options.silent),
        );
        Self {
            options,
            cwd: cwd.into(),
            executor,
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn options(&self) -> &PublishOptions {
        &self.options
    }

    /// Publish the files under `base` to the configured branch.
    ///
    /// With `silent` set, errors that could carry credentials are replaced by
    /// [`PublishError::Suppressed`].
    pub async fn publish(
        &self,
        base: &Path,
        before_add: Option<BeforeAddHook>,
    ) -> Result<PublishReport, PublishError> {
        let span = info_span!(
            "publish",
            correlation.id = %generate_correlation_id(),
            branch = %self.options.branch,
            remote = %self.options.remote,
        );
        self.run(base, before_add)
            .instrument(span)
            .await
            .map_err(|e| e.suppress_if(self.options.silent))
    }

    async fn run(
        &self,
        base: &Path,
        before_add: Option<BeforeAddHook>,
    ) -> Result<PublishReport, PublishError> {
        let options = &self.options;

        let is_dir = tokio::fs::metadata(base)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(PublishError::MissingBaseDir {
                path: base.to_path_buf(),
            });
        }

        let files = select_files(base, &options.src, options.dotfiles).await?;
        if files.is_empty() {
            return Err(PublishError::NoFiles {
                path: base.to_path_buf(),
            });
        }

        let repo_url = self.repo_url().await?;
        let clone_dir = match &options.clone_dir {
            Some(dir) => self.cwd.join(dir),
            None => cache_dir_for(&repo_url),
        };

        let mut lock = CloneLock::open(&clone_dir)?;
        let _guard = lock.try_acquire()?;

        if options.silent {
            info!("cloning");
        } else {
            info!(url = %repo_url, dir = %clone_dir.display(), "cloning");
        }
        let mut repo = Repository::obtain_with_executor(
            &repo_url,
            &clone_dir,
            &options.branch,
            &options.clone_options(),
            Arc::clone(&self.executor),
        )
        .await?;

        let actual = repo.get_remote_url(&options.remote).await?;
        if actual != repo_url {
            return Err(PublishError::RemoteMismatch {
                actual,
                expected: repo_url,
                dir: repo.cwd().to_path_buf(),
            });
        }

        info!("cleaning");
        repo.clean().await?;
        info!("fetching {}", options.remote);
        repo.fetch(&options.remote).await?;
        info!("checking out {}/{}", options.remote, options.branch);
        let checkout = repo.checkout(&options.remote, &options.branch).await?;

        if !options.history {
            info!("dropping branch history");
            repo.delete_ref(&options.branch).await?;
        }

        if !options.add {
            let targets = removal_targets(repo.cwd(), &options.dest, &options.remove).await?;
            if !targets.is_empty() {
                info!(count = targets.len(), "removing existing files");
                repo.rm(targets).await?;
            }
        }

        let dest_dir = repo.cwd().join(&options.dest);
        info!(count = files.len(), "copying files");
        copy_files(&files, base, &dest_dir).await?;
        self.write_extras(&dest_dir).await?;

        if let Some(hook) = before_add {
            info!("running before-add hook");
            hook(&mut repo).await?;
        }

        info!("adding all");
        repo.add(".").await?;
        if let Some(user) = &options.user {
            repo.config("user.email", &user.email)
                .await?
                .config("user.name", &user.name)
                .await?;
        }

        info!("committing");
        let commit = repo.commit(&options.message).await?;

        let tagged = match &options.tag {
            Some(tag) => {
                info!(tag, "tagging");
                repo.tag(tag).await?;
                true
            }
            None => false,
        };

        if options.push {
            info!("pushing");
            repo.push(&options.remote, &options.branch, !options.history)
                .await?;
        }

        Ok(PublishReport {
            clone_dir: repo.cwd().to_path_buf(),
            checkout,
            commit,
            tagged,
            pushed: options.push,
        })
    }

    async fn repo_url(&self) -> Result<String, PublishError> {
        if let Some(url) = &self.options.repo {
            return Ok(url.clone());
        }
        let local = Repository::with_executor(
            &self.cwd,
            self.options.git.clone(),
            Arc::clone(&self.executor),
        );
        Ok(local.get_remote_url(&self.options.remote).await?)
    }

    async fn write_extras(&self, dest_dir: &Path) -> Result<(), PublishError> {
        if self.options.nojekyll {
            let path = dest_dir.join(".nojekyll");
            tokio::fs::write(&path, b"")
                .await
                .map_err(|e| io_err(&path, e))?;
        }
        if let Some(cname) = &self.options.cname {
            let path = dest_dir.join("CNAME");
            tokio::fs::write(&path, cname.as_bytes())
                .await
                .map_err(|e| io_err(&path, e))?;
        }
        Ok(())
    }
}
