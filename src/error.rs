//! Error taxonomy for branch publishing.
//!
//! Three layers, leaf first:
//! - [`ProcessError`] / [`CommandError`]: a single external invocation failed.
//! - [`GitError`]: a repository operation failed, either because git did or
//!   because the environment is missing configuration.
//! - [`PublishError`]: the end-to-end workflow failed.

use std::path::PathBuf;
use thiserror::Error;

/// A process that ran to completion but exited with a nonzero status.
///
/// `message` is the combined stdout/stderr text of the process, or a
/// synthesized message naming the exit code when the process printed nothing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ProcessError {
    pub code: i32,
    pub message: String,
}

impl ProcessError {
    pub fn new(code: i32, output: impl Into<String>) -> Self {
        let output = output.into();
        let message = if output.is_empty() {
            format!("Process failed: {code}")
        } else {
            output
        };
        Self { code, message }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Command not found: {command}")]
    CommandNotFound { command: String },
    #[error("Failed to run {command}: {message}")]
    Io { command: String, message: String },
    #[error("Command {command} timed out after {timeout_ms}ms")]
    Timeout { command: String, timeout_ms: u64 },
    #[error(transparent)]
    Failed(#[from] ProcessError),
}

impl CommandError {
    /// The exit status failure, if the process ran and exited nonzero.
    pub fn process(&self) -> Option<&ProcessError> {
        match self {
            CommandError::Failed(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum GitError {
    #[error(transparent)]
    Command(#[from] CommandError),
    /// No URL is configured for the remote. Never carries the URL itself.
    #[error(
        "Failed to get remote.{remote}.url (run in a git repository with a configured \
         {remote} remote or set the \"repo\" option)"
    )]
    RemoteUrlMissing { remote: String },
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GitError {
    pub fn process(&self) -> Option<&ProcessError> {
        match self {
            GitError::Command(err) => err.process(),
            _ => None,
        }
    }
}

impl From<ProcessError> for GitError {
    fn from(err: ProcessError) -> Self {
        GitError::Command(CommandError::Failed(err))
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Base directory {} does not exist or is not a directory", path.display())]
    MissingBaseDir { path: PathBuf },
    #[error("The src patterns did not match any files in {}", path.display())]
    NoFiles { path: PathBuf },
    #[error("Invalid glob pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
    #[error(
        "Remote url mismatch. Got {actual:?} but expected {expected:?} in {}. \
         Try running `branch-publish clean` first.",
        dir.display()
    )]
    RemoteMismatch {
        actual: String,
        expected: String,
        dir: PathBuf,
    },
    #[error("Clone directory {} is locked by another publish run", dir.display())]
    Locked { dir: PathBuf },
    #[error(transparent)]
    Git(#[from] GitError),
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unspecified error (run without silent option for detail)")]
    Suppressed,
}

impl PublishError {
    /// Whether the message may embed process output or repository URLs,
    /// either of which can carry credentials.
    pub fn may_leak_secrets(&self) -> bool {
        match self {
            PublishError::MissingBaseDir { .. }
            | PublishError::NoFiles { .. }
            | PublishError::Pattern { .. }
            | PublishError::Locked { .. }
            | PublishError::Suppressed => false,
            PublishError::Git(GitError::RemoteUrlMissing { .. }) => false,
            PublishError::Git(_) | PublishError::RemoteMismatch { .. } | PublishError::Io { .. } => {
                true
            }
        }
    }

    /// Replace the error with [`PublishError::Suppressed`] when silent
    /// reporting was requested and the message could leak secrets.
    pub fn suppress_if(self, silent: bool) -> Self {
        if silent && self.may_leak_secrets() {
            PublishError::Suppressed
        } else {
            self
        }
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> PublishError {
    PublishError::Io {
        path: path.into(),
        source,
    }
}
