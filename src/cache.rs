//! Clone cache: where working copies live between runs, and the lock that
//! keeps two runs out of the same one.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fd_lock::RwLock;
use tracing::info;

use crate::error::{io_err, PublishError};

const CACHE_DIR_NAME: &str = "branch-publish";

/// Root of the clone cache: the user cache directory, or the temp directory
/// when the platform has none.
pub fn cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(CACHE_DIR_NAME)
}

/// Default working directory for `repo_url`. Credentials in the URL never
/// reach the directory name.
pub fn cache_dir_for(repo_url: &str) -> PathBuf {
    cache_root().join(sanitize(&strip_userinfo(repo_url)))
}

/// Drop the `user[:password]@` part of a URL's authority, for both
/// `scheme://` URLs and scp-style `user@host:path`.
pub fn strip_userinfo(repo_url: &str) -> String {
    let (scheme, rest) = match repo_url.split_once("://") {
        Some((scheme, rest)) => (Some(scheme), rest),
        None => (None, repo_url),
    };
    let mut authority_end = rest.find('/').unwrap_or(rest.len());
    if scheme.is_none() {
        if let Some(colon) = rest.find(':') {
            authority_end = authority_end.min(colon);
        }
    }
    match rest[..authority_end].rfind('@') {
        Some(at) => match scheme {
            Some(scheme) => format!("{scheme}://{}", &rest[at + 1..]),
            None => rest[at + 1..].to_string(),
        },
        None => repo_url.to_string(),
    }
}

/// Turn a URL into a single safe path component.
pub fn sanitize(repo_url: &str) -> String {
    repo_url
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '!'
            }
        })
        .collect()
}

/// Remove every cached working copy.
pub async fn clean_cache() -> Result<(), PublishError> {
    clean_cache_at(&cache_root()).await
}

/// Remove `root` recursively. A missing directory is not an error.
pub async fn clean_cache_at(root: &Path) -> Result<(), PublishError> {
    match tokio::fs::remove_dir_all(root).await {
        Ok(()) => {
            info!(dir = %root.display(), "removed clone cache");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_err(root, e)),
    }
}

/// Path of the lock file guarding `clone_dir`. It sits beside the clone so
/// `git clean` inside the clone never touches it.
pub fn lock_path(clone_dir: &Path) -> PathBuf {
    let mut name = clone_dir
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    clone_dir.with_file_name(name)
}

/// Exclusive lock on a clone directory for the length of one publish run.
pub struct CloneLock {
    lock: RwLock<File>,
    dir: PathBuf,
}

impl CloneLock {
    /// Open (creating parents) the lock file for `clone_dir`.
    pub fn open(clone_dir: &Path) -> Result<Self, PublishError> {
        let path = lock_path(clone_dir);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;
        Ok(Self {
            lock: RwLock::new(file),
            dir: clone_dir.to_path_buf(),
        })
    }

    /// Take the lock without waiting. Fails if another run holds it.
    pub fn try_acquire(&mut self) -> Result<fd_lock::RwLockWriteGuard<'_, File>, PublishError> {
        let dir = self.dir.clone();
        self.lock
            .try_write()
            .map_err(|_| PublishError::Locked { dir })
    }
}
