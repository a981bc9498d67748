//! Test harness for publishing against a real bare repository on disk

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use branch_publish::{PublishOptions, User};

/// Whether a usable `git` is on PATH. Tests return early when it is not.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Run git in `dir` and return trimmed stdout, failing on nonzero exit.
pub fn git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git").args(args).current_dir(dir).output()?;
    if !output.status.success() {
        bail!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// A temp directory holding a bare remote, a source tree and a clone location
pub struct GitHarness {
    temp_dir: TempDir,
}

impl GitHarness {
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let harness = Self { temp_dir };
        std::fs::create_dir_all(harness.dist())?;
        git(harness.path(), &["init", "--quiet", "--bare", "remote.git"])?;
        Ok(harness)
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn remote(&self) -> PathBuf {
        self.path().join("remote.git")
    }

    pub fn remote_url(&self) -> String {
        format!("file://{}", self.remote().display())
    }

    pub fn dist(&self) -> PathBuf {
        self.path().join("dist")
    }

    pub fn clone_dir(&self) -> PathBuf {
        self.path().join("clone")
    }

    /// Write a file under the source tree
    pub fn write(&self, relative_path: &str, content: &str) -> Result<()> {
        let path = self.dist().join(relative_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn delete(&self, relative_path: &str) -> Result<()> {
        std::fs::remove_file(self.dist().join(relative_path))?;
        Ok(())
    }

    /// Options pointing at this harness's remote and clone directory
    pub fn options(&self, branch: &str) -> PublishOptions {
        PublishOptions {
            repo: Some(self.remote_url()),
            clone_dir: Some(self.clone_dir().to_string_lossy().into_owned()),
            branch: branch.to_string(),
            user: Some(User {
                name: "Publish Test".to_string(),
                email: "publish@example.com".to_string(),
            }),
            ..PublishOptions::default()
        }
    }

    /// Commit a single file to `branch` of the remote and make it the
    /// remote's default branch.
    pub fn seed_branch(&self, branch: &str, file: &str, content: &str) -> Result<()> {
        let seed = self.path().join("seed");
        git(self.path(), &["init", "--quiet", "seed"])?;
        let head = format!("refs/heads/{branch}");
        git(&seed, &["symbolic-ref", "HEAD", &head])?;
        std::fs::write(seed.join(file), content)?;
        git(&seed, &["add", file])?;
        git(
            &seed,
            &[
                "-c",
                "user.name=Seed",
                "-c",
                "user.email=seed@example.com",
                "commit",
                "--quiet",
                "-m",
                "seed",
            ],
        )?;
        git(&seed, &["push", "--quiet", &self.remote_url(), branch])?;
        git(&self.remote(), &["symbolic-ref", "HEAD", &head])?;
        Ok(())
    }

    /// Files on `branch` in the remote, sorted
    pub fn remote_files(&self, branch: &str) -> Result<Vec<String>> {
        let listing = git(&self.remote(), &["ls-tree", "-r", "--name-only", branch])?;
        let mut files: Vec<String> = listing.lines().map(String::from).collect();
        files.sort();
        Ok(files)
    }

    pub fn remote_file(&self, branch: &str, path: &str) -> Result<String> {
        git(&self.remote(), &["show", &format!("{branch}:{path}")])
    }

    pub fn remote_commit_count(&self, branch: &str) -> Result<usize> {
        Ok(git(&self.remote(), &["rev-list", "--count", branch])?.parse()?)
    }

    pub fn remote_branch_exists(&self, branch: &str) -> bool {
        git(
            &self.remote(),
            &["rev-parse", "--verify", "--quiet", &format!("refs/heads/{branch}")],
        )
        .is_ok()
    }
}
