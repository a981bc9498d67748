use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::git::CloneOptions;

/// Name of the optional configuration file, looked up in the working directory.
pub const CONFIG_FILE: &str = "branch-publish.toml";

/// Prefix for environment overrides, e.g. `BRANCH_PUBLISH_BRANCH=gh-pages`.
pub const ENV_PREFIX: &str = "BRANCH_PUBLISH";

/// Options controlling a publish run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PublishOptions {
    /// Git executable (name on PATH or absolute path)
    pub git: String,
    /// Remote alias
    pub remote: String,
    /// Target branch
    pub branch: String,
    /// History depth for the initial shallow clone
    pub depth: u32,
    /// Directory inside the target branch that receives the files
    pub dest: String,
    /// Globs selecting the files to publish, relative to the base directory
    pub src: Vec<String>,
    /// Glob selecting existing files to remove before copying (`.` = all)
    pub remove: String,
    /// Only add files, never remove existing ones
    pub add: bool,
    /// Include files and directories whose names start with a dot
    pub dotfiles: bool,
    /// Push after committing
    pub push: bool,
    /// Keep the branch history; when false the branch is recreated and force-pushed
    pub history: bool,
    /// Commit message
    pub message: String,
    /// Tag to create at the new commit
    pub tag: Option<String>,
    /// Repository URL; defaults to the URL of `remote` in the current directory
    pub repo: Option<String>,
    /// Where to keep the working copy; defaults to a per-URL cache directory
    pub clone_dir: Option<String>,
    /// Write an empty `.nojekyll` file
    pub nojekyll: bool,
    /// Write a `CNAME` file with this domain
    pub cname: Option<String>,
    /// Hide error detail that may contain credentials
    pub silent: bool,
    /// Kill git processes running longer than this many seconds
    pub timeout_secs: Option<u64>,
    /// Commit identity; defaults to the git configuration
    pub user: Option<User>,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            git: "git".to_string(),
            remote: "origin".to_string(),
            branch: "master".to_string(),
            depth: 1,
            dest: ".".to_string(),
            src: vec!["**/*".to_string()],
            remove: ".".to_string(),
            add: false,
            dotfiles: false,
            push: true,
            history: true,
            message: "Updates".to_string(),
            tag: None,
            repo: None,
            clone_dir: None,
            nojekyll: false,
            cname: None,
            silent: false,
            timeout_secs: None,
            user: None,
        }
    }
}

impl PublishOptions {
    /// Load options from multiple sources with precedence:
    /// 1. Default values
    /// 2. `branch-publish.toml` in the current directory
    /// 3. Environment variables (prefixed with BRANCH_PUBLISH_)
    pub fn load() -> Result<Self> {
        Self::load_from(&std::env::current_dir()?)
    }

    /// Same as [`PublishOptions::load`], reading the file from `dir`.
    pub fn load_from(dir: &Path) -> Result<Self> {
        Self::load_with(dir, environment())
    }

    fn load_with(dir: &Path, env: Environment) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(dir.join(CONFIG_FILE)).required(false))
            .add_source(env)
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Save options as TOML
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    pub fn clone_options(&self) -> CloneOptions {
        CloneOptions {
            executable: self.git.clone(),
            remote: self.remote.clone(),
            depth: self.depth,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("src")
}

/// Commit identity
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Could not parse user {0:?}, expected \"Name <email@example.com>\"")]
pub struct InvalidUser(pub String);

impl FromStr for User {
    type Err = InvalidUser;

    /// Parse `Name <email>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidUser(s.to_string());
        let (name, rest) = s.trim().split_once('<').ok_or_else(invalid)?;
        let email = rest.strip_suffix('>').ok_or_else(invalid)?.trim();
        let name = name.trim();
        if name.is_empty() || email.is_empty() || !email.contains('@') {
            return Err(invalid());
        }
        Ok(User {
            name: name.to_string(),
            email: email.to_string(),
        })
    }
}
