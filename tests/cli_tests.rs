// Command-line behavior of the branch-publish binary

mod fixtures;

use assert_cmd::Command;
use predicates::prelude::*;

use fixtures::git_harness::{git_available, GitHarness};

fn branch_publish() -> Command {
    Command::cargo_bin("branch-publish").unwrap()
}

#[test]
fn test_help_lists_commands() {
    branch_publish()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("publish"))
        .stdout(predicate::str::contains("clean"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_publish_help_lists_flags() {
    branch_publish()
        .args(["publish", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--branch"))
        .stdout(predicate::str::contains("--no-history"))
        .stdout(predicate::str::contains("--silent"));
}

#[test]
fn test_config_flags_override_defaults() {
    let dir = tempfile::tempdir().unwrap();
    branch_publish()
        .current_dir(dir.path())
        .args(["config", "-b", "docs", "-m", "Deploy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("branch = \"docs\""))
        .stdout(predicate::str::contains("message = \"Deploy\""))
        .stdout(predicate::str::contains("remote = \"origin\""));
}

#[test]
fn test_config_reads_options_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("branch-publish.toml"),
        "branch = \"pages\"\ndotfiles = true\n",
    )
    .unwrap();

    branch_publish()
        .current_dir(dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("branch = \"pages\""))
        .stdout(predicate::str::contains("dotfiles = true"));
}

#[test]
fn test_config_reads_environment() {
    let dir = tempfile::tempdir().unwrap();
    branch_publish()
        .current_dir(dir.path())
        .env("BRANCH_PUBLISH_BRANCH", "from-env")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("branch = \"from-env\""));
}

#[test]
fn test_config_rejects_dist() {
    let dir = tempfile::tempdir().unwrap();
    branch_publish()
        .current_dir(dir.path())
        .args(["config", "--dist", "out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--dist"));
}

#[test]
fn test_dotenv_file_is_loaded_and_logged() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".env"), "BRANCH_PUBLISH_BRANCH=from-dotenv\n").unwrap();

    branch_publish()
        .current_dir(dir.path())
        .env_remove("RUST_LOG")
        .args(["-v", "config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("branch = \"from-dotenv\""))
        .stderr(predicate::str::contains("Loaded environment variables from .env file"));
}

#[test]
fn test_publish_missing_base_dir_fails() {
    let dir = tempfile::tempdir().unwrap();
    branch_publish()
        .current_dir(dir.path())
        .args(["publish", "-d", "no-such-dir", "-r", "file:///nowhere.git"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_publish_rejects_malformed_user() {
    branch_publish()
        .args(["publish", "-u", "no-email-here"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected \"Name <email@example.com>\""));
}

#[cfg(target_os = "linux")]
#[test]
fn test_clean_removes_cache_root() {
    let cache = tempfile::tempdir().unwrap();
    let root = cache.path().join("branch-publish");
    std::fs::create_dir_all(root.join("some!repo")).unwrap();

    branch_publish()
        .env("XDG_CACHE_HOME", cache.path())
        .arg("clean")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed"));

    assert!(!root.exists());
}

#[test]
fn test_publish_end_to_end() {
    if !git_available() {
        eprintln!("git not found on PATH; skipping");
        return;
    }
    let harness = GitHarness::new().unwrap();
    harness.write("index.html", "cli").unwrap();

    branch_publish()
        .current_dir(harness.path())
        .args(["publish", "-d", "dist", "-b", "gh-pages", "-r"])
        .arg(harness.remote_url())
        .arg("--clone-dir")
        .arg(harness.clone_dir())
        .args(["-u", "Cli Test <cli@example.com>", "-m", "From the CLI"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created branch gh-pages"))
        .stdout(predicate::str::contains("Published"));

    assert_eq!(harness.remote_files("gh-pages").unwrap(), vec!["index.html"]);

    branch_publish()
        .current_dir(harness.path())
        .args(["publish", "-d", "dist", "-b", "gh-pages", "-r"])
        .arg(harness.remote_url())
        .arg("--clone-dir")
        .arg(harness.clone_dir())
        .args(["-u", "Cli Test <cli@example.com>"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No changes to commit on gh-pages"));
}
