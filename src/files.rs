//! Source file selection and copying.
//!
//! Paths are handled relative to a base directory and always use forward
//! slashes, which is what the glob patterns are written against.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::error::{io_err, PublishError};

/// Build a matcher from glob patterns. `*` does not cross `/`; `**` does.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet, PublishError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| PublishError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| PublishError::Pattern {
        pattern: patterns.join(", "),
        source,
    })
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Walk `base` and return the sorted relative paths of regular files that
/// match any of `patterns`. Hidden entries are skipped unless `dotfiles` is
/// set; `.git` directories are always skipped.
pub async fn select_files(
    base: &Path,
    patterns: &[String],
    dotfiles: bool,
) -> Result<Vec<String>, PublishError> {
    let matcher = build_globset(patterns)?;
    let mut selected = Vec::new();
    let mut pending: Vec<(PathBuf, String)> = vec![(base.to_path_buf(), String::new())];

    while let Some((dir, prefix)) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| io_err(&dir, e))?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_err(&dir, e))? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == ".git" || (!dotfiles && is_hidden(&name)) {
                continue;
            }
            let relative = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}/{name}")
            };
            let file_type = entry.file_type().await.map_err(|e| io_err(entry.path(), e))?;
            if file_type.is_dir() {
                pending.push((entry.path(), relative));
            } else if matcher.is_match(&relative) {
                selected.push(relative);
            }
        }
    }

    selected.sort();
    debug!(base = %base.display(), count = selected.len(), "selected files");
    Ok(selected)
}

/// Paths under `dest` (relative to the working directory `root`) to remove
/// before copying new files. The pattern `.` selects `dest` itself.
pub async fn removal_targets(
    root: &Path,
    dest: &str,
    pattern: &str,
) -> Result<Vec<String>, PublishError> {
    if pattern == "." {
        return Ok(vec![dest.to_string()]);
    }
    let dest_dir = root.join(dest);
    if !tokio::fs::try_exists(&dest_dir)
        .await
        .map_err(|e| io_err(&dest_dir, e))?
    {
        return Ok(Vec::new());
    }
    let files = select_files(&dest_dir, &[pattern.to_string()], false).await?;
    Ok(files
        .into_iter()
        .map(|file| join_relative(dest, &file))
        .collect())
}

fn join_relative(dest: &str, file: &str) -> String {
    match dest.trim_end_matches('/') {
        "" | "." => file.to_string(),
        dest => format!("{dest}/{file}"),
    }
}

/// Copy each relative path in `files` from `from` to `to`, creating parent
/// directories and overwriting existing files.
pub async fn copy_files(files: &[String], from: &Path, to: &Path) -> Result<(), PublishError> {
    for file in files {
        let source = from.join(file);
        let target = to.join(file);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_err(parent, e))?;
        }
        tokio::fs::copy(&source, &target)
            .await
            .map_err(|e| io_err(&source, e))?;
    }
    debug!(count = files.len(), to = %to.display(), "copied files");
    Ok(())
}
