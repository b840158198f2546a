//! Copies declared files and directories from a working copy into a bot.
//!
//! Directory sources merge into the destination (default: the bot root).
//! File sources land at `file_dst`, or at `file_src` mirrored under the bot
//! root; an existing directory at that spot receives the file under its
//! own name.

use super::errors::{Result, UpdateError};
use super::repo_config::{BotCfg, FileRule, RepoCfg};
use log::info;
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Joins `rel` below `base`, treating a leading `/` as relative.
fn join_relative(base: &Path, rel: &Path) -> PathBuf {
    let rel: PathBuf = rel
        .components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
        .collect();
    base.join(rel)
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to).map_err(|source| UpdateError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| UpdateError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Where a rule writes for a given source. Directory sources resolve to a
/// directory to merge into; file sources to the final file path.
pub fn resolve_destination(source: &Path, bot_dir: &Path, rule: &FileRule) -> PathBuf {
    if source.is_dir() {
        return match &rule.file_dst {
            Some(dst) => join_relative(bot_dir, dst),
            None => bot_dir.to_path_buf(),
        };
    }

    let dst = join_relative(bot_dir, rule.file_dst.as_ref().unwrap_or(&rule.file_src));
    match source.file_name() {
        Some(name) if dst.is_dir() => dst.join(name),
        _ => dst,
    }
}

/// Applies one rule. Returns the number of files written.
pub fn propagate(repo_dir: &Path, bot_dir: &Path, rule: &FileRule) -> Result<usize> {
    let source = join_relative(repo_dir, &rule.file_src);
    if !source.exists() {
        return Err(UpdateError::MissingSource { path: source });
    }
    let destination = resolve_destination(&source, bot_dir, rule);

    if source.is_dir() {
        info!("    Copying folder: {} to {}", source.display(), destination.display());
        return copy_tree(&source, &destination);
    }

    if let Some(parent) = destination.parent() {
        create_dir(parent)?;
    }
    info!("    Copying file: {} to {}", source.display(), destination.display());
    copy_file(&source, &destination)?;
    Ok(1)
}

/// Recursive merge copy. Symlinks are followed so their content is copied.
fn copy_tree(source: &Path, destination: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(source).unwrap_or(Path::new(""));
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            create_dir(&target)?;
        } else {
            copy_file(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Repository rules first, then the bot's own; stops at the first failure.
pub fn propagate_all(repo: &RepoCfg, bot: &BotCfg) -> Result<usize> {
    let mut copied = 0;
    for rule in repo.rules_for(bot) {
        copied += propagate(&repo.directory, &bot.directory, rule)?;
    }
    Ok(copied)
}
