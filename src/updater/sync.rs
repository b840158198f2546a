use super::errors::{Result, UpdateError};
use super::git_ops::{RevisionId, Vcs};
use super::repo_config::RepoCfg;
use log::{debug, info};
use std::path::{Path, PathBuf};

/// What happened to one repository during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Cloned {
        url: String,
        directory: PathBuf,
    },
    Updated {
        directory: PathBuf,
        from: RevisionId,
        to: RevisionId,
        message: String,
    },
    UpToDate {
        directory: PathBuf,
    },
    InvalidRepository {
        directory: PathBuf,
    },
    /// Directory missing and no url to clone from.
    Unresolved {
        directory: PathBuf,
    },
    Failed {
        directory: PathBuf,
        error: String,
    },
}

impl SyncOutcome {
    /// Only a new revision (or a fresh clone) triggers propagation.
    pub fn changed(&self) -> bool {
        matches!(self, SyncOutcome::Cloned { .. } | SyncOutcome::Updated { .. })
    }

    pub fn notification(&self) -> Option<String> {
        match self {
            SyncOutcome::Cloned { url, directory } => {
                Some(format!("Cloned repo {url} to {}", directory.display()))
            }
            SyncOutcome::Updated { directory, from, to, message } => Some(format!(
                "{} updated from {from} to {to} latest commit: {message}",
                directory.display()
            )),
            SyncOutcome::UpToDate { .. } => None,
            SyncOutcome::InvalidRepository { directory } => Some(format!(
                "Update failed, directory {} does not contain a valid git repository",
                directory.display()
            )),
            SyncOutcome::Unresolved { directory } => Some(format!(
                "Repo directory {} doesn't exist and URL isn't specified",
                directory.display()
            )),
            SyncOutcome::Failed { directory, error } => {
                Some(format!("Update failed for {}: {error}", directory.display()))
            }
        }
    }
}

/// Clones or pulls the working copy described by `repo`. Never fails: every
/// problem is folded into the returned outcome.
pub fn synchronize<V: Vcs>(vcs: &V, repo: &RepoCfg) -> SyncOutcome {
    let directory = repo.directory.clone();

    let result = if directory.is_dir() {
        if !vcs.is_working_copy(&directory) {
            return SyncOutcome::InvalidRepository { directory };
        }
        pull(vcs, &directory)
    } else if let Some(url) = &repo.url {
        vcs.clone_repo(url, &directory, repo.branch.as_deref())
            .map(|_| SyncOutcome::Cloned {
                url: url.clone(),
                directory: directory.clone(),
            })
    } else {
        Ok(SyncOutcome::Unresolved { directory: directory.clone() })
    };

    match result {
        Ok(outcome) => outcome,
        Err(UpdateError::InvalidRepository { source, .. }) => {
            debug!("{} is not a git repository: {source}", directory.display());
            SyncOutcome::InvalidRepository { directory }
        }
        Err(error) => SyncOutcome::Failed {
            directory,
            error: error.to_string(),
        },
    }
}

fn pull<V: Vcs>(vcs: &V, directory: &Path) -> Result<SyncOutcome> {
    let wc = vcs.open(directory)?;
    let before = vcs.head_revision(&wc)?;
    vcs.pull(&wc)?;
    let after = vcs.head_revision(&wc)?;

    if before == after {
        info!("Repo {} is already up to date", directory.display());
        return Ok(SyncOutcome::UpToDate { directory: directory.to_path_buf() });
    }

    Ok(SyncOutcome::Updated {
        directory: directory.to_path_buf(),
        from: before,
        to: after,
        message: vcs.latest_commit_message(&wc)?,
    })
}
