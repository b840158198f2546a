use super::errors::{Result, UpdateError};
use git2::{
    BranchType, Cred, CredentialType, FetchOptions, RemoteCallbacks, Repository,
    build::{CheckoutBuilder, RepoBuilder},
};
use log::{debug, info};
use std::fmt;
use std::path::Path;

/// Full hex id of a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionId(pub String);

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Version control operations needed to keep a working copy current.
pub trait Vcs: Send + Sync + 'static {
    type WorkingCopy;

    fn is_working_copy(&self, path: &Path) -> bool;
    fn clone_repo(&self, url: &str, path: &Path, branch: Option<&str>) -> Result<Self::WorkingCopy>;
    /// Fails with [`UpdateError::InvalidRepository`] when `path` is not a working copy.
    fn open(&self, path: &Path) -> Result<Self::WorkingCopy>;
    fn head_revision(&self, wc: &Self::WorkingCopy) -> Result<RevisionId>;
    fn pull(&self, wc: &Self::WorkingCopy) -> Result<()>;
    fn latest_commit_message(&self, wc: &Self::WorkingCopy) -> Result<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Git2Vcs;

fn fetch_options<'a>() -> FetchOptions<'a> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(|url, username_from_url, allowed| {
        if allowed.contains(CredentialType::SSH_KEY) {
            // Use SSH agent for authentication
            Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"))
        } else if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            let config = git2::Config::open_default()?;
            Cred::credential_helper(&config, url, username_from_url)
        } else {
            Cred::default()
        }
    });

    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(callbacks);
    fetch_options
}

/// Name of the remote branch `local` tracks, or `local` itself without upstream.
fn upstream_branch(repository: &Repository, local: &str) -> String {
    repository
        .find_branch(local, BranchType::Local)
        .ok()
        .and_then(|branch| branch.upstream().ok())
        .and_then(|upstream| upstream.name().ok().flatten().map(str::to_string))
        .map(|name| name.trim_start_matches("origin/").to_string())
        .unwrap_or_else(|| local.to_string())
}

impl Vcs for Git2Vcs {
    type WorkingCopy = Repository;

    fn is_working_copy(&self, path: &Path) -> bool {
        Repository::open(path).is_ok()
    }

    fn clone_repo(&self, url: &str, path: &Path, branch: Option<&str>) -> Result<Repository> {
        info!("Cloning {} into {}", url, path.display());
        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch_options());
        if let Some(branch) = branch {
            builder.branch(branch);
        }
        Ok(builder.clone(url, path)?)
    }

    fn open(&self, path: &Path) -> Result<Repository> {
        Repository::open(path).map_err(|source| UpdateError::InvalidRepository {
            path: path.to_path_buf(),
            source,
        })
    }

    fn head_revision(&self, repository: &Repository) -> Result<RevisionId> {
        let commit = repository.head()?.peel_to_commit()?;
        Ok(RevisionId(commit.id().to_string()))
    }

    fn pull(&self, repository: &Repository) -> Result<()> {
        let workdir = repository.workdir().unwrap_or_else(|| repository.path());
        let pull_error = |reason: &str| UpdateError::Pull {
            path: workdir.to_path_buf(),
            reason: reason.to_string(),
        };

        let head = repository.head()?;
        if !head.is_branch() {
            return Err(pull_error("HEAD is detached"));
        }
        let refname = head.name().ok_or_else(|| pull_error("branch name is not utf-8"))?.to_string();
        let local = head.shorthand().ok_or_else(|| pull_error("branch name is not utf-8"))?.to_string();
        let remote_branch = upstream_branch(repository, &local);

        // Fetch with authentication
        let mut remote = repository.find_remote("origin")?;
        debug!("Fetching '{}' for {}", remote_branch, workdir.display());
        remote.fetch(&[remote_branch.as_str()], Some(&mut fetch_options()), None)?;

        let fetch_head = repository.find_reference("FETCH_HEAD")?;
        let fetch_commit = repository.reference_to_annotated_commit(&fetch_head)?;
        let (analysis, _) = repository.merge_analysis(&[&fetch_commit])?;

        if analysis.is_up_to_date() {
            debug!("No changes detected for {}", workdir.display());
            return Ok(());
        }
        if !analysis.is_fast_forward() {
            return Err(pull_error("local branch has diverged from its upstream"));
        }

        // Let's do a fast forward merge
        let mut reference = repository.find_reference(&refname)?;
        reference.set_target(fetch_commit.id(), "botpdater: fast-forward")?;
        repository.set_head(&refname)?;
        repository.checkout_head(Some(CheckoutBuilder::default().force()))?;
        info!("Fast-forwarded {} to {}", workdir.display(), fetch_commit.id());
        Ok(())
    }

    fn latest_commit_message(&self, repository: &Repository) -> Result<String> {
        let commit = repository.head()?.peel_to_commit()?;
        Ok(commit.message().unwrap_or_default().trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::updater::test_support::{commit_file, init_origin, origin_url};

    #[test]
    fn plain_directory_is_not_a_working_copy() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!Git2Vcs.is_working_copy(dir.path()));

        let Err(err) = Git2Vcs.open(dir.path()) else {
            panic!("plain directory opened as a repository");
        };
        assert!(matches!(err, UpdateError::InvalidRepository { .. }));
    }

    #[test]
    fn clone_then_pull_fast_forwards() {
        let (_origin_dir, origin) = init_origin();
        let first = commit_file(&origin, "bot.py", "print(1)", "first");

        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        let wc = Git2Vcs
            .clone_repo(&origin_url(&origin), &work, None)
            .unwrap();
        assert!(Git2Vcs.is_working_copy(&work));
        assert_eq!(Git2Vcs.head_revision(&wc).unwrap().0, first.to_string());

        let second = commit_file(&origin, "bot.py", "print(2)", "second\n\nbody");
        Git2Vcs.pull(&wc).unwrap();

        assert_eq!(Git2Vcs.head_revision(&wc).unwrap().0, second.to_string());
        assert_eq!(Git2Vcs.latest_commit_message(&wc).unwrap(), "second\n\nbody");
        assert_eq!(std::fs::read_to_string(work.join("bot.py")).unwrap(), "print(2)");
    }

    #[test]
    fn pull_without_upstream_changes_keeps_head() {
        let (_origin_dir, origin) = init_origin();
        let first = commit_file(&origin, "bot.py", "print(1)", "first");

        let dir = tempfile::tempdir().unwrap();
        let wc = Git2Vcs
            .clone_repo(&origin_url(&origin), dir.path(), None)
            .unwrap();
        Git2Vcs.pull(&wc).unwrap();

        assert_eq!(Git2Vcs.head_revision(&wc).unwrap().0, first.to_string());
    }

    #[test]
    fn clone_checks_out_requested_branch() {
        let (_origin_dir, origin) = init_origin();
        let first = commit_file(&origin, "bot.py", "print(1)", "first");
        let commit = origin.find_commit(first).unwrap();
        origin.branch("stable", &commit, false).unwrap();
        commit_file(&origin, "bot.py", "print(2)", "second");

        let dir = tempfile::tempdir().unwrap();
        let wc = Git2Vcs
            .clone_repo(
                &origin_url(&origin),
                dir.path(),
                Some("stable"),
            )
            .unwrap();

        assert_eq!(Git2Vcs.head_revision(&wc).unwrap().0, first.to_string());
        assert_eq!(wc.head().unwrap().shorthand(), Some("stable"));
    }
}
