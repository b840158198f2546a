//! Scratch git repositories, shared by the integration tests and the
//! library's unit tests.
#![allow(dead_code)]

use git2::{Oid, Repository, Signature};
use std::path::Path;
use tempfile::TempDir;

pub fn init_origin() -> (TempDir, Repository) {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    (dir, repo)
}

pub fn origin_url(repo: &Repository) -> String {
    repo.workdir().unwrap().to_str().unwrap().to_string()
}

/// Writes `name` into the work tree of `repo` and commits it on HEAD.
pub fn commit_file(repo: &Repository, name: &str, contents: &str, message: &str) -> Oid {
    let path = repo.workdir().unwrap().join(name);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, contents).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(name)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

    let signature = Signature::now("Test", "test@example.com").unwrap();
    let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
    let parents: Vec<_> = parent.iter().collect();
    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
        .unwrap()
}
