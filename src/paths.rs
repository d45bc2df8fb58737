//! Deterministic on-disk layout: `<root>/<host>/<org>/<repo>`

use anyhow::{Context, Result};
use path_clean::PathClean;
use std::path::{Path, PathBuf};

use crate::url::RepoId;

/// Name of the index file kept directly under the root
pub const INDEX_FILE_NAME: &str = "repos.jsonl";

/// Local working-copy path for a repository.
///
/// Pure: no case folding, no sanitizing, no filesystem access. Two URLs that
/// decompose to the same identity share a path.
pub fn resolve(root: &Path, host: &str, org: &str, repo: &str) -> PathBuf {
    root.join(host).join(org).join(repo)
}

/// [`resolve`] for an already-parsed identity
pub fn resolve_id(root: &Path, id: &RepoId) -> PathBuf {
    resolve(root, &id.host, &id.org, &id.repo)
}

/// Location of the index file for a root
pub fn index_path(root: &Path) -> PathBuf {
    root.join(INDEX_FILE_NAME)
}

/// Expand `~` and environment variables, anchor relative paths at the
/// current directory and clean `.`/`..` components lexically
pub fn absolutize(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw)
        .with_context(|| format!("Failed to expand path: {}", raw))?;
    let path = PathBuf::from(expanded.as_ref());

    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .context("Failed to determine current directory")?
            .join(path)
    };

    Ok(absolute.clean())
}
