//! engine::discover
//!
//! Turns the directories given on the command line (or in config) into
//! repository candidates, and loads them.
//!
//! A directory containing `.git` is a candidate itself. Any other directory is
//! scanned for candidates down to `depth` levels, skipping hidden directories
//! and never descending into a repository that was found.

use std::path::{Path, PathBuf};

use crate::repo::{LoadError, LoadOptions, Loaded, RepositoryEntity};

/// Find repository candidates under `roots`.
///
/// Roots that cannot be read are returned as candidates so that loading them
/// reports the problem. Results are sorted and free of duplicates.
pub fn discover(roots: &[PathBuf], depth: usize) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for root in roots {
        if is_repository(root) || !root.is_dir() {
            found.push(root.clone());
        } else {
            scan(root, depth, &mut found);
        }
    }

    let mut found: Vec<PathBuf> = found
        .into_iter()
        .map(|p| std::fs::canonicalize(&p).unwrap_or(p))
        .collect();
    found.sort();
    found.dedup();
    found
}

/// Load every candidate, keeping results in candidate order.
pub fn load_all(
    paths: &[PathBuf],
    options: &LoadOptions,
) -> Vec<(PathBuf, Result<Loaded, LoadError>)> {
    paths
        .iter()
        .map(|path| (path.clone(), RepositoryEntity::load(path, options)))
        .collect()
}

fn scan(dir: &Path, depth: usize, found: &mut Vec<PathBuf>) {
    if depth == 0 {
        return;
    }
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::debug!(directory = %dir.display(), error = %err, "skipping unreadable directory");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if is_hidden(&path) || !path.is_dir() {
            continue;
        }
        if is_repository(&path) {
            found.push(path);
        } else {
            scan(&path, depth - 1, found);
        }
    }
}

fn is_repository(dir: &Path) -> bool {
    dir.join(".git").exists()
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn mkrepo(path: &Path) {
        fs::create_dir_all(path.join(".git")).unwrap();
    }

    #[test]
    fn root_repository_is_candidate() {
        let dir = TempDir::new().unwrap();
        mkrepo(dir.path());
        mkrepo(&dir.path().join("nested"));

        let found = discover(&[dir.path().to_path_buf()], 3);
        assert_eq!(found, vec![fs::canonicalize(dir.path()).unwrap()]);
    }

    #[test]
    fn scans_to_depth() {
        let dir = TempDir::new().unwrap();
        mkrepo(&dir.path().join("a"));
        mkrepo(&dir.path().join("group/b"));
        mkrepo(&dir.path().join("group/deeper/c"));

        let root = fs::canonicalize(dir.path()).unwrap();
        assert_eq!(discover(&[root.clone()], 1), vec![root.join("a")]);
        assert_eq!(
            discover(&[root.clone()], 2),
            vec![root.join("a"), root.join("group/b")]
        );
        assert_eq!(discover(&[root.clone()], 3).len(), 3);
    }

    #[test]
    fn skips_hidden_directories() {
        let dir = TempDir::new().unwrap();
        mkrepo(&dir.path().join(".cache/x"));
        mkrepo(&dir.path().join("visible"));

        let root = fs::canonicalize(dir.path()).unwrap();
        assert_eq!(discover(&[root.clone()], 2), vec![root.join("visible")]);
    }

    #[test]
    fn dedups_overlapping_roots() {
        let dir = TempDir::new().unwrap();
        mkrepo(&dir.path().join("a"));

        let root = fs::canonicalize(dir.path()).unwrap();
        let found = discover(&[root.clone(), root.join("a")], 1);
        assert_eq!(found, vec![root.join("a")]);
    }

    #[test]
    fn missing_root_is_kept() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        assert_eq!(discover(&[missing.clone()], 1), vec![missing]);
    }
}
