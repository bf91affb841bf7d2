//! Parallel discovery of Java sources with early directory pruning.
//!
//! - Excluded directories are skipped as whole subtrees via `WalkDir::filter_entry`
//! - Remaining entries are checked on rayon workers through `par_bridge`
//! - The result is sorted, so model ids and report order are stable across runs

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories never descended into (build output and tooling state).
const EXCLUDED_DIRS: &[&str] = &["target", ".git", "build", "node_modules"];

#[inline]
fn is_excluded_dir(entry: &walkdir::DirEntry, excludes: &HashSet<&str>) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| excludes.contains(name))
}

/// Gathers every `.java` file under `root`, sorted by path.
pub fn gather_java_files(root: &Path) -> Result<Vec<PathBuf>> {
    let excludes: HashSet<&str> = EXCLUDED_DIRS.iter().copied().collect();

    let mut files = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_excluded_dir(e, &excludes))
        .par_bridge()
        .filter_map(|entry| match entry {
            Ok(e) => {
                let path = e.path();
                if e.file_type().is_file() && path.extension().is_some_and(|ext| ext == "java") {
                    Some(Ok(path.to_path_buf()))
                } else {
                    None
                }
            }
            Err(e) => Some(Err(e.into())),
        })
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("Failed to gather .java files from {}", root.display()))?;

    files.sort();
    Ok(files)
}

/// Number of `.java` files under `root`; zero when the tree cannot be walked.
pub fn count_java_files(root: &Path) -> usize {
    gather_java_files(root).map(|f| f.len()).unwrap_or(0)
}
