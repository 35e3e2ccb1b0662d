//! Deterministic walking of the source tree for mirroring.
//!
//! Backed by ripgrep's `ignore` crate with all of its standard filters
//! disabled: the output tree has to mirror the input verbatim, so gitignore
//! semantics, hidden-file rules and the like do not apply here. Entries are
//! sorted for a stable processing order.

use std::path::{Path, PathBuf};

use anyhow::Result;
use ignore::WalkBuilder;

/// Collects every directory and regular file under `root`, excluding `root`
/// itself. Directories come sorted parent-first, so creating them in order
/// is safe.
pub fn mirror_entries(root: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_path(|a, b| a.cmp(b))
        .build();

    for entry in walker {
        let entry = entry?;
        if entry.path() == root {
            continue;
        }

        let Some(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            dirs.push(entry.into_path());
        } else if file_type.is_file() {
            files.push(entry.into_path());
        }
    }

    Ok((dirs, files))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn write_file(root: &Path, rel: &str, contents: &str) -> Result<()> {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    #[test]
    fn test_collects_dirs_and_files_sorted() -> Result<()> {
        let tmp = TempDir::new()?;
        let root = tmp.path();

        write_file(root, "b/two.txt", "2")?;
        write_file(root, "a/one.txt", "1")?;
        write_file(root, "top.txt", "t")?;

        let (dirs, files) = mirror_entries(root)?;

        let rel = |paths: &[PathBuf]| -> Vec<PathBuf> {
            paths
                .iter()
                .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
                .collect()
        };

        assert_eq!(rel(&dirs), vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(
            rel(&files),
            vec![
                PathBuf::from("a/one.txt"),
                PathBuf::from("b/two.txt"),
                PathBuf::from("top.txt"),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_ignores_nothing() -> Result<()> {
        let tmp = TempDir::new()?;
        let root = tmp.path();

        // Files a gitignore-aware walker would drop must survive here
        write_file(root, ".gitignore", "hidden.txt")?;
        write_file(root, "hidden.txt", "h")?;
        write_file(root, ".dotfile", "d")?;

        let (_dirs, files) = mirror_entries(root)?;
        let names: Vec<_> = files
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();

        assert!(names.contains(&".gitignore"));
        assert!(names.contains(&"hidden.txt"));
        assert!(names.contains(&".dotfile"));
        Ok(())
    }

    #[test]
    fn test_empty_directory() -> Result<()> {
        let tmp = TempDir::new()?;
        let (dirs, files) = mirror_entries(tmp.path())?;
        assert!(dirs.is_empty());
        assert!(files.is_empty());
        Ok(())
    }
}
