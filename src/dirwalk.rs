//! Directory emitter: yields every directory under a root that should be
//! treated as a candidate Go package, skipping hidden and underscore-
//! prefixed directories the same way `go build` does (spec.md §2).

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::Result;

fn is_skipped(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('_')
}

/// Absolute directory paths in stable lexicographic order, root first.
pub fn walk_package_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        if entry.depth() == 0 {
            return true;
        }
        entry
            .file_name()
            .to_str()
            .map(|n| !is_skipped(n))
            .unwrap_or(true)
    });

    for entry in walker {
        let entry = entry.map_err(|e| {
            crate::error::Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
        })?;
        if entry.file_type().is_dir() {
            dirs.push(entry.path().to_path_buf());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// `.go` files directly inside `dir`, excluding `_test.go` files
/// (spec.md §2, Non-goals: test files are out of scope).
pub fn go_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.ends_with(".go") && !name.ends_with("_test.go") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn skips_hidden_and_underscore_dirs() {
        let root = tempdir().unwrap();
        fs::create_dir(root.path().join("a")).unwrap();
        fs::create_dir(root.path().join(".git")).unwrap();
        fs::create_dir(root.path().join("_vendor")).unwrap();

        let dirs = walk_package_dirs(root.path()).unwrap();
        let names: Vec<_> = dirs
            .iter()
            .filter_map(|d| d.file_name().and_then(|n| n.to_str()))
            .collect();
        assert!(names.contains(&"a"));
        assert!(!names.contains(&".git"));
        assert!(!names.contains(&"_vendor"));
    }

    #[test]
    fn go_files_excludes_tests() {
        let root = tempdir().unwrap();
        fs::write(root.path().join("a.go"), "package a").unwrap();
        fs::write(root.path().join("a_test.go"), "package a").unwrap();

        let files = go_files_in(root.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name().unwrap(), "a.go");
    }
}
