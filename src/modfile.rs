//! Module descriptor resolution: ascend the directory tree from the scan
//! root looking for `go.mod`, then extract its declared module path.
//! Grounded on the original tool's `find_go_mod_file.go`/
//! `get_module_path.go` pair — a `modfile.ModulePath` call there becomes a
//! one-line regex match here since we only need the first `module`
//! directive, not a full go.mod parse.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

static MODULE_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*module\s+(\S+)").unwrap());

/// Ascend from `start` (inclusive) until a `go.mod` file is found, returning
/// its containing directory. Mirrors `go build`'s own module-root search.
pub fn find_module_root(start: &Path) -> Result<PathBuf> {
    let mut dir = if start.is_file() {
        start.parent().map(Path::to_path_buf).unwrap_or_default()
    } else {
        start.to_path_buf()
    };
    loop {
        if dir.join("go.mod").is_file() {
            return Ok(dir);
        }
        match dir.parent() {
            Some(parent) => dir = parent.to_path_buf(),
            None => {
                return Err(Error::Module(format!(
                    "no go.mod found above {}",
                    start.display()
                )))
            }
        }
    }
}

/// Read the module path declared by the first `module` directive in the
/// `go.mod` at `module_root`.
pub fn read_module_path(module_root: &Path) -> Result<String> {
    let contents = std::fs::read_to_string(module_root.join("go.mod"))?;
    MODULE_DIRECTIVE
        .captures(&contents)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| Error::Module(format!("no module directive in {}/go.mod", module_root.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn finds_root_by_ascending() {
        let root = tempdir().unwrap();
        fs::write(root.path().join("go.mod"), "module example.com/m\n\ngo 1.21\n").unwrap();
        let nested = root.path().join("a/b/c");
        fs::create_dir_all(&nested).unwrap();

        let found = find_module_root(&nested).unwrap();
        assert_eq!(found, root.path());
    }

    #[test]
    fn reads_module_path() {
        let root = tempdir().unwrap();
        fs::write(
            root.path().join("go.mod"),
            "module example.com/widgets\n\ngo 1.21\n\nrequire foo v1.0.0\n",
        )
        .unwrap();
        assert_eq!(read_module_path(root.path()).unwrap(), "example.com/widgets");
    }

    #[test]
    fn missing_go_mod_errors() {
        let root = tempdir().unwrap();
        assert!(find_module_root(root.path()).is_err());
    }
}
