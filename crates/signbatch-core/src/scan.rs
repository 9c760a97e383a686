//! Folder scanning for signable binaries.
//!
//! Walk a directory tree and collect every file with a signable extension.
//! Results are sorted and deduplicated so repeated scans of the same tree
//! produce the same batch order.

use std::path::{Path, PathBuf};

use crate::batch::is_signable;
use crate::error::Result;

/// Recursively collect signable files under `root`, in sorted order.
///
/// Symlinked directories are not followed; a broken entry inside the tree is
/// an error rather than being silently skipped.
pub fn collect_signable(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    walk(root, &mut found)?;
    found.sort();
    found.dedup();
    tracing::debug!(root = %root.display(), count = found.len(), "Folder scan finished");
    Ok(found)
}

fn walk(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            walk(&path, found)?;
        } else if file_type.is_file() && is_signable(&path) {
            found.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn collects_only_signable_files_recursively() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("bin").join("x64");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("app.exe"), b"x").unwrap();
        std::fs::write(dir.path().join("readme.md"), b"x").unwrap();
        std::fs::write(nested.join("helper.dll"), b"x").unwrap();
        std::fs::write(nested.join("driver.SYS"), b"x").unwrap();

        let files = collect_signable(dir.path()).unwrap();
        assert_eq!(files.len(), 3);
        assert!(files.iter().all(|p| crate::batch::is_signable(p)));
    }

    #[test]
    fn result_order_is_deterministic() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.exe"), b"x").unwrap();
        std::fs::write(dir.path().join("a.exe"), b"x").unwrap();

        let first = collect_signable(dir.path()).unwrap();
        let second = collect_signable(dir.path()).unwrap();
        assert_eq!(first, second);
        assert!(first[0].ends_with("a.exe"));
    }

    #[test]
    fn empty_directory_yields_empty_list() {
        let dir = TempDir::new().unwrap();
        assert!(collect_signable(dir.path()).unwrap().is_empty());
    }
}
