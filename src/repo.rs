use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Walks up from `start` to the first directory holding a `.hg` store.
pub fn discover(start: &Path) -> Result<PathBuf> {
    for dir in start.ancestors() {
        if dir.join(".hg").is_dir() {
            return Ok(dir.to_path_buf());
        }
    }
    Err(Error::RepositoryNotFound {
        path: start.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_root_from_subdirectory() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join(".hg")).unwrap();
        std::fs::create_dir_all(tmp.path().join("a/b")).unwrap();
        assert_eq!(discover(&tmp.path().join("a/b")).unwrap(), tmp.path());
    }

    #[test]
    fn reports_missing_repository() {
        let tmp = tempfile::tempdir().unwrap();
        let err = discover(tmp.path()).unwrap_err();
        assert!(matches!(err, Error::RepositoryNotFound { .. }));
    }
}
