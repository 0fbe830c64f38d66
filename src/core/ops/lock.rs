//! core::ops::lock
//!
//! Exclusive repository lock around the manifest rewrite.
//!
//! # Architecture
//!
//! Regenerating the manifest and committing it is the only write metashift
//! makes to a repository. Two concurrent builds against the same repository
//! would otherwise race on the working-tree file and the index, so the write
//! and the commit happen while holding `<common_dir>/metashift/lock`.
//!
//! The lock is repo-scoped: every linked worktree contends for the same file.
//!
//! # Invariants
//!
//! - Acquisition never blocks; a held lock fails fast with [`LockError::AlreadyLocked`]
//! - The lock is released when the guard drops
//!
//! # Example
//!
//! ```ignore
//! use metashift::core::ops::lock::RepoLock;
//! use metashift::core::paths::MetashiftPaths;
//!
//! let paths = MetashiftPaths::from_repo_info(&git.info());
//! let _lock = RepoLock::acquire(&paths)?;
//! // write src/package.xml, stage, commit
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use crate::core::paths::MetashiftPaths;

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process already holds the lock.
    #[error("repository is locked by another metashift process")]
    AlreadyLocked,

    /// The lock file or its directory could not be created.
    #[error("failed to create lock '{path}': {source}")]
    CreateFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The OS refused the lock for a reason other than contention.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),
}

/// Guard holding the repository lock until dropped.
#[derive(Debug)]
pub struct RepoLock {
    path: PathBuf,
    file: Option<File>,
}

impl RepoLock {
    /// Acquire the lock without blocking.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if another process holds the lock
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock cannot be taken
    pub fn acquire(paths: &MetashiftPaths) -> Result<Self, LockError> {
        let dir = paths.repo_dir();
        fs::create_dir_all(&dir).map_err(|e| LockError::CreateFailed {
            path: dir.clone(),
            source: e,
        })?;

        let path = paths.repo_lock_path();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| LockError::CreateFailed {
                path: path.clone(),
                source: e,
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "acquired repository lock");
                Ok(Self {
                    path,
                    file: Some(file),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(LockError::AlreadyLocked),
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_paths(dir: &Path) -> MetashiftPaths {
        MetashiftPaths::new(dir.to_path_buf(), dir.to_path_buf())
    }

    #[test]
    fn acquire_creates_directory_and_file() {
        let temp = TempDir::new().unwrap();
        let paths = test_paths(temp.path());
        assert!(!paths.repo_dir().exists());

        let lock = RepoLock::acquire(&paths).unwrap();
        assert!(lock.is_held());
        assert_eq!(lock.path(), paths.repo_lock_path());
        assert!(lock.path().exists());
    }

    #[test]
    fn second_acquire_fails_fast() {
        let temp = TempDir::new().unwrap();
        let paths = test_paths(temp.path());

        let _held = RepoLock::acquire(&paths).unwrap();
        assert!(matches!(
            RepoLock::acquire(&paths),
            Err(LockError::AlreadyLocked)
        ));
    }

    #[test]
    fn released_on_drop() {
        let temp = TempDir::new().unwrap();
        let paths = test_paths(temp.path());

        drop(RepoLock::acquire(&paths).unwrap());
        assert!(RepoLock::acquire(&paths).unwrap().is_held());
    }

    #[test]
    fn worktree_contends_with_main() {
        let temp = TempDir::new().unwrap();
        let common = temp.path().to_path_buf();
        let main = MetashiftPaths::new(common.clone(), common.clone());
        let worktree = MetashiftPaths::new(common.join("worktrees").join("wt"), common);

        let _held = RepoLock::acquire(&main).unwrap();
        assert!(matches!(
            RepoLock::acquire(&worktree),
            Err(LockError::AlreadyLocked)
        ));
    }
}
