//! core::paths
//!
//! Where metashift keeps its per-repository state.
//!
//! # Architecture
//!
//! Repository-scoped state lives under `<common_dir>/metashift/`, which is
//! shared by every linked worktree of a repository. Nothing outside this
//! module joins `"metashift"` onto a git directory.
//!
//! # Storage Layout
//!
//! - `config.toml` - Repository configuration
//! - `lock` - Exclusive lock held while the manifest is rewritten and committed
//!
//! # Example
//!
//! ```
//! use metashift::core::paths::MetashiftPaths;
//! use std::path::PathBuf;
//!
//! let paths = MetashiftPaths::new(
//!     PathBuf::from("/repo/.git"),
//!     PathBuf::from("/repo/.git"),
//! );
//!
//! assert_eq!(
//!     paths.repo_config_path(),
//!     PathBuf::from("/repo/.git/metashift/config.toml")
//! );
//! ```

use std::path::{Path, PathBuf};

use crate::git::RepoInfo;

/// Name of the compatibility config file in the working tree root.
pub const COMPAT_CONFIG_FILE: &str = ".metashift.toml";

/// Path routing for metashift storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetashiftPaths {
    /// Per-worktree git directory. Equals `common_dir` outside linked worktrees.
    pub git_dir: PathBuf,
    /// Shared git directory (refs, objects, config).
    pub common_dir: PathBuf,
}

impl MetashiftPaths {
    pub fn new(git_dir: PathBuf, common_dir: PathBuf) -> Self {
        Self {
            git_dir,
            common_dir,
        }
    }

    /// Build from an opened repository's directories.
    pub fn from_repo_info(info: &RepoInfo) -> Self {
        Self {
            git_dir: info.git_dir.clone(),
            common_dir: info.common_dir.clone(),
        }
    }

    // =========================================================================
    // Repo-scoped paths (shared across worktrees)
    // =========================================================================

    /// `<common_dir>/metashift`
    pub fn repo_dir(&self) -> PathBuf {
        self.common_dir.join("metashift")
    }

    /// `<common_dir>/metashift/config.toml`
    pub fn repo_config_path(&self) -> PathBuf {
        self.repo_dir().join("config.toml")
    }

    /// `<common_dir>/metashift/lock`
    pub fn repo_lock_path(&self) -> PathBuf {
        self.repo_dir().join("lock")
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// True for a linked worktree (`common_dir != git_dir`).
    pub fn is_worktree(&self) -> bool {
        self.git_dir != self.common_dir
    }

    pub fn common_dir(&self) -> &Path {
        &self.common_dir
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }
}

/// Compatibility config location inside a working tree.
pub fn compat_config_path(work_dir: &Path) -> PathBuf {
    work_dir.join(COMPAT_CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normal() -> MetashiftPaths {
        MetashiftPaths::new(PathBuf::from("/repo/.git"), PathBuf::from("/repo/.git"))
    }

    #[test]
    fn repo_paths_under_common_dir() {
        let paths = normal();
        assert_eq!(paths.repo_dir(), PathBuf::from("/repo/.git/metashift"));
        assert_eq!(
            paths.repo_lock_path(),
            PathBuf::from("/repo/.git/metashift/lock")
        );
        assert!(!paths.is_worktree());
    }

    #[test]
    fn worktree_uses_common_dir() {
        let paths = MetashiftPaths::new(
            PathBuf::from("/repo/.git/worktrees/feature"),
            PathBuf::from("/repo/.git"),
        );
        assert!(paths.is_worktree());
        assert_eq!(
            paths.repo_config_path(),
            PathBuf::from("/repo/.git/metashift/config.toml")
        );
    }

    #[test]
    fn from_repo_info_copies_dirs() {
        let info = RepoInfo {
            git_dir: PathBuf::from("/r/.git/worktrees/x"),
            common_dir: PathBuf::from("/r/.git"),
            work_dir: Some(PathBuf::from("/wt")),
        };
        let paths = MetashiftPaths::from_repo_info(&info);
        assert_eq!(paths.git_dir(), Path::new("/r/.git/worktrees/x"));
        assert_eq!(paths.common_dir(), Path::new("/r/.git"));
    }

    #[test]
    fn compat_path_in_work_dir() {
        assert_eq!(
            compat_config_path(Path::new("/wt")),
            PathBuf::from("/wt/.metashift.toml")
        );
    }
}
