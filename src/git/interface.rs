//! git::interface
//!
//! Git interface implementation using git2.
//!
//! This module provides the **single doorway** to all Git operations in
//! metashift. Everything the change-set resolver and rollback builder need
//! from history (revision resolution, tree diffs, tree listings, historical
//! file content) and the one write path (committing the regenerated
//! manifest) flows through [`Git`].
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: Not inside a Git repository
//! - [`GitError::RevisionNotFound`]: A revision spec does not name a commit
//! - [`GitError::PathNotFound`]: A path is absent at a given revision
//! - [`GitError::BareRepo`]: A write needs a working directory
//!
//! # Diff Semantics
//!
//! Tree diffs are computed without similarity detection, so a rename always
//! presents as a delete of the old path plus an add of the new one.
//!
//! # Example
//!
//! ```ignore
//! use metashift::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! let head = git.resolve_commit("HEAD")?;
//! for path in git.list_tree_paths(&head)? {
//!     println!("{}", path);
//! }
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::{ChangeKind, Committer, Oid, TypeError};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Repository is bare (no working directory) but one is required.
    #[error("operation requires a working directory, repository is bare")]
    BareRepo,

    /// A revision spec does not resolve to a commit.
    #[error("revision not found: {spec}")]
    RevisionNotFound {
        /// The revision spec as given
        spec: String,
    },

    /// A path does not exist (as a file) at the given revision.
    #[error("path '{path}' not found at revision {revision}")]
    PathNotFound {
        /// Repository-relative path
        path: String,
        /// The revision searched
        revision: String,
    },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID that was not found
        oid: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// A tree path is not valid UTF-8.
    #[error("path is not valid UTF-8: {path}")]
    InvalidPath {
        /// Lossy rendering of the path
        path: String,
    },

    /// Permission or filesystem error.
    #[error("repository access error: {message}")]
    AccessError {
        /// Description of the error
        message: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => GitError::ObjectNotFound {
                oid: context.to_string(),
            },
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            git2::ErrorCode::Locked => GitError::AccessError {
                message: format!("repository is locked: {}", err.message()),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => GitError::InvalidOid { oid: msg },
            other => GitError::Internal {
                message: other.to_string(),
            },
        }
    }
}

/// Information about a Git repository.
#[derive(Debug, Clone)]
pub struct RepoInfo {
    /// Path to the per-worktree .git directory
    pub git_dir: PathBuf,
    /// Path to the shared git directory (equals git_dir outside worktrees)
    pub common_dir: PathBuf,
    /// Path to the working directory, absent for bare repositories
    pub work_dir: Option<PathBuf>,
}

/// One entry of a tree-to-tree diff.
///
/// `old_path` is absent for additions, `new_path` for deletions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub kind: ChangeKind,
    pub old_path: Option<String>,
    pub new_path: Option<String>,
}

/// The Git interface.
///
/// This is the **single point of interaction** with Git. No other module
/// imports `git2`.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Opening and Info
    // =========================================================================

    /// Open a repository at the given path.
    ///
    /// Uses `git2::Repository::discover`, so `path` may be the working
    /// directory, any directory inside it, or the `.git` directory itself.
    /// Bare repositories open fine; only [`Git::stage_and_commit`] needs a
    /// working directory.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        Ok(Self { repo })
    }

    /// Get repository information.
    pub fn info(&self) -> RepoInfo {
        RepoInfo {
            git_dir: self.repo.path().to_path_buf(),
            common_dir: self.repo.commondir().to_path_buf(),
            work_dir: self.repo.workdir().map(Path::to_path_buf),
        }
    }

    /// Get the working directory, failing for bare repositories.
    pub fn work_dir(&self) -> Result<&Path, GitError> {
        self.repo.workdir().ok_or(GitError::BareRepo)
    }

    // =========================================================================
    // Revision Resolution
    // =========================================================================

    /// Resolve a revision spec (`HEAD`, a branch, a full or abbreviated SHA)
    /// to the commit it names.
    ///
    /// # Errors
    ///
    /// - [`GitError::RevisionNotFound`] if the revision names no commit
    pub fn resolve_commit(&self, spec: &str) -> Result<Oid, GitError> {
        let not_found = || GitError::RevisionNotFound {
            spec: spec.to_string(),
        };

        let object = self.repo.revparse_single(spec).map_err(|_| not_found())?;
        let commit = object.peel_to_commit().map_err(|_| not_found())?;

        Ok(Oid::new(commit.id().to_string())?)
    }

    /// Get HEAD commit OID.
    pub fn head_oid(&self) -> Result<Oid, GitError> {
        self.resolve_commit("HEAD")
    }

    fn find_commit(&self, oid: &Oid) -> Result<git2::Commit<'_>, GitError> {
        let git_oid =
            git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))?;

        self.repo
            .find_commit(git_oid)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))
    }

    fn commit_tree(&self, oid: &Oid) -> Result<git2::Tree<'_>, GitError> {
        self.find_commit(oid)?
            .tree()
            .map_err(|e| GitError::from_git2(e, oid.as_str()))
    }

    // =========================================================================
    // Tree Queries
    // =========================================================================

    /// Diff the root trees of two commits.
    ///
    /// Entries come back in the diff engine's emission order (path order).
    /// Similarity detection is never run, so renames appear as a
    /// [`ChangeKind::Deleted`] plus a [`ChangeKind::Added`] entry. A change of
    /// file mode between blob and symlink is reported as
    /// [`ChangeKind::Modified`].
    pub fn diff_commits(&self, old: &Oid, new: &Oid) -> Result<Vec<DiffEntry>, GitError> {
        let old_tree = self.commit_tree(old)?;
        let new_tree = self.commit_tree(new)?;

        let mut opts = git2::DiffOptions::new();
        opts.include_typechange(true);

        let diff = self
            .repo
            .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), Some(&mut opts))
            .map_err(|e| GitError::Internal {
                message: e.message().to_string(),
            })?;

        let mut entries = Vec::with_capacity(diff.deltas().len());
        for delta in diff.deltas() {
            let kind = match delta.status() {
                git2::Delta::Added => ChangeKind::Added,
                git2::Delta::Deleted => ChangeKind::Deleted,
                // A blob/symlink swap keeps its path, so it counts as an edit
                git2::Delta::Modified | git2::Delta::Typechange => ChangeKind::Modified,
                _ => ChangeKind::Other,
            };

            let old_path = match kind {
                ChangeKind::Added => None,
                _ => delta.old_file().path().map(path_to_string).transpose()?,
            };
            let new_path = match kind {
                ChangeKind::Deleted => None,
                _ => delta.new_file().path().map(path_to_string).transpose()?,
            };

            entries.push(DiffEntry {
                kind,
                old_path,
                new_path,
            });
        }

        Ok(entries)
    }

    /// Flatten a commit's tree into its leaf (blob) paths.
    ///
    /// Subtrees are descended in place, so the listing follows tree-walk
    /// order. Submodule entries are not blobs and are skipped.
    pub fn list_tree_paths(&self, oid: &Oid) -> Result<Vec<String>, GitError> {
        let tree = self.commit_tree(oid)?;

        let mut paths = Vec::new();
        let mut bad_path: Option<String> = None;

        tree.walk(git2::TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() != Some(git2::ObjectType::Blob) {
                return git2::TreeWalkResult::Ok;
            }
            match entry.name() {
                Some(name) => {
                    paths.push(format!("{}{}", root, name));
                    git2::TreeWalkResult::Ok
                }
                None => {
                    bad_path = Some(format!(
                        "{}{}",
                        root,
                        String::from_utf8_lossy(entry.name_bytes())
                    ));
                    git2::TreeWalkResult::Abort
                }
            }
        })
        .or_else(|e| {
            // An aborted walk surfaces as a user error; report the path instead
            if bad_path.is_some() {
                Ok(())
            } else {
                Err(GitError::Internal {
                    message: e.message().to_string(),
                })
            }
        })?;

        if let Some(path) = bad_path {
            return Err(GitError::InvalidPath { path });
        }

        Ok(paths)
    }

    /// Read a file's bytes as of a given commit.
    ///
    /// # Errors
    ///
    /// - [`GitError::PathNotFound`] if the path does not name a file at
    ///   that revision (missing, or a directory)
    pub fn read_file_at(&self, oid: &Oid, path: &str) -> Result<Vec<u8>, GitError> {
        let not_found = || GitError::PathNotFound {
            path: path.to_string(),
            revision: oid.to_string(),
        };

        let tree = self.commit_tree(oid)?;
        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Err(not_found()),
            Err(e) => return Err(GitError::from_git2(e, path)),
        };

        if entry.kind() != Some(git2::ObjectType::Blob) {
            return Err(not_found());
        }

        let blob = self
            .repo
            .find_blob(entry.id())
            .map_err(|e| GitError::from_git2(e, path))?;

        Ok(blob.content().to_vec())
    }

    // =========================================================================
    // Commit
    // =========================================================================

    /// Stage one working-tree file and commit it on top of HEAD.
    ///
    /// `path` is relative to the working directory. The committer identity
    /// is used as both author and committer. Returns the new commit.
    ///
    /// Callers serialize this per repository (see `core::ops::lock`).
    ///
    /// # Errors
    ///
    /// - [`GitError::BareRepo`] without a working directory
    pub fn stage_and_commit(
        &self,
        path: &str,
        committer: &Committer,
        message: &str,
    ) -> Result<Oid, GitError> {
        self.work_dir()?;

        let mut index = self.repo.index().map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;
        index
            .add_path(Path::new(path))
            .map_err(|e| GitError::from_git2(e, path))?;
        index.write().map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;

        let tree_id = index.write_tree().map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;
        let tree = self
            .repo
            .find_tree(tree_id)
            .map_err(|e| GitError::from_git2(e, &tree_id.to_string()))?;

        let signature = git2::Signature::now(committer.name(), committer.email())
            .map_err(|e| GitError::Internal {
                message: e.message().to_string(),
            })?;

        // An unborn HEAD commits without parents
        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit().map_err(|e| GitError::from_git2(e, "HEAD"))?),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => None,
            Err(e) => return Err(GitError::from_git2(e, "HEAD")),
        };
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let oid = self
            .repo
            .commit(
                Some("HEAD"),
                &signature,
                &signature,
                message,
                &tree,
                &parents,
            )
            .map_err(|e| GitError::Internal {
                message: e.message().to_string(),
            })?;

        Ok(Oid::new(oid.to_string())?)
    }
}

fn path_to_string(path: &Path) -> Result<String, GitError> {
    path.to_str()
        .map(|s| s.replace('\\', "/"))
        .ok_or_else(|| GitError::InvalidPath {
            path: path.to_string_lossy().into_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    mod git_error {
        use super::*;

        #[test]
        fn error_display_formatting() {
            let err = GitError::PathNotFound {
                path: "src/classes/Foo.cls".to_string(),
                revision: "abc123".to_string(),
            };
            assert!(err.to_string().contains("src/classes/Foo.cls"));
            assert!(err.to_string().contains("abc123"));

            let err = GitError::RevisionNotFound {
                spec: "nope".to_string(),
            };
            assert!(err.to_string().contains("nope"));
        }

        #[test]
        fn type_error_maps_to_invalid_oid() {
            let err: GitError = TypeError::InvalidOid("xyz".into()).into();
            assert!(matches!(err, GitError::InvalidOid { .. }));
        }
    }

    mod paths {
        use super::*;

        #[test]
        fn path_to_string_uses_forward_slashes() {
            let p = Path::new("src/classes/Foo.cls");
            assert_eq!(path_to_string(p).unwrap(), "src/classes/Foo.cls");
        }
    }

    #[test]
    fn open_non_repository_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = Git::open(dir.path());
        assert!(matches!(result, Err(GitError::NotARepo { .. })));
    }
}
