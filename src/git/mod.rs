//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. All history reads and the
//! single manifest-commit write flow through this interface. No other
//! module should import `git2`.
//!
//! We use the `git2` crate exclusively (no shelling out to the git CLI).
//!
//! # Responsibilities
//!
//! - Repository discovery and opening
//! - Revision resolution
//! - Tree diffs and recursive tree listings
//! - Historical file retrieval
//! - Staging and committing a single file
//!
//! # Invariants
//!
//! - No other module calls git2 directly
//! - All operations return strong types (Oid, ChangeKind)
//! - History is only read, except for [`Git::stage_and_commit`]

mod interface;

pub use interface::{DiffEntry, Git, GitError, RepoInfo};
