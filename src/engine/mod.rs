//! engine
//!
//! Turns history into deployable packages: Resolve -> Synthesize -> Stage ->
//! (Rollback) -> (Commit).
//!
//! # Architecture
//!
//! ```text
//! git ──► resolver ──► manifest ──► stage
//!             │            ▲
//!             └─► rollback ┘
//! ```
//!
//! - [`resolver`] diffs two revisions into four path sets
//! - [`manifest`] classifies paths and builds type-grouped manifests
//! - [`stage`] copies accepted members into a deploy directory
//! - [`rollback`] inverts a change and packages it from history
//! - [`pipeline`] runs all of the above for one build
//!
//! # Invariants
//!
//! - The type registry is loaded once by the caller and passed in; nothing
//!   here holds process-wide state
//! - Per-path classification problems become warnings, never errors
//! - Manifests are serialized in full before any byte hits disk
//! - The only repository write is the manifest commit, made under the repo lock

pub mod manifest;
pub mod pipeline;
pub mod resolver;
pub mod rollback;
pub mod stage;

use std::path::PathBuf;

use thiserror::Error;

use crate::core::ops::lock::LockError;
use crate::core::types::TypeError;
use crate::git::GitError;

pub use manifest::{ClassificationWarning, ManifestBuilder, ManifestDocument, ManifestError, Synthesis};
pub use pipeline::{BuildEnv, BuildOptions, BuildSummary, Pipeline};
pub use resolver::{resolve_changes, ChangeSet, ChangeSetResolver, ManifestCommit, ResolveMode};
pub use rollback::{build_rollback, RollbackArtifact, RollbackError};
pub use stage::{StageError, StageLayout};

/// Any failure of an engine operation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Rollback(#[from] RollbackError),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Type(#[from] TypeError),

    /// A package update was requested without a committer identity.
    #[error("no committer identity: pass --committer-name/--committer-email or set GIT_COMMITTER_NAME/GIT_COMMITTER_EMAIL")]
    MissingCommitter,

    #[error("i/o error at '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
