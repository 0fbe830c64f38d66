//! engine::stage
//!
//! Deployment staging: a scratch directory laid out like the repository,
//! holding only the members a manifest names.
//!
//! # Layout
//!
//! ```text
//! <stage>/
//!   <source_dir>/package.xml
//!   <source_dir>/destructiveChanges.xml   (only with destructive members)
//!   <source_dir>/classes/Foo.cls
//!   <source_dir>/classes/Foo.cls-meta.xml
//! ```
//!
//! Members are written to their repository-relative path, so the stage can be
//! handed to a deploy runner unchanged. Bytes come from a [`MemberSource`]:
//! builds read the revision being deployed ([`RevisionSource`]), so the
//! staged files always match the manifest even when another revision is
//! checked out. [`WorkTree`] reads a plain directory.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::companion::companion_path_of;
use crate::core::descriptor::MetadataDescriptor;
use crate::core::types::Oid;
use crate::engine::manifest::{DESTRUCTIVE_FILE, PACKAGE_FILE};
use crate::engine::resolver::ChangeSetResolver;
use crate::git::GitError;

/// Errors from staging.
#[derive(Debug, Error)]
pub enum StageError {
    /// An accepted member has no content in the source being staged.
    #[error("member '{path}' is missing from the staging source")]
    MissingSource { path: String },

    #[error(transparent)]
    Git(#[from] GitError),

    /// Recreating the directory would delete part of the repository.
    #[error("refusing to recreate '{path}': it contains the repository at '{protected}'")]
    Overlap { path: PathBuf, protected: PathBuf },

    #[error("staging i/o error at '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Where manifests go inside a stage directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageLayout {
    pub source_dir: String,
}

impl Default for StageLayout {
    fn default() -> Self {
        Self {
            source_dir: crate::core::config::DEFAULT_SOURCE_DIR.to_string(),
        }
    }
}

impl StageLayout {
    pub fn new(source_dir: impl Into<String>) -> Self {
        Self {
            source_dir: source_dir.into(),
        }
    }

    /// `<stage>/<source_dir>`
    pub fn manifest_dir(&self, stage: &Path) -> PathBuf {
        stage.join(&self.source_dir)
    }

    pub fn package_path(&self, stage: &Path) -> PathBuf {
        self.manifest_dir(stage).join(PACKAGE_FILE)
    }

    pub fn destructive_path(&self, stage: &Path) -> PathBuf {
        self.manifest_dir(stage).join(DESTRUCTIVE_FILE)
    }
}

/// Remove `dir` if present and create it empty.
pub fn prepare_dir(dir: &Path) -> Result<(), StageError> {
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(|e| io_error(dir, e))?;
    }
    fs::create_dir_all(dir).map_err(|e| io_error(dir, e))
}

/// Check that recreating `dir` cannot delete any of `protected`.
///
/// Both sides are resolved to absolute, symlink-free paths first. `dir` may
/// not exist yet; its nearest existing ancestor is resolved instead.
///
/// # Errors
///
/// - [`StageError::Overlap`] if `dir` equals or contains a protected path
pub fn ensure_disjoint(dir: &Path, protected: &[PathBuf]) -> Result<(), StageError> {
    let resolved = resolve_path(dir)?;
    for path in protected {
        let guarded = resolve_path(path)?;
        if guarded.starts_with(&resolved) {
            return Err(StageError::Overlap {
                path: dir.to_path_buf(),
                protected: path.clone(),
            });
        }
    }
    Ok(())
}

/// Canonicalize the longest existing prefix of `path` and re-append the rest.
fn resolve_path(path: &Path) -> Result<PathBuf, StageError> {
    let mut existing = path;
    let mut missing = Vec::new();

    loop {
        match existing.canonicalize() {
            Ok(mut resolved) => {
                resolved.extend(missing.iter().rev());
                return Ok(resolved);
            }
            Err(e) => match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(name)) => {
                    missing.push(name.to_os_string());
                    existing = if parent.as_os_str().is_empty() {
                        Path::new(".")
                    } else {
                        parent
                    };
                }
                _ => return Err(io_error(path, e)),
            },
        }
    }
}

// =============================================================================
// Sources
// =============================================================================

/// Where staged bytes are read from.
pub trait MemberSource {
    /// Contents of the repository-relative `path`, or `None` if absent.
    fn read(&self, path: &str) -> Result<Option<Vec<u8>>, StageError>;
}

/// A directory laid out like the repository, typically a working tree.
#[derive(Debug, Clone, Copy)]
pub struct WorkTree<'a>(pub &'a Path);

impl MemberSource for WorkTree<'_> {
    fn read(&self, path: &str) -> Result<Option<Vec<u8>>, StageError> {
        let full = self.0.join(path);
        if !full.is_file() {
            return Ok(None);
        }
        fs::read(&full).map(Some).map_err(|e| io_error(&full, e))
    }
}

/// Files as committed at one revision.
#[derive(Debug, Clone, Copy)]
pub struct RevisionSource<'a> {
    resolver: &'a ChangeSetResolver,
    revision: &'a Oid,
}

impl<'a> RevisionSource<'a> {
    pub fn new(resolver: &'a ChangeSetResolver, revision: &'a Oid) -> Self {
        Self { resolver, revision }
    }
}

impl MemberSource for RevisionSource<'_> {
    fn read(&self, path: &str) -> Result<Option<Vec<u8>>, StageError> {
        match self.resolver.fetch_historical_file(self.revision, path) {
            Ok(contents) => Ok(Some(contents)),
            Err(GitError::PathNotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// Replication
// =============================================================================

/// Write each member from `source` into `stage`.
///
/// A member's companion file is written along with it when the registry says
/// the type has one and the source has it. Returns the number of files
/// written.
///
/// # Errors
///
/// - [`StageError::MissingSource`] if a member's primary file is absent
pub fn replicate_members<S: MemberSource + ?Sized>(
    members: &[MetadataDescriptor],
    source: &S,
    stage: &Path,
) -> Result<usize, StageError> {
    let mut copied = 0;

    for member in members {
        let relative = member.repo_path();
        let contents = source
            .read(&relative)?
            .ok_or_else(|| StageError::MissingSource {
                path: relative.clone(),
            })?;
        write_into(&stage.join(&relative), &contents)?;
        copied += 1;

        if member.has_companion {
            let companion = companion_path_of(&relative);
            match source.read(&companion)? {
                Some(contents) => {
                    write_into(&stage.join(&companion), &contents)?;
                    copied += 1;
                }
                None => tracing::debug!(path = %companion, "companion file not present"),
            }
        }
    }

    tracing::info!(files = copied, stage = %stage.display(), "replicated members");
    Ok(copied)
}

fn write_into(destination: &Path, contents: &[u8]) -> Result<(), StageError> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }
    fs::write(destination, contents).map_err(|e| io_error(destination, e))
}

pub(crate) fn io_error(path: &Path, source: std::io::Error) -> StageError {
    StageError::Io {
        path: path.to_path_buf(),
        source,
    }
}
