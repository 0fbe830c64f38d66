//! engine::rollback
//!
//! Rollback packages: the inverse of a differential change, restorable from
//! history.
//!
//! # Inversion
//!
//! - Paths the change **added** go into a destructive manifest, so deploying
//!   the rollback removes them again.
//! - Paths the change **deleted or modified** (the old change set) go into
//!   the package manifest, and their content is read from the previous
//!   revision.
//!
//! # Integrity
//!
//! Every accepted restore member must exist at the previous revision. A
//! missing primary file fails the whole rollback with
//! [`RollbackError::Integrity`] before anything is written, so a manifest
//! never references content the package does not carry. Companion files are
//! restored when present and skipped when not.
//!
//! # Output
//!
//! The package is staged under the destination directory, zipped to
//! `<destination>.zip`, and the staging directory is removed.
//!
//! # Example
//!
//! ```ignore
//! use metashift::engine::rollback::build_rollback;
//! use metashift::engine::stage::StageLayout;
//!
//! let artifact = build_rollback(&resolver, &registry, Path::new("out/rollback"), &StageLayout::default())?;
//! println!("rollback archive at {}", artifact.archive.display());
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::core::companion::companion_path_of;
use crate::core::registry::TypeRegistry;
use crate::core::types::Oid;
use crate::engine::manifest::{synthesize, ClassificationWarning, ManifestError, Synthesis};
use crate::engine::resolver::{write_atomic, ChangeSetResolver};
use crate::engine::stage::{self, StageError, StageLayout};
use crate::git::GitError;

/// Errors from building a rollback package.
#[derive(Debug, Error)]
pub enum RollbackError {
    /// Initial builds have nothing to roll back to.
    #[error("no previous revision to roll back to")]
    NoPreviousRevision,

    /// An accepted member is missing from the previous revision.
    #[error("rollback integrity: '{path}' not found at {revision}")]
    Integrity {
        path: String,
        revision: Oid,
        #[source]
        source: GitError,
    },

    #[error("rollback i/o error at '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write rollback archive: {0}")]
    Archive(String),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error(transparent)]
    Git(#[from] GitError),
}

/// A file to be written into the rollback package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredFile {
    /// Repository-relative path.
    pub path: String,
    pub contents: Vec<u8>,
}

/// Everything a rollback package contains, fully materialized in memory.
#[derive(Debug, Clone)]
pub struct RollbackPlan {
    pub previous: Oid,
    /// Removes what the change added.
    pub destructive: Synthesis,
    /// Restores what the change deleted or modified.
    pub restore: Synthesis,
    pub files: Vec<RestoredFile>,
}

impl RollbackPlan {
    /// Warnings from both manifests, destructive first.
    pub fn warnings(&self) -> Vec<ClassificationWarning> {
        self.destructive
            .warnings
            .iter()
            .chain(&self.restore.warnings)
            .cloned()
            .collect()
    }
}

/// The written rollback package.
#[derive(Debug, Clone, Serialize)]
pub struct RollbackArtifact {
    pub archive: PathBuf,
    /// Full names of restored members.
    pub restored: Vec<String>,
    /// Full names of members the rollback deletes.
    pub removed: Vec<String>,
    pub warnings: Vec<ClassificationWarning>,
}

/// Invert the resolver's change and read every restore member from history.
///
/// # Errors
///
/// - [`RollbackError::NoPreviousRevision`] in initial mode
/// - [`RollbackError::Integrity`] if a restore member is missing at the
///   previous revision
pub fn plan_rollback(
    resolver: &ChangeSetResolver,
    registry: &TypeRegistry,
) -> Result<RollbackPlan, RollbackError> {
    let previous = resolver
        .previous()
        .cloned()
        .ok_or(RollbackError::NoPreviousRevision)?;

    let destructive = synthesize(resolver.additions(), true, registry)?;
    let restore = synthesize(&resolver.old_change_set(), false, registry)?;

    let mut files = Vec::new();
    for member in &restore.accepted {
        let path = member.repo_path();
        let contents = match resolver.fetch_historical_file(&previous, &path) {
            Ok(bytes) => bytes,
            Err(e @ GitError::PathNotFound { .. }) => {
                return Err(RollbackError::Integrity {
                    path,
                    revision: previous,
                    source: e,
                })
            }
            Err(e) => return Err(e.into()),
        };
        files.push(RestoredFile { path, contents });

        if member.has_companion {
            let companion = companion_path_of(&member.repo_path());
            match resolver.fetch_historical_file(&previous, &companion) {
                Ok(contents) => files.push(RestoredFile {
                    path: companion,
                    contents,
                }),
                Err(GitError::PathNotFound { .. }) => {
                    tracing::debug!(path = %companion, "no companion at previous revision");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    tracing::info!(
        previous = %previous.short(10),
        restored = restore.accepted.len(),
        removed = destructive.accepted.len(),
        "planned rollback"
    );

    Ok(RollbackPlan {
        previous,
        destructive,
        restore,
        files,
    })
}

/// Build the rollback archive for the resolver's change.
///
/// `destination` is recreated as a staging directory, populated, zipped to
/// `destination.zip`, and removed again. A `destination` that equals or
/// contains the repository is refused before anything is deleted.
pub fn build_rollback(
    resolver: &ChangeSetResolver,
    registry: &TypeRegistry,
    destination: &Path,
    layout: &StageLayout,
) -> Result<RollbackArtifact, RollbackError> {
    stage::ensure_disjoint(destination, &resolver.protected_paths())?;
    let plan = plan_rollback(resolver, registry)?;
    write_plan(&plan, destination, layout)?;

    let archive = archive_path(destination);
    zip_directory(destination, &archive)?;
    fs::remove_dir_all(destination).map_err(|e| io_error(destination, e))?;

    tracing::info!(archive = %archive.display(), "created rollback package");

    Ok(RollbackArtifact {
        archive,
        restored: plan.restore.accepted.iter().map(|d| d.full_name()).collect(),
        removed: plan
            .destructive
            .accepted
            .iter()
            .map(|d| d.full_name())
            .collect(),
        warnings: plan.warnings(),
    })
}

/// `destination` with `.zip` appended to its file name.
fn archive_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".zip");
    PathBuf::from(name)
}

/// Write the plan's manifests and files under `destination`.
pub fn write_plan(
    plan: &RollbackPlan,
    destination: &Path,
    layout: &StageLayout,
) -> Result<(), RollbackError> {
    stage::prepare_dir(destination)?;

    let package = layout.package_path(destination);
    write_atomic(&package, plan.restore.xml.as_bytes()).map_err(|e| io_error(&package, e))?;

    if !plan.destructive.is_empty() {
        let destructive = layout.destructive_path(destination);
        write_atomic(&destructive, plan.destructive.xml.as_bytes())
            .map_err(|e| io_error(&destructive, e))?;
    }

    for file in &plan.files {
        let target = destination.join(&file.path);
        write_atomic(&target, &file.contents).map_err(|e| io_error(&target, e))?;
    }

    Ok(())
}

/// Zip every file under `dir` into `archive`, named relative to `dir`.
fn zip_directory(dir: &Path, archive: &Path) -> Result<(), RollbackError> {
    let mut entries = Vec::new();
    collect_files(dir, dir, &mut entries)?;
    entries.sort();

    let file = fs::File::create(archive).map_err(|e| io_error(archive, e))?;
    let mut zip = ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for name in entries {
        let path = dir.join(&name);
        let contents = fs::read(&path).map_err(|e| io_error(&path, e))?;
        zip.start_file(name.as_str(), options)
            .map_err(|e| RollbackError::Archive(format!("zip error: {e}")))?;
        zip.write_all(&contents).map_err(|e| io_error(archive, e))?;
    }

    zip.finish()
        .map_err(|e| RollbackError::Archive(format!("zip finish error: {e}")))?;
    Ok(())
}

/// Relative `/`-separated names of every file below `dir`.
fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<(), RollbackError> {
    let entries = fs::read_dir(dir).map_err(|e| io_error(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_error(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.push(name);
        }
    }
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> RollbackError {
    RollbackError::Io {
        path: path.to_path_buf(),
        source,
    }
}
