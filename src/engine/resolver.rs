//! engine::resolver
//!
//! The change-set resolver: what changed between two revisions.
//!
//! # Modes
//!
//! - **Initial** (no previous revision): every leaf path of the current tree
//!   is an addition; the other sets are empty.
//! - **Differential**: the root trees of both revisions are diffed and each
//!   entry is sorted into additions, deletions, or the old/new halves of the
//!   modifications.
//!
//! # Folding
//!
//! Companion descriptor paths (`Foo.cls-meta.xml`) are folded onto their
//! primary artifact (`Foo.cls`) before insertion, so an artifact and its
//! sidecar count as one logical member. An added path is additionally
//! recorded as-is, because the raw sidecar and its primary can arrive as
//! separate entries of the same logical addition.
//!
//! Every set keeps diff emission order and suppresses duplicates on insert
//! (first occurrence wins).
//!
//! # Example
//!
//! ```ignore
//! use metashift::engine::resolver::resolve_changes;
//! use std::path::{Path, PathBuf};
//!
//! let resolver = resolve_changes(Path::new("."), "HEAD", Some("HEAD~1"))?;
//! for path in resolver.new_change_set() {
//!     println!("deploy {}", path);
//! }
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::companion::primary_path_of;
use crate::core::ops::lock::RepoLock;
use crate::core::paths::MetashiftPaths;
use crate::core::registry::TypeRegistry;
use crate::core::types::{ChangeKind, Committer, Oid};
use crate::engine::manifest::synthesize;
use crate::engine::EngineError;
use crate::git::{DiffEntry, Git, GitError};

/// The four path sets produced by one resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub additions: Vec<String>,
    pub deletions: Vec<String>,
    pub modifications_old: Vec<String>,
    pub modifications_new: Vec<String>,
}

impl ChangeSet {
    /// Sort diff entries into the four sets.
    ///
    /// Entries of any kind other than add, delete or modify are ignored.
    pub fn from_diff(entries: &[DiffEntry]) -> Self {
        let mut set = ChangeSet::default();

        for entry in entries {
            match (entry.kind, &entry.old_path, &entry.new_path) {
                (ChangeKind::Deleted, Some(old), _) => {
                    push_unique(&mut set.deletions, primary_path_of(old));
                }
                (ChangeKind::Added, _, Some(new)) => {
                    push_unique(&mut set.additions, new);
                    push_unique(&mut set.additions, primary_path_of(new));
                }
                (ChangeKind::Modified, Some(old), Some(new)) => {
                    push_unique(&mut set.modifications_new, primary_path_of(new));
                    push_unique(&mut set.modifications_old, primary_path_of(old));
                }
                (kind, old, new) => {
                    tracing::debug!(%kind, ?old, ?new, "ignoring diff entry");
                }
            }
        }

        set
    }

    /// True if nothing was added, deleted or modified.
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty()
            && self.deletions.is_empty()
            && self.modifications_old.is_empty()
            && self.modifications_new.is_empty()
    }
}

fn push_unique(list: &mut Vec<String>, item: &str) {
    if !list.iter().any(|existing| existing == item) {
        list.push(item.to_string());
    }
}

/// How the resolver was constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ResolveMode {
    Initial,
    Differential { previous: Oid },
}

/// Where and how the regenerated manifest is committed.
#[derive(Debug, Clone)]
pub struct ManifestCommit {
    /// Path of the manifest relative to the working directory.
    pub path: String,
    pub message: String,
    pub committer: Committer,
}

/// Change sets for one build invocation plus read access to history.
#[derive(Debug)]
pub struct ChangeSetResolver {
    git: Git,
    current: Oid,
    mode: ResolveMode,
    changes: ChangeSet,
}

/// Open the repository at `repo_path` and resolve its changes.
///
/// With `previous_rev` absent this runs in initial mode.
///
/// # Errors
///
/// - [`GitError::NotARepo`] if `repo_path` is not inside a repository
/// - [`GitError::RevisionNotFound`] if either revision cannot be resolved
pub fn resolve_changes(
    repo_path: &Path,
    current_rev: &str,
    previous_rev: Option<&str>,
) -> Result<ChangeSetResolver, GitError> {
    let git = Git::open(repo_path)?;
    let current = git.resolve_commit(current_rev)?;

    match previous_rev {
        Some(rev) => {
            let previous = git.resolve_commit(rev)?;
            ChangeSetResolver::differential(git, current, previous)
        }
        None => ChangeSetResolver::initial(git, current),
    }
}

impl ChangeSetResolver {
    /// Initial mode: the whole current tree is the addition set.
    pub fn initial(git: Git, current: Oid) -> Result<Self, GitError> {
        let additions = git.list_tree_paths(&current)?;
        tracing::info!(current = %current.short(10), paths = additions.len(), "initial build");

        Ok(Self {
            git,
            current,
            mode: ResolveMode::Initial,
            changes: ChangeSet {
                additions,
                ..Default::default()
            },
        })
    }

    /// Differential mode: diff `previous` against `current`.
    pub fn differential(git: Git, current: Oid, previous: Oid) -> Result<Self, GitError> {
        let entries = git.diff_commits(&previous, &current)?;
        let changes = ChangeSet::from_diff(&entries);

        tracing::info!(
            previous = %previous.short(10),
            current = %current.short(10),
            additions = changes.additions.len(),
            deletions = changes.deletions.len(),
            modifications = changes.modifications_new.len(),
            "resolved changes"
        );

        Ok(Self {
            git,
            current,
            mode: ResolveMode::Differential { previous },
            changes,
        })
    }

    pub fn mode(&self) -> &ResolveMode {
        &self.mode
    }

    pub fn current(&self) -> &Oid {
        &self.current
    }

    /// The previous revision, absent in initial mode.
    pub fn previous(&self) -> Option<&Oid> {
        match &self.mode {
            ResolveMode::Initial => None,
            ResolveMode::Differential { previous } => Some(previous),
        }
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    pub fn additions(&self) -> &[String] {
        &self.changes.additions
    }

    pub fn deletions(&self) -> &[String] {
        &self.changes.deletions
    }

    pub fn modifications_old(&self) -> &[String] {
        &self.changes.modifications_old
    }

    pub fn modifications_new(&self) -> &[String] {
        &self.changes.modifications_new
    }

    /// Everything to deploy.
    ///
    /// Initial mode: the full listing. Differential mode: additions followed
    /// by the new side of the modifications, without cross-deduplication.
    pub fn new_change_set(&self) -> Vec<String> {
        match self.mode {
            ResolveMode::Initial => self.changes.additions.clone(),
            ResolveMode::Differential { .. } => self
                .changes
                .additions
                .iter()
                .chain(&self.changes.modifications_new)
                .cloned()
                .collect(),
        }
    }

    /// Everything that existed before: deletions followed by the old side of
    /// the modifications.
    pub fn old_change_set(&self) -> Vec<String> {
        self.changes
            .deletions
            .iter()
            .chain(&self.changes.modifications_old)
            .cloned()
            .collect()
    }

    /// Recursively list every leaf path of a revision (`ls-tree -r`).
    pub fn list_all_paths(&self, revision: &Oid) -> Result<Vec<String>, GitError> {
        self.git.list_tree_paths(revision)
    }

    /// Read a file as it was at an arbitrary revision.
    ///
    /// # Errors
    ///
    /// - [`GitError::PathNotFound`] if the path does not exist there
    pub fn fetch_historical_file(&self, revision: &Oid, path: &str) -> Result<Vec<u8>, GitError> {
        self.git.read_file_at(revision, path)
    }

    /// The repository's working directory.
    pub fn work_dir(&self) -> Result<&Path, GitError> {
        self.git.work_dir()
    }

    /// Directories a build must never recreate or delete: the working tree
    /// and the git directories.
    pub fn protected_paths(&self) -> Vec<PathBuf> {
        let info = self.git.info();
        let mut paths = vec![info.git_dir, info.common_dir];
        paths.extend(info.work_dir);
        paths
    }

    /// Regenerate the full manifest for the current tree and commit it.
    ///
    /// Only happens when the change set has additions or deletions; a
    /// modification-only change leaves membership unchanged and returns
    /// `false` without touching the repository. The write and commit run
    /// under the repository lock.
    pub fn commit_manifest_update(
        &self,
        registry: &TypeRegistry,
        commit: &ManifestCommit,
    ) -> Result<bool, EngineError> {
        if self.changes.additions.is_empty() && self.changes.deletions.is_empty() {
            tracing::debug!("no additions or deletions, manifest unchanged");
            return Ok(false);
        }

        let work_dir = self.git.work_dir()?;
        let contents = self.list_all_paths(&self.current)?;
        let synthesis = synthesize(&contents, false, registry)?;

        let paths = MetashiftPaths::from_repo_info(&self.git.info());
        let _lock = RepoLock::acquire(&paths)?;

        let target = work_dir.join(&commit.path);
        write_atomic(&target, synthesis.xml.as_bytes()).map_err(|e| EngineError::Io {
            path: target.clone(),
            source: e,
        })?;

        let oid = self
            .git
            .stage_and_commit(&commit.path, &commit.committer, &commit.message)?;
        tracing::info!(commit = %oid.short(10), path = %commit.path, "committed manifest update");

        Ok(true)
    }
}

/// Write a file in one step: temp file in the same directory, then rename.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = std::path::PathBuf::from(temp_name);

    let mut file = fs::File::create(&temp_path)?;
    file.write_all(contents)?;
    file.sync_all()?;

    fs::rename(&temp_path, path)
}
