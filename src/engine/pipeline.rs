//! engine::pipeline
//!
//! One build invocation, end to end.
//!
//! # Steps
//!
//! 1. Pick the previous revision ([`select_previous`])
//! 2. Resolve the change set
//! 3. Recreate the stage and write the package and destructive manifests
//! 4. Copy accepted members, as committed at the current revision, into the stage
//! 5. Decide whether the deployment must run tests
//! 6. Optionally build a rollback archive
//! 7. Optionally commit a regenerated manifest back to the repository
//!
//! The result is a [`BuildSummary`], which the CLI prints or emits as JSON.
//!
//! # Example
//!
//! ```ignore
//! let pipeline = Pipeline::new(&registry, &config, BuildEnv::from_env());
//! let summary = pipeline.run(&BuildOptions::new(repo, "HEAD", stage))?;
//! if summary.requires_tests {
//!     println!("run tests");
//! }
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::config::Config;
use crate::core::registry::TypeRegistry;
use crate::core::types::{Committer, Oid};
use crate::engine::manifest::{requires_tests, synthesize, ClassificationWarning};
use crate::engine::resolver::{resolve_changes, write_atomic, ManifestCommit, ResolveMode};
use crate::engine::rollback::{build_rollback, RollbackArtifact};
use crate::engine::stage::{self, RevisionSource, StageLayout};
use crate::engine::EngineError;

/// Environment variable pinning the previous revision.
pub const ENV_SHA_OVERRIDE: &str = "METASHIFT_SHA_OVERRIDE";

/// Environment variable forcing an initial build.
pub const ENV_FORCE_INITIAL: &str = "METASHIFT_FORCE_INITIAL_BUILD";

/// Build-relevant environment, captured once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnv {
    pub sha_override: Option<String>,
    pub force_initial: bool,
    pub committer_name: Option<String>,
    pub committer_email: Option<String>,
}

impl BuildEnv {
    /// Read the process environment.
    ///
    /// Empty values count as unset. The force flag is true only for a
    /// case-insensitive `true`.
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        Self {
            sha_override: var(ENV_SHA_OVERRIDE),
            force_initial: var(ENV_FORCE_INITIAL)
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            committer_name: var("GIT_COMMITTER_NAME"),
            committer_email: var("GIT_COMMITTER_EMAIL"),
        }
    }
}

/// Why a previous revision was (or was not) chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviousSource {
    EnvOverride,
    ConfiguredSha,
    ForcedInitial,
    LastSuccessful,
    NoHistory,
}

/// Pick the previous revision for a build.
///
/// Operator overrides win: the environment override, then the configured
/// sha. Otherwise a forced initial build ignores `last_successful`, and
/// without any of these the build is initial.
pub fn select_previous(
    env_override: Option<&str>,
    configured_sha: Option<&str>,
    force_initial: bool,
    last_successful: Option<&str>,
) -> (Option<String>, PreviousSource) {
    if let Some(sha) = env_override {
        return (Some(sha.to_string()), PreviousSource::EnvOverride);
    }
    if let Some(sha) = configured_sha {
        return (Some(sha.to_string()), PreviousSource::ConfiguredSha);
    }
    if force_initial {
        return (None, PreviousSource::ForcedInitial);
    }
    match last_successful {
        Some(rev) => (Some(rev.to_string()), PreviousSource::LastSuccessful),
        None => (None, PreviousSource::NoHistory),
    }
}

/// Per-invocation options, typically from the command line.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub repo: PathBuf,
    pub current: String,
    /// Commit of the last successful build.
    pub previous: Option<String>,
    pub force_initial: bool,
    pub stage_dir: PathBuf,
    /// Enables rollback when set, in addition to the `rollback` config flag.
    pub rollback_dir: Option<PathBuf>,
    /// Enables the manifest commit, in addition to the `update_package` config flag.
    pub update_package: bool,
    pub committer: Option<Committer>,
}

impl BuildOptions {
    pub fn new(repo: impl Into<PathBuf>, current: impl Into<String>, stage_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo: repo.into(),
            current: current.into(),
            previous: None,
            force_initial: false,
            stage_dir: stage_dir.into(),
            rollback_dir: None,
            update_package: false,
            committer: None,
        }
    }
}

/// What a build did.
#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    #[serde(flatten)]
    pub mode: ResolveMode,
    pub previous_source: PreviousSource,
    pub current: Oid,
    pub deploy_dir: PathBuf,
    pub package_manifest: PathBuf,
    pub destructive_manifest: Option<PathBuf>,
    /// Full names of deployed members.
    pub deployed: Vec<String>,
    /// Full names of deleted members.
    pub destroyed: Vec<String>,
    pub files_staged: usize,
    pub warnings: Vec<ClassificationWarning>,
    pub requires_tests: bool,
    pub rollback: Option<RollbackArtifact>,
    pub package_updated: bool,
    pub generated_at: DateTime<Utc>,
}

/// Runs builds against a loaded registry and configuration.
#[derive(Debug)]
pub struct Pipeline<'a> {
    registry: &'a TypeRegistry,
    config: &'a Config,
    env: BuildEnv,
}

impl<'a> Pipeline<'a> {
    pub fn new(registry: &'a TypeRegistry, config: &'a Config, env: BuildEnv) -> Self {
        Self {
            registry,
            config,
            env,
        }
    }

    /// Run one build.
    pub fn run(&self, options: &BuildOptions) -> Result<BuildSummary, EngineError> {
        let force_initial =
            options.force_initial || self.env.force_initial || self.config.force_initial_build();
        let (previous, previous_source) = select_previous(
            self.env.sha_override.as_deref(),
            self.config.force_sha(),
            force_initial,
            options.previous.as_deref(),
        );
        tracing::info!(?previous, source = ?previous_source, "selected previous revision");

        let resolver = resolve_changes(&options.repo, &options.current, previous.as_deref())?;
        let layout = StageLayout::new(self.config.source_dir());

        // Deploy stage
        let stage_dir = &options.stage_dir;
        stage::ensure_disjoint(stage_dir, &resolver.protected_paths())?;
        stage::prepare_dir(stage_dir)?;

        let destructive = synthesize(resolver.deletions(), true, self.registry)?;
        let package = synthesize(&resolver.new_change_set(), false, self.registry)?;

        let package_manifest = layout.package_path(stage_dir);
        write_file(&package_manifest, &package.xml)?;

        let destructive_manifest = if destructive.is_empty() {
            None
        } else {
            let path = layout.destructive_path(stage_dir);
            write_file(&path, &destructive.xml)?;
            Some(path)
        };

        let source = RevisionSource::new(&resolver, resolver.current());
        let files_staged = stage::replicate_members(&package.accepted, &source, stage_dir)?;
        let requires_tests = requires_tests(&package.accepted);

        tracing::info!(
            deployed = package.accepted.len(),
            destroyed = destructive.accepted.len(),
            requires_tests,
            "created deployment package"
        );

        // Rollback
        let rollback_enabled = options.rollback_dir.is_some() || self.config.rollback();
        let rollback = match (rollback_enabled, resolver.previous()) {
            (true, Some(_)) => {
                let dir = options
                    .rollback_dir
                    .clone()
                    .unwrap_or_else(|| default_rollback_dir(stage_dir));
                Some(build_rollback(&resolver, self.registry, &dir, &layout)?)
            }
            (true, None) => {
                tracing::info!("initial build, skipping rollback");
                None
            }
            (false, _) => None,
        };

        // Package update
        let package_updated = if options.update_package || self.config.update_package() {
            let committer = self.committer(options)?;
            resolver.commit_manifest_update(
                self.registry,
                &ManifestCommit {
                    path: self.config.manifest_path().to_string(),
                    message: self.config.commit_message().to_string(),
                    committer,
                },
            )?
        } else {
            false
        };

        let mut warnings = destructive.warnings.clone();
        warnings.extend(package.warnings.iter().cloned());

        Ok(BuildSummary {
            mode: resolver.mode().clone(),
            previous_source,
            current: resolver.current().clone(),
            deploy_dir: stage_dir.clone(),
            package_manifest,
            destructive_manifest,
            deployed: package.accepted.iter().map(|d| d.full_name()).collect(),
            destroyed: destructive.accepted.iter().map(|d| d.full_name()).collect(),
            files_staged,
            warnings,
            requires_tests,
            rollback,
            package_updated,
            generated_at: Utc::now(),
        })
    }

    /// Committer from options, then environment, then config.
    fn committer(&self, options: &BuildOptions) -> Result<Committer, EngineError> {
        if let Some(committer) = &options.committer {
            return Ok(committer.clone());
        }
        if let (Some(name), Some(email)) = (&self.env.committer_name, &self.env.committer_email) {
            return Ok(Committer::new(name.as_str(), email.as_str())?);
        }
        self.config.committer().ok_or(EngineError::MissingCommitter)
    }
}

/// `<parent of stage>/rollback`
fn default_rollback_dir(stage_dir: &Path) -> PathBuf {
    stage_dir
        .parent()
        .map(|p| p.join("rollback"))
        .unwrap_or_else(|| PathBuf::from("rollback"))
}

fn write_file(path: &Path, contents: &str) -> Result<(), EngineError> {
    write_atomic(path, contents.as_bytes()).map_err(|e| EngineError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    mod selection {
        use super::*;

        #[test]
        fn env_override_wins() {
            let (rev, source) = select_previous(Some("abc"), Some("def"), true, Some("ghi"));
            assert_eq!(rev.as_deref(), Some("abc"));
            assert_eq!(source, PreviousSource::EnvOverride);
        }

        #[test]
        fn configured_sha_beats_force_initial() {
            let (rev, source) = select_previous(None, Some("def"), true, Some("ghi"));
            assert_eq!(rev.as_deref(), Some("def"));
            assert_eq!(source, PreviousSource::ConfiguredSha);
        }

        #[test]
        fn force_initial_ignores_last_successful() {
            let (rev, source) = select_previous(None, None, true, Some("ghi"));
            assert!(rev.is_none());
            assert_eq!(source, PreviousSource::ForcedInitial);
        }

        #[test]
        fn last_successful_used() {
            let (rev, source) = select_previous(None, None, false, Some("ghi"));
            assert_eq!(rev.as_deref(), Some("ghi"));
            assert_eq!(source, PreviousSource::LastSuccessful);
        }

        #[test]
        fn nothing_means_initial() {
            let (rev, source) = select_previous(None, None, false, None);
            assert!(rev.is_none());
            assert_eq!(source, PreviousSource::NoHistory);
        }
    }

    #[test]
    fn default_rollback_dir_is_sibling() {
        assert_eq!(
            default_rollback_dir(Path::new("/work/stage")),
            PathBuf::from("/work/rollback")
        );
    }

    #[test]
    fn options_defaults() {
        let options = BuildOptions::new("/repo", "HEAD", "/stage");
        assert!(options.previous.is_none());
        assert!(!options.force_initial);
        assert!(!options.update_package);
        assert!(options.rollback_dir.is_none());
    }
}
