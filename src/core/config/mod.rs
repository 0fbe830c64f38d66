//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! metashift has two configuration scopes:
//! - **Global**: user-level settings (registry override, committer identity)
//! - **Repo**: how builds of one repository behave
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file
//! 4. Environment and CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$METASHIFT_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/metashift/config.toml`
//! 3. `~/.metashift/config.toml`
//!
//! # Repo Config Locations
//!
//! Searched in order:
//! 1. `<common_dir>/metashift/config.toml` (canonical)
//! 2. `<work_dir>/.metashift.toml` (compatibility, warns)
//!
//! # Example
//!
//! ```no_run
//! use metashift::core::config::Config;
//!
//! let result = Config::load(None).unwrap();
//! let config = result.config;
//! println!("manifest: {}", config.manifest_path());
//! println!("rollback: {}", config.rollback());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, RepoConfig};

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::core::paths::{compat_config_path, MetashiftPaths};
use crate::core::types::Committer;
use crate::git::RepoInfo;

/// Default deployable source directory.
pub const DEFAULT_SOURCE_DIR: &str = "src";

/// Default location of the committed manifest.
pub const DEFAULT_MANIFEST_PATH: &str = "src/package.xml";

/// Default message for manifest update commits.
pub const DEFAULT_COMMIT_MESSAGE: &str = "metashift updated src/package.xml";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    pub config: Config,
    pub warnings: Vec<ConfigWarning>,
}

/// Merged configuration from all sources.
///
/// Accessors apply defaults; callers never see an unset value.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub global: GlobalConfig,
    pub repo: Option<RepoConfig>,
    global_path: Option<PathBuf>,
    repo_path: Option<PathBuf>,
}

impl Config {
    /// Assemble a configuration from already-parsed parts.
    ///
    /// Nothing is read from disk, so the `*_loaded_from` accessors return
    /// `None`. Values are validated the same way as loaded files.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if either part is invalid.
    pub fn from_parts(
        global: GlobalConfig,
        repo: Option<RepoConfig>,
    ) -> Result<Self, ConfigError> {
        global.validate()?;
        if let Some(ref r) = repo {
            r.validate()?;
        }
        Ok(Config {
            global,
            repo,
            global_path: None,
            repo_path: None,
        })
    }

    /// Load configuration from default locations.
    ///
    /// If `repo` is provided, also loads that repository's config.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed or
    /// validated. Missing files are not an error (defaults are used).
    pub fn load(repo: Option<&RepoInfo>) -> Result<ConfigLoadResult, ConfigError> {
        Self::load_with(&global_candidates(), repo)
    }

    /// Load using an explicit list of global config candidates.
    pub fn load_with(
        global_candidates: &[PathBuf],
        repo: Option<&RepoInfo>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let (global, global_path) = match global_candidates.iter().find(|p| p.exists()) {
            Some(path) => (read_config::<GlobalConfig>(path)?, Some(path.clone())),
            None => (GlobalConfig::default(), None),
        };

        let (repo, repo_path) = match repo {
            Some(info) => Self::load_repo(info, &mut warnings)?,
            None => (None, None),
        };

        global.validate()?;
        if let Some(ref r) = repo {
            r.validate()?;
        }

        if let Some(path) = &global_path {
            tracing::debug!(path = %path.display(), "loaded global config");
        }
        if let Some(path) = &repo_path {
            tracing::debug!(path = %path.display(), "loaded repo config");
        }

        Ok(ConfigLoadResult {
            config: Config {
                global,
                repo,
                global_path,
                repo_path,
            },
            warnings,
        })
    }

    fn load_repo(
        info: &RepoInfo,
        warnings: &mut Vec<ConfigWarning>,
    ) -> Result<(Option<RepoConfig>, Option<PathBuf>), ConfigError> {
        let canonical = MetashiftPaths::from_repo_info(info).repo_config_path();
        if canonical.exists() {
            let config = read_config(&canonical)?;
            return Ok((Some(config), Some(canonical)));
        }

        if let Some(work_dir) = &info.work_dir {
            let compat = compat_config_path(work_dir);
            if compat.exists() {
                warnings.push(ConfigWarning {
                    message: format!(
                        "Using compatibility config location. Please move to '{}'",
                        canonical.display()
                    ),
                    path: compat.clone(),
                });
                let config = read_config(&compat)?;
                return Ok((Some(config), Some(compat)));
            }
        }

        Ok((None, None))
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Alternate Type Registry, if configured.
    pub fn registry_path(&self) -> Option<&Path> {
        self.global.registry.as_deref()
    }

    /// Committer identity, if configured.
    pub fn committer(&self) -> Option<Committer> {
        match (&self.global.committer_name, &self.global.committer_email) {
            (Some(name), Some(email)) => Committer::new(name.as_str(), email.as_str()).ok(),
            _ => None,
        }
    }

    pub fn source_dir(&self) -> &str {
        self.repo
            .as_ref()
            .and_then(|r| r.source_dir.as_deref())
            .unwrap_or(DEFAULT_SOURCE_DIR)
    }

    pub fn manifest_path(&self) -> &str {
        self.repo
            .as_ref()
            .and_then(|r| r.manifest_path.as_deref())
            .unwrap_or(DEFAULT_MANIFEST_PATH)
    }

    pub fn commit_message(&self) -> &str {
        self.repo
            .as_ref()
            .and_then(|r| r.commit_message.as_deref())
            .unwrap_or(DEFAULT_COMMIT_MESSAGE)
    }

    /// Defaults to `false`.
    pub fn rollback(&self) -> bool {
        self.repo_flag(|r| r.rollback)
    }

    /// Defaults to `false`.
    pub fn update_package(&self) -> bool {
        self.repo_flag(|r| r.update_package)
    }

    /// Defaults to `false`.
    pub fn force_initial_build(&self) -> bool {
        self.repo_flag(|r| r.force_initial_build)
    }

    pub fn force_sha(&self) -> Option<&str> {
        self.repo.as_ref().and_then(|r| r.force_sha.as_deref())
    }

    fn repo_flag(&self, get: impl Fn(&RepoConfig) -> Option<bool>) -> bool {
        self.repo.as_ref().and_then(get).unwrap_or(false)
    }

    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    pub fn repo_config_loaded_from(&self) -> Option<&Path> {
        self.repo_path.as_deref()
    }
}

/// Global config candidates in search order.
fn global_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(path) = std::env::var("METASHIFT_CONFIG") {
        candidates.push(PathBuf::from(path));
    }
    if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
        candidates.push(PathBuf::from(xdg_home).join("metashift/config.toml"));
    }
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".metashift/config.toml"));
    }

    candidates
}

fn read_config<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo_info(root: &Path) -> RepoInfo {
        RepoInfo {
            git_dir: root.join(".git"),
            common_dir: root.join(".git"),
            work_dir: Some(root.to_path_buf()),
        }
    }

    #[test]
    fn defaults_without_files() {
        let temp = TempDir::new().unwrap();
        let missing = vec![temp.path().join("nope.toml")];

        let config = Config::load_with(&missing, None).unwrap().config;
        assert_eq!(config.source_dir(), "src");
        assert_eq!(config.manifest_path(), "src/package.xml");
        assert_eq!(config.commit_message(), DEFAULT_COMMIT_MESSAGE);
        assert!(!config.rollback());
        assert!(!config.update_package());
        assert!(!config.force_initial_build());
        assert!(config.force_sha().is_none());
        assert!(config.committer().is_none());
        assert!(config.global_config_loaded_from().is_none());
    }

    #[test]
    fn first_existing_global_wins() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("first.toml");
        let second = temp.path().join("second.toml");
        fs::write(&second, "registry = \"/second.xml\"").unwrap();

        let candidates = vec![first.clone(), second.clone()];
        let config = Config::load_with(&candidates, None).unwrap().config;
        assert_eq!(config.registry_path(), Some(Path::new("/second.xml")));

        fs::write(&first, "registry = \"/first.xml\"").unwrap();
        let config = Config::load_with(&candidates, None).unwrap().config;
        assert_eq!(config.registry_path(), Some(Path::new("/first.xml")));
        assert_eq!(config.global_config_loaded_from(), Some(first.as_path()));
    }

    #[test]
    fn global_committer() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            r#"
            committer_name = "Build Bot"
            committer_email = "bot@example.com"
            "#,
        )
        .unwrap();

        let config = Config::load_with(&[path], None).unwrap().config;
        let committer = config.committer().unwrap();
        assert_eq!(committer.name(), "Build Bot");
        assert_eq!(committer.email(), "bot@example.com");
    }

    #[test]
    fn canonical_repo_config() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".git/metashift");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("config.toml"),
            r#"
            source_dir = "force-app"
            rollback = true
            force_sha = "HEAD~3"
            "#,
        )
        .unwrap();

        let result = Config::load_with(&[], Some(&repo_info(temp.path()))).unwrap();
        assert!(result.warnings.is_empty());
        assert_eq!(result.config.source_dir(), "force-app");
        assert!(result.config.rollback());
        assert_eq!(result.config.force_sha(), Some("HEAD~3"));
    }

    #[test]
    fn compat_repo_config_warns() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".metashift.toml"), "update_package = true").unwrap();

        let result = Config::load_with(&[], Some(&repo_info(temp.path()))).unwrap();
        assert!(result.config.update_package());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].message.contains("compatibility"));
    }

    #[test]
    fn canonical_preferred_over_compat() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".git/metashift");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.toml"), "rollback = true").unwrap();
        fs::write(temp.path().join(".metashift.toml"), "rollback = false").unwrap();

        let result = Config::load_with(&[], Some(&repo_info(temp.path()))).unwrap();
        assert!(result.config.rollback());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn unknown_fields_rejected() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".metashift.toml"), "trunk = \"main\"").unwrap();

        let result = Config::load_with(&[], Some(&repo_info(temp.path())));
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn invalid_value_rejected() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(".metashift.toml"),
            "manifest_path = \"/abs/package.xml\"",
        )
        .unwrap();

        let result = Config::load_with(&[], Some(&repo_info(temp.path())));
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn from_parts_applies_values() {
        let config = Config::from_parts(
            GlobalConfig::default(),
            Some(RepoConfig {
                rollback: Some(true),
                source_dir: Some("force-app".into()),
                ..Default::default()
            }),
        )
        .unwrap();

        assert!(config.rollback());
        assert_eq!(config.source_dir(), "force-app");
        assert!(config.repo_config_loaded_from().is_none());
    }

    #[test]
    fn from_parts_validates() {
        let result = Config::from_parts(
            GlobalConfig::default(),
            Some(RepoConfig {
                manifest_path: Some("package.txt".into()),
                ..Default::default()
            }),
        );
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }
}
