//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$METASHIFT_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/metashift/config.toml`
//! 3. `~/.metashift/config.toml`
//!
//! # Repo Config
//!
//! Located at `<common_dir>/metashift/config.toml` (canonical) or
//! `.metashift.toml` in the working tree (compatibility).
//!
//! # Validation
//!
//! Values are validated after parsing; a file that parses but carries a bad
//! value is rejected just like a file that does not parse.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::Committer;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// registry = "/etc/metashift/registry.xml"
/// committer_name = "Build Bot"
/// committer_email = "builds@example.com"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Alternate Type Registry document
    pub registry: Option<PathBuf>,

    /// Identity used for manifest commits
    pub committer_name: Option<String>,
    pub committer_email: Option<String>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(registry) = &self.registry {
            if registry.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "registry path cannot be empty".to_string(),
                ));
            }
        }

        match (&self.committer_name, &self.committer_email) {
            (Some(name), Some(email)) => {
                Committer::new(name, email).map_err(|e| {
                    ConfigError::InvalidValue(format!("invalid committer: {}", e))
                })?;
            }
            (None, None) => {}
            _ => {
                return Err(ConfigError::InvalidValue(
                    "committer_name and committer_email must be set together".to_string(),
                ))
            }
        }

        Ok(())
    }
}

/// Repository configuration.
///
/// # Example
///
/// ```toml
/// source_dir = "src"
/// manifest_path = "src/package.xml"
/// rollback = true
/// update_package = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Directory holding the deployable tree (default: "src")
    pub source_dir: Option<String>,

    /// Manifest committed back by package updates (default: "src/package.xml")
    pub manifest_path: Option<String>,

    /// Commit message for package updates
    pub commit_message: Option<String>,

    /// Build a rollback archive on every differential build
    pub rollback: Option<bool>,

    /// Commit a regenerated manifest when members were added or deleted
    pub update_package: Option<bool>,

    /// Always build from scratch
    pub force_initial_build: Option<bool>,

    /// Pin the previous revision
    pub force_sha: Option<String>,
}

impl RepoConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(dir) = &self.source_dir {
            if dir.is_empty() || !is_relative_inside(Path::new(dir)) {
                return Err(ConfigError::InvalidValue(format!(
                    "source_dir '{}' must be a non-empty relative path",
                    dir
                )));
            }
        }

        if let Some(manifest) = &self.manifest_path {
            if !is_relative_inside(Path::new(manifest)) || !manifest.ends_with(".xml") {
                return Err(ConfigError::InvalidValue(format!(
                    "manifest_path '{}' must be a relative path to an .xml file",
                    manifest
                )));
            }
        }

        if let Some(message) = &self.commit_message {
            if message.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "commit_message cannot be empty".to_string(),
                ));
            }
        }

        if let Some(sha) = &self.force_sha {
            if sha.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "force_sha cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Relative, and never climbing out through `..`.
fn is_relative_inside(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        && path.components().next().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    mod global_config {
        use super::*;

        #[test]
        fn defaults() {
            let config = GlobalConfig::default();
            assert!(config.registry.is_none());
            assert!(config.validate().is_ok());
        }

        #[test]
        fn committer_pair_valid() {
            let config = GlobalConfig {
                committer_name: Some("Build Bot".to_string()),
                committer_email: Some("bot@example.com".to_string()),
                ..Default::default()
            };
            assert!(config.validate().is_ok());
        }

        #[test]
        fn committer_half_rejected() {
            let config = GlobalConfig {
                committer_name: Some("Build Bot".to_string()),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn committer_bad_email_rejected() {
            let config = GlobalConfig {
                committer_name: Some("Build Bot".to_string()),
                committer_email: Some("nope".to_string()),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn roundtrip() {
            let config = GlobalConfig {
                registry: Some(PathBuf::from("/opt/registry.xml")),
                committer_name: Some("Build Bot".to_string()),
                committer_email: Some("bot@example.com".to_string()),
            };
            let toml = toml::to_string_pretty(&config).unwrap();
            let parsed: GlobalConfig = toml::from_str(&toml).unwrap();
            assert_eq!(config, parsed);
        }
    }

    mod repo_config {
        use super::*;

        #[test]
        fn defaults_validate() {
            assert!(RepoConfig::default().validate().is_ok());
        }

        #[test]
        fn absolute_source_dir_rejected() {
            let config = RepoConfig {
                source_dir: Some("/src".to_string()),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn escaping_manifest_rejected() {
            let config = RepoConfig {
                manifest_path: Some("../package.xml".to_string()),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn manifest_must_be_xml() {
            let config = RepoConfig {
                manifest_path: Some("src/package.txt".to_string()),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn empty_force_sha_rejected() {
            let config = RepoConfig {
                force_sha: Some("  ".to_string()),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn reject_unknown_fields() {
            let toml = r#"
                rollback = true
                unknown_field = true
            "#;
            let result: Result<RepoConfig, _> = toml::from_str(toml);
            assert!(result.is_err());
        }

        #[test]
        fn roundtrip() {
            let config = RepoConfig {
                source_dir: Some("force-app".to_string()),
                manifest_path: Some("force-app/package.xml".to_string()),
                commit_message: Some("update manifest".to_string()),
                rollback: Some(true),
                update_package: Some(false),
                force_initial_build: Some(false),
                force_sha: Some("abc123".to_string()),
            };
            let toml = toml::to_string_pretty(&config).unwrap();
            let parsed: RepoConfig = toml::from_str(&toml).unwrap();
            assert_eq!(config, parsed);
            assert!(parsed.validate().is_ok());
        }
    }
}
