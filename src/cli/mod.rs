//! cli
//!
//! Command-line interface layer for metashift.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration and the Type Registry once per invocation
//! - Delegate to the engine and format its results
//!
//! # Architecture
//!
//! The CLI layer is thin. It is the only place that uses `anyhow`; the
//! library layers below return typed errors that are given context here.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::core::config::{Config, ConfigLoadResult};
use crate::core::registry::TypeRegistry;
use crate::git::{Git, RepoInfo};
use crate::logging;
use crate::ui::output::{self, Verbosity};

/// Invocation-wide settings from global flags.
#[derive(Debug, Clone)]
pub struct Context {
    /// Working directory override.
    pub cwd: Option<PathBuf>,
    pub verbosity: Verbosity,
    /// Registry override from `--registry`.
    pub registry: Option<PathBuf>,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            cwd: None,
            verbosity: Verbosity::Normal,
            registry: None,
        }
    }
}

impl Context {
    /// Directory commands operate in.
    pub fn work_path(&self) -> PathBuf {
        self.cwd.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Open the repository containing the working path.
    pub fn open_repo(&self) -> Result<Git> {
        let path = self.work_path();
        Git::open(&path).with_context(|| format!("failed to open repository at {}", path.display()))
    }

    /// Load configuration, surfacing load warnings to the user.
    pub fn load_config(&self, repo: Option<&RepoInfo>) -> Result<Config> {
        let ConfigLoadResult { config, warnings } =
            Config::load(repo).context("failed to load configuration")?;
        for warning in warnings {
            output::warn(
                format!("{} ({})", warning.message, warning.path.display()),
                self.verbosity,
            );
        }
        Ok(config)
    }

    /// Load the Type Registry: `--registry`, then config, then built-in.
    pub fn load_registry(&self, config: &Config) -> Result<TypeRegistry> {
        let path: Option<&Path> = self.registry.as_deref().or(config.registry_path());
        let registry = TypeRegistry::load_or_default(path).context("failed to load type registry")?;
        tracing::debug!(
            entries = registry.len(),
            api_version = registry.api_version(),
            "loaded type registry"
        );
        Ok(registry)
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    let verbosity = Verbosity::from_flags(cli.quiet, cli.debug);
    logging::init(verbosity);

    let ctx = Context {
        cwd: cli.cwd.clone(),
        verbosity,
        registry: cli.registry.clone(),
    };

    commands::dispatch(cli.command, &ctx)
}
