//! build command - Stage a deployment package
//!
//! Wires configuration, environment and flags into the engine pipeline and
//! reports the [`BuildSummary`](crate::engine::BuildSummary).

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::core::types::Committer;
use crate::engine::pipeline::{BuildEnv, BuildOptions, Pipeline};
use crate::engine::ResolveMode;
use crate::ui::output;

use super::report_warnings;

/// Flags of the `build` command.
#[derive(Debug, Clone)]
pub struct BuildArgs {
    pub current: String,
    pub previous: Option<String>,
    pub force_initial: bool,
    pub stage: PathBuf,
    pub rollback: Option<PathBuf>,
    pub update_package: bool,
    pub committer_name: Option<String>,
    pub committer_email: Option<String>,
    pub json: bool,
}

pub fn build(ctx: &Context, args: BuildArgs) -> Result<()> {
    let git = ctx.open_repo()?;
    let info = git.info();
    let config = ctx.load_config(Some(&info))?;
    let registry = ctx.load_registry(&config)?;
    drop(git);

    let committer = match (&args.committer_name, &args.committer_email) {
        (Some(name), Some(email)) => {
            Some(Committer::new(name.as_str(), email.as_str()).context("invalid committer")?)
        }
        _ => None,
    };

    let options = BuildOptions {
        repo: ctx.work_path(),
        current: args.current,
        previous: args.previous,
        force_initial: args.force_initial,
        stage_dir: args.stage,
        rollback_dir: args.rollback,
        update_package: args.update_package,
        committer,
    };

    let pipeline = Pipeline::new(&registry, &config, BuildEnv::from_env());
    let summary = pipeline.run(&options).context("build failed")?;

    if args.json {
        output::json(&summary)?;
        return Ok(());
    }

    report_warnings(ctx, &summary.warnings);

    let v = ctx.verbosity;
    match &summary.mode {
        ResolveMode::Initial => output::print(
            format!("Initial build at {}", summary.current.short(10)),
            v,
        ),
        ResolveMode::Differential { previous } => output::print(
            format!(
                "Differential build {}..{}",
                previous.short(10),
                summary.current.short(10)
            ),
            v,
        ),
    }
    output::section("Deploying", &summary.deployed, v);
    if !summary.destroyed.is_empty() {
        output::section("Deleting", &summary.destroyed, v);
    }
    output::print(
        format!(
            "Staged {} files in {}",
            summary.files_staged,
            summary.deploy_dir.display()
        ),
        v,
    );
    if summary.requires_tests {
        output::print("Apex changes present: tests required", v);
    }
    if let Some(rollback) = &summary.rollback {
        output::print(
            format!("Rollback package: {}", rollback.archive.display()),
            v,
        );
    }
    if summary.package_updated {
        output::print("Committed updated manifest", v);
    }

    Ok(())
}
