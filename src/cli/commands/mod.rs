//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads what it needs (repository, config, registry) through the [`Context`]
//! 2. Calls the engine
//! 3. Formats and displays output
//!
//! Only `build` writes anything, and only through the engine.

mod build;
mod changes;
mod classify;
mod completion;
mod ls_tree;
mod manifest;

pub use build::build;
pub use changes::changes;
pub use classify::classify;
pub use completion::completion;
pub use ls_tree::ls_tree;
pub use manifest::manifest;

use anyhow::Result;

use crate::cli::args::Command;
use crate::cli::Context;
use crate::engine::ClassificationWarning;
use crate::ui::output;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Changes {
            current,
            previous,
            json,
        } => changes::changes(ctx, &current, previous.as_deref(), json),
        Command::LsTree { rev } => ls_tree::ls_tree(ctx, &rev),
        Command::Classify { paths, json } => classify::classify(ctx, &paths, json),
        Command::Manifest {
            current,
            previous,
            destructive,
            out,
        } => manifest::manifest(
            ctx,
            &current,
            previous.as_deref(),
            destructive,
            out.as_deref(),
        ),
        Command::Build {
            current,
            previous,
            force_initial,
            stage,
            rollback,
            update_package,
            committer_name,
            committer_email,
            json,
        } => build::build(
            ctx,
            build::BuildArgs {
                current,
                previous,
                force_initial,
                stage,
                rollback,
                update_package,
                committer_name,
                committer_email,
                json,
            },
        ),
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// Show classification warnings on stderr.
fn report_warnings(ctx: &Context, warnings: &[ClassificationWarning]) {
    for warning in warnings {
        output::warn(warning, ctx.verbosity);
    }
}
