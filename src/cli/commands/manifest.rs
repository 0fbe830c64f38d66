//! manifest command - Synthesize a package or destructive manifest

use std::path::Path;

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::engine::manifest::synthesize;
use crate::engine::resolver::resolve_changes;
use crate::ui::output;

use super::report_warnings;

pub fn manifest(
    ctx: &Context,
    current: &str,
    previous: Option<&str>,
    destructive: bool,
    out: Option<&Path>,
) -> Result<()> {
    let git = ctx.open_repo()?;
    let config = ctx.load_config(Some(&git.info()))?;
    let registry = ctx.load_registry(&config)?;

    let resolver = resolve_changes(&ctx.work_path(), current, previous)
        .context("failed to resolve changes")?;

    let synthesis = if destructive {
        synthesize(resolver.deletions(), true, &registry)?
    } else {
        synthesize(&resolver.new_change_set(), false, &registry)?
    };
    report_warnings(ctx, &synthesis.warnings);

    match out {
        Some(path) => {
            synthesis
                .document
                .write_to(path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            output::print(
                format!(
                    "Wrote {} members to {}",
                    synthesis.accepted.len(),
                    path.display()
                ),
                ctx.verbosity,
            );
        }
        // The document is the result; print it even when quiet.
        None => print!("{}", synthesis.xml),
    }

    Ok(())
}
