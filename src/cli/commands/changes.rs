//! changes command - Show the change sets between two revisions

use anyhow::{Context as _, Result};
use serde::Serialize;

use crate::cli::Context;
use crate::core::types::Oid;
use crate::engine::resolver::{resolve_changes, ChangeSet, ResolveMode};
use crate::ui::output;

#[derive(Debug, Serialize)]
struct ChangesReport<'a> {
    #[serde(flatten)]
    mode: &'a ResolveMode,
    current: &'a Oid,
    #[serde(flatten)]
    changes: &'a ChangeSet,
    new_change_set: Vec<String>,
    old_change_set: Vec<String>,
}

/// Print the four change sets plus the new and old change sets.
pub fn changes(ctx: &Context, current: &str, previous: Option<&str>, json: bool) -> Result<()> {
    let resolver = resolve_changes(&ctx.work_path(), current, previous)
        .context("failed to resolve changes")?;

    let report = ChangesReport {
        mode: resolver.mode(),
        current: resolver.current(),
        changes: resolver.changes(),
        new_change_set: resolver.new_change_set(),
        old_change_set: resolver.old_change_set(),
    };

    if json {
        output::json(&report)?;
        return Ok(());
    }

    let v = ctx.verbosity;
    match resolver.previous() {
        Some(previous) => output::print(
            format!("Changes {}..{}", previous.short(10), resolver.current().short(10)),
            v,
        ),
        None => output::print(
            format!("Initial build at {}", resolver.current().short(10)),
            v,
        ),
    }
    output::section("Additions", resolver.additions(), v);
    output::section("Deletions", resolver.deletions(), v);
    output::section("Modified (old)", resolver.modifications_old(), v);
    output::section("Modified (new)", resolver.modifications_new(), v);
    output::section("New change set", &report.new_change_set, v);
    output::section("Old change set", &report.old_change_set, v);

    Ok(())
}
