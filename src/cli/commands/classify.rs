//! classify command - Show the metadata descriptor for each path

use anyhow::Result;

use crate::cli::Context;
use crate::core::descriptor::{classify as classify_path, MetadataDescriptor};
use crate::ui::output;

pub fn classify(ctx: &Context, paths: &[String], json: bool) -> Result<()> {
    let config = ctx.load_config(None)?;
    let registry = ctx.load_registry(&config)?;

    let descriptors: Vec<MetadataDescriptor> =
        paths.iter().map(|p| classify_path(p, &registry)).collect();

    if json {
        output::json(&descriptors)?;
        return Ok(());
    }

    for d in &descriptors {
        if d.valid {
            let mut flags = Vec::new();
            if !d.destructible {
                flags.push("not destructible");
            }
            if d.has_companion {
                flags.push("companion");
            }
            let suffix = if flags.is_empty() {
                String::new()
            } else {
                format!(" ({})", flags.join(", "))
            };
            output::print(
                format!(
                    "{}\t{}\t{}/{}{}",
                    d.repo_path(),
                    d.metadata_type,
                    d.container,
                    d.member,
                    suffix
                ),
                ctx.verbosity,
            );
        } else {
            output::print(
                format!("{}\t{}", d.repo_path(), d.metadata_type),
                ctx.verbosity,
            );
        }
    }

    Ok(())
}
