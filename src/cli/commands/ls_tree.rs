//! ls-tree command - List every leaf path at a revision

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::ui::output;

pub fn ls_tree(ctx: &Context, rev: &str) -> Result<()> {
    let git = ctx.open_repo()?;
    let oid = git
        .resolve_commit(rev)
        .with_context(|| format!("cannot resolve '{}'", rev))?;

    for path in git.list_tree_paths(&oid)? {
        output::print(path, ctx.verbosity);
    }

    Ok(())
}
