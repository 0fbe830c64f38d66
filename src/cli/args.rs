//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--registry <path>`: Use an alternate Type Registry document

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// metashift - deployment manifests from git history
#[derive(Parser, Debug)]
#[command(name = "metashift")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if metashift was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Type Registry document to use instead of the configured or built-in one
    #[arg(long, global = true, value_name = "PATH")]
    pub registry: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show what changed between two revisions
    #[command(
        name = "changes",
        long_about = "Show what changed between two revisions.\n\n\
            Prints additions, deletions and both halves of the modifications, \
            followed by the new change set (what a build deploys) and the old \
            change set (what a rollback restores). Companion descriptor files \
            are folded onto their primary artifact.",
        after_help = "\
EXAMPLES:
    # Everything in HEAD, as an initial build would see it
    metashift changes

    # What changed since the last release tag
    metashift changes --previous v1.4.0

    # Machine-readable
    metashift changes --previous HEAD~1 --json"
    )]
    Changes {
        /// Revision being built
        #[arg(long, default_value = "HEAD")]
        current: String,

        /// Revision of the last successful build (omit for an initial build)
        #[arg(long)]
        previous: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List every file at a revision
    #[command(name = "ls-tree")]
    LsTree {
        /// Revision to list
        #[arg(long, default_value = "HEAD")]
        rev: String,
    },

    /// Classify paths into metadata descriptors
    #[command(
        name = "classify",
        after_help = "\
EXAMPLES:
    metashift classify src/classes/Foo.cls src/pages/Home.page
    metashift classify --json src/objects/Invoice__c.object"
    )]
    Classify {
        /// Repository-relative paths
        #[arg(required = true)]
        paths: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Synthesize a manifest for a change
    #[command(
        name = "manifest",
        long_about = "Synthesize a manifest for a change.\n\n\
            Builds a package manifest over the new change set, or a destructive \
            manifest over the deletions with --destructive. Paths that cannot be \
            classified, and non-deletable types in a destructive manifest, are \
            reported as warnings and left out.",
        after_help = "\
EXAMPLES:
    # Manifest for everything in HEAD
    metashift manifest

    # Destructive manifest since the previous build
    metashift manifest --previous HEAD~3 --destructive --out destructiveChanges.xml"
    )]
    Manifest {
        /// Revision being built
        #[arg(long, default_value = "HEAD")]
        current: String,

        /// Revision of the last successful build (omit for an initial build)
        #[arg(long)]
        previous: Option<String>,

        /// Build the destructive manifest from deletions
        #[arg(long)]
        destructive: bool,

        /// Write to this file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Stage a deployment package (and optionally a rollback)
    #[command(
        name = "build",
        long_about = "Stage a deployment package.\n\n\
            Resolves the change, writes package.xml (and destructiveChanges.xml \
            when members were deleted) into the stage directory, and copies every \
            deployed member there. Optionally zips a rollback package and commits \
            a regenerated manifest back to the repository.\n\n\
            The previous revision is chosen in this order: METASHIFT_SHA_OVERRIDE, \
            the configured force_sha, then --previous unless an initial build is \
            forced (--force-initial, METASHIFT_FORCE_INITIAL_BUILD=true, or \
            force_initial_build in config).",
        after_help = "\
EXAMPLES:
    # Initial build of everything
    metashift build --stage out/deploy

    # Differential build with rollback
    metashift build --previous $LAST_GOOD --stage out/deploy --rollback out/rollback

    # Also commit an updated src/package.xml
    metashift build --previous $LAST_GOOD --stage out/deploy --update-package \\
        --committer-name 'Build Bot' --committer-email bot@example.com"
    )]
    Build {
        /// Revision being built
        #[arg(long, default_value = "HEAD")]
        current: String,

        /// Revision of the last successful build
        #[arg(long)]
        previous: Option<String>,

        /// Ignore --previous and deploy everything
        #[arg(long)]
        force_initial: bool,

        /// Deploy stage directory (recreated)
        #[arg(long, value_name = "DIR")]
        stage: PathBuf,

        /// Build a rollback package; the archive is written to DIR.zip
        #[arg(long, value_name = "DIR")]
        rollback: Option<PathBuf>,

        /// Commit a regenerated manifest when members were added or deleted
        #[arg(long)]
        update_package: bool,

        /// Name for the manifest commit
        #[arg(long, requires = "committer_email")]
        committer_name: Option<String>,

        /// Email for the manifest commit
        #[arg(long, requires = "committer_name")]
        committer_email: Option<String>,

        /// Output the build summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
