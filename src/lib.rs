//! metashift - deployment manifests from git history
//!
//! metashift diffs two revisions of a metadata-driven source tree, classifies
//! every changed file into a typed metadata member through an extension
//! registry, and synthesizes the `package.xml` / `destructiveChanges.xml`
//! manifests that describe a deployment. It can also package the inverse
//! change as a rollback archive restored from history.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Resolve, synthesize, stage, roll back
//! - [`core`] - Domain types, registry, classification, configuration
//! - [`git`] - Single interface for all Git operations
//! - [`ui`] - User-facing output
//! - [`logging`] - Diagnostics subscriber
//!
//! # Correctness Invariants
//!
//! 1. History is only read, except for the manifest update commit
//! 2. One unclassifiable file never fails a build
//! 3. A rollback package never names a member it does not contain
//! 4. Manifests are written whole or not at all

pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
pub mod logging;
pub mod ui;
