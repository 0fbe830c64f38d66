//! core
//!
//! Core domain types, schemas, and configuration for metashift.
//!
//! # Modules
//!
//! - [`types`] - Strong types: Oid, Committer, ChangeKind
//! - [`companion`] - Companion descriptor path rules
//! - [`registry`] - Extension to metadata type registry
//! - [`descriptor`] - Path classification into metadata descriptors
//! - [`config`] - Configuration schema and loading
//! - [`paths`] - Centralized path routing for metashift storage
//! - [`ops`] - Repository lock
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - Classification is deterministic

pub mod companion;
pub mod config;
pub mod descriptor;
pub mod ops;
pub mod paths;
pub mod registry;
pub mod types;
