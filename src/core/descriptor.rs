//! core::descriptor
//!
//! Metadata descriptors: what a repository path deploys as.
//!
//! [`classify`] splits a repository-relative path into directory, member and
//! extension and resolves the extension through the [`TypeRegistry`]. An
//! unknown extension is not an error; it yields an invalid descriptor whose
//! type is [`INVALID_TYPE`], and the caller decides whether that matters.
//!
//! # Example
//!
//! ```
//! use metashift::core::descriptor::classify;
//! use metashift::core::registry::TypeRegistry;
//!
//! let registry = TypeRegistry::load_default().unwrap();
//! let d = classify("src/classes/Foo.cls", &registry);
//! assert!(d.valid);
//! assert_eq!(d.member, "Foo");
//! assert_eq!(d.path, "src/classes/");
//! assert_eq!(d.metadata_type, "ApexClass");
//! assert_eq!(d.full_name(), "Foo.cls");
//!
//! let unknown = classify("README.md", &registry);
//! assert!(!unknown.valid);
//! assert_eq!(unknown.metadata_type, "Invalid");
//! ```

use serde::Serialize;

use crate::core::registry::TypeRegistry;

/// Metadata type name carried by unclassifiable paths.
pub const INVALID_TYPE: &str = "Invalid";

/// A repository path resolved to its metadata identity.
///
/// Constructed only by [`classify`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataDescriptor {
    /// Extension without the leading dot; empty when the file has none.
    pub extension: String,
    /// Platform container directory; empty when invalid.
    pub container: String,
    /// File name without its extension.
    pub member: String,
    /// Metadata type name, or [`INVALID_TYPE`].
    pub metadata_type: String,
    /// Directory portion of the path, including the trailing `/`.
    pub path: String,
    pub destructible: bool,
    pub valid: bool,
    /// Whether the registry says members carry a companion descriptor file.
    pub has_companion: bool,
}

impl MetadataDescriptor {
    /// Member name plus extension (`Foo.cls`).
    pub fn full_name(&self) -> String {
        if self.extension.is_empty() {
            self.member.clone()
        } else {
            format!("{}.{}", self.member, self.extension)
        }
    }

    /// The repository-relative path this descriptor was classified from.
    pub fn repo_path(&self) -> String {
        format!("{}{}", self.path, self.full_name())
    }
}

/// Classify a repository-relative path.
///
/// Pure function of its inputs: classifying the same path against the same
/// registry always yields an equal descriptor.
pub fn classify(path: &str, registry: &TypeRegistry) -> MetadataDescriptor {
    let (dir, file_name) = match path.rfind('/') {
        Some(idx) => (&path[..=idx], &path[idx + 1..]),
        None => ("", path),
    };

    let (member, extension) = match file_name.rfind('.') {
        Some(idx) => (&file_name[..idx], &file_name[idx + 1..]),
        None => (file_name, ""),
    };

    tracing::debug!(%path, %member, %extension, "classifying");

    match registry.lookup(extension) {
        Some(entry) => MetadataDescriptor {
            extension: extension.to_string(),
            container: entry.container.clone(),
            member: member.to_string(),
            metadata_type: entry.metadata_type.clone(),
            path: dir.to_string(),
            destructible: entry.destructible,
            valid: true,
            has_companion: entry.has_companion,
        },
        None => MetadataDescriptor {
            extension: extension.to_string(),
            container: String::new(),
            member: member.to_string(),
            metadata_type: INVALID_TYPE.to_string(),
            path: dir.to_string(),
            destructible: false,
            valid: false,
            has_companion: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        TypeRegistry::load_default().unwrap()
    }

    #[test]
    fn classifies_known_extension() {
        let d = classify("src/triggers/Account.trigger", &registry());
        assert!(d.valid);
        assert_eq!(d.metadata_type, "ApexTrigger");
        assert_eq!(d.container, "triggers");
        assert_eq!(d.member, "Account");
        assert_eq!(d.extension, "trigger");
        assert_eq!(d.path, "src/triggers/");
        assert!(d.destructible);
        assert!(d.has_companion);
    }

    #[test]
    fn non_destructible_flag_copied() {
        let d = classify("src/profiles/Admin.profile", &registry());
        assert!(d.valid);
        assert!(!d.destructible);
    }

    #[test]
    fn unknown_extension_is_invalid() {
        let d = classify("docs/notes.txt", &registry());
        assert!(!d.valid);
        assert_eq!(d.metadata_type, INVALID_TYPE);
        assert_eq!(d.member, "notes");
        assert_eq!(d.extension, "txt");
        assert!(d.container.is_empty());
        assert!(!d.destructible);
    }

    #[test]
    fn companion_file_is_invalid() {
        let d = classify("src/classes/Foo.cls-meta.xml", &registry());
        assert!(!d.valid);
        assert_eq!(d.member, "Foo.cls-meta");
        assert_eq!(d.extension, "xml");
    }

    #[test]
    fn path_without_directory() {
        let d = classify("Foo.cls", &registry());
        assert_eq!(d.path, "");
        assert_eq!(d.repo_path(), "Foo.cls");
    }

    #[test]
    fn path_without_extension() {
        let d = classify("src/Makefile", &registry());
        assert!(!d.valid);
        assert_eq!(d.member, "Makefile");
        assert_eq!(d.extension, "");
        assert_eq!(d.full_name(), "Makefile");
    }

    #[test]
    fn dots_in_directory_do_not_split_extension() {
        let d = classify("src/v1.2/Foo.cls", &registry());
        assert_eq!(d.path, "src/v1.2/");
        assert_eq!(d.member, "Foo");
        assert_eq!(d.extension, "cls");
    }

    #[test]
    fn repo_path_reconstructs_input() {
        let path = "src/objects/Invoice__c.object";
        assert_eq!(classify(path, &registry()).repo_path(), path);
    }

    #[test]
    fn classification_is_idempotent() {
        let registry = registry();
        let a = classify("src/pages/Home.page", &registry);
        let b = classify("src/pages/Home.page", &registry);
        assert_eq!(a, b);
    }
}
