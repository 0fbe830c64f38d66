//! core::companion
//!
//! Companion descriptor files.
//!
//! A primary artifact such as `classes/Foo.cls` may be accompanied by a
//! sidecar `classes/Foo.cls-meta.xml` carrying auxiliary metadata. Both
//! collapse onto the same logical member, so the sidecar is folded onto the
//! primary path wherever change sets are computed.
//!
//! The rule is a plain suffix trim of exactly [`COMPANION_SUFFIX`]. It is
//! not filesystem-aware.
//!
//! # Example
//!
//! ```
//! use metashift::core::companion::{companion_path_of, is_companion_path, primary_path_of};
//!
//! assert!(is_companion_path("objects/Foo.object-meta.xml"));
//! assert_eq!(primary_path_of("objects/Foo.object-meta.xml"), "objects/Foo.object");
//! assert_eq!(primary_path_of("objects/Foo.object"), "objects/Foo.object");
//! assert_eq!(companion_path_of("classes/Foo.cls"), "classes/Foo.cls-meta.xml");
//! ```

/// Suffix that marks a companion descriptor file (9 characters).
pub const COMPANION_SUFFIX: &str = "-meta.xml";

/// Check whether a path names a companion descriptor file.
pub fn is_companion_path(path: &str) -> bool {
    path.len() > COMPANION_SUFFIX.len() && path.ends_with(COMPANION_SUFFIX)
}

/// Fold a path onto its primary artifact.
///
/// Companion paths lose their suffix; every other path is returned as is.
pub fn primary_path_of(path: &str) -> &str {
    if is_companion_path(path) {
        &path[..path.len() - COMPANION_SUFFIX.len()]
    } else {
        path
    }
}

/// The companion descriptor path for a primary artifact path.
pub fn companion_path_of(primary: &str) -> String {
    format!("{}{}", primary, COMPANION_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_is_nine_characters() {
        assert_eq!(COMPANION_SUFFIX.len(), 9);
    }

    #[test]
    fn detects_companion() {
        assert!(is_companion_path("src/classes/Foo.cls-meta.xml"));
        assert!(!is_companion_path("src/classes/Foo.cls"));
        assert!(!is_companion_path("src/pages/Foo.page-meta.xmlx"));
    }

    #[test]
    fn bare_suffix_is_not_a_companion() {
        assert!(!is_companion_path("-meta.xml"));
        assert_eq!(primary_path_of("-meta.xml"), "-meta.xml");
    }

    #[test]
    fn meta_elsewhere_in_path_untouched() {
        let path = "src/my-metadata/Foo.cls";
        assert!(!is_companion_path(path));
        assert_eq!(primary_path_of(path), path);
    }

    #[test]
    fn folds_companion() {
        assert_eq!(
            primary_path_of("objects/Foo.object-meta.xml"),
            "objects/Foo.object"
        );
    }

    #[test]
    fn companion_path_inverts_fold() {
        let primary = "src/triggers/Bar.trigger";
        assert_eq!(primary_path_of(&companion_path_of(primary)), primary);
    }
}
