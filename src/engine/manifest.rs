//! engine::manifest
//!
//! Deployment manifests: building, serializing, parsing, and synthesizing
//! them from changed paths.
//!
//! # Document Shape
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <Package xmlns="http://soap.sforce.com/2006/04/metadata">
//!     <types>
//!         <name>ApexClass</name>
//!         <members>Foo</members>
//!         <members>Bar</members>
//!     </types>
//!     <version>34.0</version>
//! </Package>
//! ```
//!
//! Type blocks appear in first-seen order and always precede the single
//! trailing `version` element. Members keep insertion order and are unique
//! per type.
//!
//! # Synthesis
//!
//! [`synthesize`] classifies each path, drops what cannot be deployed
//! (recording a [`ClassificationWarning`]), and groups the rest by metadata
//! type. One bad path never fails the whole synthesis.
//!
//! # Example
//!
//! ```
//! use metashift::core::registry::TypeRegistry;
//! use metashift::engine::manifest::synthesize;
//!
//! let registry = TypeRegistry::load_default().unwrap();
//! let paths = ["src/classes/Foo.cls", "src/pages/Home.page", "src/classes/Bar.cls"];
//! let out = synthesize(&paths, false, &registry).unwrap();
//!
//! let groups = &out.document.types;
//! assert_eq!(groups[0].name, "ApexClass");
//! assert_eq!(groups[0].members, vec!["Foo", "Bar"]);
//! assert_eq!(groups[1].name, "ApexPage");
//! assert!(out.xml.contains("<version>34.0</version>"));
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::companion::is_companion_path;
use crate::core::descriptor::{classify, MetadataDescriptor};
use crate::core::registry::TypeRegistry;

/// Namespace of the `Package` root element.
pub const PACKAGE_NAMESPACE: &str = "http://soap.sforce.com/2006/04/metadata";

/// File name of the deployment manifest.
pub const PACKAGE_FILE: &str = "package.xml";

/// File name of the destructive manifest.
pub const DESTRUCTIVE_FILE: &str = "destructiveChanges.xml";

/// Errors producing or reading manifest documents.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to serialize manifest: {0}")]
    Serialize(String),

    #[error("failed to parse manifest: {0}")]
    Parse(String),

    #[error("failed to write manifest '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A path that was left out of a manifest.
///
/// These are recoverable: the path is dropped and synthesis continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassificationWarning {
    /// The extension is not in the registry.
    Unrecognized { path: String },
    /// Deletion requested for a type the platform cannot delete.
    NotDestructible {
        path: String,
        full_name: String,
        metadata_type: String,
    },
}

impl std::fmt::Display for ClassificationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassificationWarning::Unrecognized { path } => {
                write!(f, "{} is not a valid member of the API", path)
            }
            ClassificationWarning::NotDestructible {
                full_name,
                metadata_type,
                ..
            } => write!(
                f,
                "{} ({}) cannot be deleted via the API",
                full_name, metadata_type
            ),
        }
    }
}

/// One `types` block: a metadata type and its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeGroup {
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
}

/// Incrementally groups members by metadata type.
///
/// Holds an ordered type-name to ordered-member-list mapping; nothing is
/// serialized until [`ManifestBuilder::finish`].
#[derive(Debug, Clone, Default)]
pub struct ManifestBuilder {
    groups: Vec<TypeGroup>,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member under its type, creating the type block on first use.
    ///
    /// Returns `false` (and changes nothing) if the member is already listed
    /// under that type.
    pub fn add(&mut self, metadata_type: &str, member: &str) -> bool {
        match self.groups.iter_mut().find(|g| g.name == metadata_type) {
            Some(group) => {
                if group.members.iter().any(|m| m == member) {
                    return false;
                }
                group.members.push(member.to_string());
            }
            None => self.groups.push(TypeGroup {
                name: metadata_type.to_string(),
                members: vec![member.to_string()],
            }),
        }
        true
    }

    pub fn groups(&self) -> &[TypeGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total members across all types.
    pub fn member_count(&self) -> usize {
        self.groups.iter().map(|g| g.members.len()).sum()
    }

    /// Close the document with its API version.
    pub fn finish(self, version: &str) -> ManifestDocument {
        ManifestDocument {
            types: self.groups,
            version: version.to_string(),
        }
    }
}

/// A complete manifest: type blocks plus the API version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestDocument {
    #[serde(rename = "types", default)]
    pub types: Vec<TypeGroup>,
    pub version: String,
}

impl ManifestDocument {
    /// Serialize to the canonical XML form.
    pub fn to_xml(&self) -> Result<String, ManifestError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);

        emit(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        )?;

        let mut root = BytesStart::new("Package");
        root.push_attribute(("xmlns", PACKAGE_NAMESPACE));
        emit(&mut writer, Event::Start(root))?;

        for group in &self.types {
            emit(&mut writer, Event::Start(BytesStart::new("types")))?;
            text_element(&mut writer, "name", &group.name)?;
            for member in &group.members {
                text_element(&mut writer, "members", member)?;
            }
            emit(&mut writer, Event::End(BytesEnd::new("types")))?;
        }

        text_element(&mut writer, "version", &self.version)?;
        emit(&mut writer, Event::End(BytesEnd::new("Package")))?;

        let mut xml = String::from_utf8(writer.into_inner())
            .map_err(|e| ManifestError::Serialize(e.to_string()))?;
        xml.push('\n');
        Ok(xml)
    }

    /// Parse a manifest document.
    ///
    /// Requires exactly the shape written by [`ManifestDocument::to_xml`]:
    /// `types` blocks with a `name` and `members`, and a `version`.
    pub fn parse(xml: &str) -> Result<Self, ManifestError> {
        quick_xml::de::from_str(xml).map_err(|e| ManifestError::Parse(e.to_string()))
    }

    /// Members listed under a type, if the type is present.
    pub fn members_of(&self, metadata_type: &str) -> Option<&[String]> {
        self.types
            .iter()
            .find(|g| g.name == metadata_type)
            .map(|g| g.members.as_slice())
    }

    /// Serialize and write to `path` in a single step.
    ///
    /// The document is fully serialized in memory first, so a failure never
    /// leaves a partial manifest behind.
    pub fn write_to(&self, path: &Path) -> Result<(), ManifestError> {
        let xml = self.to_xml()?;
        crate::engine::resolver::write_atomic(path, xml.as_bytes()).map_err(|e| {
            ManifestError::Write {
                path: path.to_path_buf(),
                source: e,
            }
        })
    }
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), ManifestError> {
    writer
        .write_event(event)
        .map_err(|e| ManifestError::Serialize(e.to_string()))
}

fn text_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    text: &str,
) -> Result<(), ManifestError> {
    emit(writer, Event::Start(BytesStart::new(name)))?;
    emit(writer, Event::Text(BytesText::new(text)))?;
    emit(writer, Event::End(BytesEnd::new(name)))
}

/// Outcome of one synthesis pass.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub document: ManifestDocument,
    /// The serialized document.
    pub xml: String,
    /// Descriptors that made it into the document, in input order.
    pub accepted: Vec<MetadataDescriptor>,
    pub warnings: Vec<ClassificationWarning>,
}

impl Synthesis {
    /// True if no member was accepted.
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}

/// Classify `paths` and build a type-grouped manifest.
///
/// Per path, in order:
/// - invalid companion files are skipped silently (their primary artifact
///   is its own path),
/// - other invalid paths are skipped with [`ClassificationWarning::Unrecognized`],
/// - for a destructive manifest, non-destructible types are skipped with
///   [`ClassificationWarning::NotDestructible`],
/// - everything else is added under its type and returned in `accepted`.
///
/// Descriptors are unique by type and full name: a repeated file is accepted
/// once. Two files that share a member name under one type (a registry may
/// map several extensions to a type) are both accepted, while the document
/// lists the member once.
pub fn synthesize<S: AsRef<str>>(
    paths: &[S],
    destructive: bool,
    registry: &TypeRegistry,
) -> Result<Synthesis, ManifestError> {
    let mut builder = ManifestBuilder::new();
    let mut accepted = Vec::new();
    let mut seen = HashSet::new();
    let mut warnings = Vec::new();

    for path in paths {
        let path = path.as_ref();
        let descriptor = classify(path, registry);

        if !descriptor.valid {
            if is_companion_path(path) {
                tracing::debug!(%path, "skipping companion file");
                continue;
            }
            let warning = ClassificationWarning::Unrecognized {
                path: path.to_string(),
            };
            tracing::warn!(%path, "{}", warning);
            warnings.push(warning);
            continue;
        }

        if destructive && !descriptor.destructible {
            let warning = ClassificationWarning::NotDestructible {
                path: path.to_string(),
                full_name: descriptor.full_name(),
                metadata_type: descriptor.metadata_type.clone(),
            };
            tracing::warn!(%path, "{}", warning);
            warnings.push(warning);
            continue;
        }

        if !seen.insert((descriptor.metadata_type.clone(), descriptor.full_name())) {
            tracing::debug!(%path, "member already listed");
            continue;
        }
        if builder.add(&descriptor.metadata_type, &descriptor.member) {
            tracing::debug!(
                member = %descriptor.member,
                metadata_type = %descriptor.metadata_type,
                "added member"
            );
        }
        accepted.push(descriptor);
    }

    let document = builder.finish(registry.api_version());
    let xml = document.to_xml()?;

    Ok(Synthesis {
        document,
        xml,
        accepted,
        warnings,
    })
}

/// Metadata types whose deployment requires running tests.
const TESTED_TYPES: [&str; 2] = ["ApexClass", "ApexTrigger"];

/// True if any accepted member is Apex code.
pub fn requires_tests(accepted: &[MetadataDescriptor]) -> bool {
    accepted
        .iter()
        .any(|d| TESTED_TYPES.contains(&d.metadata_type.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        TypeRegistry::load_default().unwrap()
    }

    mod builder {
        use super::*;

        #[test]
        fn groups_by_type_in_first_seen_order() {
            let mut b = ManifestBuilder::new();
            assert!(b.add("T1", "m1"));
            assert!(b.add("T2", "m3"));
            assert!(b.add("T1", "m2"));

            let groups = b.groups();
            assert_eq!(groups.len(), 2);
            assert_eq!(groups[0].name, "T1");
            assert_eq!(groups[0].members, vec!["m1", "m2"]);
            assert_eq!(groups[1].name, "T2");
            assert_eq!(groups[1].members, vec!["m3"]);
            assert_eq!(b.member_count(), 3);
        }

        #[test]
        fn duplicate_member_is_rejected() {
            let mut b = ManifestBuilder::new();
            assert!(b.add("T1", "m1"));
            assert!(!b.add("T1", "m1"));
            assert_eq!(b.member_count(), 1);
        }

        #[test]
        fn same_member_under_different_types() {
            let mut b = ManifestBuilder::new();
            assert!(b.add("ApexPage", "Home"));
            assert!(b.add("ApexComponent", "Home"));
            assert_eq!(b.groups().len(), 2);
        }
    }

    mod document {
        use super::*;

        fn sample() -> ManifestDocument {
            let mut b = ManifestBuilder::new();
            b.add("ApexClass", "Foo");
            b.add("ApexClass", "Bar");
            b.add("ApexPage", "Home");
            b.finish("34.0")
        }

        #[test]
        fn xml_has_expected_shape() {
            let xml = sample().to_xml().unwrap();
            assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
            assert!(xml.contains(&format!("<Package xmlns=\"{}\">", PACKAGE_NAMESPACE)));
            assert!(xml.contains("<name>ApexClass</name>"));
            assert!(xml.contains("<members>Foo</members>"));
            assert!(xml.trim_end().ends_with("</Package>"));

            let foo = xml.find("<members>Foo</members>").unwrap();
            let bar = xml.find("<members>Bar</members>").unwrap();
            let version = xml.find("<version>34.0</version>").unwrap();
            let last_types = xml.rfind("</types>").unwrap();
            assert!(foo < bar);
            assert!(last_types < version);
        }

        #[test]
        fn empty_document_has_only_version() {
            let doc = ManifestBuilder::new().finish("34.0");
            let xml = doc.to_xml().unwrap();
            assert!(!xml.contains("<types>"));
            assert!(xml.contains("<version>34.0</version>"));
        }

        #[test]
        fn round_trip() {
            let doc = sample();
            let parsed = ManifestDocument::parse(&doc.to_xml().unwrap()).unwrap();
            assert_eq!(parsed, doc);
        }

        #[test]
        fn round_trip_escapes_text() {
            let mut b = ManifestBuilder::new();
            b.add("Layout", "Account-Account <Main> & Co");
            let doc = b.finish("34.0");
            let xml = doc.to_xml().unwrap();
            assert!(xml.contains("&lt;Main&gt; &amp; Co"));
            assert_eq!(ManifestDocument::parse(&xml).unwrap(), doc);
        }

        #[test]
        fn parse_requires_version() {
            let xml = r#"<Package><types><name>A</name><members>x</members></types></Package>"#;
            assert!(matches!(
                ManifestDocument::parse(xml),
                Err(ManifestError::Parse(_))
            ));
        }

        #[test]
        fn members_of_lookup() {
            let doc = sample();
            assert_eq!(
                doc.members_of("ApexClass").unwrap(),
                &["Foo".to_string(), "Bar".to_string()]
            );
            assert!(doc.members_of("Flow").is_none());
        }

        #[test]
        fn write_to_creates_file() {
            let temp = tempfile::TempDir::new().unwrap();
            let path = temp.path().join("src").join(PACKAGE_FILE);
            sample().write_to(&path).unwrap();
            let written = std::fs::read_to_string(&path).unwrap();
            assert_eq!(ManifestDocument::parse(&written).unwrap(), sample());
        }
    }

    mod synthesis {
        use super::*;

        #[test]
        fn accepted_in_input_order() {
            let paths = [
                "src/classes/B.cls",
                "src/triggers/T.trigger",
                "src/classes/A.cls",
            ];
            let out = synthesize(&paths, false, &registry()).unwrap();
            let names: Vec<_> = out.accepted.iter().map(|d| d.full_name()).collect();
            assert_eq!(names, vec!["B.cls", "T.trigger", "A.cls"]);
            assert_eq!(out.document.members_of("ApexClass").unwrap(), &["B", "A"]);
            assert!(out.warnings.is_empty());
        }

        #[test]
        fn members_unique_by_full_name() {
            let xml = r#"<typeRegistry>
                <version API="34.0"/>
                <extension name="email">
                    <container>email</container>
                    <metadata>EmailTemplate</metadata>
                    <destructible>true</destructible>
                    <metaxml>true</metaxml>
                </extension>
                <extension name="html">
                    <container>email</container>
                    <metadata>EmailTemplate</metadata>
                    <destructible>true</destructible>
                    <metaxml>false</metaxml>
                </extension>
            </typeRegistry>"#;
            let registry = TypeRegistry::from_xml_str(xml, "test").unwrap();

            let paths = [
                "src/email/Welcome.email",
                "src/email/Welcome.html",
                "src/email/Welcome.email",
            ];
            let out = synthesize(&paths, false, &registry).unwrap();

            let names: Vec<_> = out.accepted.iter().map(|d| d.full_name()).collect();
            assert_eq!(names, vec!["Welcome.email", "Welcome.html"]);
            assert_eq!(
                out.document.members_of("EmailTemplate").unwrap(),
                &["Welcome"]
            );
        }

        #[test]
        fn companion_skipped_silently() {
            let paths = ["src/classes/Foo.cls", "src/classes/Foo.cls-meta.xml"];
            let out = synthesize(&paths, false, &registry()).unwrap();
            assert_eq!(out.accepted.len(), 1);
            assert!(out.warnings.is_empty());
        }

        #[test]
        fn unrecognized_recorded_and_skipped() {
            let paths = ["README.md", "src/classes/Foo.cls"];
            let out = synthesize(&paths, false, &registry()).unwrap();
            assert_eq!(out.accepted.len(), 1);
            assert_eq!(
                out.warnings,
                vec![ClassificationWarning::Unrecognized {
                    path: "README.md".into()
                }]
            );
            assert!(!out.xml.contains("Invalid"));
        }

        #[test]
        fn destructive_excludes_non_destructible() {
            let paths = ["src/profiles/Admin.profile", "src/classes/Foo.cls"];
            let out = synthesize(&paths, true, &registry()).unwrap();
            assert_eq!(out.accepted.len(), 1);
            assert_eq!(out.accepted[0].member, "Foo");
            assert!(out.document.members_of("Profile").is_none());
            assert!(!out.xml.contains("Admin"));
            assert!(matches!(
                out.warnings[0],
                ClassificationWarning::NotDestructible { .. }
            ));
        }

        #[test]
        fn non_destructive_keeps_non_destructible() {
            let paths = ["src/profiles/Admin.profile"];
            let out = synthesize(&paths, false, &registry()).unwrap();
            assert_eq!(out.document.members_of("Profile").unwrap(), &["Admin"]);
        }

        #[test]
        fn duplicates_accepted_once() {
            let paths = ["src/classes/Foo.cls", "src/classes/Foo.cls"];
            let out = synthesize(&paths, false, &registry()).unwrap();
            assert_eq!(out.accepted.len(), 1);
            assert_eq!(out.document.members_of("ApexClass").unwrap(), &["Foo"]);
        }

        #[test]
        fn empty_input_yields_version_only() {
            let paths: [&str; 0] = [];
            let out = synthesize(&paths, false, &registry()).unwrap();
            assert!(out.is_empty());
            assert!(out.document.types.is_empty());
            assert_eq!(out.document.version, "34.0");
        }

        #[test]
        fn deterministic() {
            let paths = ["src/classes/Foo.cls", "src/pages/P.page", "x.txt"];
            let a = synthesize(&paths, false, &registry()).unwrap();
            let b = synthesize(&paths, false, &registry()).unwrap();
            assert_eq!(a.xml, b.xml);
            assert_eq!(a.accepted, b.accepted);
        }
    }

    #[test]
    fn requires_tests_for_apex() {
        let registry = registry();
        let cls = classify("src/classes/Foo.cls", &registry);
        let page = classify("src/pages/Home.page", &registry);
        assert!(requires_tests(&[page.clone(), cls]));
        assert!(!requires_tests(&[page]));
        assert!(!requires_tests(&[]));
    }
}
