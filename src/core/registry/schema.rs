//! core::registry::schema
//!
//! On-disk shape of the Type Registry resource.
//!
//! # Format
//!
//! ```xml
//! <typeRegistry>
//!     <version API="34.0"/>
//!     <extension name="cls">
//!         <container>classes</container>
//!         <metadata>ApexClass</metadata>
//!         <destructible>true</destructible>
//!         <metaxml>true</metaxml>
//!     </extension>
//! </typeRegistry>
//! ```
//!
//! The root element name is not checked. Elements outside of `version` and
//! `extension` are ignored. Boolean fields hold the text `true` or `false`
//! (case-insensitive, surrounding whitespace ignored); anything else is a
//! malformed registry.

use serde::Deserialize;

/// The whole registry document.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RegistryDocument {
    /// The `version` element carrying the API version attribute.
    pub version: VersionElement,

    /// One element per known extension, in document order.
    #[serde(rename = "extension", default)]
    pub extensions: Vec<ExtensionElement>,
}

/// `<version API="..."/>`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct VersionElement {
    #[serde(rename = "@API")]
    pub api: String,
}

/// `<extension name="...">` with its four child fields.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ExtensionElement {
    #[serde(rename = "@name")]
    pub name: String,
    pub container: String,
    pub metadata: String,
    pub destructible: String,
    pub metaxml: String,
}

/// Parse registry boolean text.
///
/// Returns `None` for anything that is not `true` or `false`.
pub fn parse_flag(text: &str) -> Option<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_flag_accepts_booleans() {
        assert_eq!(parse_flag("true"), Some(true));
        assert_eq!(parse_flag(" TRUE\n"), Some(true));
        assert_eq!(parse_flag("False"), Some(false));
    }

    #[test]
    fn parse_flag_rejects_other_text() {
        assert_eq!(parse_flag("yes"), None);
        assert_eq!(parse_flag(""), None);
        assert_eq!(parse_flag("1"), None);
    }

    #[test]
    fn deserializes_document() {
        let xml = r#"
            <typeRegistry>
                <version API="34.0"/>
                <extension name="cls">
                    <container>classes</container>
                    <metadata>ApexClass</metadata>
                    <destructible>true</destructible>
                    <metaxml>true</metaxml>
                </extension>
            </typeRegistry>
        "#;
        let doc: RegistryDocument = quick_xml::de::from_str(xml).unwrap();
        assert_eq!(doc.version.api, "34.0");
        assert_eq!(doc.extensions.len(), 1);
        assert_eq!(doc.extensions[0].name, "cls");
        assert_eq!(doc.extensions[0].metadata, "ApexClass");
    }

    #[test]
    fn version_may_follow_extensions() {
        let xml = r#"
            <typeRegistry>
                <extension name="page">
                    <container>pages</container>
                    <metadata>ApexPage</metadata>
                    <destructible>true</destructible>
                    <metaxml>true</metaxml>
                </extension>
                <version API="35.0"/>
            </typeRegistry>
        "#;
        let doc: RegistryDocument = quick_xml::de::from_str(xml).unwrap();
        assert_eq!(doc.version.api, "35.0");
        assert_eq!(doc.extensions.len(), 1);
    }

    #[test]
    fn missing_version_is_an_error() {
        let xml = "<typeRegistry></typeRegistry>";
        let result: Result<RegistryDocument, _> = quick_xml::de::from_str(xml);
        assert!(result.is_err());
    }
}
