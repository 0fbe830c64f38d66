//! core::registry
//!
//! The Type Registry: an immutable table mapping a file extension to the
//! metadata type it deploys as.
//!
//! # Lifecycle
//!
//! The registry is loaded once by the caller (the CLI or the build
//! pipeline) and then passed by reference into classification and manifest
//! synthesis. It is never mutated after load, so a single instance can be
//! shared freely across threads.
//!
//! # Sources
//!
//! - [`TypeRegistry::load_default`] parses the resource compiled into the
//!   binary (`assets/registry.xml`).
//! - [`TypeRegistry::load`] parses an alternate resource from disk.
//!
//! Missing or malformed resources are fatal [`RegistryError`]s.
//!
//! # Example
//!
//! ```
//! use metashift::core::registry::TypeRegistry;
//!
//! let registry = TypeRegistry::load_default().unwrap();
//! let entry = registry.lookup("cls").unwrap();
//! assert_eq!(entry.metadata_type, "ApexClass");
//! assert!(registry.lookup("exe").is_none());
//! ```

pub mod schema;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use schema::{parse_flag, RegistryDocument};

/// The registry resource compiled into the binary.
const DEFAULT_REGISTRY: &str = include_str!("../../../assets/registry.xml");

/// Label used in errors for the embedded resource.
const DEFAULT_SOURCE: &str = "<built-in registry>";

/// Errors loading the Type Registry.
///
/// All of these are configuration errors: they abort before any path is
/// classified.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("type registry not found: {path}")]
    Missing { path: PathBuf },

    #[error("failed to read type registry '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed type registry '{origin}': {message}")]
    Malformed { origin: String, message: String },
}

/// One registry row, keyed by extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    /// Extension without the leading dot (`cls`).
    pub extension: String,
    /// Directory the type lives in on the platform (`classes`).
    pub container: String,
    /// Metadata type name (`ApexClass`).
    pub metadata_type: String,
    /// Whether members of this type may be removed via a destructive manifest.
    pub destructible: bool,
    /// Whether members carry a companion descriptor file.
    pub has_companion: bool,
}

/// Extension to metadata type rules plus the API version they target.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    api_version: String,
    entries: HashMap<String, RegistryEntry>,
}

impl TypeRegistry {
    /// Parse the built-in registry resource.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Malformed`] if the embedded resource is broken.
    pub fn load_default() -> Result<Self, RegistryError> {
        Self::from_xml_str(DEFAULT_REGISTRY, DEFAULT_SOURCE)
    }

    /// Load a registry resource from disk.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Missing`] if `path` does not exist
    /// - [`RegistryError::Read`] if it cannot be read
    /// - [`RegistryError::Malformed`] if it cannot be parsed or validated
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        if !path.exists() {
            return Err(RegistryError::Missing {
                path: path.to_path_buf(),
            });
        }

        let contents = fs::read_to_string(path).map_err(|e| RegistryError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::from_xml_str(&contents, &path.display().to_string())
    }

    /// Load from `path` when given, otherwise the built-in resource.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, RegistryError> {
        match path {
            Some(p) => Self::load(p),
            None => Self::load_default(),
        }
    }

    /// Parse a registry document.
    ///
    /// `origin` names the resource in error messages. When an extension is
    /// listed twice, the first entry wins.
    pub fn from_xml_str(xml: &str, origin: &str) -> Result<Self, RegistryError> {
        let malformed = |message: String| RegistryError::Malformed {
            origin: origin.to_string(),
            message,
        };

        let doc: RegistryDocument =
            quick_xml::de::from_str(xml).map_err(|e| malformed(e.to_string()))?;

        let api_version = doc.version.api.trim().to_string();
        if api_version.is_empty() {
            return Err(malformed("version API attribute is empty".into()));
        }

        let mut entries = HashMap::with_capacity(doc.extensions.len());
        for ext in doc.extensions {
            let extension = ext.name.trim().to_string();
            if extension.is_empty() {
                return Err(malformed("extension with empty name".into()));
            }

            let metadata_type = ext.metadata.trim().to_string();
            if metadata_type.is_empty() {
                return Err(malformed(format!(
                    "extension '{}' has no metadata type",
                    extension
                )));
            }

            let destructible = parse_flag(&ext.destructible).ok_or_else(|| {
                malformed(format!(
                    "extension '{}': destructible must be true or false, got '{}'",
                    extension, ext.destructible
                ))
            })?;
            let has_companion = parse_flag(&ext.metaxml).ok_or_else(|| {
                malformed(format!(
                    "extension '{}': metaxml must be true or false, got '{}'",
                    extension, ext.metaxml
                ))
            })?;

            if entries.contains_key(&extension) {
                tracing::warn!(%extension, %origin, "duplicate registry extension ignored");
                continue;
            }

            entries.insert(
                extension.clone(),
                RegistryEntry {
                    extension,
                    container: ext.container.trim().to_string(),
                    metadata_type,
                    destructible,
                    has_companion,
                },
            );
        }

        if entries.is_empty() {
            return Err(malformed("registry defines no extensions".into()));
        }

        tracing::debug!(%origin, %api_version, extensions = entries.len(), "loaded type registry");

        Ok(Self {
            api_version,
            entries,
        })
    }

    /// Look up the entry for an extension (without the leading dot).
    pub fn lookup(&self, extension: &str) -> Option<&RegistryEntry> {
        self.entries.get(extension)
    }

    /// The API version written into every manifest.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Number of known extensions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the registry has no entries (never the case after a load).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
