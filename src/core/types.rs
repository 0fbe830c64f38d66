//! core::types
//!
//! Validated value types shared by every layer.
//!
//! - [`Oid`] names a resolved revision
//! - [`Committer`] signs the manifest update commit
//! - [`ChangeKind`] tags one entry of a tree diff
//!
//! Constructors reject bad input, so a value in hand is always usable.
//!
//! ```
//! use metashift::core::types::{Committer, Oid};
//!
//! let rev = Oid::new("0123456789abcdef0123456789abcdef01234567").unwrap();
//! assert_eq!(rev.short(8), "01234567");
//! assert!(Oid::new("HEAD~1").is_err());
//!
//! let bot = Committer::new("Build Bot", "bot@example.com").unwrap();
//! assert_eq!(bot.to_string(), "Build Bot <bot@example.com>");
//! assert!(Committer::new("", "bot@example.com").is_err());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected input to a [`Oid`] or [`Committer`] constructor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("not a commit hash: {0}")]
    InvalidOid(String),

    #[error("invalid committer: {0}")]
    InvalidCommitter(String),
}

/// Full hex hash of a resolved commit.
///
/// Revision expressions (`HEAD~2`, tags, branch names) are resolved by the
/// git layer first; only the resulting hash is carried around. Stored in
/// lowercase so two hashes for the same commit compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

/// Hash widths git can produce: SHA-1 and SHA-256.
const HASH_WIDTHS: [usize; 2] = [40, 64];

impl Oid {
    /// Parse a full-width hex hash.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` for abbreviated hashes and anything
    /// that is not hex.
    pub fn new(hash: impl Into<String>) -> Result<Self, TypeError> {
        let mut hash = hash.into();
        hash.make_ascii_lowercase();

        if !HASH_WIDTHS.contains(&hash.len()) {
            return Err(TypeError::InvalidOid(format!(
                "'{}' has {} digits",
                hash,
                hash.len()
            )));
        }
        if let Some(bad) = hash.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(format!(
                "'{}' contains '{}'",
                hash, bad
            )));
        }
        Ok(Self(hash))
    }

    /// Leading `len` digits, or the whole hash when it is shorter.
    pub fn short(&self, len: usize) -> &str {
        self.0.get(..len).unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Oid::new(value)
    }
}

impl From<Oid> for String {
    fn from(value: Oid) -> Self {
        value.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity recorded on the manifest update commit.
///
/// Both fields must be non-empty; the email must contain an `@`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Committer {
    name: String,
    email: String,
}

impl Committer {
    /// Create a validated committer identity.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidCommitter` for an empty name or a
    /// malformed email.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        let email = email.into();

        if name.trim().is_empty() {
            return Err(TypeError::InvalidCommitter(
                "committer name cannot be empty".into(),
            ));
        }
        if email.trim().is_empty() || !email.contains('@') {
            return Err(TypeError::InvalidCommitter(format!(
                "committer email '{}' is not an address",
                email
            )));
        }
        // Angle brackets would corrupt the commit header
        if name.contains(['<', '>']) || email.contains(['<', '>']) {
            return Err(TypeError::InvalidCommitter(
                "committer identity cannot contain '<' or '>'".into(),
            ));
        }

        Ok(Self { name, email })
    }

    /// The committer's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The committer's email address.
    pub fn email(&self) -> &str {
        &self.email
    }
}

impl fmt::Display for Committer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// Classification of one entry in a tree-to-tree diff.
///
/// Only `Added`, `Deleted` and `Modified` feed the change sets. Renames are
/// never detected (they surface as a delete plus an add), and anything else
/// the diff engine reports is carried as `Other` and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Deleted,
    Modified,
    Other,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChangeKind::Added => "ADD",
            ChangeKind::Deleted => "DELETE",
            ChangeKind::Modified => "MODIFY",
            ChangeKind::Other => "OTHER",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod oid {
        use super::*;

        const SHA1: &str = "0123456789abcdef0123456789abcdef01234567";

        #[test]
        fn accepts_both_hash_widths() {
            assert_eq!(Oid::new(SHA1).unwrap().as_str(), SHA1);
            assert!(Oid::new("f".repeat(64)).is_ok());
        }

        #[test]
        fn lowercases_input() {
            let upper = SHA1.to_ascii_uppercase();
            assert_eq!(Oid::new(upper).unwrap(), Oid::new(SHA1).unwrap());
        }

        #[test]
        fn rejects_revision_expressions() {
            assert!(Oid::new("").is_err());
            assert!(Oid::new("0123456").is_err());
            assert!(matches!(
                Oid::new("HEAD~1"),
                Err(TypeError::InvalidOid(_))
            ));
            let mut not_hex = SHA1.to_string();
            not_hex.replace_range(0..1, "g");
            assert!(Oid::new(not_hex).is_err());
        }

        #[test]
        fn short_prefix() {
            let oid = Oid::new(SHA1).unwrap();
            assert_eq!(oid.short(10), "0123456789");
            assert_eq!(oid.short(41), SHA1);
        }

        #[test]
        fn serializes_as_plain_string() {
            let oid = Oid::new(SHA1).unwrap();
            let json = serde_json::to_string(&oid).unwrap();
            assert_eq!(json, format!("\"{}\"", SHA1));
            assert_eq!(serde_json::from_str::<Oid>(&json).unwrap(), oid);
            assert!(serde_json::from_str::<Oid>("\"main\"").is_err());
        }
    }

    mod committer {
        use super::*;

        #[test]
        fn valid_identity() {
            let c = Committer::new("Build Bot", "bot@example.com").unwrap();
            assert_eq!(c.name(), "Build Bot");
            assert_eq!(c.email(), "bot@example.com");
            assert_eq!(c.to_string(), "Build Bot <bot@example.com>");
        }

        #[test]
        fn empty_name_rejected() {
            assert!(matches!(
                Committer::new("  ", "bot@example.com"),
                Err(TypeError::InvalidCommitter(_))
            ));
        }

        #[test]
        fn email_without_at_rejected() {
            assert!(Committer::new("Bot", "bot.example.com").is_err());
        }

        #[test]
        fn angle_brackets_rejected() {
            assert!(Committer::new("Bot <x>", "bot@example.com").is_err());
        }
    }

    #[test]
    fn change_kind_display() {
        assert_eq!(ChangeKind::Added.to_string(), "ADD");
        assert_eq!(ChangeKind::Deleted.to_string(), "DELETE");
        assert_eq!(ChangeKind::Modified.to_string(), "MODIFY");
    }
}
