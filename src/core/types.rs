//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name (local or remote-tracking)
//! - [`Oid`] - Git object identifier (SHA)
//! - [`RepoId`] - Short random identity assigned to a loaded repository
//! - [`Fingerprint`] - Hash over branch tips for change detection
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use gitbatch::core::types::{BranchName, Oid};
//!
//! let branch = BranchName::new("feature/my-branch").unwrap();
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//!
//! assert!(BranchName::new("invalid..name").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),
}

/// A validated Git branch name.
///
/// Used for both local branches (`main`) and remote-tracking branches
/// (`origin/main`). Names must conform to Git's refname rules:
/// - Cannot be empty or exactly `@`
/// - Cannot start with `.` or `-`, or end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
///
/// # Example
///
/// ```
/// use gitbatch::core::types::BranchName;
///
/// let name = BranchName::new("origin/main").unwrap();
/// assert_eq!(name.as_str(), "origin/main");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name).map_err(|reason| {
            TypeError::InvalidBranchName(format!("'{}' {}", name.escape_debug(), reason))
        })?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), &'static str> {
        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];

        if name.is_empty() {
            return Err("is empty");
        }
        if name == "@" {
            return Err("is reserved");
        }
        if name.starts_with('-') {
            return Err("starts with '-'");
        }
        if name.ends_with('/') {
            return Err("ends with '/'");
        }
        if name.contains("..") || name.contains("@{") || name.contains("//") {
            return Err("contains a forbidden sequence");
        }
        if name
            .chars()
            .any(|c| c.is_ascii_control() || INVALID_CHARS.contains(&c))
        {
            return Err("contains a forbidden character");
        }
        // Per-component rules also cover a leading '.' and a trailing '.lock'
        // on the whole name.
        if name
            .split('/')
            .any(|component| component.starts_with('.') || component.ends_with(".lock"))
        {
            return Err("has a component starting with '.' or ending with '.lock'");
        }
        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the remote-tracking branch for this branch on `remote`.
    ///
    /// ```
    /// use gitbatch::core::types::BranchName;
    ///
    /// let main = BranchName::new("main").unwrap();
    /// assert_eq!(main.on_remote("origin"), "origin/main");
    /// ```
    pub fn on_remote(&self, remote: &str) -> String {
        format!("{}/{}", remote, self.0)
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Git object identifier (SHA-1 or SHA-256).
///
/// OIDs are normalized to lowercase for consistency.
///
/// # Example
///
/// ```
/// use gitbatch::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a 40 or 64 character hex OID.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(Self(oid))
    }

    /// Get an abbreviated form of the OID.
    ///
    /// If `len` exceeds the OID length, returns the full OID.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identity of a loaded repository.
///
/// Generated once when a repository is loaded and never derived from its
/// contents, so two loads of the same directory get different ids.
///
/// # Example
///
/// ```
/// use gitbatch::core::types::RepoId;
///
/// let id = RepoId::generate();
/// assert_eq!(id.as_str().len(), RepoId::LEN);
/// assert_ne!(id, RepoId::generate());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId(String);

impl RepoId {
    /// Number of characters in a generated id.
    pub const LEN: usize = 8;

    /// Generate a fresh random id.
    pub fn generate() -> Self {
        let mut id = uuid::Uuid::new_v4().simple().to_string();
        id.truncate(Self::LEN);
        Self(id)
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stable hash over branch tips, used to tell whether an operation moved
/// anything.
///
/// Entries are sorted by name before hashing so the result does not depend
/// on enumeration order.
///
/// # Example
///
/// ```
/// use gitbatch::core::types::{Fingerprint, Oid};
///
/// let tip = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
/// let a = Fingerprint::compute([("main", &tip), ("origin/main", &tip)]);
/// let b = Fingerprint::compute([("origin/main", &tip), ("main", &tip)]);
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute a fingerprint from `(name, tip)` pairs.
    pub fn compute<'a, I>(tips: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a Oid)>,
    {
        let mut sorted: Vec<_> = tips.into_iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let mut hasher = Sha256::new();
        for (name, oid) in sorted {
            hasher.update(name.as_bytes());
            hasher.update(b"\0");
            hasher.update(oid.as_str().as_bytes());
            hasher.update(b"\n");
        }

        Self(hex::encode(hasher.finalize()))
    }

    /// Get the fingerprint as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(hex: &str) -> Oid {
        Oid::new(hex).unwrap()
    }

    mod branch_name {
        use super::*;

        #[test]
        fn valid_branch_names() {
            assert!(BranchName::new("main").is_ok());
            assert!(BranchName::new("feature/foo").is_ok());
            assert!(BranchName::new("origin/feature/foo").is_ok());
            assert!(BranchName::new("user@feature").is_ok());
            assert!(BranchName::new("with.dot").is_ok());
        }

        #[test]
        fn invalid_branch_names() {
            for name in [
                "",
                "@",
                ".hidden",
                "foo/.hidden",
                "-flag",
                "branch.lock",
                "branch/",
                "bad..path",
                "foo@{bar",
                "foo//bar",
                "has space",
                "has~tilde",
                "has:colon",
                "has\ttab",
            ] {
                assert!(BranchName::new(name).is_err(), "{name:?} should be rejected");
            }
        }

        #[test]
        fn error_mentions_name() {
            let err = BranchName::new("bad..path").unwrap_err();
            assert!(err.to_string().contains("bad..path"));
        }

        #[test]
        fn on_remote() {
            let name = BranchName::new("feature/x").unwrap();
            assert_eq!(name.on_remote("upstream"), "upstream/feature/x");
        }

        #[test]
        fn ordering_is_lexicographic() {
            let mut names = vec![
                BranchName::new("main").unwrap(),
                BranchName::new("develop").unwrap(),
            ];
            names.sort();
            assert_eq!(names[0].as_str(), "develop");
        }
    }

    mod oid {
        use super::*;

        #[test]
        fn valid_lengths() {
            assert!(Oid::new("abc123def4567890abc123def4567890abc12345").is_ok());
            assert!(Oid::new("a".repeat(64)).is_ok());
        }

        #[test]
        fn invalid_values() {
            assert!(Oid::new("").is_err());
            assert!(Oid::new("abc123").is_err());
            assert!(Oid::new("xyz123def4567890abc123def4567890abc12345").is_err());
        }

        #[test]
        fn short_form() {
            let oid = oid("abc123def4567890abc123def4567890abc12345");
            assert_eq!(oid.short(7), "abc123d");
            assert_eq!(oid.short(100), oid.as_str());
        }
    }

    mod repo_id {
        use super::*;

        #[test]
        fn generated_ids_are_short_hex() {
            let id = RepoId::generate();
            assert_eq!(id.as_str().len(), RepoId::LEN);
            assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    mod fingerprint {
        use super::*;

        #[test]
        fn order_independent() {
            let a = oid("abc123def4567890abc123def4567890abc12345");
            let b = oid("def456abc7890123def456abc7890123def45678");

            let fp1 = Fingerprint::compute([("main", &a), ("origin/main", &b)]);
            let fp2 = Fingerprint::compute([("origin/main", &b), ("main", &a)]);
            assert_eq!(fp1, fp2);
        }

        #[test]
        fn moved_tip_changes_fingerprint() {
            let a = oid("abc123def4567890abc123def4567890abc12345");
            let b = oid("def456abc7890123def456abc7890123def45678");

            let fp1 = Fingerprint::compute([("main", &a)]);
            let fp2 = Fingerprint::compute([("main", &b)]);
            assert_ne!(fp1, fp2);
        }

        #[test]
        fn empty_input() {
            let fp = Fingerprint::compute(std::iter::empty());
            assert_eq!(fp.as_str().len(), 64);
        }
    }
}
