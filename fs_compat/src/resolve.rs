//! Path resolution against the capability registry
//!
//! Resolution turns an input path into a `(role, capability, suffix)`
//! triple. A lookup that matches nothing is not an error; it yields the
//! sentinel value, which callers must check before using the capability.

use crate::registry::{DirectoryRegistry, DirectoryRole};
use dirfd_api::DirFd;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Upper bound on a resolved suffix, in bytes
pub const MAX_RESOLVED_PATH: usize = 1024;

/// Errors that can occur during path resolution
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The computed suffix exceeds the resolved-path bound
    #[error("Resolved path of {len} bytes exceeds the {max}-byte bound")]
    TooLong { len: usize, max: usize },
}

/// A growable but bounds-checked suffix string
///
/// Replaces a fixed in-place buffer: an over-long suffix is a hard
/// `TooLong` failure, never a silent truncation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundedPath(String);

impl BoundedPath {
    /// The empty suffix
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Builds a bounded path, rejecting over-long input
    pub fn new(s: &str) -> Result<Self, PathError> {
        if s.len() > MAX_RESOLVED_PATH {
            return Err(PathError::TooLong {
                len: s.len(),
                max: MAX_RESOLVED_PATH,
            });
        }
        Ok(Self(s.to_string()))
    }

    /// Appends to the suffix, rejecting growth past the bound
    pub fn push_str(&mut self, s: &str) -> Result<(), PathError> {
        let len = self.0.len() + s.len();
        if len > MAX_RESOLVED_PATH {
            return Err(PathError::TooLong {
                len,
                max: MAX_RESOLVED_PATH,
            });
        }
        self.0.push_str(s);
        Ok(())
    }

    /// The suffix as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the empty suffix
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for BoundedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A resolved reference to a capability root
///
/// Produced per lookup and consumed immediately; the capability handle is
/// borrowed from the registry, so dropping this value releases nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Role of the matched root
    pub role: DirectoryRole,
    /// Remainder of the input after the matched prefix
    pub suffix: BoundedPath,
    /// Capability backing the matched root
    pub capability: DirFd,
}

impl ResolvedPath {
    /// The well-defined "no match" value
    pub fn sentinel() -> Self {
        Self {
            role: DirectoryRole::Null,
            suffix: BoundedPath::empty(),
            capability: DirFd::INVALID,
        }
    }

    /// True if this resolution matched no registry entry
    pub fn is_unresolved(&self) -> bool {
        self.role.is_null()
    }
}

impl DirectoryRegistry {
    /// Resolves a path against the registry
    ///
    /// Entries are scanned in order and the first match wins. An entry
    /// matches when the input starts with its canonical prefix or its role
    /// token; the suffix is always the remainder after the *prefix* length,
    /// also for role-token matches (role tokens are expected to be at least
    /// as long as the prefix they stand for; when they are not, the slice
    /// saturates to an empty suffix instead of reading out of bounds).
    ///
    /// No match yields `Ok(sentinel)`; only an over-long suffix is an
    /// error.
    ///
    /// # Examples
    ///
    /// ```
    /// use dirfd_api::DirFd;
    /// use fs_compat::{DirectoryEntry, DirectoryRegistry, DirectoryRole};
    ///
    /// let registry = DirectoryRegistry::new(vec![DirectoryEntry::new(
    ///     DirectoryRole::Data,
    ///     "/pgdata",
    ///     "PGDATA",
    ///     DirFd::from_raw(3),
    /// )]);
    ///
    /// let resolved = registry.lookup("/pgdata/base/1").unwrap();
    /// assert_eq!(resolved.role, DirectoryRole::Data);
    /// assert_eq!(resolved.suffix.as_str(), "/base/1");
    ///
    /// let miss = registry.lookup("/etc/passwd").unwrap();
    /// assert!(miss.is_unresolved());
    /// ```
    pub fn lookup(&self, path: &str) -> Result<ResolvedPath, PathError> {
        for entry in self.entries() {
            if entry.is_sentinel() {
                break;
            }
            if entry.matches(path) {
                let suffix = path.get(entry.prefix.len()..).unwrap_or("");
                return Ok(ResolvedPath {
                    role: entry.role,
                    suffix: BoundedPath::new(suffix)?,
                    capability: entry.capability,
                });
            }
        }
        Ok(ResolvedPath::sentinel())
    }
}
