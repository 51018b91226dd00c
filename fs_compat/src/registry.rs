//! Directory capability registry
//!
//! The registry is the process's whole filesystem worldview: an ordered,
//! immutable table of capability roots, each carrying a symbolic role, the
//! canonical install path it stands for, a short role token, and the
//! pre-opened directory capability backing it. It is built once at startup
//! from the capability table the external initializer supplies, and is
//! read-only afterwards, so concurrent lookups need no locking.

use dirfd_api::DirFd;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Symbolic role of a capability root
///
/// `Null` is the sentinel role: it terminates the table and marks an
/// unresolved lookup. It never matches any input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DirectoryRole {
    /// Sentinel; matches nothing
    Null,
    /// The data directory
    Data,
    /// Installed executables
    BinDir,
    /// Architecture-independent shared files
    ShareDir,
    /// System configuration
    SysConfDir,
    /// Public headers
    IncludeDir,
    /// Package headers
    PkgIncludeDir,
    /// Server headers
    IncludeDirServer,
    /// Installed libraries
    LibDir,
    /// Package libraries
    PkgLibDir,
    /// Locale data
    LocaleDir,
    /// Documentation
    DocDir,
    /// HTML documentation
    HtmlDir,
    /// Manual pages
    ManDir,
}

impl DirectoryRole {
    /// True for the sentinel role
    pub fn is_null(&self) -> bool {
        matches!(self, DirectoryRole::Null)
    }
}

impl fmt::Display for DirectoryRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One row of the registry
///
/// The capability handle is borrowed from the external initializer that
/// opened it; this layer never closes or reassigns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Symbolic role of this root
    pub role: DirectoryRole,
    /// Canonical path prefix, e.g. `/pgdata`
    pub prefix: String,
    /// Short role token, e.g. `PGDATA`
    pub role_name: String,
    /// Pre-opened directory capability backing this root
    pub capability: DirFd,
}

impl DirectoryEntry {
    /// Creates a registry entry
    pub fn new(
        role: DirectoryRole,
        prefix: impl Into<String>,
        role_name: impl Into<String>,
        capability: DirFd,
    ) -> Self {
        Self {
            role,
            prefix: prefix.into(),
            role_name: role_name.into(),
            capability,
        }
    }

    /// The terminating sentinel entry
    pub fn sentinel() -> Self {
        Self {
            role: DirectoryRole::Null,
            prefix: String::new(),
            role_name: String::new(),
            capability: DirFd::INVALID,
        }
    }

    /// True for the terminating sentinel
    pub fn is_sentinel(&self) -> bool {
        self.role.is_null()
    }

    /// Match test for an input path
    ///
    /// A path matches if it starts with either the canonical prefix or the
    /// role token. Both branches are accepted on purpose: callers hand in
    /// literal install paths as well as symbolic role tokens. The sentinel
    /// matches nothing (its empty prefix would otherwise match everything).
    pub fn matches(&self, path: &str) -> bool {
        if self.is_sentinel() {
            return false;
        }
        path.starts_with(&self.prefix) || path.starts_with(&self.role_name)
    }
}

/// The immutable, ordered table of capability roots
///
/// Entries are tried in registration order and the first match wins; there
/// is no longest-prefix preference and no de-duplication. The sentinel is
/// always the last entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRegistry {
    entries: Vec<DirectoryEntry>,
}

impl DirectoryRegistry {
    /// Builds a registry from the capability table, appending the sentinel
    ///
    /// Entry order is preserved exactly as given.
    pub fn new(entries: Vec<DirectoryEntry>) -> Self {
        let mut entries = entries;
        entries.push(DirectoryEntry::sentinel());
        Self { entries }
    }

    /// All entries, sentinel included
    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    /// Number of capability roots, sentinel excluded
    pub fn roots(&self) -> usize {
        self.entries.len() - 1
    }
}
