//! Argument and result types for the descriptor-relative primitives

use serde::{Deserialize, Serialize};

/// Flags controlling the open primitive
///
/// Modeled as explicit booleans rather than a packed bit word, so a
/// create-without-mode call is unrepresentable past the adapter boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpenFlags {
    /// Open for reading
    pub read: bool,
    /// Open for writing
    pub write: bool,
    /// Create the file if it does not exist
    pub create: bool,
    /// With `create`, fail if the file already exists
    pub exclusive: bool,
    /// Truncate the file to zero length
    pub truncate: bool,
    /// All writes go to the end of the file
    pub append: bool,
}

impl OpenFlags {
    /// Read-only open
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    /// Write-only open
    pub fn write_only() -> Self {
        Self {
            write: true,
            ..Self::default()
        }
    }

    /// Read-write open
    pub fn read_write() -> Self {
        Self {
            read: true,
            write: true,
            ..Self::default()
        }
    }

    /// Requests creation of the file if missing
    pub fn with_create(mut self) -> Self {
        self.create = true;
        self
    }

    /// With creation, requires that the file not already exist
    pub fn with_exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    /// Truncates on open
    pub fn with_truncate(mut self) -> Self {
        self.truncate = true;
        self
    }

    /// Appends on write
    pub fn with_append(mut self) -> Self {
        self.append = true;
        self
    }
}

/// Permission bits for newly created files and directories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMode(u32);

impl FileMode {
    /// Creates a mode from raw permission bits
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw permission bits
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Owner read permission
    pub fn owner_read(&self) -> bool {
        self.0 & 0o400 != 0
    }

    /// Owner write permission
    pub fn owner_write(&self) -> bool {
        self.0 & 0o200 != 0
    }

    /// Owner execute permission
    pub fn owner_execute(&self) -> bool {
        self.0 & 0o100 != 0
    }
}

/// Kind of access requested by the access-check primitive
///
/// All flags false means "does the entry exist at all".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccessMode {
    /// Check read permission
    pub read: bool,
    /// Check write permission
    pub write: bool,
    /// Check execute permission
    pub execute: bool,
}

impl AccessMode {
    /// Existence check only
    pub fn exists() -> Self {
        Self::default()
    }

    /// Read permission check
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    /// Read and write permission check
    pub fn read_write() -> Self {
        Self {
            read: true,
            write: true,
            ..Self::default()
        }
    }
}

/// Kind of filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link
    Symlink,
}

/// Result of the stat primitive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    /// Entry kind
    pub kind: FileKind,
    /// Size in bytes (for symlinks, the target length)
    pub size: u64,
    /// Permission bits
    pub mode: FileMode,
}

/// A single entry yielded by a directory stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Entry name (a single component, no separators)
    pub name: String,
    /// Entry kind
    pub kind: FileKind,
}

/// An open directory stream
///
/// The snapshot of entries is taken when the stream is opened; later
/// mutations of the directory are not reflected.
#[derive(Debug, Clone, Default)]
pub struct DirStream {
    entries: Vec<DirEntry>,
}

impl DirStream {
    /// Creates a stream over the given entries
    pub fn new(entries: Vec<DirEntry>) -> Self {
        Self { entries }
    }

    /// Returns the entries in the stream
    pub fn entries(&self) -> &[DirEntry] {
        &self.entries
    }

    /// Number of entries in the stream
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the directory has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for DirStream {
    type Item = DirEntry;
    type IntoIter = std::vec::IntoIter<DirEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
