//! Opaque handles for directories and open files

use serde::{Deserialize, Serialize};
use std::fmt;

/// A pre-opened directory capability handle
///
/// `DirFd` is the unit of authority on this platform: holding one grants
/// access to the subtree behind it, and nothing else. Handles are opened
/// once at process startup by an external initializer; this layer borrows
/// them and never closes or reassigns them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DirFd(u64);

impl DirFd {
    /// The well-known invalid handle carried by the registry sentinel
    ///
    /// Passing it to a primitive is a caller bug; implementations answer
    /// with `PrimitiveError::BadDescriptor`.
    pub const INVALID: DirFd = DirFd(u64::MAX);

    /// Creates a handle from a raw descriptor value
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw descriptor value
    pub fn as_raw(&self) -> u64 {
        self.0
    }

    /// Returns true for the well-known invalid handle
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl fmt::Display for DirFd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "DirFd({})", self.0)
        } else {
            write!(f, "DirFd(invalid)")
        }
    }
}

/// Handle to an open file, returned by the open primitive
///
/// Like `DirFd`, this is opaque; reading and writing through it is the
/// platform's business, not this layer's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileHandle(u64);

impl FileHandle {
    /// Creates a handle from a raw value
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value
    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileHandle({})", self.0)
    }
}
