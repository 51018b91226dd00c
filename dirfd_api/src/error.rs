//! Primitive error types

use thiserror::Error;

/// Errors reported by the descriptor-relative primitives
///
/// These pass through the compatibility layer unchanged; it adds no
/// translation and no retry policy on top of them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    /// No entry exists at the relative path
    #[error("Not found: {0}")]
    NotFound(String),

    /// An entry already exists at the relative path
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The capability does not permit the requested access
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A non-directory was found where a directory was required
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// A directory was found where a non-directory was required
    #[error("Is a directory: {0}")]
    IsADirectory(String),

    /// Attempted to remove a directory that still has entries
    #[error("Directory not empty: {0}")]
    DirectoryNotEmpty(String),

    /// The platform cannot perform this operation across two capability roots
    #[error("Operation crosses capability roots")]
    CrossDevice,

    /// The directory capability handle is unknown or invalid
    #[error("Bad directory descriptor: {0}")]
    BadDescriptor(String),

    /// An argument was malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
