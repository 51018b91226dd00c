//! # Filesystem Compatibility Layer
//!
//! This crate lets code written against a conventional, path-based file API
//! run unmodified on a platform that has no global filesystem namespace and
//! no working directory, only pre-opened directory capabilities.
//!
//! ## Philosophy
//!
//! - **Paths are views, not authority**: a path only selects one of the
//!   capability roots the process was granted at startup
//! - **No ambient namespace**: what the registry does not name does not
//!   exist; an unmatched path resolves to a sentinel, never to the host
//! - **Translation, not emulation**: each legacy call becomes exactly one
//!   descriptor-relative primitive; nothing is retried or synthesized
//!
//! ## Design
//!
//! - The [`registry`] module holds the immutable table mapping path and
//!   role-name prefixes to directory capabilities
//! - The [`resolve`] module turns an input path into a
//!   `(role, capability, suffix)` triple, or the sentinel when nothing
//!   matches
//! - The [`ops`] module presents the legacy call shapes (`open`,
//!   `opendir`, `stat`, `lstat`, `unlink`, `rmdir`, `mkdir`, `getcwd`,
//!   `access`, `rename`) over any `DirectoryPrimitives` implementation

pub mod ops;
pub mod registry;
pub mod resolve;

pub use ops::{CompatFs, FsError};
pub use registry::{DirectoryEntry, DirectoryRegistry, DirectoryRole};
pub use resolve::{BoundedPath, PathError, ResolvedPath, MAX_RESOLVED_PATH};
