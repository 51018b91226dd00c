//! # Directory Descriptor API
//!
//! This crate defines the interface between the compatibility layer and the
//! platform's descriptor-relative file primitives.
//!
//! ## Philosophy
//!
//! The platform has no global filesystem namespace and no working directory:
//! - File access flows through pre-opened directory capabilities
//! - Every operation is relative to one of those capabilities
//! - Paths are views, not authority; a handle is the authority
//!
//! ## Design Goals
//!
//! 1. **Testability**: The entire primitive set can be simulated under
//!    `cargo test`
//! 2. **Explicitness**: No ambient state; every call names its capability
//! 3. **Minimal surface**: One primitive per legacy operation family
//!
//! ## Non-Goals
//!
//! This is NOT:
//! - A path resolver (that lives above this crate)
//! - An owner of directory capabilities (they are opened at startup by an
//!   external initializer and borrowed here)
//! - A specific transport (the trait can be backed by real syscalls or by
//!   an in-memory simulation)

pub mod error;
pub mod handle;
pub mod primitives;
pub mod types;

pub use error::PrimitiveError;
pub use handle::{DirFd, FileHandle};
pub use primitives::DirectoryPrimitives;
pub use types::{AccessMode, DirEntry, DirStream, FileKind, FileMode, FileStat, OpenFlags};
