//! # Simulated Directory Primitives
//!
//! This crate implements `dirfd_api::DirectoryPrimitives` over an in-memory
//! node tree, so the whole compatibility layer runs under `cargo test`
//! without a real capability platform underneath.
//!
//! ## Design
//!
//! - Each registered root is an isolated subtree behind its own `DirFd`;
//!   there is no path between subtrees, so cross-root renames fail with
//!   `CrossDevice` exactly like a platform without that support
//! - Every primitive invocation is recorded in an audit log, which tests
//!   use to verify which descriptor-relative calls were actually issued
//! - Files, directories and symlinks are enough to exercise every legacy
//!   operation; file contents are not modeled, only sizes and modes

pub mod audit;
pub mod fs;

pub use audit::{PrimitiveAuditLog, PrimitiveEvent};
pub use fs::{NodeId, SimFilesystem};
