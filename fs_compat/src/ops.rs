//! Legacy-shaped operations over directory capabilities
//!
//! One method per conventional call. Every operation resolves its path
//! argument(s) first and refuses to proceed on a sentinel resolution;
//! the invalid capability handle must never reach a primitive. Primitive
//! failures pass through unchanged. There is no cross-call state: each
//! call is resolve-then-invoke and nothing else.

use crate::registry::DirectoryRegistry;
use crate::resolve::{PathError, ResolvedPath};
use dirfd_api::{
    AccessMode, DirStream, DirectoryPrimitives, FileHandle, FileMode, FileStat, OpenFlags,
    PrimitiveError,
};
use thiserror::Error;

/// Errors returned by the compatibility operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FsError {
    /// No registry entry matches the input path
    #[error("No capability root matches path: {0}")]
    Unresolved(String),

    /// Path resolution failed
    #[error(transparent)]
    Path(#[from] PathError),

    /// A create flag was set but no creation mode was supplied
    #[error("open with a create flag requires a creation mode")]
    MissingCreateMode,

    /// A call argument was malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The underlying primitive failed; passed through unchanged
    #[error(transparent)]
    Primitive(#[from] PrimitiveError),
}

/// The capability syscall adapter
///
/// Borrows an immutable registry and a primitive backend; holds no state
/// of its own, so one value can serve any number of threads.
pub struct CompatFs<'a, P: DirectoryPrimitives> {
    registry: &'a DirectoryRegistry,
    primitives: &'a P,
}

impl<'a, P: DirectoryPrimitives> CompatFs<'a, P> {
    /// Creates an adapter over a registry and a primitive backend
    pub fn new(registry: &'a DirectoryRegistry, primitives: &'a P) -> Self {
        Self {
            registry,
            primitives,
        }
    }

    /// Resolves a path, turning the sentinel into a hard failure
    fn resolve(&self, path: &str) -> Result<ResolvedPath, FsError> {
        let resolved = self.registry.lookup(path)?;
        if resolved.is_unresolved() {
            return Err(FsError::Unresolved(path.to_string()));
        }
        Ok(resolved)
    }

    /// Opens (or creates) a file
    ///
    /// `mode` is required exactly when `flags.create` is set; supplying it
    /// without the create flag is harmless and ignored, omitting it with
    /// the flag fails before any primitive is invoked.
    pub fn open(
        &self,
        path: &str,
        flags: OpenFlags,
        mode: Option<FileMode>,
    ) -> Result<FileHandle, FsError> {
        if flags.create && mode.is_none() {
            return Err(FsError::MissingCreateMode);
        }
        let resolved = self.resolve(path)?;
        let mode = if flags.create { mode } else { None };
        Ok(self
            .primitives
            .open_at(resolved.capability, resolved.suffix.as_str(), flags, mode)?)
    }

    /// Opens a directory stream
    pub fn opendir(&self, path: &str) -> Result<DirStream, FsError> {
        let resolved = self.resolve(path)?;
        Ok(self
            .primitives
            .open_dir_at(resolved.capability, resolved.suffix.as_str())?)
    }

    /// Stats a path, following symlinks
    pub fn stat(&self, path: &str) -> Result<FileStat, FsError> {
        let resolved = self.resolve(path)?;
        Ok(self
            .primitives
            .stat_at(resolved.capability, resolved.suffix.as_str(), true)?)
    }

    /// Stats a path without following symlinks
    pub fn lstat(&self, path: &str) -> Result<FileStat, FsError> {
        let resolved = self.resolve(path)?;
        Ok(self
            .primitives
            .stat_at(resolved.capability, resolved.suffix.as_str(), false)?)
    }

    /// Removes a non-directory entry
    pub fn unlink(&self, path: &str) -> Result<(), FsError> {
        let resolved = self.resolve(path)?;
        Ok(self
            .primitives
            .unlink_at(resolved.capability, resolved.suffix.as_str(), false)?)
    }

    /// Removes an empty directory
    pub fn rmdir(&self, path: &str) -> Result<(), FsError> {
        let resolved = self.resolve(path)?;
        Ok(self
            .primitives
            .unlink_at(resolved.capability, resolved.suffix.as_str(), true)?)
    }

    /// Creates a directory
    pub fn mkdir(&self, path: &str, mode: FileMode) -> Result<(), FsError> {
        let resolved = self.resolve(path)?;
        Ok(self
            .primitives
            .mkdir_at(resolved.capability, resolved.suffix.as_str(), mode)?)
    }

    /// Checks accessibility of a path
    pub fn access(&self, path: &str, mode: AccessMode) -> Result<(), FsError> {
        let resolved = self.resolve(path)?;
        Ok(self
            .primitives
            .access_at(resolved.capability, resolved.suffix.as_str(), mode)?)
    }

    /// Emulates `getcwd` on a platform that has no working directory
    ///
    /// The result is always the empty string. With a caller-supplied
    /// buffer the buffer is cleared in place and `None` is returned; with
    /// no buffer a freshly allocated empty `String` of `size` capacity is
    /// returned and belongs to the caller. A zero `size` is rejected, as
    /// the legacy call rejects a non-positive one.
    pub fn getcwd(
        &self,
        buf: Option<&mut String>,
        size: usize,
    ) -> Result<Option<String>, FsError> {
        if size == 0 {
            return Err(FsError::InvalidArgument(
                "getcwd buffer size must be positive".to_string(),
            ));
        }
        match buf {
            Some(buf) => {
                buf.clear();
                Ok(None)
            }
            None => Ok(Some(String::with_capacity(size))),
        }
    }

    /// Renames an entry, possibly across two capability roots
    ///
    /// Both paths are resolved independently; a single primitive naming
    /// both roots and both suffixes is issued. Whether a rename spanning
    /// two distinct roots succeeds is the platform's decision and is not
    /// emulated here.
    pub fn rename(&self, from: &str, to: &str) -> Result<(), FsError> {
        let from_resolved = self.resolve(from)?;
        let to_resolved = self.resolve(to)?;
        Ok(self.primitives.rename_at(
            from_resolved.capability,
            from_resolved.suffix.as_str(),
            to_resolved.capability,
            to_resolved.suffix.as_str(),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{DirectoryEntry, DirectoryRole};
    use dirfd_api::FileKind;
    use sim_dirfd::SimFilesystem;

    /// Two-root fixture: DATA at /pgdata, BINDIR at /opt/pg/bin
    fn fixture() -> (SimFilesystem, DirectoryRegistry) {
        let fs = SimFilesystem::new();
        let data = fs.add_root();
        let bin = fs.add_root();
        fs.add_file(data, "PG_VERSION", FileMode::from_bits(0o444), 4)
            .unwrap();
        fs.add_dir(data, "base", FileMode::from_bits(0o755)).unwrap();
        fs.add_file(data, "base/1", FileMode::from_bits(0o600), 8192)
            .unwrap();
        fs.add_file(bin, "psql", FileMode::from_bits(0o755), 1 << 20)
            .unwrap();
        fs.clear_audit();

        let registry = DirectoryRegistry::new(vec![
            DirectoryEntry::new(DirectoryRole::Data, "/pgdata", "PGDATA", data),
            DirectoryEntry::new(DirectoryRole::BinDir, "/opt/pg/bin", "PGBINDIR", bin),
        ]);
        (fs, registry)
    }

    #[test]
    fn test_open_resolved_path() {
        let (fs, registry) = fixture();
        let compat = CompatFs::new(&registry, &fs);

        compat
            .open("/pgdata/base/1", OpenFlags::read_write(), None)
            .unwrap();
    }

    #[test]
    fn test_open_unresolved_path_never_hits_primitive() {
        let (fs, registry) = fixture();
        let compat = CompatFs::new(&registry, &fs);

        let result = compat.open("/etc/passwd", OpenFlags::read_only(), None);
        assert!(matches!(result, Err(FsError::Unresolved(_))));
        assert!(fs.audit_events().is_empty());
    }

    #[test]
    fn test_open_create_without_mode_rejected_at_boundary() {
        let (fs, registry) = fixture();
        let compat = CompatFs::new(&registry, &fs);

        let result = compat.open("/pgdata/base/2", OpenFlags::write_only().with_create(), None);
        assert_eq!(result, Err(FsError::MissingCreateMode));
        // Rejected before resolution, so no primitive traffic at all.
        assert!(fs.audit_events().is_empty());
    }

    #[test]
    fn test_open_create_with_mode() {
        let (fs, registry) = fixture();
        let compat = CompatFs::new(&registry, &fs);

        compat
            .open(
                "/pgdata/base/2",
                OpenFlags::write_only().with_create(),
                Some(FileMode::from_bits(0o600)),
            )
            .unwrap();
        let stat = compat.stat("/pgdata/base/2").unwrap();
        assert_eq!(stat.kind, FileKind::File);
    }

    #[test]
    fn test_opendir() {
        let (fs, registry) = fixture();
        let compat = CompatFs::new(&registry, &fs);

        let stream = compat.opendir("/pgdata").unwrap();
        let names: Vec<String> = stream.into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["PG_VERSION", "base"]);
    }

    #[test]
    fn test_stat_vs_lstat() {
        let (fs, registry) = fixture();
        let data = registry.entries()[0].capability;
        fs.add_symlink(data, "version_link", "PG_VERSION").unwrap();
        let compat = CompatFs::new(&registry, &fs);

        let followed = compat.stat("/pgdata/version_link").unwrap();
        assert_eq!(followed.kind, FileKind::File);

        let link = compat.lstat("/pgdata/version_link").unwrap();
        assert_eq!(link.kind, FileKind::Symlink);
    }

    #[test]
    fn test_unlink_and_rmdir() {
        let (fs, registry) = fixture();
        let compat = CompatFs::new(&registry, &fs);

        assert!(matches!(
            compat.unlink("/pgdata/base"),
            Err(FsError::Primitive(PrimitiveError::IsADirectory(_)))
        ));
        compat.unlink("/pgdata/base/1").unwrap();
        compat.rmdir("/pgdata/base").unwrap();
        assert!(matches!(
            compat.stat("/pgdata/base"),
            Err(FsError::Primitive(PrimitiveError::NotFound(_)))
        ));
    }

    #[test]
    fn test_mkdir() {
        let (fs, registry) = fixture();
        let compat = CompatFs::new(&registry, &fs);

        compat
            .mkdir("/pgdata/global", FileMode::from_bits(0o700))
            .unwrap();
        let stat = compat.stat("/pgdata/global").unwrap();
        assert_eq!(stat.kind, FileKind::Directory);
    }

    #[test]
    fn test_access() {
        let (fs, registry) = fixture();
        let compat = CompatFs::new(&registry, &fs);

        compat
            .access("/pgdata/PG_VERSION", AccessMode::read_only())
            .unwrap();
        assert!(matches!(
            compat.access("/pgdata/PG_VERSION", AccessMode::read_write()),
            Err(FsError::Primitive(PrimitiveError::PermissionDenied(_)))
        ));
    }

    #[test]
    fn test_getcwd_zero_size() {
        let (fs, registry) = fixture();
        let compat = CompatFs::new(&registry, &fs);

        let result = compat.getcwd(None, 0);
        assert!(matches!(result, Err(FsError::InvalidArgument(_))));
    }

    #[test]
    fn test_getcwd_allocates_empty_string() {
        let (fs, registry) = fixture();
        let compat = CompatFs::new(&registry, &fs);

        let owned = compat.getcwd(None, 64).unwrap().unwrap();
        assert_eq!(owned, "");
        assert!(owned.capacity() >= 64);
    }

    #[test]
    fn test_getcwd_clears_caller_buffer() {
        let (fs, registry) = fixture();
        let compat = CompatFs::new(&registry, &fs);

        let mut buf = String::from("/stale/cwd");
        let returned = compat.getcwd(Some(&mut buf), 64).unwrap();
        assert!(returned.is_none());
        assert_eq!(buf, "");
    }

    #[test]
    fn test_rename_cross_capability_forwards_both_roots() {
        let (fs, registry) = fixture();
        let compat = CompatFs::new(&registry, &fs);
        let data = registry.entries()[0].capability;
        let bin = registry.entries()[1].capability;

        fs.add_file(data, "tmp", FileMode::from_bits(0o600), 1).unwrap();
        fs.clear_audit();

        // The sim platform has no cross-root rename; the error passes
        // through untranslated, and exactly one primitive was issued
        // naming both roots and both suffixes.
        let result = compat.rename("/pgdata/tmp", "/opt/pg/bin/tmp");
        assert_eq!(result, Err(FsError::Primitive(PrimitiveError::CrossDevice)));

        let events = fs.audit_events();
        assert_eq!(events.len(), 1);
        assert!(fs.audit_has(|e| matches!(
            e,
            sim_dirfd::PrimitiveEvent::RenameAt {
                from_dir,
                from_path,
                to_dir,
                to_path,
            } if *from_dir == data
                && from_path == "/tmp"
                && *to_dir == bin
                && to_path == "/tmp"
        )));
    }

    #[test]
    fn test_rename_within_one_root() {
        let (fs, registry) = fixture();
        let compat = CompatFs::new(&registry, &fs);

        compat.rename("/pgdata/base/1", "/pgdata/base/2").unwrap();
        assert!(matches!(
            compat.stat("/pgdata/base/1"),
            Err(FsError::Primitive(PrimitiveError::NotFound(_)))
        ));
        compat.stat("/pgdata/base/2").unwrap();
    }

    #[test]
    fn test_rename_with_unresolved_side_is_rejected_early() {
        let (fs, registry) = fixture();
        let compat = CompatFs::new(&registry, &fs);

        let result = compat.rename("/pgdata/base/1", "/etc/stolen");
        assert!(matches!(result, Err(FsError::Unresolved(_))));
        assert!(fs.audit_events().is_empty());
    }
}
