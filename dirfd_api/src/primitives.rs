//! The descriptor-relative primitive trait

use crate::{
    AccessMode, DirFd, DirStream, FileHandle, FileMode, FileStat, OpenFlags, PrimitiveError,
};

/// The descriptor-relative file primitives
///
/// This is the trusted boundary: everything below it (real syscalls, an
/// in-memory simulation, a remote proxy) is out of scope for the
/// compatibility layer, which only ever calls through this trait.
///
/// All methods take `&self`; implementations are responsible for their own
/// thread safety. The layer above adds no serialization of its own, so
/// concurrent calls on the same `DirFd` are exactly as safe as the
/// implementation makes them.
///
/// Relative paths handed to these primitives never escape the capability:
/// an implementation must reject traversal above the root it was given.
///
/// # Example
///
/// ```ignore
/// fn probe<P: DirectoryPrimitives>(fs: &P, root: DirFd) -> Result<FileStat, PrimitiveError> {
///     fs.stat_at(root, "PG_VERSION", true)
/// }
/// ```
pub trait DirectoryPrimitives {
    /// Opens (or creates) a file relative to a directory capability
    ///
    /// `mode` supplies permission bits for a newly created file and is
    /// required when `flags.create` is set; without the create flag it is
    /// ignored.
    fn open_at(
        &self,
        dir: DirFd,
        path: &str,
        flags: OpenFlags,
        mode: Option<FileMode>,
    ) -> Result<FileHandle, PrimitiveError>;

    /// Opens a directory stream relative to a directory capability
    fn open_dir_at(&self, dir: DirFd, path: &str) -> Result<DirStream, PrimitiveError>;

    /// Stats an entry relative to a directory capability
    ///
    /// With `follow_symlinks` the stat describes the link target; without
    /// it, the link itself.
    fn stat_at(
        &self,
        dir: DirFd,
        path: &str,
        follow_symlinks: bool,
    ) -> Result<FileStat, PrimitiveError>;

    /// Removes an entry relative to a directory capability
    ///
    /// `remove_dir` selects directory removal (the rmdir flavor); without
    /// it only non-directories may be removed.
    fn unlink_at(&self, dir: DirFd, path: &str, remove_dir: bool) -> Result<(), PrimitiveError>;

    /// Creates a directory relative to a directory capability
    fn mkdir_at(&self, dir: DirFd, path: &str, mode: FileMode) -> Result<(), PrimitiveError>;

    /// Checks accessibility of an entry relative to a directory capability
    fn access_at(&self, dir: DirFd, path: &str, mode: AccessMode) -> Result<(), PrimitiveError>;

    /// Renames an entry, possibly across two capability roots
    ///
    /// Whether a rename spanning two distinct roots succeeds is a platform
    /// property; implementations without that support answer
    /// `PrimitiveError::CrossDevice` and no emulation happens above.
    fn rename_at(
        &self,
        from_dir: DirFd,
        from_path: &str,
        to_dir: DirFd,
        to_path: &str,
    ) -> Result<(), PrimitiveError>;
}
