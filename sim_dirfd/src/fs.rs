//! In-memory filesystem behind directory capabilities
//!
//! Each registered root is a standalone subtree reachable only through its
//! `DirFd`. Relative paths are walked component by component; `..` never
//! resolves, so a path can not escape the capability it was issued under.

use crate::audit::{PrimitiveAuditLog, PrimitiveEvent};
use dirfd_api::{
    AccessMode, DirEntry, DirFd, DirStream, DirectoryPrimitives, FileHandle, FileKind, FileMode,
    FileStat, OpenFlags, PrimitiveError,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;
use uuid::Uuid;

/// Maximum symlink indirections followed before giving up
const MAX_SYMLINK_DEPTH: usize = 8;

/// Unique identifier for a simulated filesystem node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Creates a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// A node in the simulated tree
#[derive(Debug, Clone)]
enum Node {
    File { mode: FileMode, size: u64 },
    Dir { mode: FileMode, children: BTreeMap<String, NodeId> },
    Symlink { target: String },
}

#[derive(Debug, Default)]
struct Inner {
    roots: BTreeMap<DirFd, NodeId>,
    nodes: BTreeMap<NodeId, Node>,
    next_dirfd: u64,
    next_handle: u64,
    audit: PrimitiveAuditLog,
}

impl Inner {
    fn root_of(&self, dir: DirFd) -> Result<NodeId, PrimitiveError> {
        self.roots
            .get(&dir)
            .copied()
            .ok_or_else(|| PrimitiveError::BadDescriptor(dir.to_string()))
    }

    /// Splits a relative path, refusing any component that would climb out
    /// of the capability root.
    fn components(path: &str) -> Result<Vec<&str>, PrimitiveError> {
        let mut comps = Vec::new();
        for comp in path.split('/') {
            match comp {
                "" | "." => continue,
                ".." => {
                    return Err(PrimitiveError::PermissionDenied(
                        "path escapes its capability root".to_string(),
                    ))
                }
                other => comps.push(other),
            }
        }
        Ok(comps)
    }

    fn node(&self, id: NodeId) -> &Node {
        self.nodes.get(&id).expect("node table out of sync")
    }

    /// Walks from `start` through the given components, descending only
    /// through directories.
    fn walk(&self, start: NodeId, comps: &[&str]) -> Result<NodeId, PrimitiveError> {
        let mut current = start;
        for comp in comps {
            let children = match self.node(current) {
                Node::Dir { children, .. } => children,
                _ => return Err(PrimitiveError::NotADirectory((*comp).to_string())),
            };
            current = children
                .get(*comp)
                .copied()
                .ok_or_else(|| PrimitiveError::NotFound((*comp).to_string()))?;
        }
        Ok(current)
    }

    /// Resolves everything but the final component; `comps` must be
    /// non-empty.
    fn resolve_parent(
        &self,
        root: NodeId,
        comps: &[&str],
    ) -> Result<(NodeId, String), PrimitiveError> {
        let name = comps[comps.len() - 1];
        let parent = self.walk(root, &comps[..comps.len() - 1])?;
        match self.node(parent) {
            Node::Dir { .. } => Ok((parent, name.to_string())),
            _ => Err(PrimitiveError::NotADirectory(name.to_string())),
        }
    }

    fn child_of(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        match self.node(parent) {
            Node::Dir { children, .. } => children.get(name).copied(),
            _ => None,
        }
    }

    /// Follows symlinks until a non-link node is reached
    fn follow_symlinks(&self, root: NodeId, mut id: NodeId) -> Result<NodeId, PrimitiveError> {
        for _ in 0..MAX_SYMLINK_DEPTH {
            match self.node(id) {
                Node::Symlink { target } => {
                    let comps = Self::components(target)?;
                    id = self.walk(root, &comps)?;
                }
                _ => return Ok(id),
            }
        }
        Err(PrimitiveError::PermissionDenied(
            "too many levels of symbolic links".to_string(),
        ))
    }

    fn stat_of(&self, id: NodeId) -> FileStat {
        match self.node(id) {
            Node::File { mode, size } => FileStat {
                kind: FileKind::File,
                size: *size,
                mode: *mode,
            },
            Node::Dir { mode, children } => FileStat {
                kind: FileKind::Directory,
                size: children.len() as u64,
                mode: *mode,
            },
            Node::Symlink { target } => FileStat {
                kind: FileKind::Symlink,
                size: target.len() as u64,
                mode: FileMode::from_bits(0o777),
            },
        }
    }

    fn check_access(&self, id: NodeId, requested: AccessMode) -> Result<(), PrimitiveError> {
        let stat = self.stat_of(id);
        let denied = (requested.read && !stat.mode.owner_read())
            || (requested.write && !stat.mode.owner_write())
            || (requested.execute && !stat.mode.owner_execute());
        if denied {
            Err(PrimitiveError::PermissionDenied(
                "requested access not permitted by mode".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn alloc_handle(&mut self) -> FileHandle {
        let handle = FileHandle::from_raw(self.next_handle);
        self.next_handle += 1;
        handle
    }

    fn insert_child(&mut self, parent: NodeId, name: String, node: Node) -> NodeId {
        let id = NodeId::new();
        self.nodes.insert(id, node);
        if let Some(Node::Dir { children, .. }) = self.nodes.get_mut(&parent) {
            children.insert(name, id);
        }
        id
    }

    fn remove_child(&mut self, parent: NodeId, name: &str) -> Option<NodeId> {
        let removed = match self.nodes.get_mut(&parent) {
            Some(Node::Dir { children, .. }) => children.remove(name),
            _ => None,
        };
        if let Some(id) = removed {
            self.nodes.remove(&id);
        }
        removed
    }

    fn open_at(
        &mut self,
        dir: DirFd,
        path: &str,
        flags: OpenFlags,
        mode: Option<FileMode>,
    ) -> Result<FileHandle, PrimitiveError> {
        let root = self.root_of(dir)?;
        let comps = Self::components(path)?;
        if comps.is_empty() {
            return Err(PrimitiveError::IsADirectory(path.to_string()));
        }
        let (parent, name) = self.resolve_parent(root, &comps)?;

        match self.child_of(parent, &name) {
            Some(child) => {
                if flags.create && flags.exclusive {
                    return Err(PrimitiveError::AlreadyExists(path.to_string()));
                }
                let resolved = self.follow_symlinks(root, child)?;
                match self.node(resolved) {
                    Node::Dir { .. } => {
                        if flags.write || flags.truncate {
                            return Err(PrimitiveError::IsADirectory(path.to_string()));
                        }
                    }
                    Node::File { mode, .. } => {
                        if (flags.read && !mode.owner_read())
                            || (flags.write && !mode.owner_write())
                        {
                            return Err(PrimitiveError::PermissionDenied(path.to_string()));
                        }
                    }
                    Node::Symlink { .. } => unreachable!("follow_symlinks returned a link"),
                }
                if flags.truncate {
                    if let Some(Node::File { size, .. }) = self.nodes.get_mut(&resolved) {
                        *size = 0;
                    }
                }
                Ok(self.alloc_handle())
            }
            None => {
                if !flags.create {
                    return Err(PrimitiveError::NotFound(path.to_string()));
                }
                let mode = mode.ok_or_else(|| {
                    PrimitiveError::InvalidArgument(
                        "open with a create flag requires a mode".to_string(),
                    )
                })?;
                self.insert_child(parent, name, Node::File { mode, size: 0 });
                Ok(self.alloc_handle())
            }
        }
    }

    fn open_dir_at(&self, dir: DirFd, path: &str) -> Result<DirStream, PrimitiveError> {
        let root = self.root_of(dir)?;
        let comps = Self::components(path)?;
        let id = self.walk(root, &comps)?;
        match self.node(id) {
            Node::Dir { children, .. } => {
                let entries = children
                    .iter()
                    .map(|(name, child)| DirEntry {
                        name: name.clone(),
                        kind: self.stat_of(*child).kind,
                    })
                    .collect();
                Ok(DirStream::new(entries))
            }
            _ => Err(PrimitiveError::NotADirectory(path.to_string())),
        }
    }

    fn stat_at(
        &self,
        dir: DirFd,
        path: &str,
        follow_symlinks: bool,
    ) -> Result<FileStat, PrimitiveError> {
        let root = self.root_of(dir)?;
        let comps = Self::components(path)?;
        let mut id = self.walk(root, &comps)?;
        if follow_symlinks {
            id = self.follow_symlinks(root, id)?;
        }
        Ok(self.stat_of(id))
    }

    fn unlink_at(&mut self, dir: DirFd, path: &str, remove_dir: bool) -> Result<(), PrimitiveError> {
        let root = self.root_of(dir)?;
        let comps = Self::components(path)?;
        if comps.is_empty() {
            return Err(PrimitiveError::InvalidArgument(
                "cannot unlink a capability root".to_string(),
            ));
        }
        let (parent, name) = self.resolve_parent(root, &comps)?;
        let child = self
            .child_of(parent, &name)
            .ok_or_else(|| PrimitiveError::NotFound(path.to_string()))?;

        match self.node(child) {
            Node::Dir { children, .. } => {
                if !remove_dir {
                    return Err(PrimitiveError::IsADirectory(path.to_string()));
                }
                if !children.is_empty() {
                    return Err(PrimitiveError::DirectoryNotEmpty(path.to_string()));
                }
            }
            _ => {
                if remove_dir {
                    return Err(PrimitiveError::NotADirectory(path.to_string()));
                }
            }
        }
        self.remove_child(parent, &name);
        Ok(())
    }

    fn mkdir_at(&mut self, dir: DirFd, path: &str, mode: FileMode) -> Result<(), PrimitiveError> {
        let root = self.root_of(dir)?;
        let comps = Self::components(path)?;
        if comps.is_empty() {
            return Err(PrimitiveError::AlreadyExists(path.to_string()));
        }
        let (parent, name) = self.resolve_parent(root, &comps)?;
        if self.child_of(parent, &name).is_some() {
            return Err(PrimitiveError::AlreadyExists(path.to_string()));
        }
        self.insert_child(
            parent,
            name,
            Node::Dir {
                mode,
                children: BTreeMap::new(),
            },
        );
        Ok(())
    }

    fn access_at(&self, dir: DirFd, path: &str, mode: AccessMode) -> Result<(), PrimitiveError> {
        let root = self.root_of(dir)?;
        let comps = Self::components(path)?;
        let id = self.walk(root, &comps)?;
        let id = self.follow_symlinks(root, id)?;
        self.check_access(id, mode)
    }

    fn rename_at(
        &mut self,
        from_dir: DirFd,
        from_path: &str,
        to_dir: DirFd,
        to_path: &str,
    ) -> Result<(), PrimitiveError> {
        let from_root = self.root_of(from_dir)?;
        let to_root = self.root_of(to_dir)?;
        // Every root is its own device here; this platform has no
        // cross-capability rename support.
        if from_root != to_root {
            return Err(PrimitiveError::CrossDevice);
        }

        let from_comps = Self::components(from_path)?;
        let to_comps = Self::components(to_path)?;
        if from_comps.is_empty() || to_comps.is_empty() {
            return Err(PrimitiveError::InvalidArgument(
                "cannot rename a capability root".to_string(),
            ));
        }

        let (from_parent, from_name) = self.resolve_parent(from_root, &from_comps)?;
        let src = self
            .child_of(from_parent, &from_name)
            .ok_or_else(|| PrimitiveError::NotFound(from_path.to_string()))?;
        let (to_parent, to_name) = self.resolve_parent(to_root, &to_comps)?;

        if let Some(dest) = self.child_of(to_parent, &to_name) {
            if dest == src {
                return Ok(());
            }
            let src_is_dir = matches!(self.node(src), Node::Dir { .. });
            match self.node(dest) {
                Node::Dir { children, .. } => {
                    if !src_is_dir {
                        return Err(PrimitiveError::IsADirectory(to_path.to_string()));
                    }
                    if !children.is_empty() {
                        return Err(PrimitiveError::DirectoryNotEmpty(to_path.to_string()));
                    }
                }
                _ => {
                    if src_is_dir {
                        return Err(PrimitiveError::NotADirectory(to_path.to_string()));
                    }
                }
            }
            self.remove_child(to_parent, &to_name);
        }

        if let Some(Node::Dir { children, .. }) = self.nodes.get_mut(&from_parent) {
            children.remove(&from_name);
        }
        if let Some(Node::Dir { children, .. }) = self.nodes.get_mut(&to_parent) {
            children.insert(to_name, src);
        }
        Ok(())
    }

    /// Creates missing intermediate directories along `comps`
    fn ensure_dirs(&mut self, root: NodeId, comps: &[&str]) -> Result<NodeId, PrimitiveError> {
        let mut current = root;
        for comp in comps {
            current = match self.child_of(current, comp) {
                Some(existing) => match self.node(existing) {
                    Node::Dir { .. } => existing,
                    _ => return Err(PrimitiveError::NotADirectory((*comp).to_string())),
                },
                None => self.insert_child(
                    current,
                    (*comp).to_string(),
                    Node::Dir {
                        mode: FileMode::from_bits(0o755),
                        children: BTreeMap::new(),
                    },
                ),
            };
        }
        Ok(current)
    }
}

/// Simulated capability filesystem
///
/// Interior mutability keeps all primitive methods `&self`, matching the
/// trait contract; a single lock serializes the node tree.
#[derive(Debug, Default)]
pub struct SimFilesystem {
    inner: Mutex<Inner>,
}

impl SimFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("sim filesystem lock poisoned")
    }

    /// Registers a fresh, empty capability root and returns its handle
    ///
    /// This plays the part of the external initializer that pre-opens
    /// directories at process startup.
    pub fn add_root(&self) -> DirFd {
        let mut inner = self.lock();
        let fd = DirFd::from_raw(inner.next_dirfd);
        inner.next_dirfd += 1;
        let id = NodeId::new();
        inner.nodes.insert(
            id,
            Node::Dir {
                mode: FileMode::from_bits(0o755),
                children: BTreeMap::new(),
            },
        );
        inner.roots.insert(fd, id);
        fd
    }

    /// Seeds a directory (and any missing parents) under a root
    ///
    /// Seeding helpers bypass the audit log; they are fixture setup, not
    /// primitive traffic.
    pub fn add_dir(&self, root: DirFd, path: &str, mode: FileMode) -> Result<(), PrimitiveError> {
        let mut inner = self.lock();
        let root_id = inner.root_of(root)?;
        let comps = Inner::components(path)?;
        if comps.is_empty() {
            return Ok(());
        }
        let parent = inner.ensure_dirs(root_id, &comps[..comps.len() - 1])?;
        let name = comps[comps.len() - 1];
        match inner.child_of(parent, name) {
            Some(_) => Err(PrimitiveError::AlreadyExists(path.to_string())),
            None => {
                inner.insert_child(
                    parent,
                    name.to_string(),
                    Node::Dir {
                        mode,
                        children: BTreeMap::new(),
                    },
                );
                Ok(())
            }
        }
    }

    /// Seeds a file (and any missing parents) under a root
    pub fn add_file(
        &self,
        root: DirFd,
        path: &str,
        mode: FileMode,
        size: u64,
    ) -> Result<(), PrimitiveError> {
        let mut inner = self.lock();
        let root_id = inner.root_of(root)?;
        let comps = Inner::components(path)?;
        if comps.is_empty() {
            return Err(PrimitiveError::IsADirectory(path.to_string()));
        }
        let parent = inner.ensure_dirs(root_id, &comps[..comps.len() - 1])?;
        let name = comps[comps.len() - 1];
        match inner.child_of(parent, name) {
            Some(_) => Err(PrimitiveError::AlreadyExists(path.to_string())),
            None => {
                inner.insert_child(parent, name.to_string(), Node::File { mode, size });
                Ok(())
            }
        }
    }

    /// Seeds a symlink (and any missing parents) under a root
    ///
    /// The target is interpreted relative to the same root when the link
    /// is followed.
    pub fn add_symlink(&self, root: DirFd, path: &str, target: &str) -> Result<(), PrimitiveError> {
        let mut inner = self.lock();
        let root_id = inner.root_of(root)?;
        let comps = Inner::components(path)?;
        if comps.is_empty() {
            return Err(PrimitiveError::IsADirectory(path.to_string()));
        }
        let parent = inner.ensure_dirs(root_id, &comps[..comps.len() - 1])?;
        let name = comps[comps.len() - 1];
        match inner.child_of(parent, name) {
            Some(_) => Err(PrimitiveError::AlreadyExists(path.to_string())),
            None => {
                inner.insert_child(
                    parent,
                    name.to_string(),
                    Node::Symlink {
                        target: target.to_string(),
                    },
                );
                Ok(())
            }
        }
    }

    /// Snapshot of the primitive audit log
    pub fn audit_events(&self) -> Vec<PrimitiveEvent> {
        self.lock().audit.events().to_vec()
    }

    /// Clears the primitive audit log
    pub fn clear_audit(&self) {
        self.lock().audit.clear();
    }

    /// True if any recorded invocation satisfies the predicate
    pub fn audit_has<F>(&self, predicate: F) -> bool
    where
        F: Fn(&PrimitiveEvent) -> bool,
    {
        self.lock().audit.has_event(predicate)
    }
}

impl DirectoryPrimitives for SimFilesystem {
    fn open_at(
        &self,
        dir: DirFd,
        path: &str,
        flags: OpenFlags,
        mode: Option<FileMode>,
    ) -> Result<FileHandle, PrimitiveError> {
        let mut inner = self.lock();
        inner.audit.record(PrimitiveEvent::OpenAt {
            dir,
            path: path.to_string(),
            create: flags.create,
        });
        inner.open_at(dir, path, flags, mode)
    }

    fn open_dir_at(&self, dir: DirFd, path: &str) -> Result<DirStream, PrimitiveError> {
        let mut inner = self.lock();
        inner.audit.record(PrimitiveEvent::OpenDirAt {
            dir,
            path: path.to_string(),
        });
        inner.open_dir_at(dir, path)
    }

    fn stat_at(
        &self,
        dir: DirFd,
        path: &str,
        follow_symlinks: bool,
    ) -> Result<FileStat, PrimitiveError> {
        let mut inner = self.lock();
        inner.audit.record(PrimitiveEvent::StatAt {
            dir,
            path: path.to_string(),
            follow_symlinks,
        });
        inner.stat_at(dir, path, follow_symlinks)
    }

    fn unlink_at(&self, dir: DirFd, path: &str, remove_dir: bool) -> Result<(), PrimitiveError> {
        let mut inner = self.lock();
        inner.audit.record(PrimitiveEvent::UnlinkAt {
            dir,
            path: path.to_string(),
            remove_dir,
        });
        inner.unlink_at(dir, path, remove_dir)
    }

    fn mkdir_at(&self, dir: DirFd, path: &str, mode: FileMode) -> Result<(), PrimitiveError> {
        let mut inner = self.lock();
        inner.audit.record(PrimitiveEvent::MkdirAt {
            dir,
            path: path.to_string(),
        });
        inner.mkdir_at(dir, path, mode)
    }

    fn access_at(&self, dir: DirFd, path: &str, mode: AccessMode) -> Result<(), PrimitiveError> {
        let mut inner = self.lock();
        inner.audit.record(PrimitiveEvent::AccessAt {
            dir,
            path: path.to_string(),
        });
        inner.access_at(dir, path, mode)
    }

    fn rename_at(
        &self,
        from_dir: DirFd,
        from_path: &str,
        to_dir: DirFd,
        to_path: &str,
    ) -> Result<(), PrimitiveError> {
        let mut inner = self.lock();
        inner.audit.record(PrimitiveEvent::RenameAt {
            from_dir,
            from_path: from_path.to_string(),
            to_dir,
            to_path: to_path.to_string(),
        });
        inner.rename_at(from_dir, from_path, to_dir, to_path)
    }
}
