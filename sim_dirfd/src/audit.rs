//! Audit log for primitive invocations
//!
//! Every descriptor-relative call that reaches the simulated backend is
//! recorded here, so tests can assert not just on results but on which
//! primitives were issued against which capabilities.

use dirfd_api::DirFd;
use serde::{Deserialize, Serialize};

/// A single primitive invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimitiveEvent {
    /// Open (or create) was invoked
    OpenAt {
        dir: DirFd,
        path: String,
        create: bool,
    },
    /// Directory stream open was invoked
    OpenDirAt { dir: DirFd, path: String },
    /// Stat was invoked
    StatAt {
        dir: DirFd,
        path: String,
        follow_symlinks: bool,
    },
    /// Unlink was invoked
    UnlinkAt {
        dir: DirFd,
        path: String,
        remove_dir: bool,
    },
    /// Directory creation was invoked
    MkdirAt { dir: DirFd, path: String },
    /// Access check was invoked
    AccessAt { dir: DirFd, path: String },
    /// Rename was invoked, naming both capability roots
    RenameAt {
        from_dir: DirFd,
        from_path: String,
        to_dir: DirFd,
        to_path: String,
    },
}

impl PrimitiveEvent {
    /// Returns every directory capability named by this invocation
    pub fn descriptors(&self) -> Vec<DirFd> {
        match self {
            PrimitiveEvent::OpenAt { dir, .. }
            | PrimitiveEvent::OpenDirAt { dir, .. }
            | PrimitiveEvent::StatAt { dir, .. }
            | PrimitiveEvent::UnlinkAt { dir, .. }
            | PrimitiveEvent::MkdirAt { dir, .. }
            | PrimitiveEvent::AccessAt { dir, .. } => vec![*dir],
            PrimitiveEvent::RenameAt {
                from_dir, to_dir, ..
            } => vec![*from_dir, *to_dir],
        }
    }
}

/// Audit log of primitive invocations
#[derive(Debug, Clone, Default)]
pub struct PrimitiveAuditLog {
    events: Vec<PrimitiveEvent>,
}

impl PrimitiveAuditLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn record(&mut self, event: PrimitiveEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[PrimitiveEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn has_event<F>(&self, predicate: F) -> bool
    where
        F: Fn(&PrimitiveEvent) -> bool,
    {
        self.events.iter().any(predicate)
    }
}
