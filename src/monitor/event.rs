// src/monitor/event.rs

use std::path::PathBuf;

use inotify::WatchMask;

/// What happened to a path.
///
/// Closed set: every consumer pattern-matches exhaustively, so a new kind is
/// a compile-time obligation at each of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Access,
    Attribute,
    CloseWrite,
    CloseNoWrite,
    Create,
    Delete,
    DeleteSelf,
    Modify,
    MoveSelf,
    Rename,
    Open,
}

impl EventKind {
    /// Content events change what a reader of the file would see.
    pub fn is_content(self) -> bool {
        match self {
            EventKind::CloseWrite
            | EventKind::Create
            | EventKind::Delete
            | EventKind::DeleteSelf
            | EventKind::Modify
            | EventKind::MoveSelf
            | EventKind::Rename => true,
            EventKind::Access
            | EventKind::Attribute
            | EventKind::CloseNoWrite
            | EventKind::Open => false,
        }
    }

    pub fn is_metadata(self) -> bool {
        !self.is_content()
    }

    /// Wire name, as exported in `WATCHEXEC_EVENT`.
    pub fn label(self) -> &'static str {
        match self {
            EventKind::Access => "access",
            EventKind::Attribute => "attribute",
            EventKind::CloseWrite => "close_write",
            EventKind::CloseNoWrite => "close_nowrite",
            EventKind::Create => "create",
            EventKind::Delete => "delete",
            EventKind::DeleteSelf => "delete_self",
            EventKind::Modify => "modify",
            EventKind::MoveSelf => "move_self",
            EventKind::Rename => "rename",
            EventKind::Open => "open",
        }
    }
}

/// Which event classes a watch is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventClasses {
    pub content: bool,
    pub metadata: bool,
}

impl EventClasses {
    pub fn content_only() -> Self {
        Self {
            content: true,
            metadata: false,
        }
    }

    pub fn all() -> Self {
        Self {
            content: true,
            metadata: true,
        }
    }

    pub fn enables(self, kind: EventKind) -> bool {
        (self.content && kind.is_content()) || (self.metadata && kind.is_metadata())
    }

    /// The kernel-side selection for a directory watch.
    pub fn watch_mask(self) -> WatchMask {
        let mut mask = WatchMask::empty();
        if self.content {
            mask |= WatchMask::CLOSE_WRITE
                | WatchMask::CREATE
                | WatchMask::DELETE
                | WatchMask::DELETE_SELF
                | WatchMask::MODIFY
                | WatchMask::MOVE_SELF
                | WatchMask::MOVED_FROM
                | WatchMask::MOVED_TO;
        }
        if self.metadata {
            mask |= WatchMask::ACCESS
                | WatchMask::ATTRIB
                | WatchMask::CLOSE_NOWRITE
                | WatchMask::OPEN;
        }
        mask
    }
}

/// One classified, filtered event: what happened, and to which path.
///
/// For `Rename` the path is the destination; `DeleteSelf` and `MoveSelf`
/// name a watched directory itself. `Eq + Hash` so change-sets can be
/// deduplicated: the run loop treats them as sets, not sequences.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MonitorResult {
    pub kind: EventKind,
    pub path: PathBuf,
}

impl MonitorResult {
    pub fn new(kind: EventKind, path: PathBuf) -> Self {
        Self { kind, path }
    }
}
