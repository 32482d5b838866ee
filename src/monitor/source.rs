// src/monitor/source.rs

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::Path;
use std::time::Duration;

use inotify::{EventMask, Inotify, WatchDescriptor, WatchMask, Watches};
use tokio::io::unix::AsyncFd;
use tracing::warn;

use crate::errors::SourceError;
use crate::monitor::event::{EventClasses, EventKind};

/// A raw kernel event, owned and minimally decoded.
///
/// `kind == None` carries only bookkeeping: `removed` says the kernel dropped
/// the watch (`IN_IGNORED`), which the monitor uses to prune stale
/// descriptors. Per-descriptor ordering is the kernel's; ordering across
/// descriptors is unspecified.
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub wd: WatchDescriptor,
    pub kind: Option<EventKind>,
    pub is_dir: bool,
    pub removed: bool,
    pub name: Option<OsString>,
}

impl RawEvent {
    fn from_inotify(event: inotify::Event<&OsStr>) -> Self {
        Self {
            wd: event.wd.clone(),
            kind: classify(event.mask),
            is_dir: event.mask.contains(EventMask::ISDIR),
            removed: event.mask.contains(EventMask::IGNORED),
            name: event.name.map(|n| n.to_os_string()),
        }
    }
}

/// The platform event source: one inotify instance, one watch descriptor per
/// directory.
///
/// The fd is non-blocking; `poll` drains whatever is ready and only parks on
/// the reactor when the queue is empty and the caller allowed a timeout.
pub struct FsEventSource {
    fd: AsyncFd<Inotify>,
    watches: Watches,
    buffer: Box<[u8; 4096]>,
}

impl FsEventSource {
    /// Must be called from within the runtime (the fd is registered with the
    /// reactor immediately).
    pub fn new() -> Result<Self, SourceError> {
        let mut inotify = Inotify::init().map_err(SourceError::classify)?;
        let watches = inotify.watches();
        let fd = AsyncFd::new(inotify).map_err(SourceError::classify)?;
        Ok(Self {
            fd,
            watches,
            buffer: Box::new([0u8; 4096]),
        })
    }

    /// Register a directory watch for the selected event classes.
    ///
    /// `ONLYDIR` guards against the path having been replaced by a file
    /// between the caller's check and registration.
    pub fn add_watch(
        &mut self,
        dir: &Path,
        classes: EventClasses,
    ) -> Result<WatchDescriptor, SourceError> {
        self.watches
            .add(dir, classes.watch_mask() | WatchMask::ONLYDIR)
            .map_err(SourceError::classify)
    }

    /// Drop a watch. Fails with `Io(EINVAL)` if the kernel already removed
    /// it (deleted or moved-out directory); callers treat that as success.
    pub fn remove_watch(&mut self, wd: WatchDescriptor) -> Result<(), SourceError> {
        self.watches.remove(wd).map_err(SourceError::classify)
    }

    /// Return every event currently queued, blocking up to `timeout` if the
    /// queue is empty. `poll(Duration::ZERO)` never blocks. May return an
    /// empty vec on timeout.
    pub async fn poll(&mut self, timeout: Duration) -> Result<Vec<RawEvent>, SourceError> {
        let mut out = Vec::new();
        let Self { fd, buffer, .. } = self;

        drain(fd.get_mut(), &mut buffer[..], &mut out)?;
        if !out.is_empty() || timeout.is_zero() {
            return Ok(out);
        }

        let waited = tokio::time::timeout(timeout, async {
            loop {
                let mut guard = fd.readable_mut().await.map_err(SourceError::classify)?;
                drain(guard.get_inner_mut(), &mut buffer[..], &mut out)?;
                if out.is_empty() {
                    guard.clear_ready();
                    continue;
                }
                return Ok::<(), SourceError>(());
            }
        })
        .await;

        match waited {
            Ok(result) => result?,
            Err(_elapsed) => {}
        }
        Ok(out)
    }
}

fn drain(
    inotify: &mut Inotify,
    buffer: &mut [u8],
    out: &mut Vec<RawEvent>,
) -> Result<(), SourceError> {
    loop {
        match inotify.read_events(buffer) {
            Ok(events) => {
                let before = out.len();
                for event in events {
                    if event.mask.contains(EventMask::Q_OVERFLOW) {
                        warn!("kernel event queue overflowed, events were lost");
                        continue;
                    }
                    out.push(RawEvent::from_inotify(event));
                }
                if out.len() == before {
                    break;
                }
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
            Err(err) => return Err(SourceError::classify(err)),
        }
    }
    Ok(())
}

fn classify(mask: EventMask) -> Option<EventKind> {
    if mask.contains(EventMask::ACCESS) {
        Some(EventKind::Access)
    } else if mask.contains(EventMask::ATTRIB) {
        Some(EventKind::Attribute)
    } else if mask.contains(EventMask::CLOSE_WRITE) {
        Some(EventKind::CloseWrite)
    } else if mask.contains(EventMask::CLOSE_NOWRITE) {
        Some(EventKind::CloseNoWrite)
    } else if mask.contains(EventMask::CREATE) {
        Some(EventKind::Create)
    } else if mask.contains(EventMask::DELETE) {
        Some(EventKind::Delete)
    } else if mask.contains(EventMask::DELETE_SELF) {
        Some(EventKind::DeleteSelf)
    } else if mask.contains(EventMask::MODIFY) {
        Some(EventKind::Modify)
    } else if mask.contains(EventMask::MOVE_SELF) {
        Some(EventKind::MoveSelf)
    } else if mask.contains(EventMask::MOVED_FROM) {
        // The file left this directory; from the watcher's point of view it
        // is gone. The arrival side is MOVED_TO, reported as Rename.
        Some(EventKind::Delete)
    } else if mask.contains(EventMask::MOVED_TO) {
        Some(EventKind::Rename)
    } else if mask.contains(EventMask::OPEN) {
        Some(EventKind::Open)
    } else {
        None
    }
}
