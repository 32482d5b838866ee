// src/monitor/recursive.rs

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use inotify::WatchDescriptor;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::errors::SourceError;
use crate::filter::{GlobFilter, IgnoreLayers};
use crate::monitor::event::{EventClasses, EventKind, MonitorResult};
use crate::monitor::source::{FsEventSource, RawEvent};

/// Recursive directory monitor.
///
/// Owns the watch set: every directory in the recursive closure of the roots
/// that passes `should_watch` carries exactly one descriptor. The set grows
/// when directories are created or renamed into the tree and shrinks when
/// watched directories are deleted or moved away, always before the
/// triggering `wait` call returns.
pub struct RecursiveMonitor {
    source: FsEventSource,
    filter: GlobFilter,
    layers: IgnoreLayers,
    vcs_ignore: bool,
    follow_symlinks: bool,
    classes: EventClasses,
    roots: Vec<PathBuf>,
    dirs: HashMap<WatchDescriptor, PathBuf>,
    watch_set: HashMap<PathBuf, WatchDescriptor>,
}

impl RecursiveMonitor {
    /// Walk every root and register the initial watch set.
    ///
    /// With `follow_symlinks` disabled each root is resolved through symlinks
    /// once and used as a fixed anchor; the walk itself never dereferences
    /// symlinked directories. With it enabled, roots stay symbolic and
    /// symlinked directories are traversed.
    ///
    /// Must be called from within the runtime.
    pub fn new(
        roots: &[PathBuf],
        filter: GlobFilter,
        vcs_ignore: bool,
        follow_symlinks: bool,
        classes: EventClasses,
    ) -> Result<Self> {
        let cwd = std::env::current_dir().context("resolving working directory")?;
        let mut anchors = Vec::with_capacity(roots.len());
        for root in roots {
            let anchor = if follow_symlinks {
                cwd.join(root)
            } else {
                root.canonicalize()
                    .with_context(|| format!("resolving watch root {}", root.display()))?
            };
            anchors.push(anchor);
        }

        let mut monitor = Self {
            source: FsEventSource::new()?,
            filter,
            layers: IgnoreLayers::new(),
            vcs_ignore,
            follow_symlinks,
            classes,
            roots: anchors.clone(),
            dirs: HashMap::new(),
            watch_set: HashMap::new(),
        };

        for anchor in &anchors {
            monitor.register_tree(anchor);
        }
        if monitor.watch_set.is_empty() {
            bail!("no watchable directories under the given roots");
        }
        info!(watches = monitor.watch_set.len(), "watch set established");
        Ok(monitor)
    }

    /// Number of live watches, mostly for diagnostics and tests.
    pub fn watch_count(&self) -> usize {
        self.watch_set.len()
    }

    pub fn is_watched(&self, dir: &Path) -> bool {
        self.watch_set.contains_key(dir)
    }

    /// Block up to `timeout` for events; classify, maintain the watch set,
    /// filter, deduplicate. `wait(Duration::ZERO)` never blocks.
    pub async fn wait(&mut self, timeout: Duration) -> Result<Vec<MonitorResult>> {
        let raw = self.source.poll(timeout).await?;
        Ok(self.process(raw))
    }

    /// Drain window: keep pumping events until `window` has elapsed since the
    /// call. Used after an initial trigger to let stragglers catch up.
    pub async fn collect(&mut self, window: Duration) -> Result<Vec<MonitorResult>> {
        let deadline = Instant::now() + window;
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            for result in self.wait(deadline - now).await? {
                if seen.insert(result.clone()) {
                    out.push(result);
                }
            }
        }
        Ok(out)
    }

    /// Discard everything currently queued. Creates are still processed so
    /// the watch set keeps tracking the tree. Idempotent.
    pub async fn clear(&mut self) -> Result<()> {
        loop {
            if self.wait(Duration::ZERO).await?.is_empty() {
                return Ok(());
            }
        }
    }

    fn process(&mut self, raw: Vec<RawEvent>) -> Vec<MonitorResult> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        for event in raw {
            if event.removed {
                if let Some(dir) = self.dirs.remove(&event.wd) {
                    trace!(dir = %dir.display(), "kernel dropped watch");
                    self.watch_set.remove(&dir);
                }
                continue;
            }
            let Some(kind) = event.kind else { continue };
            let Some(dir) = self.dirs.get(&event.wd).cloned() else {
                // Stale descriptor, already pruned.
                continue;
            };

            let path = match &event.name {
                Some(name) => {
                    if name.to_str().is_none() {
                        debug!(dir = %dir.display(), "non-UTF-8 name in event, dropped");
                        continue;
                    }
                    dir.join(name)
                }
                None => dir.clone(),
            };

            match kind {
                // A fresh directory must be registered before we keep
                // draining, so a burst inside it is not lost.
                EventKind::Create | EventKind::Rename if event.is_dir => {
                    self.register_tree(&path);
                }
                EventKind::DeleteSelf | EventKind::MoveSelf => {
                    self.forget(&path);
                    if kind == EventKind::MoveSelf {
                        self.rewatch_after_move(&path);
                    }
                }
                _ => {}
            }

            let Some(path_str) = path.to_str() else {
                debug!("non-UTF-8 event path, dropped");
                continue;
            };
            if !self.filter.matches(path_str) {
                continue;
            }

            let result = MonitorResult::new(kind, path);
            if seen.insert(result.clone()) {
                out.push(result);
            }
        }
        out
    }

    /// Register `start` and every directory below it that passes
    /// `should_watch`, using an explicit work queue so pathological trees
    /// cannot overflow the stack.
    fn register_tree(&mut self, start: &Path) {
        let mut queue = vec![start.to_path_buf()];

        while let Some(dir) = queue.pop() {
            if self.watch_set.contains_key(&dir) {
                continue;
            }
            if !self.should_watch(&dir) {
                trace!(dir = %dir.display(), "directory filtered, subtree skipped");
                continue;
            }
            if self.vcs_ignore {
                if let Err(err) = self.layers.ingest_dir(&dir) {
                    warn!(dir = %dir.display(), error = %err, "unreadable ignore file, skipped");
                }
            }

            match self.source.add_watch(&dir, self.classes) {
                Ok(wd) => {
                    self.dirs.insert(wd.clone(), dir.clone());
                    self.watch_set.insert(dir.clone(), wd);
                    trace!(dir = %dir.display(), "watch added");
                }
                Err(SourceError::NoSpace) => {
                    warn!(dir = %dir.display(), "watch quota exhausted, subtree unwatched");
                    continue;
                }
                Err(err) => {
                    info!(dir = %dir.display(), error = %err, "watch registration failed, subtree skipped");
                    continue;
                }
            }

            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(err) => {
                    debug!(dir = %dir.display(), error = %err, "read_dir failed");
                    continue;
                }
            };
            for entry in entries.flatten() {
                let path = entry.path();
                let meta = if self.follow_symlinks {
                    fs::metadata(&path)
                } else {
                    fs::symlink_metadata(&path)
                };
                if matches!(meta, Ok(m) if m.is_dir()) {
                    queue.push(path);
                }
            }
        }
    }

    fn should_watch(&self, dir: &Path) -> bool {
        let Some(dir_str) = dir.to_str() else {
            return false;
        };
        self.layers.accepts(dir) && self.filter.accepts_dir(dir_str)
    }

    fn forget(&mut self, dir: &Path) {
        if let Some(wd) = self.watch_set.remove(dir) {
            self.dirs.remove(&wd);
            // EINVAL here just means the kernel beat us to it.
            if let Err(err) = self.source.remove_watch(wd) {
                trace!(dir = %dir.display(), error = %err, "watch already gone");
            }
        }
    }

    /// A watched directory reported `MoveSelf`. The descriptor follows the
    /// inode, so our recorded path is stale; if the old path is still inside
    /// the tree and exists again (atomic-replace pattern), pick it back up.
    /// The moved directory's new location is covered by the `Rename` event
    /// on its destination parent.
    fn rewatch_after_move(&mut self, old_path: &Path) {
        let is_root = self.roots.iter().any(|r| r.as_path() == old_path);
        let under_root = self.roots.iter().any(|r| old_path.starts_with(r));
        if !is_root && under_root && old_path.is_dir() {
            debug!(dir = %old_path.display(), "re-registering after move");
            self.register_tree(old_path);
        }
    }
}

impl crate::run::ChangeSource for RecursiveMonitor {
    async fn wait(&mut self, timeout: Duration) -> Result<Vec<MonitorResult>> {
        RecursiveMonitor::wait(self, timeout).await
    }

    async fn collect(&mut self, window: Duration) -> Result<Vec<MonitorResult>> {
        RecursiveMonitor::collect(self, window).await
    }

    async fn clear(&mut self) -> Result<()> {
        RecursiveMonitor::clear(self).await
    }
}

