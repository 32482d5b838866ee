// src/oneshot/mod.rs

//! One-shot mode: instead of a live watcher, a content-addressed scan of the
//! tree is diffed against a persisted database. Same trigger semantics as
//! the live path, different change source.
//!
//! The database only advances when the command exits zero, and only via a
//! temp-file write plus atomic rename, so a crashed or failed run leaves the
//! prior state byte-identical.

pub mod db;
pub mod fingerprint;

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::filter::GlobFilter;
use crate::monitor::{EventKind, MonitorResult};
use crate::process::ChildSupervisor;
use crate::run::{encode_change_set, report_status, RunOptions, EVENT_ENV_VAR};

pub use db::FileDb;
pub use fingerprint::Fingerprint;

pub struct OneShotDiffer {
    roots: Vec<PathBuf>,
    filter: GlobFilter,
    follow_symlinks: bool,
    db_path: PathBuf,
    cwd: PathBuf,
}

impl OneShotDiffer {
    pub fn new(
        roots: Vec<PathBuf>,
        filter: GlobFilter,
        follow_symlinks: bool,
        db_path: PathBuf,
    ) -> Result<Self> {
        let cwd = std::env::current_dir().context("resolving working directory")?;
        Ok(Self {
            roots,
            filter,
            follow_symlinks,
            db_path,
            cwd,
        })
    }

    /// Scan, diff, and (when anything changed) run the command once. The
    /// database is advanced only on a zero exit status.
    pub async fn run(
        &self,
        supervisor: &ChildSupervisor,
        command: &[String],
        options: &RunOptions,
    ) -> Result<()> {
        let prior = FileDb::load(&self.db_path);
        let candidates = self.scan()?;
        let candidate_set: HashSet<PathBuf> = candidates.iter().cloned().collect();

        let mut next = FileDb::new(command.to_vec());
        let mut changes: Vec<MonitorResult> = Vec::new();

        for path in candidates {
            let mut current = match Fingerprint::of(&path) {
                Ok(fp) => fp,
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "file vanished during scan");
                    continue;
                }
            };

            match prior.get(&path) {
                None => {
                    changes.push(MonitorResult::new(EventKind::Create, path));
                    self.finish_checksum(&mut current);
                    next.insert(current);
                }
                Some(old) if old.size_bytes != current.size_bytes => {
                    changes.push(MonitorResult::new(EventKind::Modify, path));
                    self.finish_checksum(&mut current);
                    next.insert(current);
                }
                Some(old) if old.mtime_unix_s == current.mtime_unix_s => {
                    // Size and mtime agree: trust mtime, keep the cached
                    // checksum without reading the file.
                    next.insert(old.clone());
                }
                Some(old) => {
                    // Same size, different mtime: the checksum decides.
                    self.finish_checksum(&mut current);
                    if current.cached_checksum() != old.cached_checksum() {
                        changes.push(MonitorResult::new(EventKind::Modify, path));
                        next.insert(current);
                    } else {
                        next.insert(old.clone());
                    }
                }
            }
        }

        for path in prior.paths() {
            if !candidate_set.contains(path) {
                changes.push(MonitorResult::new(EventKind::Delete, path.clone()));
            }
        }

        if changes.is_empty() {
            info!("no changes detected");
            return Ok(());
        }
        info!(changes = changes.len(), "changes detected, running command");

        // Serialize the new database on the blocking pool while the child
        // runs; it is only promoted after a clean exit.
        let tmp_path = temp_path(&self.db_path);
        let write_task = tokio::task::spawn_blocking({
            let tmp_path = tmp_path.clone();
            move || next.write_to(&tmp_path)
        });

        if options.clear_screen {
            print!("\x1bc");
            let _ = std::io::stdout().flush();
        }
        let mut env = std::collections::HashMap::new();
        if options.export_env {
            env.insert(EVENT_ENV_VAR.to_string(), encode_change_set(&changes));
        }

        let mut child = supervisor
            .spawn(command, &env)
            .context("command spawn failed")?;
        let status = child.wait_with_timeout().await?;
        report_status(status, options.notify.as_deref());

        let written = write_task.await.context("database writer panicked")?;
        if let Err(err) = written {
            warn!(error = %err, "temp database write failed, database not advanced");
            let _ = fs::remove_file(&tmp_path);
            return Ok(());
        }

        if status.success() {
            match fs::rename(&tmp_path, &self.db_path) {
                Ok(()) => info!(db = %self.db_path.display(), "database advanced"),
                Err(err) => {
                    warn!(error = %err, "database rename failed, prior state left intact");
                    let _ = fs::remove_file(&tmp_path);
                }
            }
        } else {
            info!("command failed, database not advanced");
            let _ = fs::remove_file(&tmp_path);
        }
        Ok(())
    }

    /// Every file reachable under the roots (plus file roots themselves),
    /// filtered and relativized to the working directory. Iterative walk,
    /// root-only symlink policy as in the live monitor.
    fn scan(&self) -> Result<Vec<PathBuf>> {
        let mut queue: Vec<PathBuf> = Vec::new();
        let mut files: Vec<PathBuf> = Vec::new();

        for root in &self.roots {
            match fs::metadata(root) {
                Ok(meta) if meta.is_dir() => queue.push(root.clone()),
                Ok(meta) if meta.is_file() => files.push(root.clone()),
                Ok(_) => {}
                Err(err) => warn!(root = %root.display(), error = %err, "scan root unreadable, skipped"),
            }
        }

        while let Some(dir) = queue.pop() {
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
                match meta {
                    Ok(m) if m.is_dir() => queue.push(path),
                    Ok(m) if m.is_file() => files.push(path),
                    _ => {}
                }
            }
        }

        let mut out: Vec<PathBuf> = files
            .into_iter()
            .map(|p| self.relativize(p))
            .filter(|p| match p.to_str() {
                Some(s) => self.filter.matches(s),
                None => {
                    debug!("non-UTF-8 path skipped in scan");
                    false
                }
            })
            .collect();
        out.sort();
        out.dedup();
        Ok(out)
    }

    fn relativize(&self, path: PathBuf) -> PathBuf {
        match path.strip_prefix(&self.cwd) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => path,
        }
    }

    fn finish_checksum(&self, fp: &mut Fingerprint) {
        if let Err(err) = fp.checksum() {
            warn!(path = %fp.path.display(), error = %err, "checksum failed, recorded as 0");
            fp.set_checksum(0);
        }
    }
}

fn temp_path(db_path: &Path) -> PathBuf {
    let mut os = db_path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}
