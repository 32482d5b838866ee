// src/oneshot/db.rs

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::oneshot::fingerprint::Fingerprint;

/// On-disk shape. All numeric members are strings; paths are relative to
/// the working directory.
#[derive(Debug, Serialize, Deserialize)]
struct DbRecord {
    files: Vec<DbEntry>,
    cmd: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DbEntry {
    p: String,
    t: String,
    s: String,
    c: String,
}

/// The persisted fingerprint database: path → fingerprint, plus the
/// canonical command the fingerprints belong to.
#[derive(Debug, Default)]
pub struct FileDb {
    entries: BTreeMap<PathBuf, Fingerprint>,
    cmd: Vec<String>,
}

impl FileDb {
    pub fn new(cmd: Vec<String>) -> Self {
        Self {
            entries: BTreeMap::new(),
            cmd,
        }
    }

    /// Read the database at `path`. A missing file is an empty prior state;
    /// a malformed one is logged and treated the same.
    pub fn load(path: &Path) -> Self {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(db = %path.display(), "no prior database, starting empty");
                return Self::default();
            }
            Err(err) => {
                warn!(db = %path.display(), error = %err, "database unreadable, starting empty");
                return Self::default();
            }
        };

        let record: DbRecord = match serde_json::from_slice(&bytes) {
            Ok(record) => record,
            Err(err) => {
                warn!(db = %path.display(), error = %err, "malformed database, starting empty");
                return Self::default();
            }
        };

        let mut db = Self::new(record.cmd);
        for entry in record.files {
            let (Ok(t), Ok(s), Ok(c)) = (
                entry.t.parse::<i64>(),
                entry.s.parse::<u64>(),
                entry.c.parse::<u64>(),
            ) else {
                debug!(path = %entry.p, "unparseable database entry skipped");
                continue;
            };
            let path = PathBuf::from(entry.p);
            db.entries
                .insert(path.clone(), Fingerprint::restored(path, t, s, c));
        }
        db
    }

    pub fn cmd(&self) -> &[String] {
        &self.cmd
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &Path) -> Option<&Fingerprint> {
        self.entries.get(path)
    }

    pub fn insert(&mut self, fp: Fingerprint) {
        self.entries.insert(fp.path.clone(), fp);
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.entries.keys()
    }

    /// Serialize and write to `path`. Entries without a cached checksum get
    /// one computed here, so the stored record is always complete.
    pub fn write_to(mut self, path: &Path) -> Result<()> {
        let mut files = Vec::with_capacity(self.entries.len());
        for fp in self.entries.values_mut() {
            let sum = fp.checksum().with_context(|| {
                format!("computing checksum for {}", fp.path.display())
            })?;
            files.push(DbEntry {
                p: fp.path.display().to_string(),
                t: fp.mtime_unix_s.to_string(),
                s: fp.size_bytes.to_string(),
                c: sum.to_string(),
            });
        }
        let record = DbRecord {
            files,
            cmd: self.cmd.clone(),
        };

        let bytes = serde_json::to_vec(&record).context("serializing database")?;
        fs::write(path, bytes).with_context(|| format!("writing database {}", path.display()))?;
        Ok(())
    }
}
