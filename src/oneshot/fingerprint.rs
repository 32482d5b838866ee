// src/oneshot/fingerprint.rs

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use blake3::Hasher;

/// What we remember about one file between one-shot invocations.
///
/// The checksum is computed lazily on first access and cached; a zero-byte
/// file has checksum 0 without a read. The mtime + size pair is the cheap
/// first-stage comparison, the checksum the authority under ambiguity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub path: PathBuf,
    pub mtime_unix_s: i64,
    pub size_bytes: u64,
    checksum: Option<u64>,
}

impl Fingerprint {
    /// Stat `path` without touching its contents.
    pub fn of(path: &Path) -> Result<Self> {
        let meta = std::fs::metadata(path)
            .with_context(|| format!("stat failed for {}", path.display()))?;
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Ok(Self {
            path: path.to_path_buf(),
            mtime_unix_s: mtime,
            size_bytes: meta.len(),
            checksum: None,
        })
    }

    /// Rehydrate a stored entry, checksum included.
    pub fn restored(path: PathBuf, mtime_unix_s: i64, size_bytes: u64, checksum: u64) -> Self {
        Self {
            path,
            mtime_unix_s,
            size_bytes,
            checksum: Some(checksum),
        }
    }

    pub fn cached_checksum(&self) -> Option<u64> {
        self.checksum
    }

    pub fn set_checksum(&mut self, sum: u64) {
        self.checksum = Some(sum);
    }

    /// The content checksum, reading the file on first access.
    pub fn checksum(&mut self) -> Result<u64> {
        if let Some(sum) = self.checksum {
            return Ok(sum);
        }
        let sum = if self.size_bytes == 0 {
            0
        } else {
            hash_file(&self.path)?
        };
        self.checksum = Some(sum);
        Ok(sum)
    }
}

/// 64-bit content hash: the low eight bytes of the blake3 digest.
pub fn hash_file(path: &Path) -> Result<u64> {
    let mut hasher = Hasher::new();
    let mut file =
        File::open(path).with_context(|| format!("opening {} for hashing", path.display()))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let digest = hasher.finalize();
    let bytes = digest.as_bytes();
    Ok(u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ]))
}
