// src/errors.rs

//! Crate-wide error types.
//!
//! Most of the crate propagates `anyhow::Result`; the one place that needs a
//! structured taxonomy is the event source, where the monitor decides per
//! call whether a failure is worth skipping a subtree over.

use std::io;

pub use anyhow::{Error, Result};

/// Failure modes of the native event source.
///
/// None of these are fatal to the source itself. `NoSpace` means the kernel
/// watch quota is exhausted, `NotFound` that the target vanished before
/// registration, `Permission` that the target is not readable by us.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("watch quota exhausted (fs.inotify.max_user_watches)")]
    NoSpace,

    #[error("watch target vanished before registration")]
    NotFound,

    #[error("permission denied on watch target")]
    Permission,

    #[error("event source I/O error: {0}")]
    Io(io::Error),
}

impl SourceError {
    /// Classify an I/O error by errno.
    pub fn classify(err: io::Error) -> Self {
        match err.raw_os_error() {
            Some(libc::ENOSPC) => SourceError::NoSpace,
            Some(libc::ENOENT) => SourceError::NotFound,
            Some(libc::EACCES) => SourceError::Permission,
            _ => SourceError::Io(err),
        }
    }
}
