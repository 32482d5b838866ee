// src/filter/ignore.rs

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::filter::GlobFilter;

/// Built-in ignore patterns, skipped with `--no-default-ignore`.
///
/// These are matched against the full event path, so the leading `*/` makes
/// them apply at any depth.
pub const DEFAULT_IGNORES: &[&str] = &[
    "*/.DS_Store",
    "*.py[co]",
    "*/#*#",
    "*/.#*",
    "*/.*.kate-swp",
    "*/.*.sw?",
    "*/.*.sw?x",
    "*/.git/*",
];

pub const GITIGNORE_FILE: &str = ".gitignore";

/// Parse a `.gitignore` into exclude patterns.
///
/// Line-based: blank lines and `#` comments are dropped, a trailing `/` is
/// stripped. Negation (`!`) is not supported; negated lines are dropped.
pub fn read_gitignore(path: &Path) -> Result<Vec<String>> {
    let file =
        File::open(path).with_context(|| format!("opening ignore file {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut patterns = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if trimmed.starts_with('!') {
            debug!(pattern = %trimmed, file = %path.display(), "negated ignore pattern unsupported, dropped");
            continue;
        }
        patterns.push(trimmed.trim_end_matches('/').to_string());
    }
    Ok(patterns)
}

/// Per-directory ignore filters, resolved by nearest ancestor.
///
/// Each layer is `(directory, filter)`; a path is checked against the layer
/// whose directory is its longest prefix, with the pattern match performed on
/// the path relative to that directory. Layers are independent, not
/// inherited: one `.gitignore`, one layer.
#[derive(Debug, Default)]
pub struct IgnoreLayers {
    layers: Vec<(PathBuf, GlobFilter)>,
}

impl IgnoreLayers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Register the `.gitignore` of `dir`, if it has one with any usable
    /// patterns.
    pub fn ingest_dir(&mut self, dir: &Path) -> Result<()> {
        let candidate = dir.join(GITIGNORE_FILE);
        if !candidate.is_file() {
            return Ok(());
        }
        let patterns = read_gitignore(&candidate)?;
        if patterns.is_empty() {
            return Ok(());
        }
        debug!(dir = %dir.display(), patterns = patterns.len(), "ignore layer added");
        self.push(dir.to_path_buf(), GlobFilter::new(&[], &patterns)?);
        Ok(())
    }

    pub fn push(&mut self, prefix: PathBuf, filter: GlobFilter) {
        self.layers.push((prefix, filter));
    }

    /// True unless the nearest-ancestor layer excludes `path`.
    pub fn accepts(&self, path: &Path) -> bool {
        let mut nearest: Option<(&PathBuf, &GlobFilter)> = None;
        for (prefix, filter) in &self.layers {
            if path.starts_with(prefix) && path != prefix.as_path() {
                match nearest {
                    Some((best, _)) if best.as_os_str().len() >= prefix.as_os_str().len() => {}
                    _ => nearest = Some((prefix, filter)),
                }
            }
        }

        let Some((prefix, filter)) = nearest else {
            return true;
        };
        let Ok(rel) = path.strip_prefix(prefix) else {
            return true;
        };
        match rel.to_str() {
            Some(rel) => filter.matches(rel),
            None => true,
        }
    }
}
