// src/filter/glob.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Compiled include/exclude glob patterns.
///
/// A path is interesting iff at least one include pattern matches and no
/// exclude pattern matches. An empty include list is the universal pattern:
/// everything is included unless excluded.
///
/// Patterns are standard shell globs (`*`, `?`, `[..]`). `*` is allowed to
/// span path separators, so `*/.git/*` matches at any depth.
#[derive(Clone)]
pub struct GlobFilter {
    include: GlobSet,
    include_empty: bool,
    exclude: GlobSet,
    patterns: (Vec<String>, Vec<String>),
}

impl fmt::Debug for GlobFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobFilter")
            .field("include", &self.patterns.0)
            .field("exclude", &self.patterns.1)
            .finish()
    }
}

impl GlobFilter {
    /// Compile both pattern lists. An invalid pattern is a configuration
    /// error and aborts startup.
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include: build_globset(include).context("compiling include patterns")?,
            include_empty: include.is_empty(),
            exclude: build_globset(exclude).context("compiling exclude patterns")?,
            patterns: (include.to_vec(), exclude.to_vec()),
        })
    }

    /// A filter that matches everything.
    pub fn universal() -> Self {
        Self {
            include: GlobSet::empty(),
            include_empty: true,
            exclude: GlobSet::empty(),
            patterns: (Vec::new(), Vec::new()),
        }
    }

    /// Returns true if `path` passes the filter: included (or the include
    /// list is empty) and not excluded.
    pub fn matches(&self, path: &str) -> bool {
        if !self.include_empty && !self.include.is_match(path) {
            return false;
        }
        !self.exclude.is_match(path)
    }

    /// Directory variant: only the exclude side is consulted.
    ///
    /// Include patterns select the *files* the operator cares about; a
    /// directory that matches no include must still be descended into so
    /// those files can be seen.
    pub fn accepts_dir(&self, path: &str) -> bool {
        !self.exclude.is_match(path)
    }

    pub fn include_patterns(&self) -> &[String] {
        &self.patterns.0
    }

    pub fn exclude_patterns(&self) -> &[String] {
        &self.patterns.1
    }
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
