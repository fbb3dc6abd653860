// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Compiled `exclude` globs.
///
/// Patterns are matched against paths relative to the watch root, using
/// forward slashes (e.g. `"target/debug/app"`). A directory that matches is
/// skipped together with everything below it.
#[derive(Clone)]
pub struct ExcludeSet {
    patterns: Vec<String>,
    set: Option<GlobSet>,
}

impl fmt::Debug for ExcludeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExcludeSet")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl Default for ExcludeSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl ExcludeSet {
    /// A set that excludes nothing.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            set: None,
        }
    }

    pub fn new(patterns: &[String]) -> Result<Self> {
        if patterns.is_empty() {
            return Ok(Self::empty());
        }
        let set = build_globset(patterns).context("building exclude globset")?;
        Ok(Self {
            patterns: patterns.to_vec(),
            set: Some(set),
        })
    }

    pub fn is_excluded(&self, rel_path: &str) -> bool {
        match &self.set {
            Some(set) => set.is_match(rel_path),
            None => false,
        }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_excludes_nothing() {
        let set = ExcludeSet::empty();
        assert!(!set.is_excluded("anything"));
        assert!(!set.is_excluded(""));
    }

    #[test]
    fn matches_relative_paths() -> Result<()> {
        let set = ExcludeSet::new(&["target".to_string(), "**/*.swp".to_string()])?;
        assert!(set.is_excluded("target"));
        assert!(set.is_excluded("src/.main.rs.swp"));
        assert!(!set.is_excluded("src/main.rs"));
        Ok(())
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        assert!(ExcludeSet::new(&["a[".to_string()]).is_err());
    }
}
