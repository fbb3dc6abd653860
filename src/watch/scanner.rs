// src/watch/scanner.rs

//! Recursive "latest modification time" scanner.
//!
//! A scan walks the whole tree below the watch root and returns the largest
//! mtime it saw. Comparing the result against the previous scan is how the
//! supervisor detects changes; no OS notification service is involved.
//!
//! Results:
//! - `Ok(ts)`: the tree was observed. `Ok(0)` is a legitimate answer for an
//!   empty directory.
//! - `Err(ScanError)`: the root itself could not be stat'ed or listed.
//!
//! Problems below the root (entry deleted mid-scan, permission denied, path
//! too long) skip that entry only. Each such path is written to the log
//! buffer once and not again until it has recovered.
//!
//! Symlinks are followed. A directory reached a second time in one scan
//! (same [`FileId`]) is not descended into again, so link cycles cost one
//! stat per extra path.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::errors::ScanError;
use crate::fs::{EntryKind, FileId, FileSystem};
use crate::log_buffer::LogBuffer;
use crate::watch::path_utils::{exceeds_max_len, relative_str};
use crate::watch::patterns::ExcludeSet;

/// An entry that had to be left out of a scan.
#[derive(Debug, Clone)]
struct Skipped {
    path: PathBuf,
    reason: String,
}

/// State for one walk of the tree.
#[derive(Debug, Default)]
struct Walk {
    skipped: Vec<Skipped>,
    visited: HashSet<FileId>,
}

#[derive(Debug)]
pub struct ChangeWatcher<F: FileSystem> {
    fs: F,
    exclude: ExcludeSet,
    /// Paths whose failure has already been logged.
    reported: HashSet<PathBuf>,
}

impl<F: FileSystem> ChangeWatcher<F> {
    pub fn new(fs: F, exclude: ExcludeSet) -> Self {
        Self {
            fs,
            exclude,
            reported: HashSet::new(),
        }
    }

    /// Drop the record of already-reported paths, e.g. after the watch
    /// path changed.
    pub fn forget_reported(&mut self) {
        self.reported.clear();
    }

    /// Latest modification time under `root`, in nanoseconds since the epoch.
    pub fn latest_modified_time(
        &mut self,
        root: &Path,
        log: &mut LogBuffer,
    ) -> Result<u64, ScanError> {
        let meta = match self.fs.metadata(root) {
            Ok(meta) => meta,
            Err(cause) => {
                log.log(format_args!("failed to stat watch path {:?}: {:#}", root, cause));
                return Err(ScanError {
                    path: root.to_path_buf(),
                    cause,
                });
            }
        };

        if meta.kind == EntryKind::File {
            return Ok(meta.modified_ns);
        }

        let entries = match self.fs.read_dir(root) {
            Ok(entries) => entries,
            Err(cause) => {
                log.log(format_args!("failed to open watch directory {:?}: {:#}", root, cause));
                return Err(ScanError {
                    path: root.to_path_buf(),
                    cause,
                });
            }
        };

        let mut walk = Walk::default();
        if let Some(id) = meta.id {
            walk.visited.insert(id);
        }
        let mut latest = 0u64;
        for entry in entries {
            latest = latest.max(self.visit(root, &entry, &mut walk));
        }

        self.report_skipped(walk.skipped, log);
        trace!(?root, latest, "scan complete");
        Ok(latest)
    }

    fn visit(&self, root: &Path, path: &Path, walk: &mut Walk) -> u64 {
        if exceeds_max_len(path) {
            walk.skipped.push(Skipped {
                path: path.to_path_buf(),
                reason: "file path length too long".to_string(),
            });
            return 0;
        }

        if let Some(rel) = relative_str(root, path) {
            if self.exclude.is_excluded(&rel) {
                return 0;
            }
        }

        let meta = match self.fs.metadata(path) {
            Ok(meta) => meta,
            Err(e) => {
                walk.skipped.push(Skipped {
                    path: path.to_path_buf(),
                    reason: format!("{e:#}"),
                });
                return 0;
            }
        };

        if meta.kind == EntryKind::Dir {
            if let Some(id) = meta.id {
                if !walk.visited.insert(id) {
                    trace!(?path, "directory already scanned");
                    return 0;
                }
            }
        }

        match meta.kind {
            EntryKind::File => meta.modified_ns,
            EntryKind::Dir => match self.fs.read_dir(path) {
                Ok(children) => children
                    .iter()
                    .map(|child| self.visit(root, child, walk))
                    .max()
                    .unwrap_or(0),
                Err(e) => {
                    walk.skipped.push(Skipped {
                        path: path.to_path_buf(),
                        reason: format!("{e:#}"),
                    });
                    0
                }
            },
        }
    }

    fn report_skipped(&mut self, skipped: Vec<Skipped>, log: &mut LogBuffer) {
        let current: HashSet<PathBuf> = skipped.iter().map(|s| s.path.clone()).collect();
        self.reported.retain(|p| current.contains(p));

        for s in skipped {
            if self.reported.insert(s.path.clone()) {
                // Reason first: long paths get cut off at the line capacity.
                log.log(format_args!("skipping ({}): {:?}", s.reason, s.path));
            } else {
                debug!(path = ?s.path, "still skipping");
            }
        }
    }
}
