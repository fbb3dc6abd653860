// src/fs/mod.rs

//! Filesystem seam used by the change watcher.
//!
//! The scanner only needs two primitives, `metadata` and `read_dir`, so the
//! trait stays small. [`RealFileSystem`] goes straight to `std::fs`;
//! [`mock::MockFileSystem`] lets tests drive modification times and inject
//! failures without sleeping on real clocks.

use std::collections::hash_map::DefaultHasher;
use std::fmt::Debug;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};

pub mod mock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Dir,
    /// Anything that is not a directory (regular files, fifos, sockets...).
    File,
}

/// Identity of the object a path resolves to, so two paths reaching the
/// same directory through symlinks compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId {
    pub dev: u64,
    pub ino: u64,
}

impl FileId {
    /// Identity derived from a canonical path, for platforms (and the mock)
    /// without device/inode numbers.
    pub fn from_canonical(path: &Path) -> Self {
        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        Self {
            dev: 0,
            ino: hasher.finish(),
        }
    }
}

/// What the scanner needs to know about one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMeta {
    pub kind: EntryKind,
    /// Modification time in nanoseconds since the Unix epoch.
    pub modified_ns: u64,
    /// `None` when the platform cannot tell.
    pub id: Option<FileId>,
}

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    /// Stat `path`, following symlinks.
    fn metadata(&self, path: &Path) -> Result<EntryMeta>;

    /// Return the entries of a directory as full paths.
    ///
    /// `.` and `..` are never included.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    fn exists(&self, path: &Path) -> bool {
        self.metadata(path).is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.metadata(path), Ok(m) if m.kind == EntryKind::Dir)
    }
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn metadata(&self, path: &Path) -> Result<EntryMeta> {
        let meta = fs::metadata(path).with_context(|| format!("stat {:?}", path))?;
        let modified = meta
            .modified()
            .with_context(|| format!("reading mtime of {:?}", path))?;
        let kind = if meta.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        };
        Ok(EntryMeta {
            kind,
            modified_ns: system_time_to_ns(modified),
            id: file_id(path, &meta),
        })
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {:?}", path))? {
            let entry = entry.with_context(|| format!("reading entry of {:?}", path))?;
            entries.push(entry.path());
        }
        Ok(entries)
    }
}

#[cfg(unix)]
fn file_id(_path: &Path, meta: &fs::Metadata) -> Option<FileId> {
    use std::os::unix::fs::MetadataExt;
    Some(FileId {
        dev: meta.dev(),
        ino: meta.ino(),
    })
}

#[cfg(not(unix))]
fn file_id(path: &Path, meta: &fs::Metadata) -> Option<FileId> {
    if !meta.is_dir() {
        return None;
    }
    fs::canonicalize(path)
        .ok()
        .map(|p| FileId::from_canonical(&p))
}

/// Convert a wall-clock time into nanoseconds since the epoch.
///
/// Times before the epoch clamp to 0, times past year 2554 clamp to
/// `u64::MAX`.
pub fn system_time_to_ns(time: SystemTime) -> u64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => u64::try_from(d.as_nanos()).unwrap_or(u64::MAX),
        Err(_) => 0,
    }
}
