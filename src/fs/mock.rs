// src/fs/mock.rs

use super::{EntryKind, EntryMeta, FileId, FileSystem};
use anyhow::{anyhow, Result};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
enum MockEntry {
    File { modified_ns: u64 },
    Dir { modified_ns: u64 },
    /// Symlink to another mock path.
    Link { target: PathBuf },
}

/// Mirrors the usual ELOOP limit.
const MAX_LINK_HOPS: usize = 40;

#[derive(Debug, Default)]
struct MockState {
    entries: BTreeMap<PathBuf, MockEntry>,
    denied: HashSet<PathBuf>,
}

/// In-memory filesystem with explicit modification times.
///
/// Clones share state, so a test can keep one handle while the supervisor
/// owns another. Parent directories are created implicitly with mtime 0.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut state = self.lock();
        ensure_dir(&mut state, path.as_ref());
    }

    /// Create or update a file with the given modification time.
    pub fn add_file(&self, path: impl AsRef<Path>, modified_ns: u64) {
        let path = path.as_ref();
        let mut state = self.lock();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                ensure_dir(&mut state, parent);
            }
        }
        state
            .entries
            .insert(path.to_path_buf(), MockEntry::File { modified_ns });
    }

    /// Alias for [`add_file`](Self::add_file) that reads better in tests.
    pub fn touch(&self, path: impl AsRef<Path>, modified_ns: u64) {
        self.add_file(path, modified_ns);
    }

    /// Create a symlink at `path` pointing at the mock path `target`.
    pub fn link(&self, path: impl AsRef<Path>, target: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut state = self.lock();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                ensure_dir(&mut state, parent);
            }
        }
        state.entries.insert(
            path.to_path_buf(),
            MockEntry::Link {
                target: target.as_ref().to_path_buf(),
            },
        );
    }

    /// Remove a path and everything below it.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut state = self.lock();
        state.entries.retain(|p, _| !p.starts_with(path));
    }

    /// Make `metadata` and `read_dir` on `path` fail as if permission was
    /// denied.
    pub fn deny(&self, path: impl AsRef<Path>) {
        self.lock().denied.insert(path.as_ref().to_path_buf());
    }

    pub fn allow(&self, path: impl AsRef<Path>) {
        self.lock().denied.remove(path.as_ref());
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the state from the others.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn ensure_dir(state: &mut MockState, path: &Path) {
    let mut current = PathBuf::new();
    for component in path.components() {
        current.push(component);
        state
            .entries
            .entry(current.clone())
            .or_insert(MockEntry::Dir { modified_ns: 0 });
    }
}

/// Replace symlinked prefixes of `path` until none are left.
fn resolve(state: &MockState, path: &Path) -> Result<PathBuf> {
    let mut current = path.to_path_buf();
    for _ in 0..MAX_LINK_HOPS {
        let mut prefix = PathBuf::new();
        let mut hit = None;
        for component in current.components() {
            prefix.push(component);
            if let Some(MockEntry::Link { target }) = state.entries.get(&prefix) {
                hit = Some((prefix.clone(), target.clone()));
                break;
            }
        }
        let Some((link, target)) = hit else {
            return Ok(current);
        };
        let rest = current
            .strip_prefix(&link)
            .map(Path::to_path_buf)
            .unwrap_or_default();
        current = if rest.as_os_str().is_empty() {
            target
        } else {
            target.join(rest)
        };
    }
    Err(anyhow!("too many levels of symbolic links: {:?}", path))
}

impl FileSystem for MockFileSystem {
    fn metadata(&self, path: &Path) -> Result<EntryMeta> {
        let state = self.lock();
        if state.denied.contains(path) {
            return Err(anyhow!("permission denied: {:?}", path));
        }
        let real = resolve(&state, path)?;
        let (kind, modified_ns) = match state.entries.get(&real) {
            Some(MockEntry::File { modified_ns }) => (EntryKind::File, *modified_ns),
            Some(MockEntry::Dir { modified_ns }) => (EntryKind::Dir, *modified_ns),
            Some(MockEntry::Link { .. }) | None => {
                return Err(anyhow!("no such file or directory: {:?}", path));
            }
        };
        Ok(EntryMeta {
            kind,
            modified_ns,
            id: Some(FileId::from_canonical(&real)),
        })
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let state = self.lock();
        if state.denied.contains(path) {
            return Err(anyhow!("permission denied: {:?}", path));
        }
        let real = resolve(&state, path)?;
        match state.entries.get(&real) {
            Some(MockEntry::Dir { .. }) => Ok(state
                .entries
                .keys()
                .filter(|p| p.parent() == Some(real.as_path()))
                .filter_map(|p| p.file_name().map(|name| path.join(name)))
                .collect()),
            Some(MockEntry::File { .. }) => Err(anyhow!("not a directory: {:?}", path)),
            Some(MockEntry::Link { .. }) | None => {
                Err(anyhow!("no such file or directory: {:?}", path))
            }
        }
    }
}
