// src/watch/path_utils.rs

//! Utility functions for path handling in the scanner.

use std::path::Path;

/// Longest path, in bytes, the scanner will descend into.
pub const MAX_PATH_LEN: usize = 2048;

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Returns `None` if `path` is not below `root`. The scanner builds every
/// path by joining onto `root`, so no canonicalisation is attempted here.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(root)
        .ok()
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
}

/// True if `path` is too long to be scanned.
pub fn exceeds_max_len(path: &Path) -> bool {
    path.as_os_str().len() >= MAX_PATH_LEN
}
