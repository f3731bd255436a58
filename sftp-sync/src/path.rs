//! Trailing-separator conventions for local and remote paths
//!
//! A trailing separator on the source of a tree operation selects
//! "contents only"; without one the directory itself takes part. Remote
//! paths are always `/`-separated, local paths use the platform separator.

use std::path::{Path, PathBuf, MAIN_SEPARATOR};

/// Separator used for every remote path
pub const REMOTE_SEPARATOR: char = '/';

/// Which part of a directory a tree operation acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeScope {
    /// Only the entries inside the directory
    ContentsOnly,
    /// The directory entry itself together with its contents
    WithDirectory,
}

impl TreeScope {
    /// Scope selected by a remote path
    pub fn of_remote(path: &str) -> Self {
        if has_trailing_separator(path) {
            Self::ContentsOnly
        } else {
            Self::WithDirectory
        }
    }

    /// Scope selected by a local path
    pub fn of_local(path: &Path) -> Self {
        if has_trailing_local_separator(path) {
            Self::ContentsOnly
        } else {
            Self::WithDirectory
        }
    }
}

/// Whether a remote path ends with `/`
pub fn has_trailing_separator(path: &str) -> bool {
    path.ends_with(REMOTE_SEPARATOR)
}

/// Whether a local path ends with `/` or the platform separator.
///
/// `Path` normalizes trailing separators away in its component view, so the
/// raw string form is inspected.
pub fn has_trailing_local_separator(path: &Path) -> bool {
    let raw = path.as_os_str().to_string_lossy();
    raw.ends_with(REMOTE_SEPARATOR) || raw.ends_with(MAIN_SEPARATOR)
}

/// Strip trailing `/` from a remote path, keeping a bare root intact
pub fn trim_remote(path: &str) -> &str {
    let trimmed = path.trim_end_matches(REMOTE_SEPARATOR);
    if trimmed.is_empty() && path.starts_with(REMOTE_SEPARATOR) {
        "/"
    } else {
        trimmed
    }
}

/// Strip trailing separators from a local path, keeping a bare root intact
pub fn trim_local(path: &Path) -> PathBuf {
    let raw = path.as_os_str().to_string_lossy();
    let trimmed = raw.trim_end_matches(|c| c == REMOTE_SEPARATOR || c == MAIN_SEPARATOR);
    if trimmed.is_empty() {
        if raw.is_empty() {
            PathBuf::new()
        } else {
            PathBuf::from(MAIN_SEPARATOR.to_string())
        }
    } else {
        PathBuf::from(trimmed)
    }
}

/// Join a remote directory and an entry name with `/`
pub fn join_remote(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else if has_trailing_separator(dir) {
        format!("{}{}", dir, name)
    } else {
        format!("{}{}{}", dir, REMOTE_SEPARATOR, name)
    }
}

/// Last component of a remote path, ignoring trailing `/`
pub fn remote_basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches(REMOTE_SEPARATOR);
    trimmed.rsplit(REMOTE_SEPARATOR).next().unwrap_or(trimmed)
}

/// Last component of a local path, ignoring trailing separators
pub fn local_basename(path: &Path) -> Option<String> {
    trim_local(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// `.` and `..` never take part in a walk
pub fn is_dot_entry(name: &str) -> bool {
    name == "." || name == ".."
}
