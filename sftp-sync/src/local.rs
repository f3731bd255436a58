//! Local filesystem checks used before writing into a local tree

use std::path::Path;

use tokio::fs;

/// Whether `path` is an existing directory this process may create entries in
pub async fn is_writable_dir(path: &Path) -> bool {
    match fs::metadata(path).await {
        Ok(metadata) if metadata.is_dir() => can_write(path, &metadata),
        _ => false,
    }
}

/// Whether `path` is an existing directory, following symlinks
pub async fn is_dir(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false)
}

#[cfg(unix)]
fn can_write(path: &Path, _metadata: &std::fs::Metadata) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Ok(path_cstr) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    // Checks the real uid and gid, including ACLs and read-only mounts
    unsafe { libc::access(path_cstr.as_ptr(), libc::W_OK | libc::X_OK) == 0 }
}

#[cfg(not(unix))]
fn can_write(_path: &Path, metadata: &std::fs::Metadata) -> bool {
    !metadata.permissions().readonly()
}

/// Superuser access checks pass regardless of mode bits
#[cfg(all(test, unix))]
pub(crate) fn running_as_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}
