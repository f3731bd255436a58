//! Fault-injecting session used by the tree walk tests

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use crate::backend::LocalRemote;
use crate::error::{SessionError, SessionResult};
use crate::path::remote_basename;
use crate::session::{Connector, Handshake, RemoteFs};
use crate::{DirectorySync, SyncOptions};

/// Which requests the faulty session refuses or breaks on, matched by
/// entry name
#[derive(Debug, Clone, Default)]
pub(crate) struct Faults {
    /// Transfers and deletes of these names are refused
    pub refuse: HashSet<String>,
    /// Directory creation of these names is refused
    pub refuse_mkdir: HashSet<String>,
    /// Directory removal of these names is refused
    pub refuse_rmdir: HashSet<String>,
    /// Any request touching these names fails with a transport error
    pub disconnect: HashSet<String>,
}

impl Faults {
    pub fn refuse(mut self, name: &str) -> Self {
        self.refuse.insert(name.to_string());
        self
    }

    pub fn refuse_mkdir(mut self, name: &str) -> Self {
        self.refuse_mkdir.insert(name.to_string());
        self
    }

    pub fn refuse_rmdir(mut self, name: &str) -> Self {
        self.refuse_rmdir.insert(name.to_string());
        self
    }

    pub fn disconnect(mut self, name: &str) -> Self {
        self.disconnect.insert(name.to_string());
        self
    }
}

/// Connector handing out [`FaultyRemote`] sessions over a local root
#[derive(Clone)]
pub(crate) struct FaultyConnector {
    root: PathBuf,
    faults: Faults,
    leaf_calls: Arc<AtomicUsize>,
}

impl FaultyConnector {
    pub fn new(root: &Path, faults: Faults) -> Self {
        Self {
            root: root.to_path_buf(),
            faults,
            leaf_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter of mutating requests across all sessions
    pub fn leaf_calls(&self) -> Arc<AtomicUsize> {
        self.leaf_calls.clone()
    }
}

pub(crate) struct FaultyHandshake(FaultyConnector);

#[async_trait]
impl Connector for FaultyConnector {
    type Session = FaultyRemote;
    type Handshake = FaultyHandshake;

    async fn connect(&self, host: &str, port: u16) -> SessionResult<FaultyHandshake> {
        if host == "unreachable" {
            return Err(SessionError::Connect {
                host: host.to_string(),
                port,
                message: "connection refused".to_string(),
            });
        }
        Ok(FaultyHandshake(self.clone()))
    }
}

#[async_trait]
impl Handshake for FaultyHandshake {
    type Session = FaultyRemote;

    async fn authenticate(self, _user: &str, password: &str) -> SessionResult<Option<FaultyRemote>> {
        if password == "wrong" {
            return Ok(None);
        }
        let connector = self.0;
        Ok(Some(FaultyRemote {
            inner: LocalRemote::new(connector.root),
            faults: connector.faults,
            leaf_calls: connector.leaf_calls,
        }))
    }
}

/// Session over a local root that refuses or fails selected requests
pub(crate) struct FaultyRemote {
    inner: LocalRemote,
    faults: Faults,
    leaf_calls: Arc<AtomicUsize>,
}

impl FaultyRemote {
    fn check_link(&self, path: &str) -> SessionResult<()> {
        if self.faults.disconnect.contains(remote_basename(path)) {
            Err(SessionError::Ssh("connection reset by peer".to_string()))
        } else {
            Ok(())
        }
    }

    fn is_listed(set: &HashSet<String>, path: &str) -> bool {
        set.contains(remote_basename(path))
    }

    fn count_leaf(&self) {
        self.leaf_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteFs for FaultyRemote {
    async fn list_entries(&self, path: &str) -> SessionResult<Option<Vec<String>>> {
        self.check_link(path)?;
        self.inner.list_entries(path).await
    }

    async fn is_directory(&self, path: &str) -> SessionResult<bool> {
        self.check_link(path)?;
        self.inner.is_directory(path).await
    }

    async fn is_regular_file(&self, path: &str) -> SessionResult<bool> {
        self.check_link(path)?;
        self.inner.is_regular_file(path).await
    }

    async fn delete_file(&self, path: &str) -> SessionResult<bool> {
        self.check_link(path)?;
        self.count_leaf();
        if Self::is_listed(&self.faults.refuse, path) {
            return Ok(false);
        }
        self.inner.delete_file(path).await
    }

    async fn make_directory(&self, path: &str, recursive: bool) -> SessionResult<bool> {
        self.check_link(path)?;
        self.count_leaf();
        if Self::is_listed(&self.faults.refuse_mkdir, path) {
            return Ok(false);
        }
        self.inner.make_directory(path, recursive).await
    }

    async fn remove_directory(&self, path: &str) -> SessionResult<bool> {
        self.check_link(path)?;
        self.count_leaf();
        if Self::is_listed(&self.faults.refuse_rmdir, path) {
            return Ok(false);
        }
        self.inner.remove_directory(path).await
    }

    async fn rename_path(&self, old_path: &str, new_path: &str) -> SessionResult<bool> {
        self.check_link(old_path)?;
        self.count_leaf();
        self.inner.rename_path(old_path, new_path).await
    }

    async fn transfer_to_remote(&self, remote_path: &str, local_source: &Path) -> SessionResult<bool> {
        self.check_link(remote_path)?;
        self.count_leaf();
        if Self::is_listed(&self.faults.refuse, remote_path) {
            return Ok(false);
        }
        self.inner.transfer_to_remote(remote_path, local_source).await
    }

    async fn transfer_from_remote(&self, remote_path: &str, local_dest: &Path) -> SessionResult<bool> {
        self.check_link(remote_path)?;
        self.count_leaf();
        if Self::is_listed(&self.faults.refuse, remote_path) {
            return Ok(false);
        }
        self.inner.transfer_from_remote(remote_path, local_dest).await
    }

    async fn current_working_directory(&self) -> SessionResult<String> {
        self.inner.current_working_directory().await
    }
}

/// Temporary "remote" root and local working directory
pub(crate) struct Sandbox {
    pub remote: TempDir,
    pub local: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            remote: TempDir::new().unwrap(),
            local: TempDir::new().unwrap(),
        }
    }

    pub fn remote_path(&self, relative: &str) -> PathBuf {
        self.remote.path().join(relative)
    }

    pub fn local_path(&self, relative: &str) -> PathBuf {
        self.local.path().join(relative)
    }

    /// Logged-in façade over the remote root with the given faults
    pub async fn connect(&self, faults: Faults, options: SyncOptions) -> DirectorySync<FaultyConnector> {
        let connector = FaultyConnector::new(self.remote.path(), faults);
        let mut sync = DirectorySync::with_options(connector, options);
        sync.login("localhost", "tester", "secret", 22).await.unwrap();
        sync
    }
}

/// Write `contents` to `root/relative`, creating parents
pub(crate) fn write_file(root: &Path, relative: &str, contents: &[u8]) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

/// Relative paths of every file below `root`, sorted
pub(crate) fn list_tree(root: &Path) -> Vec<String> {
    fn visit(root: &Path, dir: &Path, out: &mut Vec<String>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                visit(root, &path, out);
            } else if let Ok(relative) = path.strip_prefix(root) {
                out.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
    }

    let mut files = Vec::new();
    visit(root, root, &mut files);
    files.sort();
    files
}
