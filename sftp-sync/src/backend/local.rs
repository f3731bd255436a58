//! Local-directory backend
//!
//! Serves a directory on this machine through the same session capability
//! as a real server. Remote paths resolve below the root; `..` never climbs
//! above it. Any filesystem error on the served side counts as the server
//! refusing the request.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::error::{SessionError, SessionResult};
use crate::session::{Connector, Handshake, RemoteFs};

/// Connector for a local directory tree
#[derive(Debug, Clone)]
pub struct LocalConnector {
    root: PathBuf,
    credentials: Option<(String, String)>,
}

impl LocalConnector {
    /// Serve `root`, accepting any credentials
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            credentials: None,
        }
    }

    /// Only accept `user` with `password`
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((user.into(), password.into()));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl Connector for LocalConnector {
    type Session = LocalRemote;
    type Handshake = LocalHandshake;

    async fn connect(&self, host: &str, port: u16) -> SessionResult<LocalHandshake> {
        let is_dir = fs::metadata(&self.root).await.map(|m| m.is_dir()).unwrap_or(false);
        if !is_dir {
            return Err(SessionError::Connect {
                host: host.to_string(),
                port,
                message: format!("'{}' is not a directory", self.root.display()),
            });
        }

        Ok(LocalHandshake {
            root: self.root.clone(),
            credentials: self.credentials.clone(),
        })
    }
}

pub struct LocalHandshake {
    root: PathBuf,
    credentials: Option<(String, String)>,
}

#[async_trait]
impl Handshake for LocalHandshake {
    type Session = LocalRemote;

    async fn authenticate(self, user: &str, password: &str) -> SessionResult<Option<LocalRemote>> {
        if let Some((expected_user, expected_password)) = &self.credentials {
            if expected_user != user || expected_password != password {
                return Ok(None);
            }
        }
        Ok(Some(LocalRemote::new(self.root)))
    }
}

/// Session over a local directory tree
#[derive(Debug, Clone)]
pub struct LocalRemote {
    root: PathBuf,
}

impl LocalRemote {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a remote path below the root
    pub fn resolve(&self, remote_path: &str) -> PathBuf {
        let mut relative = PathBuf::new();
        for component in Path::new(remote_path).components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::ParentDir => {
                    relative.pop();
                }
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            }
        }
        self.root.join(relative)
    }
}

fn refused(operation: &str, path: &Path, result: std::io::Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            debug!(operation, path = %path.display(), error = %e, "Local request refused");
            false
        }
    }
}

#[async_trait]
impl RemoteFs for LocalRemote {
    async fn list_entries(&self, path: &str) -> SessionResult<Option<Vec<String>>> {
        let Ok(mut reader) = fs::read_dir(self.resolve(path)).await else {
            return Ok(None);
        };

        let mut names = vec![".".to_string(), "..".to_string()];
        while let Some(entry) = reader.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(Some(names))
    }

    async fn is_directory(&self, path: &str) -> SessionResult<bool> {
        Ok(fs::metadata(self.resolve(path)).await.map(|m| m.is_dir()).unwrap_or(false))
    }

    async fn is_regular_file(&self, path: &str) -> SessionResult<bool> {
        Ok(fs::metadata(self.resolve(path)).await.map(|m| m.is_file()).unwrap_or(false))
    }

    async fn delete_file(&self, path: &str) -> SessionResult<bool> {
        let target = self.resolve(path);
        Ok(refused("delete", &target, fs::remove_file(&target).await))
    }

    async fn make_directory(&self, path: &str, recursive: bool) -> SessionResult<bool> {
        let target = self.resolve(path);
        if target == self.root {
            return Ok(false);
        }
        if recursive {
            if let Some(parent) = target.parent() {
                // The result of the last component decides
                if let Err(e) = fs::create_dir_all(parent).await {
                    debug!(path = %parent.display(), error = %e, "Could not create parent directories");
                }
            }
        }
        Ok(refused("mkdir", &target, fs::create_dir(&target).await))
    }

    async fn remove_directory(&self, path: &str) -> SessionResult<bool> {
        let target = self.resolve(path);
        if target == self.root {
            return Ok(false);
        }
        Ok(refused("rmdir", &target, fs::remove_dir(&target).await))
    }

    async fn rename_path(&self, old_path: &str, new_path: &str) -> SessionResult<bool> {
        let source = self.resolve(old_path);
        let result = fs::rename(&source, self.resolve(new_path)).await;
        Ok(refused("rename", &source, result))
    }

    async fn transfer_to_remote(&self, remote_path: &str, local_source: &Path) -> SessionResult<bool> {
        let target = self.resolve(remote_path);
        let result = fs::copy(local_source, &target).await.map(|_| ());
        Ok(refused("upload", &target, result))
    }

    async fn transfer_from_remote(&self, remote_path: &str, local_dest: &Path) -> SessionResult<bool> {
        let source = self.resolve(remote_path);
        if !fs::metadata(&source).await.map(|m| m.is_file()).unwrap_or(false) {
            return Ok(false);
        }
        let result = fs::copy(&source, local_dest).await.map(|_| ());
        Ok(refused("download", &source, result))
    }

    async fn current_working_directory(&self) -> SessionResult<String> {
        Ok("/".to_string())
    }
}
