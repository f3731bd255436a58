//! `DirectorySync`: single-file and directory-tree operations over one
//! authenticated session

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ErrorPolicy, SyncOptions};
use crate::error::{SessionError, SessionResult, SyncError, SyncResult};
use crate::metrics::{TreeOperation, TreeStats};
use crate::path::is_dot_entry;
use crate::session::{Connector, Handshake, RemoteFs};
use crate::walk::TreeWalker;

/// Façade owning at most one live session produced by its connector.
///
/// Every operation takes `&mut self`; one instance serves one caller at a
/// time. Use separate instances, and so separate sessions, for concurrent
/// work.
pub struct DirectorySync<C: Connector> {
    connector: C,
    session: Option<C::Session>,
    options: SyncOptions,
    cancel: CancellationToken,
    last_stats: TreeStats,
}

impl<C: Connector> DirectorySync<C> {
    /// Create an unauthenticated façade with default options
    pub fn new(connector: C) -> Self {
        Self::with_options(connector, SyncOptions::default())
    }

    pub fn with_options(connector: C, options: SyncOptions) -> Self {
        Self {
            connector,
            session: None,
            options,
            cancel: CancellationToken::new(),
            last_stats: TreeStats::new(),
        }
    }

    /// Use `token` to stop running tree operations
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token checked before every leaf operation of a tree walk
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Statistics of the most recent tree operation
    pub fn last_stats(&self) -> &TreeStats {
        &self.last_stats
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Connect and authenticate, replacing any live session.
    ///
    /// Under [`ErrorPolicy::Lenient`] a failed login is logged and the
    /// façade stays unauthenticated; check [`is_connected`](Self::is_connected).
    pub async fn login(
        &mut self,
        server: &str,
        user: &str,
        password: &str,
        port: u16,
    ) -> SyncResult<&mut Self> {
        self.logout().await;

        match self.open_session(server, user, password, port).await {
            Ok(session) => {
                info!(server, port, user, "Logged in");
                self.session = Some(session);
            }
            Err(source) => {
                let err = SyncError::login_error(server, port, source);
                match self.options.error_policy {
                    ErrorPolicy::Strict => return Err(err),
                    ErrorPolicy::Lenient => warn!(error = %err, "Login failed"),
                }
            }
        }

        Ok(self)
    }

    /// Log in and report whether a session was established
    pub async fn test(&mut self, server: &str, user: &str, password: &str, port: u16) -> SyncResult<bool> {
        Ok(self.login(server, user, password, port).await?.is_connected())
    }

    /// Close the live session, if any
    pub async fn logout(&mut self) {
        if let Some(session) = self.session.take() {
            if let Err(e) = session.close().await {
                debug!(error = %e, "Error while closing session");
            }
        }
    }

    async fn open_session(
        &self,
        server: &str,
        user: &str,
        password: &str,
        port: u16,
    ) -> SessionResult<C::Session> {
        debug!("Connecting to {}:{}", server, port);
        let handshake = self.connector.connect(server, port).await?;
        handshake
            .authenticate(user, password)
            .await?
            .ok_or_else(|| SessionError::AuthenticationRejected { user: user.to_string() })
    }

    fn session(&self) -> SyncResult<&C::Session> {
        self.session.as_ref().ok_or(SyncError::NotConnected)
    }

    /// Apply the error policy to a finished operation
    fn settle<T>(&mut self, result: SyncResult<T>, fallback: T) -> SyncResult<T> {
        let err = match result {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if err.session_error().is_some_and(SessionError::is_connection_error) {
            warn!(error = %err, "Session lost, login required");
            self.session = None;
        }

        if err.is_fatal() || self.options.error_policy == ErrorPolicy::Strict {
            return Err(err);
        }

        warn!(error = %err, "Operation failed");
        Ok(fallback)
    }

    fn finish_tree(&mut self, mut stats: TreeStats, result: SyncResult<bool>) -> SyncResult<bool> {
        stats.complete(matches!(result, Ok(true)));
        self.last_stats = stats;
        self.settle(result, false)
    }

    /// Whether `path` exists and is a regular file
    pub async fn is_file(&mut self, path: &str) -> SyncResult<bool> {
        let result = self
            .session()?
            .is_regular_file(path)
            .await
            .map_err(|e| SyncError::file_error("is_file", path, e));
        self.settle(result, false)
    }

    /// Delete a regular file. Missing paths and directories yield `false`.
    pub async fn delete(&mut self, path: &str) -> SyncResult<bool> {
        let session = self.session()?;
        let result = async {
            if !session.is_regular_file(path).await? {
                return Ok(false);
            }
            session.delete_file(path).await
        }
        .await
        .map_err(|e| SyncError::file_error("delete", path, e));
        self.settle(result, false)
    }

    /// Remove a remote tree.
    ///
    /// With a trailing `/` only the contents of `remote_path` are removed;
    /// without one the directory itself goes too, and only once its
    /// contents are gone.
    pub async fn rmdir(&mut self, remote_path: &str) -> SyncResult<bool> {
        let session = self.session()?;
        info!(path = remote_path, "Removing remote tree");

        let mut stats = TreeStats::start(TreeOperation::Remove);
        let result = TreeWalker::new(session, &self.cancel, &mut stats)
            .remove_tree(remote_path)
            .await
            .map_err(|e| {
                wrap_tree_error(e, |source| SyncError::DirectoryRemovalFailed {
                    path: remote_path.to_string(),
                    source,
                })
            });
        self.finish_tree(stats, result)
    }

    /// Upload a local tree.
    ///
    /// Without a trailing separator `local_path` itself is recreated below
    /// `remote_path`; with one only its contents are uploaded into
    /// `remote_path`.
    pub async fn upload_dir(&mut self, local_path: impl AsRef<Path>, remote_path: &str) -> SyncResult<bool> {
        let local_path = local_path.as_ref();
        let session = self.session()?;
        info!(local = %local_path.display(), remote = remote_path, "Uploading tree");

        let mut stats = TreeStats::start(TreeOperation::Upload);
        let result = TreeWalker::new(session, &self.cancel, &mut stats)
            .upload_tree(local_path, remote_path)
            .await
            .map_err(|e| {
                wrap_tree_error(e, |source| SyncError::DirectoryUploadFailed {
                    local: local_path.to_path_buf(),
                    remote: remote_path.to_string(),
                    source,
                })
            });
        self.finish_tree(stats, result)
    }

    /// Download a remote tree into the existing, writable `local_dir`.
    ///
    /// Without a trailing `/` the remote directory itself is recreated below
    /// `local_dir`; with one only its contents are downloaded.
    pub async fn download_dir(&mut self, remote_dir: &str, local_dir: impl AsRef<Path>) -> SyncResult<bool> {
        let local_dir = local_dir.as_ref();
        let session = self.session()?;
        info!(remote = remote_dir, local = %local_dir.display(), "Downloading tree");

        let mut stats = TreeStats::start(TreeOperation::Download);
        let result = TreeWalker::new(session, &self.cancel, &mut stats)
            .download_tree(remote_dir, local_dir)
            .await
            .map_err(|e| {
                wrap_tree_error(e, |source| SyncError::DirectoryDownloadFailed {
                    remote: remote_dir.to_string(),
                    local: local_dir.to_path_buf(),
                    source,
                })
            });
        self.finish_tree(stats, result)
    }

    /// Download one remote file to `local_file`
    pub async fn download(&mut self, remote_file: &str, local_file: impl AsRef<Path>) -> SyncResult<bool> {
        let result = self
            .session()?
            .transfer_from_remote(remote_file, local_file.as_ref())
            .await
            .map_err(|e| SyncError::file_error("download", remote_file, e));
        self.settle(result, false)
    }

    /// Download one remote file and return its bytes, `None` if the server
    /// refused the transfer
    pub async fn download_contents(&mut self, remote_file: &str) -> SyncResult<Option<Vec<u8>>> {
        let result = read_via_scratch(self.session()?, remote_file)
            .await
            .map_err(|e| SyncError::file_error("download", remote_file, e));
        self.settle(result, None)
    }

    pub async fn rename(&mut self, old_path: &str, new_path: &str) -> SyncResult<bool> {
        let result = self
            .session()?
            .rename_path(old_path, new_path)
            .await
            .map_err(|e| SyncError::file_error("rename", old_path, e));
        self.settle(result, false)
    }

    /// Create a directory and its missing parents
    pub async fn mkdir(&mut self, path: &str) -> SyncResult<bool> {
        let result = self
            .session()?
            .make_directory(path, true)
            .await
            .map_err(|e| SyncError::file_error("mkdir", path, e));
        self.settle(result, false)
    }

    /// Create or overwrite a remote file holding `content`
    pub async fn touch(&mut self, path: &str, content: impl AsRef<[u8]>) -> SyncResult<bool> {
        let result = write_via_scratch(self.session()?, path, content.as_ref())
            .await
            .map_err(|e| SyncError::file_error("touch", path, e));
        self.settle(result, false)
    }

    /// Upload one local file to `remote_file`
    pub async fn upload(&mut self, local_file: impl AsRef<Path>, remote_file: &str) -> SyncResult<bool> {
        let result = self
            .session()?
            .transfer_to_remote(remote_file, local_file.as_ref())
            .await
            .map_err(|e| SyncError::file_error("upload", remote_file, e));
        self.settle(result, false)
    }

    /// Entry names of `path` without `.` and `..`. A missing directory lists
    /// as empty.
    pub async fn scan_dir(&mut self, path: &str) -> SyncResult<Vec<String>> {
        let result = self
            .session()?
            .list_entries(path)
            .await
            .map(|entries| {
                entries
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|name| !is_dot_entry(name))
                    .collect()
            })
            .map_err(|e| SyncError::file_error("scan_dir", path, e));
        self.settle(result, Vec::new())
    }

    /// Names of every regular file below `path`, depth first
    pub async fn all_files(&mut self, path: &str) -> SyncResult<Vec<String>> {
        let session = self.session()?;
        let mut stats = TreeStats::new();
        let result = TreeWalker::new(session, &self.cancel, &mut stats)
            .collect_files(path.to_string())
            .await;
        self.settle(result, Vec::new())
    }

    /// Working directory the server assigned to the session. Empty under the
    /// lenient policy when the server cannot tell.
    pub async fn pwd(&mut self) -> SyncResult<String> {
        let result = self
            .session()?
            .current_working_directory()
            .await
            .map_err(|e| SyncError::file_error("pwd", ".", e));
        self.settle(result, String::new())
    }
}

/// Wrap a walk error into its tree-level kind; fatal errors pass through
fn wrap_tree_error(err: SyncError, wrap: impl FnOnce(Box<SyncError>) -> SyncError) -> SyncError {
    if err.is_fatal() {
        err
    } else {
        wrap(Box::new(err))
    }
}

/// Stage `content` in a scratch file and upload it. The scratch file is
/// removed when this returns.
async fn write_via_scratch<S: RemoteFs>(session: &S, remote_path: &str, content: &[u8]) -> SessionResult<bool> {
    let scratch = tempfile::NamedTempFile::new()?.into_temp_path();
    tokio::fs::write(&scratch, content).await?;
    let uploaded = session.transfer_to_remote(remote_path, &scratch).await;
    release_scratch(scratch);
    uploaded
}

/// Download into a scratch file and read it back
async fn read_via_scratch<S: RemoteFs>(session: &S, remote_path: &str) -> SessionResult<Option<Vec<u8>>> {
    let scratch = tempfile::NamedTempFile::new()?.into_temp_path();
    let contents = match session.transfer_from_remote(remote_path, &scratch).await {
        Ok(true) => tokio::fs::read(&scratch).await.map(Some).map_err(SessionError::from),
        Ok(false) => Ok(None),
        Err(e) => Err(e),
    };
    release_scratch(scratch);
    contents
}

fn release_scratch(scratch: tempfile::TempPath) {
    if let Err(e) = scratch.close() {
        debug!(error = %e, "Failed to remove scratch file");
    }
}
