//! Depth-first tree walks over a borrowed session
//!
//! Each walk visits one directory level at a time and folds the per-entry
//! results into a [`TransferOutcome`]. A refused leaf operation only lowers
//! the succeeded count; a session fault or a directory that cannot be
//! created aborts the whole walk with an error.

use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::local;
use crate::metrics::{LeafOperation, TreeStats};
use crate::outcome::TransferOutcome;
use crate::path::{
    is_dot_entry, join_remote, local_basename, remote_basename, trim_local, trim_remote, TreeScope,
};
use crate::session::RemoteFs;

/// Walks remote and local trees using one session
pub(crate) struct TreeWalker<'a, S: RemoteFs> {
    session: &'a S,
    cancel: &'a CancellationToken,
    stats: &'a mut TreeStats,
}

impl<'a, S: RemoteFs> TreeWalker<'a, S> {
    pub(crate) fn new(session: &'a S, cancel: &'a CancellationToken, stats: &'a mut TreeStats) -> Self {
        Self {
            session,
            cancel,
            stats,
        }
    }

    /// Checked before every leaf operation
    fn check_cancelled(&self) -> SyncResult<()> {
        if self.cancel.is_cancelled() {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Remove a remote tree, or only its contents when `remote_path` ends
    /// with `/`
    pub(crate) async fn remove_tree(&mut self, remote_path: &str) -> SyncResult<bool> {
        let scope = TreeScope::of_remote(remote_path);
        let target = trim_remote(remote_path).to_string();

        if !self.clean_dir(target.clone()).await?.is_complete() {
            return Ok(false);
        }

        match scope {
            TreeScope::ContentsOnly => Ok(true),
            TreeScope::WithDirectory => {
                self.check_cancelled()?;
                let removed = self
                    .session
                    .remove_directory(&target)
                    .await
                    .map_err(|e| SyncError::removal_error(&target, e))?;
                self.stats.record(LeafOperation::RemoveDirectory, removed);
                Ok(removed)
            }
        }
    }

    /// Delete everything below `remote_dir`, leaving the directory itself
    pub(crate) fn clean_dir(&mut self, remote_dir: String) -> BoxFuture<'_, SyncResult<TransferOutcome>> {
        Box::pin(async move {
            let mut outcome = TransferOutcome::new();

            let entries = self
                .session
                .list_entries(&remote_dir)
                .await
                .map_err(|e| SyncError::removal_error(&remote_dir, e))?
                .unwrap_or_default();

            for name in entries.iter().filter(|name| !is_dot_entry(name)) {
                let child = join_remote(&remote_dir, name);
                let is_dir = self
                    .session
                    .is_directory(&child)
                    .await
                    .map_err(|e| SyncError::removal_error(&child, e))?;

                if is_dir {
                    // Removal is attempted even when the nested clean left
                    // entries behind; the refused rmdir then counts as the
                    // failure for this level.
                    self.clean_dir(child.clone()).await?;

                    self.check_cancelled()?;
                    let removed = self
                        .session
                        .remove_directory(&child)
                        .await
                        .map_err(|e| SyncError::removal_error(&child, e))?;
                    debug!(path = %child, removed, "Removed remote directory");
                    self.stats.record(LeafOperation::RemoveDirectory, removed);
                    outcome.record(removed);
                } else {
                    self.check_cancelled()?;
                    let deleted = self
                        .session
                        .delete_file(&child)
                        .await
                        .map_err(|e| SyncError::removal_error(&child, e))?;
                    debug!(path = %child, deleted, "Deleted remote file");
                    self.stats.record(LeafOperation::Delete, deleted);
                    outcome.record(deleted);
                }
            }

            Ok(outcome)
        })
    }

    /// Upload `local_path` below `remote_path`.
    ///
    /// Without a trailing separator on `local_path` the directory itself is
    /// mirrored as `remote_path/<basename>`; with one, its contents land
    /// directly in `remote_path`.
    pub(crate) async fn upload_tree(&mut self, local_path: &Path, remote_path: &str) -> SyncResult<bool> {
        let remote_root = trim_remote(remote_path).to_string();
        let local_root = trim_local(local_path);

        let target = match TreeScope::of_local(local_path) {
            TreeScope::ContentsOnly => remote_root,
            TreeScope::WithDirectory => {
                let Some(name) = local_basename(local_path) else {
                    return Ok(self.upload_all(local_root, remote_root).await?.is_complete());
                };
                let dir = join_remote(&remote_root, &name);

                self.check_cancelled()?;
                // Refusal here usually means the directory already exists
                let created = self
                    .session
                    .make_directory(&dir, false)
                    .await
                    .map_err(|e| SyncError::upload_error(&dir, e))?;
                if created {
                    self.stats.record(LeafOperation::CreateDirectory, true);
                }
                dir
            }
        };

        let is_dir = self
            .session
            .is_directory(&target)
            .await
            .map_err(|e| SyncError::upload_error(&target, e))?;
        if !is_dir {
            debug!(path = %target, "Remote upload target is not a directory");
            return Ok(false);
        }

        Ok(self.upload_all(local_root, target).await?.is_complete())
    }

    /// Mirror the contents of `local_dir` into `remote_dir`, creating
    /// `remote_dir` when it is missing
    pub(crate) fn upload_all(
        &mut self,
        local_dir: PathBuf,
        remote_dir: String,
    ) -> BoxFuture<'_, SyncResult<TransferOutcome>> {
        Box::pin(async move {
            let exists = self
                .session
                .is_directory(&remote_dir)
                .await
                .map_err(|e| SyncError::upload_error(&remote_dir, e))?;
            if !exists {
                self.check_cancelled()?;
                let created = self
                    .session
                    .make_directory(&remote_dir, false)
                    .await
                    .map_err(|e| SyncError::upload_error(&remote_dir, e))?;
                self.stats.record(LeafOperation::CreateDirectory, created);
                if !created {
                    return Err(SyncError::RemoteDirectoryUnavailable { path: remote_dir });
                }
            }

            let mut outcome = TransferOutcome::new();

            for name in read_local_names(&local_dir, &remote_dir).await? {
                let local_child = local_dir.join(&name);
                let remote_child = join_remote(&remote_dir, &name);

                if local::is_dir(&local_child).await {
                    // Recurse into the matching remote subdirectory, not
                    // into the local path reused as a remote target.
                    let complete = self.upload_all(local_child, remote_child).await?.is_complete();
                    outcome.record(complete);
                } else {
                    self.check_cancelled()?;
                    let uploaded = self
                        .session
                        .transfer_to_remote(&remote_child, &local_child)
                        .await
                        .map_err(|e| SyncError::upload_error(&remote_child, e))?;
                    debug!(local = %local_child.display(), remote = %remote_child, uploaded, "Uploaded file");
                    self.stats.record(LeafOperation::Upload, uploaded);
                    outcome.record(uploaded);
                }
            }

            Ok(outcome)
        })
    }

    /// Download `remote_path` into `local_path`.
    ///
    /// Without a trailing `/` on `remote_path` the directory itself is
    /// mirrored as `local_path/<basename>`; with one, its contents land
    /// directly in `local_path`. `local_path` must be an existing, writable
    /// directory.
    pub(crate) async fn download_tree(&mut self, remote_path: &str, local_path: &Path) -> SyncResult<bool> {
        let local_root = trim_local(local_path);
        if !local::is_writable_dir(&local_root).await {
            return Err(SyncError::LocalDirectoryUnavailable {
                path: local_path.to_path_buf(),
            });
        }

        let remote = trim_remote(remote_path).to_string();
        let basename = remote_basename(&remote);
        let target = match TreeScope::of_remote(remote_path) {
            TreeScope::WithDirectory if !basename.is_empty() && !is_dot_entry(basename) => {
                let dir = local_root.join(basename);
                self.check_cancelled()?;
                self.ensure_local_dir(&remote, &dir).await?;
                dir
            }
            _ => local_root,
        };

        Ok(self.download_all(remote, target).await?.is_complete())
    }

    /// Create the local mirror of `remote_dir`; only new directories are counted
    async fn ensure_local_dir(&mut self, remote_dir: &str, local_dir: &Path) -> SyncResult<()> {
        if local::is_dir(local_dir).await {
            return Ok(());
        }
        fs::create_dir_all(local_dir)
            .await
            .map_err(|e| SyncError::download_error(remote_dir, e))?;
        self.stats.record(LeafOperation::CreateDirectory, true);
        Ok(())
    }

    /// Mirror the contents of `remote_dir` into the existing `local_dir`
    pub(crate) fn download_all(
        &mut self,
        remote_dir: String,
        local_dir: PathBuf,
    ) -> BoxFuture<'_, SyncResult<TransferOutcome>> {
        Box::pin(async move {
            let mut outcome = TransferOutcome::new();

            let is_dir = self
                .session
                .is_directory(&remote_dir)
                .await
                .map_err(|e| SyncError::download_error(&remote_dir, e))?;
            if !is_dir {
                return Ok(outcome);
            }

            let Some(entries) = self
                .session
                .list_entries(&remote_dir)
                .await
                .map_err(|e| SyncError::download_error(&remote_dir, e))?
            else {
                return Ok(outcome);
            };

            for name in entries.iter().filter(|name| !is_dot_entry(name)) {
                let remote_child = join_remote(&remote_dir, name);
                let local_child = local_dir.join(remote_basename(name));

                let child_is_dir = self
                    .session
                    .is_directory(&remote_child)
                    .await
                    .map_err(|e| SyncError::download_error(&remote_child, e))?;

                if child_is_dir {
                    self.check_cancelled()?;
                    self.ensure_local_dir(&remote_child, &local_child).await?;

                    let complete = self.download_all(remote_child, local_child).await?.is_complete();
                    outcome.record(complete);
                } else {
                    self.check_cancelled()?;
                    let downloaded = self
                        .session
                        .transfer_from_remote(&remote_child, &local_child)
                        .await
                        .map_err(|e| SyncError::download_error(&remote_child, e))?;
                    debug!(remote = %remote_child, local = %local_child.display(), downloaded, "Downloaded file");
                    self.stats.record(LeafOperation::Download, downloaded);
                    outcome.record(downloaded);
                }
            }

            Ok(outcome)
        })
    }

    /// Names of every regular file below `remote_dir`, depth first
    pub(crate) fn collect_files(&mut self, remote_dir: String) -> BoxFuture<'_, SyncResult<Vec<String>>> {
        Box::pin(async move {
            let mut files = Vec::new();

            let Some(entries) = self
                .session
                .list_entries(&remote_dir)
                .await
                .map_err(|e| SyncError::file_error("all_files", &remote_dir, e))?
            else {
                return Ok(files);
            };

            for name in entries.into_iter().filter(|name| !is_dot_entry(name)) {
                let child = join_remote(&remote_dir, &name);
                let is_dir = self
                    .session
                    .is_directory(&child)
                    .await
                    .map_err(|e| SyncError::file_error("all_files", &child, e))?;

                if is_dir {
                    files.extend(self.collect_files(child).await?);
                } else {
                    files.push(name);
                }
            }

            Ok(files)
        })
    }
}

/// Entry names of a local directory in a stable order
async fn read_local_names(local_dir: &Path, remote_dir: &str) -> SyncResult<Vec<String>> {
    let mut reader = fs::read_dir(local_dir)
        .await
        .map_err(|e| SyncError::upload_error(remote_dir, e))?;

    let mut names = Vec::new();
    while let Some(entry) = reader
        .next_entry()
        .await
        .map_err(|e| SyncError::upload_error(remote_dir, e))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_dot_entry(&name) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}
