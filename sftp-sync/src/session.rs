//! Session capability consumed by the directory sync façade
//!
//! The façade never talks to a wire protocol directly. A backend provides a
//! [`Connector`] that opens a transport, a [`Handshake`] that authenticates
//! it, and a [`RemoteFs`] session exposing the remote filesystem primitives
//! the tree walks are built from.
//!
//! Boolean results follow one convention everywhere: `Ok(false)` means the
//! server refused or the path did not qualify, `Err` means the session
//! itself failed.

use std::path::Path;

use async_trait::async_trait;

use crate::error::SessionResult;

/// Opens a transport to a remote host.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Authenticated session type produced by this connector
    type Session: RemoteFs;
    /// Connected but not yet authenticated transport
    type Handshake: Handshake<Session = Self::Session>;

    /// Connect to `host:port`
    async fn connect(&self, host: &str, port: u16) -> SessionResult<Self::Handshake>;
}

/// A connected transport waiting for credentials.
#[async_trait]
pub trait Handshake: Send {
    type Session: RemoteFs;

    /// Authenticate with a password. `Ok(None)` means the credentials were
    /// rejected.
    async fn authenticate(self, user: &str, password: &str) -> SessionResult<Option<Self::Session>>;
}

/// Remote filesystem primitives of one authenticated session.
#[async_trait]
pub trait RemoteFs: Send + Sync {
    /// Names in `path` as the server reports them, `.` and `..` included if
    /// the server sends them. `Ok(None)` when the listing failed, e.g. the
    /// path does not exist.
    async fn list_entries(&self, path: &str) -> SessionResult<Option<Vec<String>>>;

    async fn is_directory(&self, path: &str) -> SessionResult<bool>;

    async fn is_regular_file(&self, path: &str) -> SessionResult<bool>;

    async fn delete_file(&self, path: &str) -> SessionResult<bool>;

    /// Create `path`, and its missing parents when `recursive` is set
    async fn make_directory(&self, path: &str, recursive: bool) -> SessionResult<bool>;

    /// Remove an empty directory
    async fn remove_directory(&self, path: &str) -> SessionResult<bool>;

    async fn rename_path(&self, old_path: &str, new_path: &str) -> SessionResult<bool>;

    /// Copy the local file `local_source` to `remote_path`
    async fn transfer_to_remote(&self, remote_path: &str, local_source: &Path) -> SessionResult<bool>;

    /// Copy `remote_path` into the local file `local_dest`
    async fn transfer_from_remote(&self, remote_path: &str, local_dest: &Path) -> SessionResult<bool>;

    async fn current_working_directory(&self) -> SessionResult<String>;

    /// Best-effort disconnect
    async fn close(&self) -> SessionResult<()> {
        Ok(())
    }
}
