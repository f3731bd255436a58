//! SFTP Directory Sync Library
//!
//! An async façade over one SFTP session providing:
//! - Login and session lifecycle
//! - Single-file operations (upload, download, delete, rename, mkdir, touch)
//! - Recursive upload, download and removal of directory trees
//! - Trailing-slash conventions selecting "contents only" or "directory itself"
//! - Strict or lenient error propagation
//! - Per-tree statistics and cancellation

pub mod backend;
pub mod config;
pub mod error;
pub mod facade;
pub mod local;
pub mod metrics;
pub mod outcome;
pub mod path;
pub mod session;
mod walk;

// Re-export main types
pub use backend::{HostKeyPolicy, LocalConnector, SftpConnector, SftpOptions};
pub use config::{ErrorPolicy, SyncOptions, DEFAULT_PORT};
pub use error::{SessionError, SessionResult, SyncError, SyncResult};
pub use facade::DirectorySync;
pub use metrics::{LeafOperation, TreeOperation, TreeStats};
pub use outcome::TransferOutcome;
pub use path::TreeScope;
pub use session::{Connector, Handshake, RemoteFs};
pub use tokio_util::sync::CancellationToken;

/// Log in to an SFTP server with default options
pub async fn connect_sftp(
    server: &str,
    user: &str,
    password: &str,
    port: u16,
) -> SyncResult<DirectorySync<SftpConnector>> {
    let mut sync = DirectorySync::new(SftpConnector::default());
    sync.login(server, user, password, port).await?;
    Ok(sync)
}

#[cfg(test)]
mod test_support;


#[cfg(test)]
mod facade_tests;
