//! Session backends
//!
//! - [`sftp`]: SSH transport with the SFTP subsystem
//! - [`local`]: a directory on the local filesystem standing in for a
//!   remote host

pub mod local;
pub mod sftp;

pub use local::{LocalConnector, LocalRemote};
pub use sftp::{HostKeyPolicy, SftpConnector, SftpOptions, SftpRemote};
