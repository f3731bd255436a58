//! SFTP backend on top of `russh` and `russh-sftp`

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Handle, Handler};
use russh_sftp::client::error::Error as SftpError;
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

use crate::error::{SessionError, SessionResult};
use crate::path::{is_dot_entry, REMOTE_SEPARATOR};
use crate::session::{Connector, Handshake, RemoteFs};

/// How the server's host key is verified
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HostKeyPolicy {
    /// Check against `~/.ssh/known_hosts`
    #[default]
    KnownHosts,
    /// Check against a specific known hosts file
    KnownHostsFile(PathBuf),
    /// Accept any host key
    AcceptAny,
}

/// Connection settings for [`SftpConnector`]
#[derive(Debug, Clone)]
pub struct SftpOptions {
    /// Limit for TCP connect plus key exchange
    pub connect_timeout: Duration,
    /// Drop the connection after this long without traffic
    pub inactivity_timeout: Option<Duration>,
    pub host_key_policy: HostKeyPolicy,
}

impl Default for SftpOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            inactivity_timeout: Some(Duration::from_secs(300)),
            host_key_policy: HostKeyPolicy::default(),
        }
    }
}

/// Opens SSH connections and starts the SFTP subsystem after login
#[derive(Debug, Clone, Default)]
pub struct SftpConnector {
    options: SftpOptions,
}

impl SftpConnector {
    pub fn new(options: SftpOptions) -> Self {
        Self { options }
    }

    fn client_config(&self) -> Arc<client::Config> {
        Arc::new(client::Config {
            inactivity_timeout: self.options.inactivity_timeout,
            ..Default::default()
        })
    }
}

#[async_trait]
impl Connector for SftpConnector {
    type Session = SftpRemote;
    type Handshake = PendingSftp;

    async fn connect(&self, host: &str, port: u16) -> SessionResult<PendingSftp> {
        let handler = HostKeyCheck {
            hostname: host.to_string(),
            port,
            policy: self.options.host_key_policy.clone(),
        };

        let timeout = self.options.connect_timeout;
        let connecting = client::connect(self.client_config(), (host, port), handler);
        let handle = match tokio::time::timeout(timeout, connecting).await {
            Err(_) => return Err(SessionError::Timeout(timeout)),
            Ok(Err(russh::Error::UnknownKey)) => {
                return Err(SessionError::HostKeyRejected { host: host.to_string() })
            }
            Ok(Err(e)) => {
                return Err(SessionError::Connect {
                    host: host.to_string(),
                    port,
                    message: e.to_string(),
                })
            }
            Ok(Ok(handle)) => handle,
        };

        debug!("SSH transport established to {}:{}", host, port);
        Ok(PendingSftp { handle })
    }
}

/// Client handler verifying the server key
pub struct HostKeyCheck {
    hostname: String,
    port: u16,
    policy: HostKeyPolicy,
}

impl Handler for HostKeyCheck {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        let checked = match &self.policy {
            HostKeyPolicy::AcceptAny => return Ok(true),
            HostKeyPolicy::KnownHosts => {
                russh::keys::check_known_hosts(&self.hostname, self.port, server_public_key)
            }
            HostKeyPolicy::KnownHostsFile(path) => russh::keys::check_known_hosts_path(
                &self.hostname,
                self.port,
                server_public_key,
                path,
            ),
        };

        match checked {
            Ok(known) => {
                if !known {
                    warn!(host = %self.hostname, "Host key not found in known hosts");
                }
                Ok(known)
            }
            Err(e) => {
                warn!(host = %self.hostname, error = %e, "Host key verification failed");
                Ok(false)
            }
        }
    }
}

/// Connected SSH transport awaiting password authentication
pub struct PendingSftp {
    handle: Handle<HostKeyCheck>,
}

#[async_trait]
impl Handshake for PendingSftp {
    type Session = SftpRemote;

    async fn authenticate(mut self, user: &str, password: &str) -> SessionResult<Option<SftpRemote>> {
        let auth = self.handle.authenticate_password(user, password).await?;
        if !auth.success() {
            debug!(user, "Password authentication rejected");
            return Ok(None);
        }

        let channel = self.handle.channel_open_session().await?;
        channel.request_subsystem(true, "sftp").await?;
        let sftp = SftpSession::new(channel.into_stream()).await?;

        Ok(Some(SftpRemote {
            handle: self.handle,
            sftp,
        }))
    }
}

/// Authenticated session with an open SFTP subsystem
pub struct SftpRemote {
    handle: Handle<HostKeyCheck>,
    sftp: SftpSession,
}

/// Status replies are the server refusing a request, except the two codes
/// the client raises itself once the channel is gone; anything else is a
/// failure of the channel itself
fn refusal<T>(path: &str, result: Result<T, SftpError>) -> SessionResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(SftpError::Status(status))
            if !matches!(status.status_code, StatusCode::NoConnection | StatusCode::ConnectionLost) =>
        {
            debug!(path, status = ?status.status_code, message = %status.error_message, "SFTP request refused");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Every prefix of a remote path, shortest first
fn directory_prefixes(path: &str) -> Vec<String> {
    let absolute = path.starts_with(REMOTE_SEPARATOR);
    let mut current = String::new();
    let mut prefixes = Vec::new();

    for component in path.split(REMOTE_SEPARATOR).filter(|c| !c.is_empty()) {
        if !current.is_empty() || absolute {
            current.push(REMOTE_SEPARATOR);
        }
        current.push_str(component);
        prefixes.push(current.clone());
    }

    prefixes
}

impl SftpRemote {
    async fn create_single(&self, path: &str) -> SessionResult<bool> {
        Ok(refusal(path, self.sftp.create_dir(path).await)?.is_some())
    }
}

#[async_trait]
impl RemoteFs for SftpRemote {
    async fn list_entries(&self, path: &str) -> SessionResult<Option<Vec<String>>> {
        Ok(refusal(path, self.sftp.read_dir(path).await)?
            .map(|entries| entries.map(|entry| entry.file_name()).collect()))
    }

    async fn is_directory(&self, path: &str) -> SessionResult<bool> {
        Ok(refusal(path, self.sftp.metadata(path).await)?
            .is_some_and(|metadata| metadata.file_type().is_dir()))
    }

    async fn is_regular_file(&self, path: &str) -> SessionResult<bool> {
        Ok(refusal(path, self.sftp.metadata(path).await)?
            .is_some_and(|metadata| metadata.file_type().is_file()))
    }

    async fn delete_file(&self, path: &str) -> SessionResult<bool> {
        Ok(refusal(path, self.sftp.remove_file(path).await)?.is_some())
    }

    async fn make_directory(&self, path: &str, recursive: bool) -> SessionResult<bool> {
        if !recursive {
            return self.create_single(path).await;
        }

        let prefixes = directory_prefixes(path);
        let Some((last, parents)) = prefixes.split_last() else {
            return Ok(false);
        };
        for parent in parents.iter().filter(|p| !is_dot_entry(p)) {
            if !self.is_directory(parent).await? {
                self.create_single(parent).await?;
            }
        }
        self.create_single(last).await
    }

    async fn remove_directory(&self, path: &str) -> SessionResult<bool> {
        Ok(refusal(path, self.sftp.remove_dir(path).await)?.is_some())
    }

    async fn rename_path(&self, old_path: &str, new_path: &str) -> SessionResult<bool> {
        Ok(refusal(old_path, self.sftp.rename(old_path, new_path).await)?.is_some())
    }

    async fn transfer_to_remote(&self, remote_path: &str, local_source: &Path) -> SessionResult<bool> {
        let contents = match tokio::fs::read(local_source).await {
            Ok(contents) => contents,
            Err(e) => {
                warn!(local = %local_source.display(), error = %e, "Cannot read local file");
                return Ok(false);
            }
        };

        let Some(mut file) = refusal(remote_path, self.sftp.create(remote_path).await)? else {
            return Ok(false);
        };
        file.write_all(&contents).await?;
        file.flush().await?;
        file.shutdown().await?;
        Ok(true)
    }

    async fn transfer_from_remote(&self, remote_path: &str, local_dest: &Path) -> SessionResult<bool> {
        let Some(mut file) = refusal(remote_path, self.sftp.open(remote_path).await)? else {
            return Ok(false);
        };
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).await?;

        if let Err(e) = tokio::fs::write(local_dest, &contents).await {
            warn!(local = %local_dest.display(), error = %e, "Cannot write local file");
            return Ok(false);
        }
        Ok(true)
    }

    async fn current_working_directory(&self) -> SessionResult<String> {
        Ok(self.sftp.canonicalize(".").await?)
    }

    async fn close(&self) -> SessionResult<()> {
        if let Err(e) = self.sftp.close().await {
            debug!(error = %e, "Error while closing SFTP subsystem");
        }
        self.handle
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}
