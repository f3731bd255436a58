//! Error types for the directory sync façade and its session capability

use std::path::PathBuf;

/// Result type alias for façade operations
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Result type alias for session capability calls
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Faults reported by a session backend.
///
/// A backend returns `Ok(false)` when the server refuses an operation; a
/// `SessionError` means the transport or protocol itself failed.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Could not reach the remote host
    #[error("Connection to {host}:{port} failed: {message}")]
    Connect {
        host: String,
        port: u16,
        message: String,
    },

    /// The server rejected the supplied credentials
    #[error("Authentication rejected for user '{user}'")]
    AuthenticationRejected { user: String },

    /// Host key did not pass verification
    #[error("Host key verification failed for {host}")]
    HostKeyRejected { host: String },

    /// SSH transport errors
    #[error("SSH error: {0}")]
    Ssh(String),

    /// SFTP protocol errors
    #[error("SFTP error: {0}")]
    Sftp(String),

    /// The SFTP channel reported that it has no connection to the server
    #[error("SFTP channel closed: {0}")]
    ChannelClosed(String),

    /// Operation did not finish in time
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Whether the session can no longer be used after this fault
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::Ssh(_) | Self::ChannelClosed(_) | Self::Timeout(_)
        )
    }
}

impl From<russh::Error> for SessionError {
    fn from(e: russh::Error) -> Self {
        Self::Ssh(e.to_string())
    }
}

impl From<russh_sftp::client::error::Error> for SessionError {
    fn from(e: russh_sftp::client::error::Error) -> Self {
        use russh_sftp::client::error::Error;
        use russh_sftp::protocol::StatusCode;

        match e {
            Error::Status(status)
                if matches!(status.status_code, StatusCode::NoConnection | StatusCode::ConnectionLost) =>
            {
                Self::ChannelClosed(status.status_code.to_string())
            }
            e => Self::Sftp(e.to_string()),
        }
    }
}

/// Comprehensive error type for façade operations
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Operation attempted without an authenticated session
    #[error("Not connected: login first")]
    NotConnected,

    /// Login to the remote host failed
    #[error("Login to '{target}' failed: {source}")]
    LoginFailed {
        target: String,
        #[source]
        source: SessionError,
    },

    /// A single-entry operation failed
    #[error("File operation '{operation}' failed at '{path}': {source}")]
    FileOperationFailed {
        operation: &'static str,
        path: String,
        #[source]
        source: SessionError,
    },

    /// Recursive removal failed
    #[error("Directory removal failed at '{path}': {source}")]
    DirectoryRemovalFailed {
        path: String,
        #[source]
        source: Box<SyncError>,
    },

    /// Recursive upload failed
    #[error("Directory upload from '{local}' to '{remote}' failed: {source}")]
    DirectoryUploadFailed {
        local: PathBuf,
        remote: String,
        #[source]
        source: Box<SyncError>,
    },

    /// Recursive download failed
    #[error("Directory download from '{remote}' to '{local}' failed: {source}")]
    DirectoryDownloadFailed {
        remote: String,
        local: PathBuf,
        #[source]
        source: Box<SyncError>,
    },

    /// A step inside the upload walk failed
    #[error("Subtree upload failed at '{path}': {source}")]
    SubtreeUploadFailed {
        path: String,
        #[source]
        source: SessionError,
    },

    /// A step inside the download walk failed
    #[error("Subtree download failed at '{path}': {source}")]
    SubtreeDownloadFailed {
        path: String,
        #[source]
        source: SessionError,
    },

    /// A step inside the removal walk failed
    #[error("Subtree removal failed at '{path}': {source}")]
    SubtreeRemovalFailed {
        path: String,
        #[source]
        source: SessionError,
    },

    /// Remote directory could not be created during an upload
    #[error("Cannot create remote directory '{path}'")]
    RemoteDirectoryUnavailable { path: String },

    /// Local target directory missing or not writable
    #[error("Local directory '{path}' does not exist or is not writable")]
    LocalDirectoryUnavailable { path: PathBuf },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Cancellation error
    #[error("Operation was cancelled")]
    Cancelled,
}

impl SyncError {
    /// Create a new login error
    pub fn login_error(host: &str, port: u16, source: SessionError) -> Self {
        Self::LoginFailed {
            target: format!("{}:{}", host, port),
            source,
        }
    }

    /// Create a new single-entry operation error
    pub fn file_error(operation: &'static str, path: impl Into<String>, source: SessionError) -> Self {
        Self::FileOperationFailed {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Create a new upload walk error
    pub fn upload_error(path: impl Into<String>, source: impl Into<SessionError>) -> Self {
        Self::SubtreeUploadFailed {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Create a new download walk error
    pub fn download_error(path: impl Into<String>, source: impl Into<SessionError>) -> Self {
        Self::SubtreeDownloadFailed {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Create a new removal walk error
    pub fn removal_error(path: impl Into<String>, source: impl Into<SessionError>) -> Self {
        Self::SubtreeRemovalFailed {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Underlying session fault, looking through wrapped tree errors
    pub fn session_error(&self) -> Option<&SessionError> {
        match self {
            Self::LoginFailed { source, .. }
            | Self::FileOperationFailed { source, .. }
            | Self::SubtreeUploadFailed { source, .. }
            | Self::SubtreeDownloadFailed { source, .. }
            | Self::SubtreeRemovalFailed { source, .. } => Some(source),
            Self::DirectoryRemovalFailed { source, .. }
            | Self::DirectoryUploadFailed { source, .. }
            | Self::DirectoryDownloadFailed { source, .. } => source.session_error(),
            _ => None,
        }
    }

    /// Errors that are returned even under the lenient policy
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NotConnected | Self::LocalDirectoryUnavailable { .. } | Self::Cancelled
        )
    }
}
