use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use sftp_sync::{HostKeyPolicy, SftpOptions, SyncOptions, DEFAULT_PORT};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub sync: SyncOptions,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_user")]
    pub user: String,
    /// Prefer `SFTP_SYNC_PASSWORD` or the prompt over storing it here
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(default = "default_inactivity_timeout", with = "humantime_serde")]
    pub inactivity_timeout: Option<Duration>,
    #[serde(default)]
    pub host_key: HostKeyMode,
    #[serde(default)]
    pub known_hosts_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyMode {
    #[default]
    KnownHosts,
    AcceptAny,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            user: default_user(),
            password: None,
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            inactivity_timeout: default_inactivity_timeout(),
            host_key: HostKeyMode::default(),
            known_hosts_file: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl CliConfig {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: CliConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `explicit`, or the default location when it exists
    pub async fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path).await;
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load(path).await,
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            anyhow::bail!("No server host configured; pass --host or set server.host");
        }
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }
        if self.server.user.trim().is_empty() {
            anyhow::bail!("Server user cannot be empty");
        }
        if self.connection.connect_timeout.is_zero() {
            anyhow::bail!("Connect timeout must be greater than zero");
        }
        if let Some(path) = &self.connection.known_hosts_file {
            if !path.exists() {
                anyhow::bail!("Known hosts file does not exist: {}", path.display());
            }
        }
        tracing::Level::from_str(&self.logging.level)
            .map_err(|_| anyhow::anyhow!("Invalid log level: {}", self.logging.level))?;

        Ok(())
    }

    pub fn sftp_options(&self) -> SftpOptions {
        let host_key_policy = match (self.connection.host_key, &self.connection.known_hosts_file) {
            (HostKeyMode::AcceptAny, _) => HostKeyPolicy::AcceptAny,
            (HostKeyMode::KnownHosts, Some(path)) => HostKeyPolicy::KnownHostsFile(path.clone()),
            (HostKeyMode::KnownHosts, None) => HostKeyPolicy::KnownHosts,
        };

        SftpOptions {
            connect_timeout: self.connection.connect_timeout,
            inactivity_timeout: self.connection.inactivity_timeout,
            host_key_policy,
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sftp-sync").join("config.toml"))
}

// Default value functions
fn default_port() -> u16 { DEFAULT_PORT }
fn default_user() -> String {
    std::env::var("USER").unwrap_or_else(|_| "root".to_string())
}
fn default_connect_timeout() -> Duration { Duration::from_secs(30) }
fn default_inactivity_timeout() -> Option<Duration> { Some(Duration::from_secs(300)) } // 5 minutes
fn default_log_level() -> String { "info".to_string() }

#[cfg(test)]
mod tests {
    use super::*;
    use sftp_sync::ErrorPolicy;

    #[test]
    fn test_full_config() {
        let config: CliConfig = toml::from_str(
            r#"
            [server]
            host = "files.example.org"
            port = 2222
            user = "deploy"

            [connection]
            connect_timeout = "10s"
            inactivity_timeout = "2m"
            host_key = "accept-any"

            [sync]
            error_policy = "lenient"

            [logging]
            level = "debug"
            json = true
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 2222);
        assert_eq!(config.connection.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.connection.inactivity_timeout, Some(Duration::from_secs(120)));
        assert_eq!(config.sync.error_policy, ErrorPolicy::Lenient);
        assert!(config.logging.json);
        assert_eq!(config.sftp_options().host_key_policy, HostKeyPolicy::AcceptAny);
        config.validate().unwrap();
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config: CliConfig = toml::from_str("[server]\nhost = \"h\"\n").unwrap();

        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.connection.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.connection.host_key, HostKeyMode::KnownHosts);
        assert_eq!(config.sync.error_policy, ErrorPolicy::Strict);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.sftp_options().host_key_policy, HostKeyPolicy::KnownHosts);
    }

    #[test]
    fn test_validate_rejects_missing_host() {
        let err = CliConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("No server host"));
    }

    #[test]
    fn test_validate_rejects_bad_log_level() {
        let mut config = CliConfig::default();
        config.server.host = "h".to_string();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_known_hosts_file_must_exist() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let known_hosts = temp_dir.path().join("known_hosts");

        let mut config = CliConfig::default();
        config.server.host = "h".to_string();
        config.connection.known_hosts_file = Some(known_hosts.clone());
        assert!(config.validate().is_err());

        std::fs::write(&known_hosts, "").unwrap();
        config.validate().unwrap();
        assert_eq!(
            config.sftp_options().host_key_policy,
            HostKeyPolicy::KnownHostsFile(known_hosts)
        );
    }

    #[tokio::test]
    async fn test_load_explicit_path() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        tokio::fs::write(&path, "[server]\nhost = \"example.org\"\n").await.unwrap();

        let config = CliConfig::load_or_default(Some(&path)).await.unwrap();
        assert_eq!(config.server.host, "example.org");
        assert!(CliConfig::load_or_default(Some(&temp_dir.path().join("nope.toml"))).await.is_err());
    }
}
