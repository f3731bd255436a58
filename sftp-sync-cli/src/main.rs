mod config;
mod logging;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sftp_sync::{
    CancellationToken, Connector, DirectorySync, ErrorPolicy, LocalConnector, SftpConnector, SyncOptions,
};
use tracing::{info, warn};

use crate::config::CliConfig;

#[derive(Parser)]
#[command(name = "sftp-sync")]
#[command(about = "Upload, download and remove directory trees over SFTP")]
struct Cli {
    /// Configuration file (default: <config dir>/sftp-sync/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Server host
    #[arg(long, global = true)]
    host: Option<String>,

    /// Server port
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Login user
    #[arg(short, long, global = true)]
    user: Option<String>,

    #[arg(long, env = "SFTP_SYNC_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// Log failures and report false instead of returning errors
    #[arg(long, global = true)]
    lenient: bool,

    /// Serve this local directory instead of connecting to a server
    #[arg(long, global = true)]
    local_root: Option<PathBuf>,

    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Print statistics of tree operations as JSON
    #[arg(long, global = true)]
    stats: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that login succeeds
    Test,
    #[command(flatten)]
    Remote(RemoteCommand),
}

/// Commands that run inside a logged-in session
#[derive(Subcommand)]
enum RemoteCommand {
    /// List a remote directory
    Ls {
        #[arg(default_value = ".")]
        path: String,
    },
    /// List every file below a remote directory
    Find {
        #[arg(default_value = ".")]
        path: String,
    },
    /// Print the remote working directory
    Pwd,
    /// Upload one file
    Put { local: PathBuf, remote: String },
    /// Download one file
    Get { remote: String, local: PathBuf },
    /// Print a remote file
    Cat { remote: String },
    /// Create or overwrite a remote file
    Touch {
        remote: String,
        #[arg(long, default_value = "")]
        content: String,
    },
    /// Delete a remote file
    Rm { remote: String },
    /// Create a remote directory and its parents
    Mkdir { remote: String },
    /// Rename a remote entry
    Mv { from: String, to: String },
    /// Remove a remote tree; a trailing slash only empties it
    Rmdir { remote: String },
    /// Upload a local tree; a trailing slash uploads only its contents
    Push { local: PathBuf, remote: String },
    /// Download a remote tree; a trailing slash downloads only its contents
    Pull { remote: String, local: PathBuf },
}

impl RemoteCommand {
    fn is_tree_operation(&self) -> bool {
        matches!(
            self,
            RemoteCommand::Rmdir { .. } | RemoteCommand::Push { .. } | RemoteCommand::Pull { .. }
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = CliConfig::load_or_default(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?;
    apply_overrides(&mut config, &cli);

    logging::initialize_logging(&config.logging.level, config.logging.json);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current entry");
            on_interrupt.cancel();
        }
    });

    let ok = match &cli.local_root {
        Some(root) => {
            info!(root = %root.display(), "Using local backend");
            let connector = LocalConnector::new(root);
            let sync = DirectorySync::with_options(connector, config.sync.clone()).with_cancellation(cancel);
            execute(sync, &config, String::new(), cli.command, cli.stats).await?
        }
        None => {
            config.validate()?;
            let password = resolve_password(&config)?;
            let connector = SftpConnector::new(config.sftp_options());
            let sync = DirectorySync::with_options(connector, config.sync.clone()).with_cancellation(cancel);
            execute(sync, &config, password, cli.command, cli.stats).await?
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

fn apply_overrides(config: &mut CliConfig, cli: &Cli) {
    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(user) = &cli.user {
        config.server.user = user.clone();
    }
    if let Some(password) = &cli.password {
        config.server.password = Some(password.clone());
    }
    if cli.lenient {
        config.sync = SyncOptions { error_policy: ErrorPolicy::Lenient };
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.json_logs {
        config.logging.json = true;
    }
    if cli.local_root.is_some() && config.server.host.is_empty() {
        config.server.host = "localhost".to_string();
    }
}

fn resolve_password(config: &CliConfig) -> Result<String> {
    if let Some(password) = &config.server.password {
        return Ok(password.clone());
    }
    let prompt = format!("{}@{}'s password: ", config.server.user, config.server.host);
    rpassword::prompt_password(prompt).context("Failed to read password")
}

async fn execute<C: Connector>(
    mut sync: DirectorySync<C>,
    config: &CliConfig,
    password: String,
    command: Commands,
    print_stats: bool,
) -> Result<bool> {
    let server = &config.server;

    let command = match command {
        Commands::Remote(command) => command,
        Commands::Test => {
            let ok = sync.test(&server.host, &server.user, &password, server.port).await?;
            if ok {
                println!("✅ Logged in to {}:{} as {}", server.host, server.port, server.user);
            } else {
                println!("❌ Login to {}:{} failed", server.host, server.port);
            }
            sync.logout().await;
            return Ok(ok);
        }
    };

    if !sync
        .login(&server.host, &server.user, &password, server.port)
        .await?
        .is_connected()
    {
        println!("❌ Login to {}:{} failed", server.host, server.port);
        return Ok(false);
    }

    let tree_operation = command.is_tree_operation();
    let ok = run(&mut sync, command).await?;

    if print_stats && tree_operation {
        println!("{}", sync.last_stats().to_json()?);
    } else if tree_operation {
        info!("{}", sync.last_stats().summary());
    }

    sync.logout().await;
    Ok(ok)
}

async fn run<C: Connector>(sync: &mut DirectorySync<C>, command: RemoteCommand) -> Result<bool> {
    let ok = match command {
        RemoteCommand::Ls { path } => {
            for name in sync.scan_dir(&path).await? {
                println!("{}", name);
            }
            true
        }
        RemoteCommand::Find { path } => {
            for name in sync.all_files(&path).await? {
                println!("{}", name);
            }
            true
        }
        RemoteCommand::Pwd => {
            println!("{}", sync.pwd().await?);
            true
        }
        RemoteCommand::Put { local, remote } => report("Upload", sync.upload(&local, &remote).await?),
        RemoteCommand::Get { remote, local } => report("Download", sync.download(&remote, &local).await?),
        RemoteCommand::Cat { remote } => match sync.download_contents(&remote).await? {
            Some(contents) => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(&contents)?;
                stdout.flush()?;
                true
            }
            None => report("Download", false),
        },
        RemoteCommand::Touch { remote, content } => report("Touch", sync.touch(&remote, content).await?),
        RemoteCommand::Rm { remote } => report("Delete", sync.delete(&remote).await?),
        RemoteCommand::Mkdir { remote } => report("Mkdir", sync.mkdir(&remote).await?),
        RemoteCommand::Mv { from, to } => report("Rename", sync.rename(&from, &to).await?),
        RemoteCommand::Rmdir { remote } => report("Remove", sync.rmdir(&remote).await?),
        RemoteCommand::Push { local, remote } => report("Upload", sync.upload_dir(&local, &remote).await?),
        RemoteCommand::Pull { remote, local } => report("Download", sync.download_dir(&remote, &local).await?),
    };
    Ok(ok)
}

fn report(operation: &str, ok: bool) -> bool {
    if ok {
        println!("✅ {} complete", operation);
    } else {
        println!("❌ {} incomplete", operation);
    }
    ok
}
