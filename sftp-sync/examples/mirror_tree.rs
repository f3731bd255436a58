//! Mirror a directory tree through the façade using the local backend

use std::error::Error;
use sftp_sync::{DirectorySync, LocalConnector, SyncOptions, DEFAULT_PORT};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("Directory Sync Example");
    println!("======================");

    // Create temporary directories for testing
    let temp_dir = tempfile::TempDir::new()?;
    let site_dir = temp_dir.path().join("site");
    let server_root = temp_dir.path().join("server");
    let restore_dir = temp_dir.path().join("restore");

    // Setup a local site with a nested directory
    tokio::fs::create_dir_all(site_dir.join("assets")).await?;
    tokio::fs::write(site_dir.join("index.html"), b"<h1>hello</h1>").await?;
    tokio::fs::write(site_dir.join("assets").join("style.css"), b"h1 { color: teal }").await?;

    // The "server" is a plain directory served by the local backend
    tokio::fs::create_dir_all(server_root.join("www")).await?;
    tokio::fs::create_dir_all(&restore_dir).await?;

    let connector = LocalConnector::new(&server_root);
    let mut sync = DirectorySync::with_options(connector, SyncOptions::strict());
    sync.login("localhost", "demo", "demo", DEFAULT_PORT).await?;

    // Example 1: upload the directory itself
    println!("Example 1: Upload");
    println!("-----------------");
    let uploaded = sync.upload_dir(&site_dir, "/www").await?;
    println!("Upload complete: {}", uploaded);
    println!("{}", sync.last_stats().summary());
    println!("Remote /www/site: {:?}", sync.scan_dir("/www/site").await?);
    println!();

    // Example 2: download only the contents
    println!("Example 2: Download contents");
    println!("----------------------------");
    let downloaded = sync.download_dir("/www/site/", &restore_dir).await?;
    println!("Download complete: {}", downloaded);
    println!("{}", sync.last_stats().summary());
    assert!(restore_dir.join("assets").join("style.css").exists());
    println!();

    // Example 3: remove the remote tree
    println!("Example 3: Remove");
    println!("-----------------");
    let removed = sync.rmdir("/www/site").await?;
    println!("Removal complete: {}", removed);
    println!("Statistics: {}", sync.last_stats().to_json()?);

    sync.logout().await;
    Ok(())
}
