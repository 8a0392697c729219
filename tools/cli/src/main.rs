//! filestorage CLI - Command line access to a local storage disk.
//!
//! Runs the same put pipeline applications use, so unique names and image
//! variants can be tried out by hand.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use filestorage_image::{ImageManipulation, ImageManipulationOptions};
use filestorage_storage::{DiskConfig, Storage, StorageConfig, StorageContext};

#[derive(Parser)]
#[command(name = "filestorage")]
#[command(about = "filestorage - Unified file storage operations")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Root directory of the local disk.
    #[arg(short, long, default_value = "storage")]
    root: PathBuf,

    /// Store uploads under random file names.
    #[arg(short, long)]
    unique: bool,

    /// Generate thumbnails and responsive variants for uploaded images.
    #[arg(short, long)]
    images: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file.
    Put {
        /// Source file to upload.
        source: PathBuf,

        /// Destination path on the disk.
        dest: String,
    },

    /// Download an image from a URI and store it.
    Fetch {
        /// Remote URI.
        uri: String,

        /// Destination path on the disk.
        dest: String,

        /// Store the resource even if it is not advertised as an image.
        #[arg(long)]
        any_type: bool,
    },

    /// Download a file.
    Get {
        /// Path on the disk.
        path: String,

        /// Destination file.
        dest: PathBuf,
    },

    /// Check whether a file exists.
    Exists {
        /// Path on the disk.
        path: String,
    },

    /// Show size and modification time of a file.
    Stat {
        /// Path on the disk.
        path: String,
    },

    /// Delete a file.
    Delete {
        /// Path on the disk.
        path: String,
    },

    /// Copy a file.
    Copy {
        /// Source path.
        from: String,

        /// Destination path.
        to: String,
    },

    /// Move a file.
    Move {
        /// Source path.
        from: String,

        /// Destination path.
        to: String,
    },

    /// Print the URL of a file.
    Url {
        /// Path on the disk.
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; RUST_LOG takes precedence over --verbose
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let storage = open_storage(&cli.root, cli.unique, cli.images)?;

    let outcome = match cli.command {
        Commands::Put { source, dest } => cmd_put(&storage, &source, &dest).await,

        Commands::Fetch { uri, dest, any_type } => cmd_fetch(&storage, &uri, &dest, any_type).await,

        Commands::Get { path, dest } => cmd_get(&storage, &path, &dest).await,

        Commands::Exists { path } => {
            println!("{}", storage.exists(&path).await?);
            Ok(())
        }

        Commands::Stat { path } => cmd_stat(&storage, &path).await,

        Commands::Delete { path } => {
            storage.delete(&path).await.context("Failed to delete file")?;
            println!("Deleted {}", path);
            Ok(())
        }

        Commands::Copy { from, to } => {
            storage.copy(&from, &to).await.context("Failed to copy file")?;
            println!("Copied {} -> {}", from, to);
            Ok(())
        }

        Commands::Move { from, to } => {
            storage.move_file(&from, &to).await.context("Failed to move file")?;
            println!("Moved {} -> {}", from, to);
            Ok(())
        }

        Commands::Url { path } => {
            println!("{}", storage.url(&path)?);
            Ok(())
        }
    };

    storage.shutdown().await?;
    outcome
}

/// Build a façade over a single local disk.
fn open_storage(root: &Path, unique: bool, images: bool) -> Result<Storage> {
    let mut config = StorageConfig::new()
        .with_disk(DiskConfig::local("local", root.to_string_lossy()))
        .with_unique_file_name(unique);

    if images {
        config = config.with_plugin(ImageManipulation::factory(
            ImageManipulationOptions::default(),
        ));
    }

    StorageContext::new()
        .storage(config)
        .context("Failed to configure storage")
}

/// Upload a local file.
async fn cmd_put(storage: &Storage, source: &Path, dest: &str) -> Result<()> {
    info!("Uploading {} to {}", source.display(), dest);

    let data = tokio::fs::read(source)
        .await
        .with_context(|| format!("Failed to read {}", source.display()))?;

    let result = storage.put(dest, data).await.context("Failed to upload file")?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

/// Download a remote image into the disk.
async fn cmd_fetch(storage: &Storage, uri: &str, dest: &str, any_type: bool) -> Result<()> {
    info!("Fetching {} into {}", uri, dest);

    let result = storage
        .upload_image_from_uri(uri, dest, any_type)
        .await
        .context("Failed to fetch remote image")?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

/// Download a file to the local filesystem.
async fn cmd_get(storage: &Storage, path: &str, dest: &Path) -> Result<()> {
    let data = storage.read(path).await.context("Failed to read file")?;

    tokio::fs::write(dest, &data)
        .await
        .with_context(|| format!("Failed to write {}", dest.display()))?;

    println!("Wrote {} bytes to {}", data.len(), dest.display());
    Ok(())
}

/// Print file metadata.
async fn cmd_stat(storage: &Storage, path: &str) -> Result<()> {
    let stat = storage.stats(path).await.context("Failed to stat file")?;

    println!("Path: {}", path);
    println!("  Size: {} bytes", stat.size);
    println!("  Modified: {}", stat.last_modified.to_rfc3339());
    println!("  Directory: {}", stat.is_directory);

    Ok(())
}
