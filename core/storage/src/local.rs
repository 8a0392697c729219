//! Local filesystem driver.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::driver::{
    stream_from_bytes, ByteStream, Driver, ErrorHandler, FileStat, PutData, PutReceipt,
};
use crate::normalize::ErrorMapping;
use filestorage_common::{Error, Result, StoragePath};

/// Local filesystem driver.
///
/// Stores files under a root directory. Failures surface as
/// `std::io::Error` and are translated with [`ErrorMapping::Posix`].
pub struct LocalDriver {
    root: PathBuf,
    public_url: Option<String>,
}

impl LocalDriver {
    /// Create a new local driver with the given root directory.
    ///
    /// # Postconditions
    /// - Root directory is created if it doesn't exist
    ///
    /// # Errors
    /// - Permission denied
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        // Create root if it doesn't exist (sync for constructor)
        if !root.exists() {
            std::fs::create_dir_all(&root)?;
        }

        Ok(Self {
            root,
            public_url: None,
        })
    }

    /// Set the public base URL used by [`Driver::url`].
    pub fn with_public_url(mut self, url: Option<String>) -> Self {
        self.public_url = url.map(|u| u.trim_end_matches('/').to_string());
        self
    }

    /// Root directory of this disk.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Convert a StoragePath to a filesystem path.
    fn to_fs_path(&self, path: &StoragePath) -> PathBuf {
        let mut fs_path = self.root.clone();
        for component in path.components() {
            fs_path.push(component);
        }
        fs_path
    }

    async fn ensure_parent(fs_path: &Path) -> Result<()> {
        if let Some(parent) = fs_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    fn require_file(path: &StoragePath) -> Result<()> {
        if path.is_root() {
            return Err(Error::InvalidInput("A file path is required".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Driver for LocalDriver {
    fn name(&self) -> &str {
        "local"
    }

    fn url(&self, path: &StoragePath) -> Result<String> {
        Ok(match &self.public_url {
            Some(base) => format!("{}/{}", base, path.as_key()),
            None => self.to_fs_path(path).to_string_lossy().into_owned(),
        })
    }

    async fn exists(&self, path: &StoragePath) -> Result<bool> {
        Ok(fs::try_exists(self.to_fs_path(path)).await.unwrap_or(false))
    }

    async fn stats(&self, path: &StoragePath) -> Result<FileStat> {
        let fs_meta = fs::metadata(self.to_fs_path(path)).await?;
        let last_modified: DateTime<Utc> = fs_meta
            .modified()
            .map(|t| t.into())
            .unwrap_or_else(|_| Utc::now());

        Ok(FileStat {
            size: fs_meta.len(),
            last_modified,
            is_directory: fs_meta.is_dir(),
        })
    }

    async fn put(&self, path: &StoragePath, data: PutData) -> Result<PutReceipt> {
        Self::require_file(path)?;
        let fs_path = self.to_fs_path(path);
        Self::ensure_parent(&fs_path).await?;

        let bytes = data.into_bytes().await?;
        fs::write(&fs_path, &bytes).await?;

        Ok(PutReceipt::uploaded())
    }

    async fn get(&self, path: &StoragePath) -> Result<ByteStream> {
        let fs_path = self.to_fs_path(path);

        if fs::metadata(&fs_path).await?.is_dir() {
            return Err(Error::InvalidInput(format!(
                "Cannot read directory: {}",
                path
            )));
        }

        let data = fs::read(&fs_path).await?;
        Ok(stream_from_bytes(data.into()))
    }

    async fn delete(&self, path: &StoragePath) -> Result<bool> {
        Self::require_file(path)?;
        fs::remove_file(self.to_fs_path(path)).await?;
        Ok(true)
    }

    async fn copy(&self, from: &StoragePath, to: &StoragePath) -> Result<()> {
        Self::require_file(to)?;
        let to_path = self.to_fs_path(to);
        Self::ensure_parent(&to_path).await?;

        fs::copy(self.to_fs_path(from), &to_path).await?;
        Ok(())
    }

    async fn move_file(&self, from: &StoragePath, to: &StoragePath) -> Result<()> {
        Self::require_file(to)?;
        let to_path = self.to_fs_path(to);
        Self::ensure_parent(&to_path).await?;

        fs::rename(self.to_fs_path(from), &to_path).await?;
        Ok(())
    }

    async fn make_dir(&self, dir: &StoragePath) -> Result<()> {
        let fs_path = self.to_fs_path(dir);

        if fs::try_exists(&fs_path).await? {
            return Err(Error::AlreadyExists(format!(
                "Directory already exists: {}",
                dir
            )));
        }

        fs::create_dir_all(&fs_path).await?;
        Ok(())
    }

    async fn remove_dir(&self, dir: &StoragePath) -> Result<()> {
        if dir.is_root() {
            return Err(Error::InvalidInput(
                "Cannot remove the disk root".to_string(),
            ));
        }
        fs::remove_dir_all(self.to_fs_path(dir)).await?;
        Ok(())
    }

    fn error_handler(&self) -> Option<&dyn ErrorHandler> {
        Some(&ErrorMapping::Posix)
    }
}
