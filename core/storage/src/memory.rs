//! In-memory driver for testing.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::driver::{
    stream_from_bytes, ByteStream, Driver, ErrorHandler, FileStat, PutData, PutReceipt,
};
use crate::normalize::ErrorMapping;
use filestorage_common::{BackendError, Error, Result, StoragePath};

/// Stored object.
#[derive(Debug, Clone)]
struct Object {
    data: Bytes,
    modified: DateTime<Utc>,
}

/// In-memory driver.
///
/// Behaves like a flat object store: keys are full paths, directories are
/// marker keys ending in `/`, and missing objects are reported as HTTP 404 so
/// they go through the same normalization as a remote store. All data is lost
/// on drop.
pub struct MemoryDriver {
    objects: RwLock<BTreeMap<String, Object>>,
    public_url: Option<String>,
}

impl MemoryDriver {
    /// Create a new empty memory driver.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            public_url: None,
        }
    }

    /// Set the public base URL used by [`Driver::url`].
    pub fn with_public_url(mut self, url: Option<String>) -> Self {
        self.public_url = url.map(|u| u.trim_end_matches('/').to_string());
        self
    }

    fn dir_key(dir: &StoragePath) -> String {
        format!("{}/", dir.as_key())
    }

    fn not_found(path: &StoragePath) -> Error {
        Error::Backend(BackendError::http(
            404,
            format!("NoSuchKey: {}", path),
        ))
    }

    async fn object(&self, path: &StoragePath) -> Result<Object> {
        self.objects
            .read()
            .await
            .get(&path.as_key())
            .cloned()
            .ok_or_else(|| Self::not_found(path))
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    fn name(&self) -> &str {
        "memory"
    }

    fn url(&self, path: &StoragePath) -> Result<String> {
        Ok(match &self.public_url {
            Some(base) => format!("{}/{}", base, path.as_key()),
            None => format!("memory://{}", path.as_key()),
        })
    }

    async fn exists(&self, path: &StoragePath) -> Result<bool> {
        Ok(self.objects.read().await.contains_key(&path.as_key()))
    }

    async fn stats(&self, path: &StoragePath) -> Result<FileStat> {
        let object = self.object(path).await?;
        Ok(FileStat {
            size: object.data.len() as u64,
            last_modified: object.modified,
            is_directory: false,
        })
    }

    async fn put(&self, path: &StoragePath, data: PutData) -> Result<PutReceipt> {
        if path.is_root() {
            return Err(Error::InvalidInput("A file path is required".to_string()));
        }

        let data = data.into_bytes().await?;
        let size = data.len();
        let object = Object {
            data,
            modified: Utc::now(),
        };
        self.objects.write().await.insert(path.as_key(), object);

        Ok(PutReceipt::uploaded()
            .with_field("Key", path.as_key())
            .with_field("ContentLength", size))
    }

    async fn get(&self, path: &StoragePath) -> Result<ByteStream> {
        let object = self.object(path).await?;
        Ok(stream_from_bytes(object.data))
    }

    async fn delete(&self, path: &StoragePath) -> Result<bool> {
        match self.objects.write().await.remove(&path.as_key()) {
            Some(_) => Ok(true),
            None => Err(Self::not_found(path)),
        }
    }

    async fn copy(&self, from: &StoragePath, to: &StoragePath) -> Result<()> {
        let mut object = self.object(from).await?;
        object.modified = Utc::now();
        self.objects.write().await.insert(to.as_key(), object);
        Ok(())
    }

    async fn move_file(&self, from: &StoragePath, to: &StoragePath) -> Result<()> {
        let mut objects = self.objects.write().await;
        let object = objects
            .remove(&from.as_key())
            .ok_or_else(|| Self::not_found(from))?;
        objects.insert(to.as_key(), object);
        Ok(())
    }

    async fn make_dir(&self, dir: &StoragePath) -> Result<()> {
        let key = Self::dir_key(dir);
        let mut objects = self.objects.write().await;

        if objects.contains_key(&key) {
            return Err(Error::AlreadyExists(format!(
                "Directory already exists: {}",
                dir
            )));
        }

        objects.insert(
            key,
            Object {
                data: Bytes::new(),
                modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn remove_dir(&self, dir: &StoragePath) -> Result<()> {
        let prefix = Self::dir_key(dir);
        self.objects
            .write()
            .await
            .retain(|key, _| !key.starts_with(&prefix));
        Ok(())
    }

    fn error_handler(&self) -> Option<&dyn ErrorHandler> {
        Some(&ErrorMapping::Http)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::read_to_end;

    fn path(p: &str) -> StoragePath {
        StoragePath::parse(p).unwrap()
    }

    #[tokio::test]
    async fn test_put_get() {
        let driver = MemoryDriver::new();
        let data = b"Hello, World!".to_vec();

        let receipt = driver.put(&path("dir/test.txt"), data.clone().into()).await.unwrap();
        assert_eq!(receipt.fields["Key"], "dir/test.txt");

        let read = read_to_end(&driver, &path("dir/test.txt")).await.unwrap();
        assert_eq!(read.as_ref(), data.as_slice());
    }

    #[tokio::test]
    async fn test_exists_and_delete() {
        let driver = MemoryDriver::new();
        let p = path("test.txt");

        assert!(!driver.exists(&p).await.unwrap());
        driver.put(&p, vec![1, 2, 3].into()).await.unwrap();
        assert!(driver.exists(&p).await.unwrap());

        assert!(driver.delete(&p).await.unwrap());
        assert!(!driver.exists(&p).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_object_is_http_404() {
        let driver = MemoryDriver::new();
        match driver.get(&path("missing.jpeg")).await {
            Err(Error::Backend(backend)) => assert!(backend.message.contains("missing.jpeg")),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[tokio::test]
    async fn test_copy_and_move() {
        let driver = MemoryDriver::new();
        driver.put(&path("original.txt"), vec![1, 2, 3].into()).await.unwrap();

        driver.copy(&path("original.txt"), &path("copy.txt")).await.unwrap();
        driver.move_file(&path("original.txt"), &path("moved.txt")).await.unwrap();

        assert!(!driver.exists(&path("original.txt")).await.unwrap());
        assert_eq!(driver.size(&path("copy.txt")).await.unwrap(), 3);
        assert_eq!(driver.size(&path("moved.txt")).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_dirs() {
        let driver = MemoryDriver::new();
        driver.make_dir(&path("photos")).await.unwrap();
        assert!(driver.make_dir(&path("photos")).await.is_err());

        driver.put(&path("photos/a.jpeg"), vec![1].into()).await.unwrap();
        driver.put(&path("photosynthesis.txt"), vec![1].into()).await.unwrap();
        driver.remove_dir(&path("photos")).await.unwrap();

        assert!(!driver.exists(&path("photos/a.jpeg")).await.unwrap());
        assert!(driver.exists(&path("photosynthesis.txt")).await.unwrap());
    }
}
