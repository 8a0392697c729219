//! Driver contract every storage backend implements.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::{stream, Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::pin::Pin;

use filestorage_common::{Error, Result, StoragePath};

/// Byte stream type for upload/download operations.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Data accepted by [`Driver::put`].
///
/// Every concrete source (buffer, string, stream) is adapted into this type at
/// the call boundary, so drivers only deal with one representation.
pub enum PutData {
    /// Complete content held in memory.
    Bytes(Bytes),
    /// Content produced incrementally.
    Stream(ByteStream),
}

impl PutData {
    /// Wrap a byte stream.
    pub fn stream(stream: impl Stream<Item = Result<Bytes>> + Send + 'static) -> Self {
        PutData::Stream(Box::pin(stream))
    }

    /// Collect the data into a single contiguous buffer.
    pub async fn into_bytes(self) -> Result<Bytes> {
        match self {
            PutData::Bytes(bytes) => Ok(bytes),
            PutData::Stream(stream) => collect_stream(stream).await,
        }
    }

    /// Convert the data into a byte stream.
    pub fn into_stream(self) -> ByteStream {
        match self {
            PutData::Bytes(bytes) => stream_from_bytes(bytes),
            PutData::Stream(stream) => stream,
        }
    }

    /// Length in bytes, when known without consuming the data.
    pub fn len_hint(&self) -> Option<usize> {
        match self {
            PutData::Bytes(bytes) => Some(bytes.len()),
            PutData::Stream(_) => None,
        }
    }
}

impl fmt::Debug for PutData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PutData::Bytes(bytes) => write!(f, "PutData::Bytes({} bytes)", bytes.len()),
            PutData::Stream(_) => write!(f, "PutData::Stream"),
        }
    }
}

impl From<Bytes> for PutData {
    fn from(bytes: Bytes) -> Self {
        PutData::Bytes(bytes)
    }
}

impl From<Vec<u8>> for PutData {
    fn from(data: Vec<u8>) -> Self {
        PutData::Bytes(Bytes::from(data))
    }
}

impl From<&[u8]> for PutData {
    fn from(data: &[u8]) -> Self {
        PutData::Bytes(Bytes::copy_from_slice(data))
    }
}

impl From<String> for PutData {
    fn from(text: String) -> Self {
        PutData::Bytes(Bytes::from(text))
    }
}

impl From<&str> for PutData {
    fn from(text: &str) -> Self {
        PutData::Bytes(Bytes::copy_from_slice(text.as_bytes()))
    }
}

impl From<ByteStream> for PutData {
    fn from(stream: ByteStream) -> Self {
        PutData::Stream(stream)
    }
}

/// Read a byte stream to the end.
pub async fn collect_stream(mut stream: ByteStream) -> Result<Bytes> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(&chunk?);
    }
    Ok(buffer.freeze())
}

/// Single-chunk stream over an in-memory buffer.
pub fn stream_from_bytes(bytes: Bytes) -> ByteStream {
    Box::pin(stream::once(async move { Ok(bytes) }))
}

/// File information reported by [`Driver::stats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// Whether this is a directory.
    pub is_directory: bool,
}

/// What a driver reports back from a successful write.
///
/// `fields` carries backend-native values (bucket, key, reply code, ...) and
/// is merged into the [`PutResult`] returned to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct PutReceipt {
    pub success: bool,
    pub message: String,
    pub fields: Map<String, Value>,
}

impl PutReceipt {
    /// The receipt drivers return when nothing backend-specific is worth reporting.
    pub fn uploaded() -> Self {
        Self {
            success: true,
            message: "Uploading success!".to_string(),
            fields: Map::new(),
        }
    }

    /// Attach a backend-native field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Result of [`crate::Storage::put`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PutResult {
    pub success: bool,
    pub message: String,
    pub name: String,
    pub path: String,
    /// Backend-native fields and plugin outputs, serialized inline.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PutResult {
    /// Provisional result built before the driver is called.
    pub fn provisional(path: &StoragePath) -> Self {
        Self {
            success: true,
            message: "Uploading success".to_string(),
            name: path.name().unwrap_or_default().to_string(),
            path: path.as_key(),
            extra: Map::new(),
        }
    }

    /// Merge a driver receipt; the driver's values win on conflict.
    pub fn merge(&mut self, receipt: PutReceipt) {
        self.success = receipt.success;
        self.message = receipt.message;
        self.extra.extend(receipt.fields);
    }

    /// Get a backend field or plugin output.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Whether a field or plugin output is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.extra.contains_key(key)
    }

    /// Deserialize a field or plugin output into a typed value.
    pub fn field<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.extra
            .get(key)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
            .map_err(Error::from)
    }
}

/// Driver operation, passed to error handlers for context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Url,
    Exists,
    Stats,
    Size,
    LastModified,
    Put,
    Get,
    Delete,
    Copy,
    Move,
    MakeDir,
    RemoveDir,
    Close,
}

/// Translates backend-specific failures into the normalized taxonomy.
pub trait ErrorHandler: Send + Sync {
    /// Map `error`, raised by `op`, onto `FileNotFound`, `Unauthenticated`,
    /// `MoveFailed`, or return it unchanged.
    fn handle(&self, op: Operation, error: Error) -> Error;
}

/// Storage driver trait for different backends.
///
/// All I/O is async. Drivers are shared behind `Arc`, so they handle their
/// own interior mutability and connection lifecycle.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Get the driver identifier (e.g., "local", "memory", "s3").
    fn name(&self) -> &str;

    /// Public URL of a file.
    fn url(&self, path: &StoragePath) -> Result<String>;

    /// Check if a file exists.
    async fn exists(&self, path: &StoragePath) -> Result<bool>;

    /// Get file information.
    ///
    /// # Errors
    /// - File not found
    /// - `NotSupported` when the driver has no stat capability
    async fn stats(&self, path: &StoragePath) -> Result<FileStat> {
        Err(Error::NotSupported(format!(
            "Driver '{}' does not provide stats for {}",
            self.name(),
            path
        )))
    }

    /// Size of a file in bytes.
    async fn size(&self, path: &StoragePath) -> Result<u64> {
        Ok(self.stats(path).await?.size)
    }

    /// Last modification time in milliseconds since the Unix epoch.
    async fn last_modified(&self, path: &StoragePath) -> Result<i64> {
        Ok(self.stats(path).await?.last_modified.timestamp_millis())
    }

    /// Write data to a file, creating missing parent directories.
    ///
    /// # Postconditions
    /// - File is created or replaced at the specified path
    async fn put(&self, path: &StoragePath, data: PutData) -> Result<PutReceipt>;

    /// Read a file as a stream.
    ///
    /// # Errors
    /// - File not found
    async fn get(&self, path: &StoragePath) -> Result<ByteStream>;

    /// Delete a file.
    async fn delete(&self, path: &StoragePath) -> Result<bool>;

    /// Copy a file to a new location.
    async fn copy(&self, from: &StoragePath, to: &StoragePath) -> Result<()>;

    /// Move a file to a new location.
    async fn move_file(&self, from: &StoragePath, to: &StoragePath) -> Result<()>;

    /// Create a directory, including missing parents.
    ///
    /// # Errors
    /// - Directory already exists
    async fn make_dir(&self, dir: &StoragePath) -> Result<()>;

    /// Remove a directory and everything in it.
    async fn remove_dir(&self, dir: &StoragePath) -> Result<()>;

    /// Release held connections.
    async fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Backend error translation, if this driver has one.
    fn error_handler(&self) -> Option<&dyn ErrorHandler> {
        None
    }
}

/// Read a whole file through a driver.
pub async fn read_to_end(driver: &dyn Driver, path: &StoragePath) -> Result<Bytes> {
    let stream = driver.get(path).await?;
    collect_stream(stream).await
}
