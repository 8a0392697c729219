//! Error normalization for driver calls.
//!
//! Every driver handed out by the registry is wrapped in [`Normalized`], so
//! callers only ever see the closed taxonomy (`FileNotFound`,
//! `Unauthenticated`, `MoveFailed`) for the failures a backend can signal, and
//! the original error for everything else.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::sync::Arc;
use tracing::debug;

use filestorage_common::{BackendSignal, Error, Result, StoragePath};

use crate::driver::{ByteStream, Driver, ErrorHandler, FileStat, Operation, PutData, PutReceipt};

/// Built-in error translations, one per backend family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorMapping {
    /// POSIX errno values surfaced as `std::io::Error`.
    Posix,
    /// HTTP status codes (object stores, GCS, the memory driver).
    Http,
    /// S3 error codes and credential-provider failures.
    S3,
    /// SFTP status codes.
    Sftp,
    /// FTP reply codes.
    Ftp,
}

impl ErrorMapping {
    fn classify(&self, error: &Error) -> Option<Kind> {
        match (self, error) {
            (ErrorMapping::Posix, Error::Io(io)) => match io.kind() {
                ErrorKind::NotFound => Some(Kind::NotFound),
                ErrorKind::PermissionDenied => Some(Kind::Unauthenticated),
                _ => Some(Kind::Unrecognized),
            },
            (ErrorMapping::Http, Error::Backend(backend)) => match backend.signal {
                BackendSignal::HttpStatus(404) => Some(Kind::NotFound),
                BackendSignal::HttpStatus(401) | BackendSignal::HttpStatus(403) => {
                    Some(Kind::Unauthenticated)
                }
                _ => Some(Kind::Unrecognized),
            },
            (ErrorMapping::S3, Error::Backend(backend)) => match &backend.signal {
                BackendSignal::S3Code(code) if code == "NoSuchKey" || code == "NotFound" => {
                    Some(Kind::NotFound)
                }
                BackendSignal::S3Code(code)
                    if code == "InvalidAccessKeyId" || code == "SignatureDoesNotMatch" =>
                {
                    Some(Kind::Unauthenticated)
                }
                BackendSignal::HttpStatus(404) => Some(Kind::NotFound),
                BackendSignal::CredentialProvider => Some(Kind::Unauthenticated),
                _ => Some(Kind::Unrecognized),
            },
            (ErrorMapping::Sftp, Error::Backend(backend)) => match backend.signal {
                // SSH_FX_NO_SUCH_FILE, SSH_FX_FAILURE
                BackendSignal::SftpStatus(2) | BackendSignal::SftpStatus(4) => {
                    Some(Kind::NotFound)
                }
                _ => Some(Kind::Unrecognized),
            },
            (ErrorMapping::Ftp, Error::Backend(backend)) => match backend.signal {
                BackendSignal::FtpReply(550) => Some(Kind::NotFound),
                BackendSignal::FtpReply(530) => Some(Kind::Unauthenticated),
                BackendSignal::FtpReply(553) => Some(Kind::MoveFailed),
                _ => Some(Kind::Unrecognized),
            },
            _ => None,
        }
    }
}

enum Kind {
    NotFound,
    Unauthenticated,
    MoveFailed,
    Unrecognized,
}

impl ErrorHandler for ErrorMapping {
    fn handle(&self, op: Operation, error: Error) -> Error {
        if error.is_normalized() {
            return error;
        }

        let kind = match self.classify(&error) {
            Some(kind) => kind,
            None => return error,
        };

        let message = match &error {
            Error::Backend(backend) => backend.message.clone(),
            other => other.to_string(),
        };

        match kind {
            Kind::NotFound => Error::FileNotFound(message),
            Kind::Unauthenticated => Error::Unauthenticated(message),
            Kind::MoveFailed => Error::MoveFailed(message),
            Kind::Unrecognized if op == Operation::Move => Error::MoveFailed(message),
            Kind::Unrecognized => error,
        }
    }
}

/// Decorator that routes every failure of the inner driver through its
/// error handler.
pub struct Normalized {
    inner: Arc<dyn Driver>,
}

impl Normalized {
    /// Wrap a driver.
    pub fn new(inner: Arc<dyn Driver>) -> Self {
        Self { inner }
    }

    /// Wrap a driver and erase the type.
    pub fn wrap(inner: Arc<dyn Driver>) -> Arc<dyn Driver> {
        Arc::new(Self::new(inner))
    }

    fn normalize<T>(&self, op: Operation, result: Result<T>) -> Result<T> {
        result.map_err(|error| match self.inner.error_handler() {
            Some(handler) => {
                let normalized = handler.handle(op, error);
                debug!(driver = self.inner.name(), ?op, error = %normalized, "driver call failed");
                normalized
            }
            None => error,
        })
    }
}

#[async_trait]
impl Driver for Normalized {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn url(&self, path: &StoragePath) -> Result<String> {
        self.normalize(Operation::Url, self.inner.url(path))
    }

    async fn exists(&self, path: &StoragePath) -> Result<bool> {
        let result = self.inner.exists(path).await;
        self.normalize(Operation::Exists, result)
    }

    async fn stats(&self, path: &StoragePath) -> Result<FileStat> {
        let result = self.inner.stats(path).await;
        self.normalize(Operation::Stats, result)
    }

    async fn size(&self, path: &StoragePath) -> Result<u64> {
        let result = self.inner.size(path).await;
        self.normalize(Operation::Size, result)
    }

    async fn last_modified(&self, path: &StoragePath) -> Result<i64> {
        let result = self.inner.last_modified(path).await;
        self.normalize(Operation::LastModified, result)
    }

    async fn put(&self, path: &StoragePath, data: PutData) -> Result<PutReceipt> {
        let result = self.inner.put(path, data).await;
        self.normalize(Operation::Put, result)
    }

    async fn get(&self, path: &StoragePath) -> Result<ByteStream> {
        let result = self.inner.get(path).await;
        self.normalize(Operation::Get, result)
    }

    async fn delete(&self, path: &StoragePath) -> Result<bool> {
        let result = self.inner.delete(path).await;
        self.normalize(Operation::Delete, result)
    }

    async fn copy(&self, from: &StoragePath, to: &StoragePath) -> Result<()> {
        let result = self.inner.copy(from, to).await;
        self.normalize(Operation::Copy, result)
    }

    async fn move_file(&self, from: &StoragePath, to: &StoragePath) -> Result<()> {
        let result = self.inner.move_file(from, to).await;
        self.normalize(Operation::Move, result)
    }

    async fn make_dir(&self, dir: &StoragePath) -> Result<()> {
        let result = self.inner.make_dir(dir).await;
        self.normalize(Operation::MakeDir, result)
    }

    async fn remove_dir(&self, dir: &StoragePath) -> Result<()> {
        let result = self.inner.remove_dir(dir).await;
        self.normalize(Operation::RemoveDir, result)
    }

    async fn close(&self) -> Result<()> {
        let result = self.inner.close().await;
        self.normalize(Operation::Close, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filestorage_common::BackendError;
    use std::io;

    fn backend(signal: BackendSignal, message: &str) -> Error {
        Error::Backend(BackendError::new(signal, message))
    }

    #[test]
    fn test_posix_mapping() {
        let err = ErrorMapping::Posix.handle(
            Operation::Get,
            Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                "No such file or directory",
            )),
        );
        match err {
            Error::FileNotFound(message) => assert!(message.contains("No such file or directory")),
            other => panic!("unexpected error: {other:?}"),
        }

        let err = ErrorMapping::Posix.handle(
            Operation::Move,
            Error::Io(io::Error::new(io::ErrorKind::Other, "cross-device link")),
        );
        assert!(matches!(err, Error::MoveFailed(_)));

        let err = ErrorMapping::Posix.handle(
            Operation::Put,
            Error::Io(io::Error::new(io::ErrorKind::Other, "disk full")),
        );
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_http_mapping() {
        let err = ErrorMapping::Http.handle(
            Operation::Get,
            backend(BackendSignal::HttpStatus(404), "missing"),
        );
        assert!(matches!(err, Error::FileNotFound(ref m) if m == "missing"));

        let err = ErrorMapping::Http.handle(
            Operation::Put,
            backend(BackendSignal::HttpStatus(401), "expired"),
        );
        assert!(matches!(err, Error::Unauthenticated(_)));

        let err = ErrorMapping::Http.handle(
            Operation::Put,
            backend(BackendSignal::HttpStatus(503), "busy"),
        );
        assert!(matches!(err, Error::Backend(_)));
    }

    #[test]
    fn test_s3_mapping() {
        let err = ErrorMapping::S3.handle(
            Operation::Get,
            backend(
                BackendSignal::S3Code("NoSuchKey".to_string()),
                "The specified key does not exist.",
            ),
        );
        assert!(matches!(err, Error::FileNotFound(_)));

        let err = ErrorMapping::S3.handle(
            Operation::Get,
            backend(BackendSignal::CredentialProvider, "no credentials"),
        );
        assert!(matches!(err, Error::Unauthenticated(_)));
    }

    #[test]
    fn test_sftp_and_ftp_mapping() {
        let err = ErrorMapping::Sftp.handle(
            Operation::Get,
            backend(BackendSignal::SftpStatus(2), "No such file"),
        );
        assert!(matches!(err, Error::FileNotFound(_)));

        let err = ErrorMapping::Ftp.handle(
            Operation::Get,
            backend(BackendSignal::FtpReply(550), "File unavailable"),
        );
        assert!(matches!(err, Error::FileNotFound(_)));

        let err = ErrorMapping::Ftp.handle(
            Operation::Exists,
            backend(BackendSignal::FtpReply(530), "Not logged in"),
        );
        assert!(matches!(err, Error::Unauthenticated(_)));

        let err = ErrorMapping::Ftp.handle(
            Operation::Move,
            backend(BackendSignal::FtpReply(451), "aborted"),
        );
        assert!(matches!(err, Error::MoveFailed(_)));
    }

    #[test]
    fn test_foreign_errors_pass_through() {
        let err = ErrorMapping::Sftp.handle(Operation::Get, Error::InvalidInput("bad".to_string()));
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = ErrorMapping::Http.handle(
            Operation::Move,
            Error::FileNotFound("gone".to_string()),
        );
        assert!(matches!(err, Error::FileNotFound(_)));
    }
}
