//! Common error types for filestorage.

use std::fmt;
use thiserror::Error;

/// Top-level error type for storage operations.
///
/// The first group of variants is configuration failures, raised synchronously
/// while resolving disks. The second group is the normalized I/O taxonomy
/// every driver failure is mapped onto. The rest are supporting errors that
/// pass through normalization when no mapping applies.
#[derive(Debug, Error)]
pub enum Error {
    /// Two configured disks share a name.
    #[error("Duplicated disk name: {0}")]
    DuplicatedDiskName(String),

    /// More than one disk is configured and none was chosen as default.
    #[error("Missing default disk: {count} disks are configured but no default disk name was given")]
    MissingDefaultDisk { count: usize },

    /// A disk name does not match any configured disk.
    #[error("Given disk is not defined: {0}")]
    DiskNotDefined(String),

    /// A driver identifier could not be resolved or instantiated.
    #[error("{0}")]
    DriverNotDeclared(String),

    /// The backend reports that the resource is absent.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// The backend rejected the credentials or the authorization.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// A backend-level rename or move failed.
    #[error("File move failed: {0}")]
    MoveFailed(String),

    /// Raw failure reported by a backend, before normalization.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network transfer failed.
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Image decoding or encoding failed.
    #[error("Image error: {0}")]
    Image(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The driver does not implement this capability.
    #[error("Not supported: {0}")]
    NotSupported(String),
}

impl Error {
    /// Whether this error is one of the normalized I/O kinds.
    pub fn is_normalized(&self) -> bool {
        matches!(
            self,
            Error::FileNotFound(_) | Error::Unauthenticated(_) | Error::MoveFailed(_)
        )
    }

    /// Whether this error means the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::FileNotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Backend-specific failure signal carried by [`BackendError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendSignal {
    /// HTTP status code returned by an object store or API.
    HttpStatus(u16),
    /// Error code string reported by an S3-compatible service.
    S3Code(String),
    /// Credentials could not be loaded or were rejected by the SDK.
    CredentialProvider,
    /// SFTP status code (SSH_FX_*).
    SftpStatus(u32),
    /// FTP reply code.
    FtpReply(u16),
    /// Anything else.
    Other,
}

impl fmt::Display for BackendSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendSignal::HttpStatus(status) => write!(f, "HTTP {}", status),
            BackendSignal::S3Code(code) => write!(f, "S3 {}", code),
            BackendSignal::CredentialProvider => write!(f, "credentials"),
            BackendSignal::SftpStatus(code) => write!(f, "SFTP {}", code),
            BackendSignal::FtpReply(code) => write!(f, "FTP {}", code),
            BackendSignal::Other => write!(f, "backend"),
        }
    }
}

/// A failure reported by a storage backend, with the signal it was raised with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{signal}: {message}")]
pub struct BackendError {
    pub signal: BackendSignal,
    pub message: String,
}

impl BackendError {
    /// Create a backend error from a signal and message.
    pub fn new(signal: BackendSignal, message: impl Into<String>) -> Self {
        Self {
            signal,
            message: message.into(),
        }
    }

    /// Shorthand for an HTTP status failure.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::new(BackendSignal::HttpStatus(status), message)
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
