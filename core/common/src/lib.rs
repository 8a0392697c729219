//! Common utilities and types shared across the filestorage crates.
//!
//! This module provides the error taxonomy every driver failure is normalized
//! onto, and the logical path type used by all storage operations.

pub mod error;
pub mod types;

pub use error::{BackendError, BackendSignal, Error, Result};
pub use types::StoragePath;
