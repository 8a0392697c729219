//! Disk abstraction and storage façade.
//!
//! Applications describe named disks in a [`StorageConfig`], each backed by a
//! driver, and talk to them through a [`Storage`] façade. The façade adds
//! unique file naming and plugin hooks on top of the driver calls.
//!
//! # Design Principles
//! - Driver isolation: backend-specific failures are normalized before they
//!   reach callers
//! - No global state: drivers are looked up in a [`DriverRegistry`] owned by
//!   a [`StorageContext`]
//! - Async operations: all I/O is async and file bodies can be streamed

pub mod config;
pub mod connection;
pub mod context;
pub mod driver;
pub mod facade;
pub mod local;
pub mod memory;
pub mod normalize;
pub mod plugin;
pub mod registry;
pub mod remote;

pub use config::{DiskConfig, DiskOptions, DriverFactory, DriverName, DriverRef, StorageConfig};
pub use connection::{Connector, IdleConnection};
pub use context::StorageContext;
pub use driver::{
    collect_stream, read_to_end, ByteStream, Driver, ErrorHandler, FileStat, Operation, PutData,
    PutReceipt, PutResult,
};
pub use facade::Storage;
pub use local::LocalDriver;
pub use memory::MemoryDriver;
pub use normalize::{ErrorMapping, Normalized};
pub use plugin::{plugin_factory, Plugin, PluginFactory};
pub use registry::{DiskSet, DriverRegistry};
