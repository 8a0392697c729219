//! Application-wide storage context.

use std::sync::Arc;

use filestorage_common::Result;

use crate::config::StorageConfig;
use crate::facade::Storage;
use crate::registry::DriverRegistry;

/// Owns the driver catalogue shared by every façade an application creates.
///
/// Build it once at start-up, after registering any extra drivers, and hand
/// clones to the code that needs storage.
#[derive(Clone)]
pub struct StorageContext {
    registry: Arc<DriverRegistry>,
}

impl StorageContext {
    /// Context with the in-tree drivers.
    pub fn new() -> Self {
        Self::with_registry(DriverRegistry::with_builtins())
    }

    /// Context over a prepared registry.
    pub fn with_registry(registry: DriverRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// The driver catalogue.
    pub fn registry(&self) -> &DriverRegistry {
        &self.registry
    }

    /// Build a façade from a configuration.
    ///
    /// # Errors
    /// - Any configuration error from disk or driver resolution
    pub fn storage(&self, config: StorageConfig) -> Result<Storage> {
        Storage::new(self.registry.clone(), config)
    }
}

impl Default for StorageContext {
    fn default() -> Self {
        Self::new()
    }
}
