//! Post-write plugin hooks.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use filestorage_common::{Result, StoragePath};

use crate::driver::{Driver, PutData};

/// Factory that builds a fresh plugin instance.
///
/// The façade calls it on every (re)configuration, so a plugin instance is
/// never shared between two façades or reused across drivers.
pub type PluginFactory = Arc<dyn Fn() -> Box<dyn Plugin> + Send + Sync>;

/// Extension that runs around a [`crate::Storage::put`].
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Bind the plugin to the driver it will read from and write to.
    ///
    /// The plugin may keep the driver for its lifetime but never closes it.
    fn init(&mut self, driver: Arc<dyn Driver>);

    /// Key under which [`Plugin::after_put`] output is stored in the result.
    fn after_put_key(&self) -> Option<&str> {
        None
    }

    /// Runs before the driver write.
    async fn before_put(&self, _data: &PutData, _path: &StoragePath) -> Result<()> {
        Ok(())
    }

    /// Runs after the driver write succeeded.
    ///
    /// Returns `None` when the plugin has nothing to report, in which case
    /// its key is left out of the result entirely.
    async fn after_put(&self, _path: &StoragePath) -> Result<Option<Value>> {
        Ok(None)
    }
}

/// Wrap a constructor as a [`PluginFactory`].
pub fn plugin_factory<P, F>(make: F) -> PluginFactory
where
    P: Plugin + 'static,
    F: Fn() -> P + Send + Sync + 'static,
{
    Arc::new(move || Box::new(make()) as Box<dyn Plugin>)
}
