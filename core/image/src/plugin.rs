//! The image derivation plugin.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use filestorage_common::{Error, Result, StoragePath};
use filestorage_storage::{plugin_factory, Driver, Plugin, PluginFactory, PutData};

use crate::config::ImageManipulationOptions;
use crate::derive::{generate_variants, processable_format};
use crate::stats::{image_stats, ImageStats};

/// Key of the plugin output in put results.
pub const FORMATS_KEY: &str = "formats";

/// Generates a thumbnail and responsive variants for uploaded images.
pub struct ImageManipulation {
    options: ImageManipulationOptions,
    driver: Option<Arc<dyn Driver>>,
}

impl ImageManipulation {
    pub fn new(options: ImageManipulationOptions) -> Self {
        Self {
            options,
            driver: None,
        }
    }

    /// Factory to register in a [`filestorage_storage::StorageConfig`].
    pub fn factory(options: ImageManipulationOptions) -> PluginFactory {
        plugin_factory(move || ImageManipulation::new(options.clone()))
    }

    pub fn options(&self) -> &ImageManipulationOptions {
        &self.options
    }

    /// Write a variant next to the original and strip its buffer.
    async fn store(&self, driver: &dyn Driver, variant: ImageStats) -> Option<ImageStats> {
        let buffer = variant.buffer.clone()?;
        let path = StoragePath::parse(&variant.path).ok()?;

        match driver.put(&path, PutData::Bytes(buffer)).await {
            Ok(_) => Some(variant.without_buffer()),
            Err(e) => {
                warn!(path = %variant.path, error = %e, "failed to store image variant");
                None
            }
        }
    }
}

impl Default for ImageManipulation {
    fn default() -> Self {
        Self::new(ImageManipulationOptions::default())
    }
}

#[async_trait]
impl Plugin for ImageManipulation {
    fn init(&mut self, driver: Arc<dyn Driver>) {
        self.driver = Some(driver);
    }

    fn after_put_key(&self) -> Option<&str> {
        Some(FORMATS_KEY)
    }

    async fn after_put(&self, path: &StoragePath) -> Result<Option<Value>> {
        let driver = self
            .driver
            .as_deref()
            .ok_or_else(|| Error::InvalidInput("Image plugin used before init".to_string()))?;

        let source = match image_stats(driver, path, true).await {
            Ok(source) => source,
            Err(e) => {
                debug!(path = %path, error = %e, "not an image, skipping derivation");
                return Ok(None);
            }
        };

        if source.buffer.as_deref().and_then(processable_format).is_none() {
            debug!(path = %path, mime = %source.mime, "image format not processed");
            return Ok(None);
        }

        let mut formats = Map::new();

        for (key, variant) in generate_variants(&source, &self.options).await {
            if let Some(stored) = self.store(driver, variant).await {
                formats.insert(key, serde_json::to_value(stored)?);
            }
        }

        if formats.is_empty() {
            return Ok(None);
        }

        info!(path = %path, variants = formats.len(), "image variants generated");
        Ok(Some(Value::Object(formats)))
    }
}
