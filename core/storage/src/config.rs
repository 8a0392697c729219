//! Disk and storage configuration.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use filestorage_common::Result;

use crate::driver::Driver;
use crate::plugin::PluginFactory;

/// Factory function type for creating drivers from a disk configuration.
pub type DriverFactory = Arc<dyn Fn(&DiskConfig) -> Result<Arc<dyn Driver>> + Send + Sync>;

/// Identifiers of the drivers this crate knows about.
///
/// `Local` and `Memory` ship in-tree and are registered by default. The
/// remote drivers are recognized by name but need a backend implementation
/// registered by the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverName {
    Local,
    Memory,
    S3,
    Ftp,
    Sftp,
    Gcs,
}

impl DriverName {
    /// All known identifiers.
    pub const ALL: [DriverName; 6] = [
        DriverName::Local,
        DriverName::Memory,
        DriverName::S3,
        DriverName::Ftp,
        DriverName::Sftp,
        DriverName::Gcs,
    ];

    /// The identifier string used in configurations.
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverName::Local => "local",
            DriverName::Memory => "memory",
            DriverName::S3 => "s3",
            DriverName::Ftp => "ftp",
            DriverName::Sftp => "sftp",
            DriverName::Gcs => "gcs",
        }
    }

    /// Look up a known identifier.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|driver| driver.as_str() == name)
    }
}

impl fmt::Display for DriverName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a disk refers to its driver.
#[derive(Clone)]
pub enum DriverRef {
    /// Identifier looked up in the registry.
    Named(String),
    /// Factory supplied inline, bypassing the registry.
    Factory(DriverFactory),
}

impl DriverRef {
    /// Wrap an inline factory.
    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn(&DiskConfig) -> Result<Arc<dyn Driver>> + Send + Sync + 'static,
    {
        DriverRef::Factory(Arc::new(factory))
    }

    /// Human-readable label used in errors and logs.
    pub fn label(&self) -> &str {
        match self {
            DriverRef::Named(name) => name,
            DriverRef::Factory(_) => "<inline factory>",
        }
    }
}

impl fmt::Debug for DriverRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverRef::Named(name) => f.debug_tuple("Named").field(name).finish(),
            DriverRef::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

impl From<DriverName> for DriverRef {
    fn from(name: DriverName) -> Self {
        DriverRef::Named(name.as_str().to_string())
    }
}

impl From<&str> for DriverRef {
    fn from(name: &str) -> Self {
        DriverRef::Named(name.to_string())
    }
}

impl From<String> for DriverRef {
    fn from(name: String) -> Self {
        DriverRef::Named(name)
    }
}

impl<'de> Deserialize<'de> for DriverRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        if name.is_empty() {
            return Err(de::Error::custom("driver identifier cannot be empty"));
        }
        Ok(DriverRef::Named(name))
    }
}

/// Configuration of one disk.
///
/// `options` holds the backend-specific fields: `root` for the local driver,
/// bucket and credentials for object stores, access options for FTP/SFTP.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskConfig {
    /// Unique disk name.
    pub name: String,
    /// Driver backing this disk.
    pub driver: DriverRef,
    /// Public base URL used instead of the driver's default.
    #[serde(default)]
    pub public_url: Option<String>,
    /// Backend-specific options.
    #[serde(default)]
    pub options: Value,
}

impl DiskConfig {
    /// Create a disk configuration with no options.
    pub fn new(name: impl Into<String>, driver: impl Into<DriverRef>) -> Self {
        Self {
            name: name.into(),
            driver: driver.into(),
            public_url: None,
            options: Value::Null,
        }
    }

    /// Local filesystem disk rooted at `root`.
    pub fn local(name: impl Into<String>, root: impl Into<String>) -> Self {
        Self::new(name, DriverName::Local).with_option("root", root.into())
    }

    /// In-memory disk.
    pub fn memory(name: impl Into<String>) -> Self {
        Self::new(name, DriverName::Memory)
    }

    /// Set the public base URL.
    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = Some(url.into());
        self
    }

    /// Set a backend-specific option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if !self.options.is_object() {
            self.options = Value::Object(serde_json::Map::new());
        }
        if let Value::Object(map) = &mut self.options {
            map.insert(key.into(), value.into());
        }
        self
    }

    /// Read a string option.
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(|v| v.as_str())
    }
}

/// Everything needed to build a [`crate::Storage`].
#[derive(Clone, Default)]
pub struct StorageConfig {
    /// Name of the disk the façade operates on.
    pub default_disk: Option<String>,
    /// Configured disks. Empty means one implicit local disk.
    pub disks: Vec<DiskConfig>,
    /// Plugins, in the order their hooks run.
    pub plugins: Vec<PluginFactory>,
    /// Replace uploaded file names with random tokens.
    pub unique_file_name: bool,
}

impl StorageConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a disk.
    pub fn with_disk(mut self, disk: DiskConfig) -> Self {
        self.disks.push(disk);
        self
    }

    /// Replace the disk list.
    pub fn with_disks(mut self, disks: Vec<DiskConfig>) -> Self {
        self.disks = disks;
        self
    }

    /// Set the default disk name.
    pub fn with_default_disk(mut self, name: impl Into<String>) -> Self {
        self.default_disk = Some(name.into());
        self
    }

    /// Add a plugin.
    pub fn with_plugin(mut self, plugin: PluginFactory) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Enable or disable unique file names.
    pub fn with_unique_file_name(mut self, enabled: bool) -> Self {
        self.unique_file_name = enabled;
        self
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("default_disk", &self.default_disk)
            .field("disks", &self.disks)
            .field("plugins", &self.plugins.len())
            .field("unique_file_name", &self.unique_file_name)
            .finish()
    }
}

/// Overrides applied when forking a façade onto another disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskOptions {
    /// Override the unique file name setting.
    pub unique_file_name: Option<bool>,
}

impl DiskOptions {
    /// Override the unique file name setting.
    pub fn unique_file_name(enabled: bool) -> Self {
        Self {
            unique_file_name: Some(enabled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_config_deserialization() {
        let json = r#"[
            {"name": "local", "driver": "local", "options": {"root": "storage"}},
            {"name": "assets", "driver": "s3", "publicUrl": "https://cdn.example.com",
             "options": {"bucket": "assets"}}
        ]"#;

        let disks: Vec<DiskConfig> = serde_json::from_str(json).unwrap();
        assert_eq!(disks.len(), 2);
        assert_eq!(disks[0].option_str("root"), Some("storage"));
        assert_eq!(disks[1].driver.label(), "s3");
        assert_eq!(disks[1].public_url.as_deref(), Some("https://cdn.example.com"));
    }

    #[test]
    fn test_empty_driver_rejected() {
        let result: std::result::Result<DiskConfig, _> =
            serde_json::from_str(r#"{"name": "x", "driver": ""}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_driver_name_parse() {
        assert_eq!(DriverName::parse("sftp"), Some(DriverName::Sftp));
        assert_eq!(DriverName::parse("onedriver"), None);
        for name in DriverName::ALL {
            assert_eq!(DriverName::parse(name.as_str()), Some(name));
        }
    }

    #[test]
    fn test_with_option_builds_object() {
        let disk = DiskConfig::local("local", "storage").with_option("mode", 0o644);
        assert_eq!(disk.option_str("root"), Some("storage"));
        assert_eq!(disk.options["mode"], 0o644);
    }
}
