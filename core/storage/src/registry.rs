//! Driver registry and disk resolution.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use filestorage_common::{Error, Result};

use crate::config::{DiskConfig, DriverFactory, DriverName, DriverRef};
use crate::driver::Driver;
use crate::normalize::Normalized;

/// Registry for driver factories.
///
/// Maps driver identifiers to the factories that build them. Registrations
/// are only ever added.
pub struct DriverRegistry {
    factories: HashMap<String, DriverFactory>,
}

impl DriverRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry with the in-tree drivers (`local`, `memory`).
    pub fn with_builtins() -> Self {
        let mut factories: HashMap<String, DriverFactory> = HashMap::new();

        factories.insert(
            DriverName::Local.as_str().to_string(),
            Arc::new(|config: &DiskConfig| -> Result<Arc<dyn Driver>> {
                let root = config.option_str("root").ok_or_else(|| {
                    Error::InvalidInput("Local driver requires 'root' path".to_string())
                })?;
                let driver = crate::local::LocalDriver::new(root)?
                    .with_public_url(config.public_url.clone());
                Ok(Arc::new(driver) as Arc<dyn Driver>)
            }),
        );

        factories.insert(
            DriverName::Memory.as_str().to_string(),
            Arc::new(|config: &DiskConfig| -> Result<Arc<dyn Driver>> {
                let driver = crate::memory::MemoryDriver::new()
                    .with_public_url(config.public_url.clone());
                Ok(Arc::new(driver) as Arc<dyn Driver>)
            }),
        );

        Self { factories }
    }

    /// Register a driver factory.
    ///
    /// # Errors
    /// - Returns error if the identifier is already registered
    pub fn register(&mut self, name: impl Into<String>, factory: DriverFactory) -> Result<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(Error::AlreadyExists(format!(
                "Driver '{}' is already registered",
                name
            )));
        }
        debug!(driver = %name, "registered driver");
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Get list of registered driver identifiers.
    pub fn drivers(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Check if a driver is registered.
    pub fn has_driver(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Find the factory a disk refers to.
    ///
    /// # Errors
    /// - `DriverNotDeclared` if the identifier is unknown, or is a known
    ///   built-in whose backend was never registered
    pub fn resolve(&self, driver: &DriverRef) -> Result<DriverFactory> {
        let name = match driver {
            DriverRef::Factory(factory) => return Ok(factory.clone()),
            DriverRef::Named(name) => name,
        };

        if let Some(factory) = self.factories.get(name) {
            return Ok(factory.clone());
        }

        match DriverName::parse(name) {
            Some(_) => Err(Error::DriverNotDeclared(format!(
                "Driver '{}' is not installed: register a '{}' backend before configuring this disk",
                name, name
            ))),
            None => Err(Error::DriverNotDeclared(format!(
                "Driver '{}' is not declared.",
                name
            ))),
        }
    }

    /// Build the driver for a disk, wrapped for error normalization.
    ///
    /// # Errors
    /// - `DriverNotDeclared` if the driver cannot be resolved or its factory
    ///   fails
    pub fn instantiate(&self, disk: &DiskConfig) -> Result<Arc<dyn Driver>> {
        let factory = self.resolve(&disk.driver)?;
        let driver = factory(disk).map_err(|e| {
            Error::DriverNotDeclared(format!(
                "Driver '{}' could not be created for disk '{}': {}",
                disk.driver.label(),
                disk.name,
                e
            ))
        })?;
        debug!(disk = %disk.name, driver = driver.name(), "instantiated driver");
        Ok(Normalized::wrap(driver))
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Name of the disk synthesized when no disk is configured.
pub const IMPLICIT_DISK_NAME: &str = "local";

/// Root of the disk synthesized when no disk is configured.
pub const IMPLICIT_DISK_ROOT: &str = "storage";

/// A validated set of disk configurations with a resolved default.
#[derive(Debug, Clone)]
pub struct DiskSet {
    disks: Vec<DiskConfig>,
    default_disk: String,
}

impl DiskSet {
    /// Validate disk configurations and pick the default disk.
    ///
    /// # Errors
    /// - `DuplicatedDiskName` if two disks share a name
    /// - `MissingDefaultDisk` if several disks exist and no default is given
    /// - `DiskNotDefined` if the default does not name a configured disk
    pub fn resolve(disks: Vec<DiskConfig>, default_disk: Option<&str>) -> Result<Self> {
        let mut seen = HashSet::new();
        for disk in &disks {
            if !seen.insert(disk.name.as_str()) {
                return Err(Error::DuplicatedDiskName(disk.name.clone()));
            }
        }

        let disks = if disks.is_empty() {
            vec![DiskConfig::local(IMPLICIT_DISK_NAME, IMPLICIT_DISK_ROOT)]
        } else {
            disks
        };

        let default_disk = match default_disk {
            Some(name) => name.to_string(),
            None if disks.len() == 1 => disks[0].name.clone(),
            None => return Err(Error::MissingDefaultDisk { count: disks.len() }),
        };

        let set = Self {
            disks,
            default_disk,
        };
        set.get(&set.default_disk)?;
        Ok(set)
    }

    /// Look up a disk by name.
    pub fn get(&self, name: &str) -> Result<&DiskConfig> {
        self.disks
            .iter()
            .find(|disk| disk.name == name)
            .ok_or_else(|| Error::DiskNotDefined(name.to_string()))
    }

    /// Name of the default disk.
    pub fn default_disk(&self) -> &str {
        &self.default_disk
    }

    /// All configured disks.
    pub fn disks(&self) -> &[DiskConfig] {
        &self.disks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDriver;
    use serde_json::Value;
    use tempfile::TempDir;

    fn memory_factory() -> DriverFactory {
        Arc::new(|_: &DiskConfig| -> Result<Arc<dyn Driver>> {
            Ok(Arc::new(MemoryDriver::new()))
        })
    }

    #[test]
    fn test_register_and_instantiate() {
        let mut registry = DriverRegistry::new();
        registry.register("test", memory_factory()).unwrap();

        let driver = registry.instantiate(&DiskConfig::new("disk", "test")).unwrap();
        assert_eq!(driver.name(), "memory");
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = DriverRegistry::new();
        registry.register("test", memory_factory()).unwrap();

        let result = registry.register("test", memory_factory());
        assert!(matches!(result, Err(Error::AlreadyExists(_))));
    }

    #[test]
    fn test_builtins_registered() {
        let registry = DriverRegistry::with_builtins();
        assert!(registry.has_driver("local"));
        assert!(registry.has_driver("memory"));
        assert!(!registry.has_driver("s3"));
    }

    #[test]
    fn test_unknown_driver_not_declared() {
        let registry = DriverRegistry::with_builtins();
        let result = registry.instantiate(&DiskConfig::new("disk", "onedriver"));
        match result {
            Err(Error::DriverNotDeclared(message)) => {
                assert_eq!(message, "Driver 'onedriver' is not declared.");
            }
            other => panic!("unexpected result: {:?}", other.map(|d| d.name().to_string())),
        }
    }

    #[test]
    fn test_builtin_without_backend_not_installed() {
        let registry = DriverRegistry::with_builtins();
        let result = registry.instantiate(&DiskConfig::new("assets", DriverName::S3));
        match result {
            Err(Error::DriverNotDeclared(message)) => {
                assert!(message.contains("'s3'"));
                assert!(message.contains("not installed"));
            }
            other => panic!("unexpected result: {:?}", other.map(|d| d.name().to_string())),
        }
    }

    #[test]
    fn test_factory_failure_is_not_declared() {
        let registry = DriverRegistry::with_builtins();
        // Local disks need a root.
        let result = registry.instantiate(&DiskConfig::new("local", DriverName::Local));
        match result {
            Err(Error::DriverNotDeclared(message)) => assert!(message.contains("'root'")),
            other => panic!("unexpected result: {:?}", other.map(|d| d.name().to_string())),
        }
    }

    #[test]
    fn test_inline_factory_bypasses_registry() {
        let registry = DriverRegistry::new();
        let disk = DiskConfig::new(
            "custom",
            DriverRef::factory(|_| Ok(Arc::new(MemoryDriver::new()) as Arc<dyn Driver>)),
        );
        assert!(registry.instantiate(&disk).is_ok());
    }

    #[test]
    fn test_local_builtin_uses_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("disk");
        let registry = DriverRegistry::with_builtins();
        let disk = DiskConfig::local("local", root.to_string_lossy().to_string());

        let driver = registry.instantiate(&disk).unwrap();
        assert_eq!(driver.name(), "local");
        assert!(root.is_dir());
    }

    #[test]
    fn test_disk_set_rejects_duplicates() {
        let result = DiskSet::resolve(
            vec![DiskConfig::memory("myDisk"), DiskConfig::memory("myDisk")],
            Some("myDisk"),
        );
        assert!(matches!(result, Err(Error::DuplicatedDiskName(name)) if name == "myDisk"));
    }

    #[test]
    fn test_disk_set_implicit_local() {
        let set = DiskSet::resolve(Vec::new(), None).unwrap();
        assert_eq!(set.default_disk(), IMPLICIT_DISK_NAME);
        let disk = set.get(IMPLICIT_DISK_NAME).unwrap();
        assert_eq!(disk.options["root"], Value::from(IMPLICIT_DISK_ROOT));
    }

    #[test]
    fn test_disk_set_single_disk_is_default() {
        let set = DiskSet::resolve(vec![DiskConfig::memory("only")], None).unwrap();
        assert_eq!(set.default_disk(), "only");
    }

    #[test]
    fn test_disk_set_ambiguous_default() {
        let result = DiskSet::resolve(vec![DiskConfig::memory("a"), DiskConfig::memory("b")], None);
        assert!(matches!(result, Err(Error::MissingDefaultDisk { count: 2 })));
    }

    #[test]
    fn test_disk_set_unknown_default() {
        let result = DiskSet::resolve(vec![DiskConfig::memory("a")], Some("b"));
        assert!(matches!(result, Err(Error::DiskNotDefined(name)) if name == "b"));
    }
}
