//! The storage façade applications call.

use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use filestorage_common::{Error, Result, StoragePath};

use crate::config::{DiskOptions, StorageConfig};
use crate::driver::{collect_stream, ByteStream, Driver, FileStat, PutData, PutResult};
use crate::plugin::Plugin;
use crate::registry::{DiskSet, DriverRegistry};

/// Single entry point for file operations on a configured disk.
///
/// Holds the active driver, the plugins bound to it and the write options.
/// Every operation except `put` forwards to the driver; `put` additionally
/// assigns unique names and runs plugin hooks.
pub struct Storage {
    registry: Arc<DriverRegistry>,
    config: StorageConfig,
    disks: DiskSet,
    disk_name: String,
    driver: Arc<dyn Driver>,
    plugins: Vec<Box<dyn Plugin>>,
}

impl Storage {
    /// Build a façade over the default disk of `config`.
    ///
    /// # Errors
    /// - `DuplicatedDiskName`, `MissingDefaultDisk`, `DiskNotDefined` from
    ///   disk resolution
    /// - `DriverNotDeclared` if the default disk's driver cannot be built
    pub fn new(registry: Arc<DriverRegistry>, config: StorageConfig) -> Result<Self> {
        let disks = DiskSet::resolve(config.disks.clone(), config.default_disk.as_deref())?;
        let disk_name = disks.default_disk().to_string();
        Self::build(registry, config, disks, disk_name)
    }

    fn build(
        registry: Arc<DriverRegistry>,
        config: StorageConfig,
        disks: DiskSet,
        disk_name: String,
    ) -> Result<Self> {
        let disk = disks.get(&disk_name)?;
        let driver = registry.instantiate(disk)?;

        let plugins = config
            .plugins
            .iter()
            .map(|factory| {
                let mut plugin = factory();
                plugin.init(driver.clone());
                plugin
            })
            .collect::<Vec<_>>();

        info!(
            disk = %disk_name,
            driver = driver.name(),
            plugins = plugins.len(),
            unique_file_name = config.unique_file_name,
            "storage configured"
        );

        Ok(Self {
            registry,
            config,
            disks,
            disk_name,
            driver,
            plugins,
        })
    }

    /// Replace the configuration.
    ///
    /// The new driver and fresh plugin instances are fully built before
    /// anything is replaced, so a failed call leaves the façade unchanged.
    ///
    /// The replaced driver is dropped without [`Driver::close`]. Backends
    /// holding sessions should be swapped with [`Storage::reconfigure`], or
    /// closed through [`Storage::shutdown`] first.
    pub fn configure(&mut self, config: StorageConfig) -> Result<()> {
        *self = Self::new(self.registry.clone(), config)?;
        Ok(())
    }

    /// Replace the configuration and close the replaced driver.
    ///
    /// Same atomicity as [`Storage::configure`]. A failure to close the old
    /// driver is logged; the new configuration stays in place.
    pub async fn reconfigure(&mut self, config: StorageConfig) -> Result<()> {
        let next = Self::new(self.registry.clone(), config)?;
        let replaced = std::mem::replace(self, next);

        debug!(disk = %replaced.disk_name, "closing replaced driver");
        if let Err(e) = replaced.shutdown().await {
            warn!(disk = %replaced.disk_name, error = %e, "failed to close replaced driver");
        }
        Ok(())
    }

    /// A façade on another configured disk, with the current settings.
    ///
    /// The returned façade is independent: changing it never affects `self`.
    pub fn disk(&self, name: &str) -> Result<Storage> {
        self.disk_with(name, DiskOptions::default())
    }

    /// A façade on another configured disk, with explicit overrides.
    pub fn disk_with(&self, name: &str, options: DiskOptions) -> Result<Storage> {
        let mut config = self.config.clone();
        config.default_disk = Some(name.to_string());
        if let Some(unique) = options.unique_file_name {
            config.unique_file_name = unique;
        }
        Self::build(
            self.registry.clone(),
            config,
            self.disks.clone(),
            name.to_string(),
        )
    }

    /// Name of the active disk.
    pub fn disk_name(&self) -> &str {
        &self.disk_name
    }

    /// Identifier of the active driver.
    pub fn driver_name(&self) -> &str {
        self.driver.name()
    }

    /// The active driver, with error normalization applied.
    pub fn driver(&self) -> Arc<dyn Driver> {
        self.driver.clone()
    }

    /// Whether uploaded files get random names.
    pub fn unique_file_name(&self) -> bool {
        self.config.unique_file_name
    }

    /// The configuration this façade was built from.
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Write data to a file and run plugin hooks.
    ///
    /// # Postconditions
    /// - `result.path` is where the data was written; with unique names
    ///   enabled the file name is a random token with the original extension
    /// - plugin outputs are stored under their keys, in plugin order
    pub async fn put(&self, path: &str, data: impl Into<PutData>) -> Result<PutResult> {
        let path = StoragePath::parse(path)?;
        if path.is_root() {
            return Err(Error::InvalidInput("A file path is required".to_string()));
        }

        let mut result = PutResult::provisional(&path);

        let path = if self.config.unique_file_name {
            let unique = unique_path(&path)?;
            result.path = unique.as_key();
            unique
        } else {
            path
        };

        let data = data.into();
        for plugin in &self.plugins {
            plugin.before_put(&data, &path).await?;
        }

        debug!(disk = %self.disk_name, path = %path, "writing file");
        let receipt = self.driver.put(&path, data).await?;
        result.merge(receipt);

        for plugin in &self.plugins {
            let key = match plugin.after_put_key() {
                Some(key) => key,
                None => continue,
            };
            if let Some(value) = plugin.after_put(&path).await? {
                if result.contains_key(key) {
                    warn!(key, "plugin output overwrites an existing result field");
                }
                result.extra.insert(key.to_string(), value);
            }
        }

        Ok(result)
    }

    /// Read a file as a stream.
    pub async fn get(&self, path: &str) -> Result<ByteStream> {
        self.driver.get(&StoragePath::parse(path)?).await
    }

    /// Read a whole file into memory.
    pub async fn read(&self, path: &str) -> Result<Bytes> {
        collect_stream(self.get(path).await?).await
    }

    /// Public URL of a file.
    pub fn url(&self, path: &str) -> Result<String> {
        self.driver.url(&StoragePath::parse(path)?)
    }

    /// Check if a file exists.
    pub async fn exists(&self, path: &str) -> Result<bool> {
        self.driver.exists(&StoragePath::parse(path)?).await
    }

    /// Size, modification time and kind of a file.
    pub async fn stats(&self, path: &str) -> Result<FileStat> {
        self.driver.stats(&StoragePath::parse(path)?).await
    }

    /// Size of a file in bytes.
    pub async fn size(&self, path: &str) -> Result<u64> {
        self.driver.size(&StoragePath::parse(path)?).await
    }

    /// Last modification time in milliseconds since the Unix epoch.
    pub async fn last_modified(&self, path: &str) -> Result<i64> {
        self.driver.last_modified(&StoragePath::parse(path)?).await
    }

    /// Delete a file.
    pub async fn delete(&self, path: &str) -> Result<bool> {
        self.driver.delete(&StoragePath::parse(path)?).await
    }

    /// Copy a file.
    pub async fn copy(&self, path: &str, new_path: &str) -> Result<()> {
        let from = StoragePath::parse(path)?;
        let to = StoragePath::parse(new_path)?;
        self.driver.copy(&from, &to).await
    }

    /// Move a file.
    pub async fn move_file(&self, path: &str, new_path: &str) -> Result<()> {
        let from = StoragePath::parse(path)?;
        let to = StoragePath::parse(new_path)?;
        self.driver.move_file(&from, &to).await
    }

    /// Create a directory, including missing parents.
    pub async fn make_dir(&self, dir: &str) -> Result<()> {
        self.driver.make_dir(&StoragePath::parse(dir)?).await
    }

    /// Remove a directory and everything in it.
    pub async fn remove_dir(&self, dir: &str) -> Result<()> {
        self.driver.remove_dir(&StoragePath::parse(dir)?).await
    }

    /// Close the active driver's connections.
    pub async fn shutdown(&self) -> Result<()> {
        info!(disk = %self.disk_name, "closing storage");
        self.driver.close().await
    }
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("disk", &self.disk_name)
            .field("driver", &self.driver.name())
            .field("plugins", &self.plugins.len())
            .field("unique_file_name", &self.config.unique_file_name)
            .finish()
    }
}

/// Replace the file name with a random UUID, keeping directory and extension.
fn unique_path(path: &StoragePath) -> Result<StoragePath> {
    let token = Uuid::new_v4().to_string();
    let name = match path.extension() {
        Some(ext) => format!("{}.{}", token, ext),
        None => token,
    };
    path.with_name(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DiskConfig, DriverRef};
    use crate::driver::{ErrorHandler, PutReceipt};
    use crate::normalize::ErrorMapping;
    use crate::plugin::plugin_factory;
    use async_trait::async_trait;
    use filestorage_common::{BackendError, BackendSignal};
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn registry() -> Arc<DriverRegistry> {
        Arc::new(DriverRegistry::with_builtins())
    }

    fn memory_storage(config: StorageConfig) -> Storage {
        Storage::new(registry(), config.with_disk(DiskConfig::memory("memory"))).unwrap()
    }

    /// Plugin that reports a fixed value under a fixed key.
    struct Tag {
        key: &'static str,
        value: Option<&'static str>,
        driver: Option<Arc<dyn Driver>>,
    }

    #[async_trait]
    impl Plugin for Tag {
        fn init(&mut self, driver: Arc<dyn Driver>) {
            self.driver = Some(driver);
        }

        fn after_put_key(&self) -> Option<&str> {
            Some(self.key)
        }

        async fn after_put(&self, path: &StoragePath) -> Result<Option<Value>> {
            let driver = self.driver.as_ref().expect("plugin not initialized");
            assert!(driver.exists(path).await?);
            Ok(self.value.map(Value::from))
        }
    }

    fn tag(key: &'static str, value: Option<&'static str>) -> crate::plugin::PluginFactory {
        plugin_factory(move || Tag {
            key,
            value,
            driver: None,
        })
    }

    #[tokio::test]
    async fn test_end_to_end_local_disk() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("storage");
        let config = StorageConfig::new()
            .with_disk(DiskConfig::local("local", root.to_string_lossy().to_string()));
        let storage = Storage::new(registry(), config).unwrap();

        let result = storage.put("greet.txt", b"hello".to_vec()).await.unwrap();

        assert!(result.success);
        assert_eq!(result.message, "Uploading success!");
        assert_eq!(result.name, "greet.txt");
        assert_eq!(result.path, "greet.txt");
        assert!(result.extra.is_empty());
        assert!(storage.exists("greet.txt").await.unwrap());
        assert_eq!(storage.read("greet.txt").await.unwrap().as_ref(), b"hello");
    }

    #[test]
    fn test_implicit_local_disk() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().to_path_buf();
        let roots = Arc::new(std::sync::Mutex::new(Vec::new()));

        // Root the implicit disk under the temp dir instead of the cwd.
        let seen = roots.clone();
        let mut registry = DriverRegistry::new();
        registry
            .register(
                "local",
                Arc::new(move |disk: &DiskConfig| -> Result<Arc<dyn Driver>> {
                    let root = disk.option_str("root").unwrap_or_default().to_string();
                    seen.lock().unwrap().push(root.clone());
                    let driver = crate::local::LocalDriver::new(base.join(&root))?;
                    Ok(Arc::new(driver) as Arc<dyn Driver>)
                }),
            )
            .unwrap();

        let storage = Storage::new(Arc::new(registry), StorageConfig::new()).unwrap();

        assert_eq!(storage.disk_name(), "local");
        assert_eq!(storage.driver_name(), "local");
        assert_eq!(*roots.lock().unwrap(), vec!["storage".to_string()]);
        assert!(temp.path().join("storage").is_dir());
    }

    #[test]
    fn test_single_disk_becomes_default() {
        let storage = memory_storage(StorageConfig::new());
        assert_eq!(storage.disk_name(), "memory");
    }

    #[test]
    fn test_configuration_errors() {
        let result = Storage::new(
            registry(),
            StorageConfig::new()
                .with_disk(DiskConfig::memory("a"))
                .with_disk(DiskConfig::memory("b")),
        );
        assert!(matches!(result, Err(Error::MissingDefaultDisk { count: 2 })));

        let result = Storage::new(
            registry(),
            StorageConfig::new().with_disk(DiskConfig::new("x", "onedriver")),
        );
        match result {
            Err(Error::DriverNotDeclared(message)) => assert!(message.contains("onedriver")),
            other => panic!("unexpected result: {:?}", other.map(|s| s.disk_name().to_string())),
        }
    }

    #[test]
    fn test_duplicates_rejected_before_instantiation() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let factory = DriverRef::factory(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(crate::memory::MemoryDriver::new()) as Arc<dyn Driver>)
        });

        let result = Storage::new(
            registry(),
            StorageConfig::new()
                .with_disk(DiskConfig::new("same", factory.clone()))
                .with_disk(DiskConfig::new("same", factory))
                .with_default_disk("same"),
        );

        assert!(matches!(result, Err(Error::DuplicatedDiskName(_))));
        assert_eq!(built.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_configure_keeps_previous_state() {
        let mut storage = memory_storage(StorageConfig::new());
        storage.put("keep.txt", "data").await.unwrap();

        let result = storage.configure(
            StorageConfig::new().with_disk(DiskConfig::new("broken", "onedriver")),
        );

        assert!(result.is_err());
        assert_eq!(storage.disk_name(), "memory");
        assert!(storage.exists("keep.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_unique_file_name() {
        let storage = memory_storage(StorageConfig::new().with_unique_file_name(true));

        let result = storage.put("a/b.txt", "content").await.unwrap();

        let path = StoragePath::parse(&result.path).unwrap();
        assert_eq!(path.parent().unwrap().as_key(), "a");
        assert_eq!(path.extension(), Some("txt"));
        assert_eq!(path.name().unwrap().len(), 36 + ".txt".len());
        assert!(!result.path.contains("b.txt"));
        assert_eq!(result.name, "b.txt");
        assert!(storage.exists(&result.path).await.unwrap());
        assert!(!storage.exists("a/b.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_unique_file_name_without_extension() {
        let storage = memory_storage(StorageConfig::new().with_unique_file_name(true));
        let result = storage.put("README", "content").await.unwrap();
        assert_eq!(result.path.len(), 36);
    }

    #[tokio::test]
    async fn test_disk_fork_is_isolated() {
        let storage = Storage::new(
            registry(),
            StorageConfig::new()
                .with_disk(DiskConfig::memory("main"))
                .with_disk(DiskConfig::memory("other"))
                .with_default_disk("main")
                .with_unique_file_name(true),
        )
        .unwrap();

        let other = storage
            .disk_with("other", DiskOptions::unique_file_name(false))
            .unwrap();
        assert_eq!(other.disk_name(), "other");
        assert!(!other.unique_file_name());

        let forked = other.put("x.txt", "1").await.unwrap();
        assert_eq!(forked.path, "x.txt");

        let original = storage.put("x.txt", "1").await.unwrap();
        assert_ne!(original.path, "x.txt");
        assert!(storage.unique_file_name());
        assert_eq!(storage.disk_name(), "main");
    }

    #[test]
    fn test_disk_unknown_name() {
        let storage = memory_storage(StorageConfig::new());
        assert!(matches!(storage.disk("nope"), Err(Error::DiskNotDefined(name)) if name == "nope"));
    }

    #[tokio::test]
    async fn test_plugin_outputs_in_order_and_omitted_when_empty() {
        let storage = memory_storage(
            StorageConfig::new()
                .with_plugin(tag("first", Some("1")))
                .with_plugin(tag("skipped", None))
                .with_plugin(tag("second", Some("2"))),
        );

        let result = storage.put("file.bin", vec![0u8; 4]).await.unwrap();

        assert_eq!(result.get("first"), Some(&Value::from("1")));
        assert_eq!(result.get("second"), Some(&Value::from("2")));
        assert!(!result.contains_key("skipped"));
    }

    #[tokio::test]
    async fn test_duplicate_plugin_keys_last_write_wins() {
        let storage = memory_storage(
            StorageConfig::new()
                .with_plugin(tag("formats", Some("first")))
                .with_plugin(tag("formats", Some("second"))),
        );

        let result = storage.put("file.bin", "x").await.unwrap();
        assert_eq!(result.get("formats"), Some(&Value::from("second")));
    }

    #[tokio::test]
    async fn test_plugins_rebuilt_on_configure() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = created.clone();
        let factory: crate::plugin::PluginFactory = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::new(Tag {
                key: "tag",
                value: Some("v"),
                driver: None,
            }) as Box<dyn Plugin>
        });

        let config = StorageConfig::new()
            .with_disk(DiskConfig::memory("memory"))
            .with_plugin(factory);
        let mut storage = Storage::new(registry(), config.clone()).unwrap();
        storage.configure(config).unwrap();
        let _fork = storage.disk("memory").unwrap();

        assert_eq!(created.load(Ordering::SeqCst), 3);
    }

    /// Memory driver that counts `close` calls.
    struct Closing {
        inner: crate::memory::MemoryDriver,
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Driver for Closing {
        fn name(&self) -> &str {
            "closing"
        }

        fn url(&self, path: &StoragePath) -> Result<String> {
            self.inner.url(path)
        }

        async fn exists(&self, path: &StoragePath) -> Result<bool> {
            self.inner.exists(path).await
        }

        async fn put(&self, path: &StoragePath, data: PutData) -> Result<PutReceipt> {
            self.inner.put(path, data).await
        }

        async fn get(&self, path: &StoragePath) -> Result<ByteStream> {
            self.inner.get(path).await
        }

        async fn delete(&self, path: &StoragePath) -> Result<bool> {
            self.inner.delete(path).await
        }

        async fn copy(&self, from: &StoragePath, to: &StoragePath) -> Result<()> {
            self.inner.copy(from, to).await
        }

        async fn move_file(&self, from: &StoragePath, to: &StoragePath) -> Result<()> {
            self.inner.move_file(from, to).await
        }

        async fn make_dir(&self, dir: &StoragePath) -> Result<()> {
            self.inner.make_dir(dir).await
        }

        async fn remove_dir(&self, dir: &StoragePath) -> Result<()> {
            self.inner.remove_dir(dir).await
        }

        async fn close(&self) -> Result<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn closing_config(closed: Arc<AtomicUsize>) -> StorageConfig {
        let disk = DiskConfig::new(
            "session",
            DriverRef::factory(move |_| {
                Ok(Arc::new(Closing {
                    inner: crate::memory::MemoryDriver::new(),
                    closed: closed.clone(),
                }) as Arc<dyn Driver>)
            }),
        );
        StorageConfig::new().with_disk(disk)
    }

    #[tokio::test]
    async fn test_reconfigure_closes_replaced_driver() {
        let closed = Arc::new(AtomicUsize::new(0));
        let mut storage = Storage::new(registry(), closing_config(closed.clone())).unwrap();

        storage.configure(closing_config(closed.clone())).unwrap();
        assert_eq!(closed.load(Ordering::SeqCst), 0);

        storage
            .reconfigure(StorageConfig::new().with_disk(DiskConfig::memory("memory")))
            .await
            .unwrap();
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert_eq!(storage.disk_name(), "memory");

        let broken = StorageConfig::new()
            .with_disk(DiskConfig::memory("a"))
            .with_disk(DiskConfig::memory("b"));
        assert!(storage.reconfigure(broken).await.is_err());
        assert_eq!(storage.disk_name(), "memory");
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pass_through_operations() {
        let storage = memory_storage(StorageConfig::new());
        storage.put("a.txt", "abc").await.unwrap();

        assert_eq!(storage.size("a.txt").await.unwrap(), 3);
        assert!(!storage.stats("a.txt").await.unwrap().is_directory);
        assert!(storage.last_modified("a.txt").await.unwrap() > 0);
        storage.copy("a.txt", "b.txt").await.unwrap();
        storage.move_file("b.txt", "c.txt").await.unwrap();
        assert!(!storage.exists("b.txt").await.unwrap());
        assert!(storage.delete("c.txt").await.unwrap());
        assert_eq!(storage.url("a.txt").unwrap(), "memory://a.txt");

        storage.make_dir("dir").await.unwrap();
        storage.remove_dir("dir").await.unwrap();
    }

    /// Driver whose reads fail with a fixed backend error.
    struct Failing {
        signal: BackendSignal,
        mapping: ErrorMapping,
    }

    #[async_trait]
    impl Driver for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn url(&self, path: &StoragePath) -> Result<String> {
            Ok(path.as_key())
        }

        async fn exists(&self, _path: &StoragePath) -> Result<bool> {
            Ok(false)
        }

        async fn put(&self, _path: &StoragePath, _data: PutData) -> Result<PutReceipt> {
            Ok(PutReceipt::uploaded())
        }

        async fn get(&self, path: &StoragePath) -> Result<ByteStream> {
            Err(BackendError::new(self.signal.clone(), format!("cannot read {}", path)).into())
        }

        async fn delete(&self, _path: &StoragePath) -> Result<bool> {
            Ok(true)
        }

        async fn copy(&self, _from: &StoragePath, _to: &StoragePath) -> Result<()> {
            Ok(())
        }

        async fn move_file(&self, _from: &StoragePath, _to: &StoragePath) -> Result<()> {
            Err(BackendError::new(self.signal.clone(), "rename refused").into())
        }

        async fn make_dir(&self, _dir: &StoragePath) -> Result<()> {
            Ok(())
        }

        async fn remove_dir(&self, _dir: &StoragePath) -> Result<()> {
            Ok(())
        }

        fn error_handler(&self) -> Option<&dyn ErrorHandler> {
            Some(&self.mapping)
        }
    }

    fn failing_storage(signal: BackendSignal, mapping: ErrorMapping) -> Storage {
        let disk = DiskConfig::new(
            "remote",
            DriverRef::factory(move |_| {
                Ok(Arc::new(Failing {
                    signal: signal.clone(),
                    mapping,
                }) as Arc<dyn Driver>)
            }),
        );
        Storage::new(registry(), StorageConfig::new().with_disk(disk)).unwrap()
    }

    #[tokio::test]
    async fn test_not_found_normalized_for_every_backend() {
        let cases = vec![
            (BackendSignal::HttpStatus(404), ErrorMapping::Http),
            (BackendSignal::S3Code("NoSuchKey".to_string()), ErrorMapping::S3),
            (BackendSignal::SftpStatus(2), ErrorMapping::Sftp),
            (BackendSignal::FtpReply(550), ErrorMapping::Ftp),
        ];

        for (signal, mapping) in cases {
            let storage = failing_storage(signal, mapping);
            match storage.get("missing.jpeg").await {
                Err(Error::FileNotFound(message)) => assert!(message.contains("missing.jpeg")),
                Err(other) => panic!("{:?}: unexpected error {other:?}", mapping),
                Ok(_) => panic!("{:?}: expected an error", mapping),
            }
        }

        let memory = memory_storage(StorageConfig::new());
        assert!(matches!(memory.get("missing.jpeg").await, Err(Error::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_move_failure_normalized() {
        let storage = failing_storage(BackendSignal::HttpStatus(500), ErrorMapping::Http);
        match storage.move_file("a", "b").await {
            Err(Error::MoveFailed(message)) => assert_eq!(message, "rename refused"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
