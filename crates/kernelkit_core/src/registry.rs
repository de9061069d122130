//! Kernel registry: logical keys to generated kernel files.
//!
//! # Responsibility
//! - Materialize kernel buffers in storage under never-reused generated paths.
//! - Keep storage, the toolkit kernel pool and the key table consistent
//!   across load and unload.
//!
//! # Invariants
//! - A key is present iff its file is stored and furnished.
//! - Generated paths come from a monotonically increasing counter and are
//!   never reused by this registry, including after unload.
//! - Each operation runs entirely under one lock, so concurrent callers
//!   observe loads and unloads as atomic.

use crate::config::RegistryConfig;
use crate::storage::KernelStorage;
use crate::toolkit::{KernelPool, ToolkitError};
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Registry operation errors.
#[derive(Debug)]
pub enum RegistryError {
    /// `load_kernel` with a key that is already registered.
    DuplicateKey(String),
    /// `unload_kernel` with a key that is not registered.
    UnknownKey(String),
    /// Storage write or delete failed for `path`.
    Storage { path: String, source: io::Error },
    /// Toolkit furnish/unload failed.
    Toolkit(ToolkitError),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateKey(key) => write!(f, "kernel key already registered: {key}"),
            Self::UnknownKey(key) => write!(f, "kernel key not registered: {key}"),
            Self::Storage { path, source } => {
                write!(f, "kernel storage failed at `{path}`: {source}")
            }
            Self::Toolkit(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::DuplicateKey(_) | Self::UnknownKey(_) => None,
            Self::Storage { source, .. } => Some(source),
            Self::Toolkit(err) => Some(err),
        }
    }
}

impl From<ToolkitError> for RegistryError {
    fn from(value: ToolkitError) -> Self {
        Self::Toolkit(value)
    }
}

/// One keyed kernel currently held by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelRecord {
    pub key: String,
    pub generated_path: String,
}

#[derive(Debug, Default)]
struct RegistryState {
    key_to_path: BTreeMap<String, String>,
    next_counter: u64,
}

/// Owns the key table for one host.
///
/// Create one per host and share it by reference; independent registries do
/// not see each other's keys.
pub struct KernelRegistry {
    state: Mutex<RegistryState>,
    storage: Arc<dyn KernelStorage>,
    pool: Arc<dyn KernelPool>,
    config: RegistryConfig,
}

impl KernelRegistry {
    pub fn new(
        storage: Arc<dyn KernelStorage>,
        pool: Arc<dyn KernelPool>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            storage,
            pool,
            config,
        }
    }

    /// Stores `buffer` under a fresh generated path and furnishes it.
    ///
    /// Returns the generated path. With `key`, the kernel can later be
    /// released through [`Self::unload_kernel`].
    ///
    /// # Errors
    /// - [`RegistryError::DuplicateKey`] before any side effect.
    /// - [`RegistryError::Storage`] when the write fails; nothing is recorded.
    /// - [`RegistryError::Toolkit`] when furnishing fails; the written file is
    ///   removed again and nothing is recorded.
    pub fn load_kernel(&self, buffer: &[u8], key: Option<&str>) -> RegistryResult<String> {
        let mut state = self.lock();
        if let Some(key) = key {
            if state.key_to_path.contains_key(key) {
                warn!("event=kernel_load module=registry status=rejected reason=duplicate_key key={key}");
                return Err(RegistryError::DuplicateKey(key.to_string()));
            }
        }

        let counter = state.next_counter;
        state.next_counter += 1;
        let path = self.storage.resolve(&self.config.file_name(counter));

        self.storage
            .write(&path, buffer)
            .map_err(|source| storage_error(&path, source))?;

        if let Err(err) = self.pool.furnish(&path) {
            if let Err(cleanup) = self.storage.delete(&path) {
                error!(
                    "event=kernel_load module=registry status=error stage=cleanup path={path} error={cleanup}"
                );
            }
            warn!("event=kernel_load module=registry status=error stage=furnish path={path}");
            return Err(err.into());
        }

        if let Some(key) = key {
            state.key_to_path.insert(key.to_string(), path.clone());
        }
        info!(
            "event=kernel_load module=registry status=ok key={} path={} bytes={}",
            key.unwrap_or("-"),
            path,
            buffer.len()
        );
        Ok(path)
    }

    /// Unfurnishes and deletes the kernel registered under `key`.
    ///
    /// # Errors
    /// - [`RegistryError::UnknownKey`]; also on a second unload of one key.
    /// - [`RegistryError::Toolkit`] when the pool refuses; nothing changes.
    /// - [`RegistryError::Storage`] when deletion fails after the toolkit
    ///   released the file; the key is dropped regardless.
    pub fn unload_kernel(&self, key: &str) -> RegistryResult<()> {
        let mut state = self.lock();
        let Some(path) = state.key_to_path.get(key).cloned() else {
            warn!("event=kernel_unload module=registry status=rejected reason=unknown_key key={key}");
            return Err(RegistryError::UnknownKey(key.to_string()));
        };

        self.pool.unload(&path)?;
        state.key_to_path.remove(key);

        self.storage.delete(&path).map_err(|source| {
            error!("event=kernel_unload module=registry status=error stage=delete key={key} path={path}");
            storage_error(&path, source)
        })?;
        info!("event=kernel_unload module=registry status=ok key={key} path={path}");
        Ok(())
    }

    /// Unloads every keyed kernel in key order, stopping at the first error.
    pub fn unload_all(&self) -> RegistryResult<()> {
        for key in self.loaded_keys() {
            self.unload_kernel(&key)?;
        }
        Ok(())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().key_to_path.contains_key(key)
    }

    /// Generated path registered under `key`.
    pub fn generated_path(&self, key: &str) -> Option<String> {
        self.lock().key_to_path.get(key).cloned()
    }

    /// Registered keys in sorted order.
    pub fn loaded_keys(&self) -> Vec<String> {
        self.lock().key_to_path.keys().cloned().collect()
    }

    pub fn records(&self) -> Vec<KernelRecord> {
        self.lock()
            .key_to_path
            .iter()
            .map(|(key, path)| KernelRecord {
                key: key.clone(),
                generated_path: path.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().key_to_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().key_to_path.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn storage_error(path: &str, source: io::Error) -> RegistryError {
    RegistryError::Storage {
        path: path.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::{KernelRegistry, RegistryError};
    use crate::config::RegistryConfig;
    use crate::storage::MemoryStorage;
    use crate::toolkit::MemoryKernelPool;
    use std::sync::Arc;

    fn registry() -> KernelRegistry {
        let config = RegistryConfig {
            instance_tag: "t".to_string(),
            ..RegistryConfig::default()
        };
        KernelRegistry::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(MemoryKernelPool::new()),
            config,
        )
    }

    #[test]
    fn generated_paths_follow_counter() {
        let registry = registry();
        assert_eq!(
            registry.load_kernel(b"a", None).expect("load"),
            "_buffer_t_0.bin"
        );
        assert_eq!(
            registry.load_kernel(b"b", Some("k")).expect("load"),
            "_buffer_t_1.bin"
        );
        assert_eq!(registry.generated_path("k").as_deref(), Some("_buffer_t_1.bin"));
    }

    #[test]
    fn duplicate_key_does_not_advance_counter() {
        let registry = registry();
        registry.load_kernel(b"a", Some("k")).expect("first load");
        let err = registry
            .load_kernel(b"b", Some("k"))
            .expect_err("duplicate rejected");
        assert!(matches!(err, RegistryError::DuplicateKey(ref key) if key == "k"));
        assert_eq!(
            registry.load_kernel(b"c", None).expect("next load"),
            "_buffer_t_1.bin"
        );
    }

    #[test]
    fn records_list_keys_in_order() {
        let registry = registry();
        registry.load_kernel(b"b", Some("beta")).expect("load");
        registry.load_kernel(b"a", Some("alpha")).expect("load");
        let records = registry.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key, "alpha");
        assert_eq!(records[0].generated_path, "_buffer_t_1.bin");
        assert_eq!(registry.loaded_keys(), vec!["alpha", "beta"]);
    }

    #[test]
    fn unload_all_empties_registry() {
        let registry = registry();
        registry.load_kernel(b"a", Some("a")).expect("load");
        registry.load_kernel(b"b", Some("b")).expect("load");
        registry.unload_all().expect("unload all");
        assert!(registry.is_empty());
    }
}
