// Stowage Store Layer - Durable Store Trait
//
// Defines the synchronous key-value capability the persistence bridge is
// constructed with. Backends: `FileStore` for real runs, `MemoryStore` for tests.

use std::ffi::OsString;
use std::path::PathBuf;

use stowage_utils::consts::{DATA_DIR_ENV, DATA_DIR_NAME, FALLBACK_DATA_DIR};

use super::error::StoreResult;

/// Synchronous key-value persistence surviving process restarts.
///
/// All three primitives complete before returning; the bridge relies on this
/// to order a mutation strictly before its acknowledgment.
///
/// # Error Isolation
///
/// Implementations report failures through `StoreError` and never panic.
/// The bridge decides how each failure degrades.
///
/// # Example
///
/// ```ignore
/// use stowage_server::store::{DurableStore, MemoryStore};
///
/// let store = MemoryStore::new("scratch");
/// store.set("store", "42")?;
/// assert_eq!(store.get("store")?, Some("42".to_string()));
/// store.remove("store")?;
/// assert_eq!(store.get("store")?, None);
/// ```
pub trait DurableStore: Send + Sync {
    /// Current text for `key`, or `None` if the key does not exist.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Replace the content of `key` with `value`.
    ///
    /// Writes are total overwrites; a reader never observes a partial value.
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Delete `key`. Removing a key that does not exist is not an error.
    fn remove(&self, key: &str) -> StoreResult<()>;

    /// Name of this backend for logging.
    fn name(&self) -> &str;
}

impl<S: DurableStore + ?Sized> DurableStore for Box<S> {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        (**self).remove(key)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Configuration for the on-disk store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding one file per key
    pub data_dir: PathBuf,
}

impl StoreConfig {
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Default configuration, honoring the data directory override in the environment.
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var_os(DATA_DIR_ENV))
    }

    /// An unset or empty override keeps the default directory.
    fn from_env_value(value: Option<OsString>) -> Self {
        match value {
            Some(dir) if !dir.is_empty() => Self::default().with_data_dir(dir),
            _ => Self::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .map(|dir| dir.join(DATA_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from(FALLBACK_DATA_DIR));
        Self { data_dir }
    }
}
