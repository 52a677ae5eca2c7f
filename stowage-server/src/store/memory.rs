// Stowage Store Layer - In-Memory Store
//
// In-memory implementation of DurableStore for tests and for hosts without a
// writable disk. Lets tests inspect the slot, inject failures, and count calls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::durable::DurableStore;
use super::error::{StoreError, StoreResult};

/// In-memory durable store.
///
/// Clones share the same entries and counters, so a test can hand one clone
/// to the bridge and keep another to observe what was written.
///
/// # Example
///
/// ```ignore
/// let store = MemoryStore::new("test");
/// store.fail_writes(Some(StoreError::Unavailable("quota exceeded".into())));
///
/// let (mut bridge, _acks) = PersistenceBridge::detached(store.clone());
/// bridge.submit(PersistedValue::present(1))?;
/// assert_eq!(store.set_count(), 1);
/// assert_eq!(store.entry("store"), None);
/// ```
#[derive(Clone)]
pub struct MemoryStore {
    name: String,

    entries: Arc<Mutex<HashMap<String, String>>>,

    /// Error returned by every `get()` while set
    read_failure: Arc<Mutex<Option<StoreError>>>,

    /// Error returned by every `set()` and `remove()` while set
    write_failure: Arc<Mutex<Option<StoreError>>>,

    get_count: Arc<AtomicUsize>,
    set_count: Arc<AtomicUsize>,
    remove_count: Arc<AtomicUsize>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Arc::new(Mutex::new(HashMap::new())),
            read_failure: Arc::new(Mutex::new(None)),
            write_failure: Arc::new(Mutex::new(None)),
            get_count: Arc::new(AtomicUsize::new(0)),
            set_count: Arc::new(AtomicUsize::new(0)),
            remove_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A store that rejects every read, write and removal with `failure`.
    pub fn unavailable(failure: StoreError) -> Self {
        let store = Self::new("unavailable");
        store.fail_reads(Some(failure.clone()));
        store.fail_writes(Some(failure));
        store
    }

    /// Seed an entry without counting it as a write.
    pub fn with_entry(self, key: &str, value: &str) -> Self {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        self
    }

    /// Make every read fail with `failure` (or succeed again with `None`).
    pub fn fail_reads(&self, failure: Option<StoreError>) {
        *lock(&self.read_failure) = failure;
    }

    /// Make every write and removal fail with `failure` (or succeed again with `None`).
    pub fn fail_writes(&self, failure: Option<StoreError>) {
        *lock(&self.write_failure) = failure;
    }

    /// Peek at an entry without counting it as a read.
    pub fn entry(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = lock(&self.entries).keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn get_count(&self) -> usize {
        self.get_count.load(Ordering::Relaxed)
    }

    pub fn set_count(&self) -> usize {
        self.set_count.load(Ordering::Relaxed)
    }

    pub fn remove_count(&self) -> usize {
        self.remove_count.load(Ordering::Relaxed)
    }

    /// Reset all counters. Entries are kept.
    pub fn reset(&self) {
        self.get_count.store(0, Ordering::Relaxed);
        self.set_count.store(0, Ordering::Relaxed);
        self.remove_count.store(0, Ordering::Relaxed);
    }

    fn check_write(&self) -> StoreResult<()> {
        match &*lock(&self.write_failure) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("memory")
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.get_count.fetch_add(1, Ordering::Relaxed);
        if let Some(err) = &*lock(&self.read_failure) {
            return Err(err.clone());
        }
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.set_count.fetch_add(1, Ordering::Relaxed);
        self.check_write()?;
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.remove_count.fetch_add(1, Ordering::Relaxed);
        self.check_write()?;
        lock(&self.entries).remove(key);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
