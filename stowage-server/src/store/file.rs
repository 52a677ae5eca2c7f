// Stowage Store Layer - File Store
//
// Directory-backed DurableStore: one `<key>.json` file per key. Writes go to a
// temporary file in the same directory and are renamed over the target, so a
// reader sees either the old value or the new one.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tempfile::NamedTempFile;

use super::durable::{DurableStore, StoreConfig};
use super::error::{StoreError, StoreResult};
use super::memory::MemoryStore;

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) the data directory named by `config`.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        fs::create_dir_all(&config.data_dir).map_err(|e| {
            StoreError::Unavailable(format!("{}: {}", config.data_dir.display(), e))
        })?;
        debug!("Stowage: file store opened at {}", config.data_dir.display());
        Ok(Self {
            root: config.data_dir.clone(),
        })
    }

    /// Open the data directory, or fall back to a store that rejects every
    /// access when the directory cannot be created.
    ///
    /// With the fallback the bridge still runs: the slot reads as absent
    /// and every write is acknowledged as degraded.
    pub fn open_or_unavailable(config: &StoreConfig) -> Box<dyn DurableStore> {
        match Self::open(config) {
            Ok(store) => Box::new(store),
            Err(e) => {
                warn!("Stowage: Failed to open file store: {}", e);
                warn!("Stowage: Continuing without persistence");
                Box::new(MemoryStore::unavailable(e))
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{}.json", key)))
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                Err(StoreError::InvalidEncoding(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        let mut staged = NamedTempFile::new_in(&self.root)?;
        staged.write_all(value.as_bytes())?;
        staged.as_file().sync_all()?;
        staged.persist(&path).map_err(|e| StoreError::from(e.error))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &str {
        "file"
    }
}
