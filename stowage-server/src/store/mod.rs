// Stowage Store Layer
//
// The durable key-value capability the persistence bridge is handed at
// construction. The bridge never reaches for an ambient global store; it
// only talks to whatever `DurableStore` it was given.
//
// # Architecture
//
// ```text
// PersistenceBridge
//         │
//         ▼
// ┌───────────────────┐
// │   DurableStore    │  ← get / set / remove, all synchronous
// └───────────────────┘
//         │
//    ┌────┴─────┐
//    ▼          ▼
// FileStore  MemoryStore
// ```
//
// For tests:
// ```ignore
// let store = MemoryStore::new("test").with_entry(STORAGE_KEY, r#"{"name":"x"}"#);
// store.fail_writes(Some(StoreError::Unavailable("quota exceeded".into())));
// ```

mod durable;
mod error;
mod file;
mod memory;

pub use durable::{DurableStore, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::MemoryStore;
