pub mod persistence;
pub mod store;

pub use persistence::{PersistenceBridge, PersistSender};
pub use store::{DurableStore, FileStore, MemoryStore};
