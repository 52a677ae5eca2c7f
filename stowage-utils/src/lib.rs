pub mod consts;
pub mod persisted;

pub use consts::STORAGE_KEY;
pub use persisted::{AckEvent, AckStatus, Flags, LoadedValue, Persisted, PersistedValue};
