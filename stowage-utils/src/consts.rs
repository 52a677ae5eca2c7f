//! Stowage program-wide constants.

/// The single slot the bridge owns in the durable store.
pub const STORAGE_KEY: &str = "store";

pub const DATA_DIR_ENV: &str = "STOWAGE_DATA_DIR";
pub const DATA_DIR_NAME: &str = "stowage";
pub const FALLBACK_DATA_DIR: &str = ".stowage";
