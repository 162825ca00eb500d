mod local;
mod memory;
mod settings;

pub use local::{default_settings_path, JsonFileStore};
pub use memory::MemoryStore;
pub use settings::SettingsStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(String),

    #[error("store file is corrupt: {0}")]
    Corrupt(String),
}

/// Durable string key-value storage scoped to this viewer.
///
/// Reads and writes are synchronous; `set` is durable by the time it
/// returns.
pub trait KeyValueStore {
    /// Read a value. Absent keys return `None`.
    fn get(&self, key: &str) -> Option<String>;

    /// Write (create or overwrite) a value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Write several values as one unit: either all of them land or none
    /// do.
    fn set_many(&mut self, pairs: &[(&str, &str)]) -> Result<(), StoreError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn set_many(&mut self, pairs: &[(&str, &str)]) -> Result<(), StoreError> {
        (**self).set_many(pairs)
    }
}

// -- Setting keys --

pub const BASE_URL_KEY: &str = "ds.baseUrl";
pub const USE_PROXY_KEY: &str = "ds.useProxy";
pub const AUTO_REFRESH_KEY: &str = "ds.autoRefresh";
pub const INTERVAL_KEY: &str = "ds.interval";
