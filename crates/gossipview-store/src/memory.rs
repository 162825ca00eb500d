use std::collections::BTreeMap;

use crate::{KeyValueStore, StoreError};

/// Volatile store. Nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
    writes: usize,
    read_only: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            writes: 0,
            read_only: false,
        }
    }

    /// Reject every write with [`StoreError::Io`], keeping current values.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Number of successful write calls made so far.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.set_many(&[(key, value)])
    }

    fn set_many(&mut self, pairs: &[(&str, &str)]) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::Io("store is read-only".into()));
        }
        for (key, value) in pairs {
            self.values.insert((*key).to_string(), (*value).to_string());
        }
        self.writes += 1;
        Ok(())
    }
}
