use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::{KeyValueStore, StoreError};

/// Settings persisted as a flat JSON object of strings in a single file.
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file is an empty store; an
    /// unreadable or malformed one is reported as an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) => parse_values(&text)
                .map_err(|e| StoreError::Corrupt(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(StoreError::Io(format!("read {}: {e}", path.display())));
            }
        };
        Ok(Self { path, values })
    }

    /// Like [`open`](Self::open), but a corrupt file is logged and replaced
    /// by an empty store on the next write.
    pub fn open_lenient(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        match Self::open(path.clone()) {
            Err(StoreError::Corrupt(msg)) => {
                warn!("ignoring corrupt settings file: {msg}");
                Ok(Self {
                    path,
                    values: BTreeMap::new(),
                })
            }
            other => other,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Io(format!("mkdir {}: {e}", parent.display())))?;
            }
        }
        let text = serde_json::to_string_pretty(&self.values)
            .map_err(|e| StoreError::Io(format!("encode: {e}")))?;

        // Write-then-rename: readers never see a partial file.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, text)
            .map_err(|e| StoreError::Io(format!("write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| StoreError::Io(format!("rename {}: {e}", self.path.display())))
    }
}

/// Non-string values are kept in their JSON text form.
fn parse_values(text: &str) -> Result<BTreeMap<String, String>, String> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
    let obj = value
        .as_object()
        .ok_or_else(|| "expected a JSON object".to_string())?;
    Ok(obj
        .iter()
        .map(|(k, v)| {
            let text = match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), text)
        })
        .collect())
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.set_many(&[(key, value)])
    }

    fn set_many(&mut self, pairs: &[(&str, &str)]) -> Result<(), StoreError> {
        let previous = self.values.clone();
        for (key, value) in pairs {
            self.values.insert((*key).to_string(), (*value).to_string());
        }
        // One flush per batch; on failure memory goes back to what is on disk.
        if let Err(e) = self.flush() {
            self.values = previous;
            return Err(e);
        }
        Ok(())
    }
}

/// `$XDG_CONFIG_HOME/gossipview/settings.json`, falling back to
/// `$HOME/.config` and finally the working directory.
pub fn default_settings_path() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return PathBuf::from(xdg).join("gossipview/settings.json");
        }
    }
    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home).join(".config/gossipview/settings.json");
    }
    PathBuf::from("gossipview-settings.json")
}
