use gossipview_core::settings::{Settings, DEFAULT_INTERVAL_SECS};

use crate::{
    KeyValueStore, StoreError, AUTO_REFRESH_KEY, BASE_URL_KEY, INTERVAL_KEY, USE_PROXY_KEY,
};

/// Typed accessors over a [`KeyValueStore`].
///
/// Reads never validate: absent or unreadable values fall back to the
/// defaults (`useProxy` true, `autoRefresh` false, interval 10s).
/// Validation happens only when the user saves.
pub struct SettingsStore<S> {
    inner: S,
}

impl<S: KeyValueStore> SettingsStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn base_url(&self) -> String {
        self.inner.get(BASE_URL_KEY).unwrap_or_default()
    }

    pub fn set_base_url(&mut self, value: &str) -> Result<(), StoreError> {
        self.inner.set(BASE_URL_KEY, value)
    }

    pub fn use_proxy(&self) -> bool {
        self.flag(USE_PROXY_KEY, true)
    }

    pub fn set_use_proxy(&mut self, value: bool) -> Result<(), StoreError> {
        self.inner.set(USE_PROXY_KEY, bool_text(value))
    }

    pub fn auto_refresh(&self) -> bool {
        self.flag(AUTO_REFRESH_KEY, false)
    }

    pub fn set_auto_refresh(&mut self, value: bool) -> Result<(), StoreError> {
        self.inner.set(AUTO_REFRESH_KEY, bool_text(value))
    }

    pub fn interval_seconds(&self) -> u32 {
        self.inner
            .get(INTERVAL_KEY)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|&n| n >= 1)
            .unwrap_or(DEFAULT_INTERVAL_SECS)
    }

    pub fn set_interval_seconds(&mut self, value: u32) -> Result<(), StoreError> {
        self.inner.set(INTERVAL_KEY, &value.to_string())
    }

    pub fn load(&self) -> Settings {
        Settings {
            base_url: self.base_url(),
            use_proxy: self.use_proxy(),
            auto_refresh: self.auto_refresh(),
            interval_seconds: self.interval_seconds(),
        }
    }

    /// Persist every field in one write. On error nothing changed.
    pub fn save(&mut self, settings: &Settings) -> Result<(), StoreError> {
        let interval = settings.interval_seconds.to_string();
        self.inner.set_many(&[
            (BASE_URL_KEY, settings.base_url.as_str()),
            (USE_PROXY_KEY, bool_text(settings.use_proxy)),
            (AUTO_REFRESH_KEY, bool_text(settings.auto_refresh)),
            (INTERVAL_KEY, interval.as_str()),
        ])
    }

    /// A present value counts as true only when it is exactly `"true"`.
    fn flag(&self, key: &str, default: bool) -> bool {
        match self.inner.get(key) {
            Some(v) => v == "true",
            None => default,
        }
    }
}

fn bool_text(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
