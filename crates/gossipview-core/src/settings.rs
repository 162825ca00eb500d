use std::time::Duration;

use url::Url;

use crate::error::SettingsError;

pub const DEFAULT_INTERVAL_SECS: u32 = 10;

/// Floor on the auto-refresh period, whatever the configured interval.
pub const MIN_REFRESH_PERIOD_SECS: u32 = 3;

/// Interval selector choices, in seconds.
pub const INTERVAL_CHOICES: &[u32] = &[3, 5, 10, 15, 30, 60];

/// User-chosen viewer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub use_proxy: bool,
    pub auto_refresh: bool,
    pub interval_seconds: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            use_proxy: true,
            auto_refresh: false,
            interval_seconds: DEFAULT_INTERVAL_SECS,
        }
    }
}

impl Settings {
    /// Period of the recurring refresh timer.
    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval_seconds.max(MIN_REFRESH_PERIOD_SECS)))
    }
}

/// Raw values from the settings form, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsForm {
    pub base_url: String,
    pub use_proxy: bool,
    pub auto_refresh: bool,
    pub interval: String,
}

impl From<&Settings> for SettingsForm {
    fn from(s: &Settings) -> Self {
        Self {
            base_url: s.base_url.clone(),
            use_proxy: s.use_proxy,
            auto_refresh: s.auto_refresh,
            interval: s.interval_seconds.to_string(),
        }
    }
}

impl SettingsForm {
    /// Validate the form into settings ready to persist.
    pub fn validate(&self) -> Result<Settings, SettingsError> {
        Ok(Settings {
            base_url: validate_base_url(&self.base_url)?,
            use_proxy: self.use_proxy,
            auto_refresh: self.auto_refresh,
            interval_seconds: parse_interval(&self.interval),
        })
    }
}

/// Accepts an empty value (meaning "unset") or an absolute http(s) URL
/// with a host. Returns the trimmed input unchanged otherwise.
pub fn validate_base_url(input: &str) -> Result<String, SettingsError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    let invalid = |reason: &str| SettingsError::InvalidBaseUrl {
        input: trimmed.to_string(),
        reason: reason.to_string(),
    };
    let parsed = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(invalid("must start with http or https"));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(invalid("host is empty"));
    }
    Ok(trimmed.to_string())
}

/// Positive integer seconds, or the default for anything else.
pub fn parse_interval(raw: &str) -> u32 {
    match raw.trim().parse::<u32>() {
        Ok(n) if n >= 1 => n,
        _ => DEFAULT_INTERVAL_SECS,
    }
}

/// Next (or previous) selector choice relative to `current`.
pub fn cycle_interval(current: u32, forward: bool) -> u32 {
    let pos = INTERVAL_CHOICES.iter().position(|&c| c == current);
    let len = INTERVAL_CHOICES.len();
    let next = match (pos, forward) {
        (Some(i), true) => (i + 1) % len,
        (Some(i), false) => (i + len - 1) % len,
        (None, true) => INTERVAL_CHOICES
            .iter()
            .position(|&c| c > current)
            .unwrap_or(0),
        (None, false) => INTERVAL_CHOICES
            .iter()
            .rposition(|&c| c < current)
            .unwrap_or(len - 1),
    };
    INTERVAL_CHOICES[next]
}
