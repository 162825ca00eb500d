use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("invalid base url {input:?}: {reason}")]
    InvalidBaseUrl { input: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("no base URL configured")]
    NoBaseUrlConfigured,
}
