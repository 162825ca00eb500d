use std::time::Duration;

use async_trait::async_trait;
use gossipview_core::GossipTarget;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Network(String),

    #[error("request timed out after {}", duration_text(.0))]
    Timeout(Duration),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("invalid JSON: {0}")]
    Decode(String),
}

/// Whole seconds as `15s`, anything finer as `200ms`.
fn duration_text(d: &Duration) -> String {
    if d.subsec_nanos() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}ms", d.as_millis())
    }
}

/// Defaults advertised by the dashboard host at `GET /config`.
///
/// A field of an unexpected type never fails the whole object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    #[serde(rename = "baseApiUrl", default, deserialize_with = "string_or_none")]
    pub base_api_url: Option<String>,
    #[serde(default, deserialize_with = "scalar_text")]
    pub version: Option<String>,
}

fn string_or_none<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Numbers and booleans keep their JSON text, so `"version": 2` reads as `2`.
fn scalar_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

impl ServerConfig {
    /// The advertised base URL, if non-empty.
    pub fn default_base_url(&self) -> Option<&str> {
        self.base_api_url.as_deref().filter(|s| !s.is_empty())
    }
}

/// Where gossip data comes from.
///
/// `HttpService` talks to real endpoints; tests script their own.
#[async_trait]
pub trait GossipSource: Send + Sync {
    async fn fetch_config(&self) -> Result<ServerConfig, ServiceError>;

    /// Fetch the raw gossip payload. Any JSON value is a success; shape
    /// checking is left to the normalizer.
    async fn fetch_gossip(&self, target: &GossipTarget) -> Result<serde_json::Value, ServiceError>;
}
