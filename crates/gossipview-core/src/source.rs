use url::form_urlencoded;

use crate::error::SourceError;
use crate::settings::Settings;

/// Same-origin relay path served by the dashboard host.
pub const PROXY_PATH: &str = "/proxy/gossip";

/// Where a poll should be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GossipTarget {
    /// Absolute `<base>/gossip` URL on the node itself.
    Direct(String),
    /// Relay path and query, relative to the dashboard host.
    Proxied(String),
}

impl GossipTarget {
    pub fn as_str(&self) -> &str {
        match self {
            GossipTarget::Direct(url) | GossipTarget::Proxied(url) => url,
        }
    }

    /// Absolute URL to request, joining relay paths onto `origin`.
    pub fn absolute(&self, origin: &str) -> String {
        match self {
            GossipTarget::Direct(url) => url.clone(),
            GossipTarget::Proxied(path) => format!("{}{path}", origin.trim_end_matches('/')),
        }
    }
}

/// Base with a single trailing slash removed.
pub fn trimmed_base(base: &str) -> &str {
    base.strip_suffix('/').unwrap_or(base)
}

/// Base URL to start with: the stored value, or the server-supplied
/// default when nothing is stored. Either may be empty.
pub fn startup_base_url(stored: &str, server_default: Option<&str>) -> String {
    if stored.is_empty() {
        server_default.unwrap_or_default().to_string()
    } else {
        stored.to_string()
    }
}

pub fn resolve_target(settings: &Settings) -> Result<GossipTarget, SourceError> {
    let base = trimmed_base(&settings.base_url);
    if base.is_empty() {
        return Err(SourceError::NoBaseUrlConfigured);
    }
    if settings.use_proxy {
        let encoded: String = form_urlencoded::byte_serialize(base.as_bytes()).collect();
        Ok(GossipTarget::Proxied(format!("{PROXY_PATH}?base={encoded}")))
    } else {
        Ok(GossipTarget::Direct(format!("{base}/gossip")))
    }
}

/// Direct link to a node's gossip endpoint, for display.
pub fn api_link(base: &str) -> Option<String> {
    let base = trimmed_base(base);
    (!base.is_empty()).then(|| format!("{base}/gossip"))
}
