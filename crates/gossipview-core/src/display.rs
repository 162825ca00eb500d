//! Display helpers shared by the terminal and HTML renderers.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};

pub const UNKNOWN_NODE: &str = "Unknown node";

/// Node title: scheme, first port and trailing slash removed.
pub fn format_node_name(url: Option<&str>) -> String {
    let url = match url {
        Some(u) if !u.is_empty() => u,
        _ => return UNKNOWN_NODE.to_string(),
    };

    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .unwrap_or(url);

    let without_port = strip_first_port(rest);
    without_port
        .strip_suffix('/')
        .unwrap_or(without_port.as_str())
        .to_string()
}

/// Removes the first `:<digits>` run, wherever it appears.
fn strip_first_port(s: &str) -> String {
    let bytes = s.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b':' {
            continue;
        }
        let digits = bytes[i + 1..]
            .iter()
            .take_while(|c| c.is_ascii_digit())
            .count();
        if digits > 0 {
            let mut out = String::with_capacity(s.len());
            out.push_str(&s[..i]);
            out.push_str(&s[i + 1 + digits..]);
            return out;
        }
    }
    s.to_string()
}

pub fn short_sha(sha: &str) -> String {
    sha.chars().take(7).collect()
}

/// Parse the timestamp shapes gossip nodes emit: RFC 3339 (what Go's
/// `time.Time` marshals to), naive date-times, and bare dates. Values
/// without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

/// Local-time rendering of a payload timestamp. Unparseable input is shown
/// verbatim; absent input renders empty.
pub fn format_timestamp(raw: Option<&str>) -> String {
    match raw {
        None => String::new(),
        Some(r) => match parse_timestamp(r) {
            Some(t) => t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
            None => r.to_string(),
        },
    }
}

pub fn format_clock(now: DateTime<Local>) -> String {
    now.format("%H:%M:%S").to_string()
}
