use std::collections::HashSet;

use crate::display::parse_timestamp;

/// One cluster member's self-view, as returned by a single gossip poll.
///
/// Rebuilt wholesale on every successful poll. Optional fields stay `None`
/// when the payload omitted them; nothing is inferred.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeReport {
    pub node_url: Option<String>,
    pub last_updated: Option<String>,
    pub is_local: bool,
    pub fetch_error: Option<String>,
    pub repositories: Vec<RepoStatus>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepoStatus {
    pub name: Option<String>,
    pub config_path: Option<String>,
    pub sha: Option<String>,
    pub time: Option<String>,
    pub changed: bool,
    pub success: bool,
    pub error_message: Option<String>,
    pub task_statuses: Vec<TaskStatus>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskStatus {
    pub task_name: Option<String>,
    pub command: Vec<String>,
    pub success: bool,
    pub output: Option<String>,
}

impl NodeReport {
    /// Stable identity used to key per-node UI state across polls.
    /// Falls back to the position when the node did not report a URL.
    pub fn identity(&self, position: usize) -> String {
        match self.node_url.as_deref() {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => format!("#{position}"),
        }
    }

    /// Repositories ordered by `time` descending. Missing or unparseable
    /// times sort as the epoch; equal keys keep payload order.
    pub fn repositories_by_recency(&self) -> Vec<&RepoStatus> {
        let mut repos: Vec<&RepoStatus> = self.repositories.iter().collect();
        repos.sort_by(|a, b| b.recency_key().cmp(&a.recency_key()));
        repos
    }
}

/// Keys for per-node UI state, one per node and unique within `nodes`.
///
/// Each key starts from [`NodeReport::identity`]. A key already taken by an
/// earlier node, whether a repeated URL or a URL that looks like a
/// positional fallback, gets the first free `#<n>` suffix.
pub fn node_keys(nodes: &[NodeReport]) -> Vec<String> {
    let mut taken = HashSet::with_capacity(nodes.len());
    nodes
        .iter()
        .enumerate()
        .map(|(position, node)| {
            let base = node.identity(position);
            let mut key = base.clone();
            let mut n = 1;
            while taken.contains(&key) {
                key = format!("{base}#{n}");
                n += 1;
            }
            taken.insert(key.clone());
            key
        })
        .collect()
}

impl RepoStatus {
    /// Milliseconds since the epoch, or 0 when `time` is absent or invalid.
    pub fn recency_key(&self) -> i64 {
        self.time
            .as_deref()
            .and_then(parse_timestamp)
            .map(|t| t.timestamp_millis())
            .unwrap_or(0)
    }

    /// Task detail is only worth showing when something actually ran.
    pub fn shows_task_detail(&self) -> bool {
        self.changed && !self.task_statuses.is_empty()
    }
}
