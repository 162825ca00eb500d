//! Pure card-list renderer.
//!
//! [`build_view`] turns the canonical model plus per-node UI state into a
//! [`CardsView`] tree. It holds no references to the previous tree, so
//! every call is a full rebuild, and the same inputs always produce an
//! equal tree.

use std::collections::{HashMap, HashSet};

use gossipview_core::display::{format_node_name, format_timestamp, short_sha, UNKNOWN_NODE};
use gossipview_core::{node_keys, NodeReport, RepoStatus, TaskStatus};

/// Repositories shown per node before "show more", and the step size.
pub const PAGE_SIZE: usize = 25;

pub const EMPTY_MESSAGE: &str = "No nodes found.";

const META_SEPARATOR: &str = " • ";

/// Visible repository count per node, keyed by [`node_keys`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pagination {
    visible: HashMap<String, usize>,
}

impl Pagination {
    pub fn visible_for(&self, node_key: &str) -> usize {
        self.visible.get(node_key).copied().unwrap_or(PAGE_SIZE)
    }

    pub fn show_more(&mut self, node_key: &str) {
        let next = self.visible_for(node_key) + PAGE_SIZE;
        self.visible.insert(node_key.to_string(), next);
    }

    /// Drop entries for nodes that are no longer reported.
    pub fn retain_nodes(&mut self, nodes: &[NodeReport]) {
        let present: HashSet<String> = node_keys(nodes).into_iter().collect();
        self.visible.retain(|key, _| present.contains(key));
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }
}

/// Which task disclosures are expanded, by (node key, row position).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Disclosures {
    open: HashSet<(String, usize)>,
}

impl Disclosures {
    pub fn toggle(&mut self, node_key: &str, repo: usize) {
        let key = (node_key.to_string(), repo);
        if !self.open.remove(&key) {
            self.open.insert(key);
        }
    }

    pub fn is_open(&self, node_key: &str, repo: usize) -> bool {
        self.open.contains(&(node_key.to_string(), repo))
    }

    pub fn clear(&mut self) {
        self.open.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Local,
    FetchError,
    Changed,
    Unchanged,
    Success,
    Error,
    TaskOk,
    TaskFail,
}

impl Badge {
    pub fn label(&self) -> &'static str {
        match self {
            Badge::Local => "local",
            Badge::FetchError => "fetch error",
            Badge::Changed => "changed",
            Badge::Unchanged => "unchanged",
            Badge::Success => "success",
            Badge::Error => "error",
            Badge::TaskOk => "ok",
            Badge::TaskFail => "fail",
        }
    }

    /// Class name used by the HTML snapshot.
    pub fn class(&self) -> &'static str {
        match self {
            Badge::Local => "islocal",
            Badge::FetchError | Badge::Error | Badge::TaskFail => "error",
            Badge::Changed => "changed",
            Badge::Unchanged => "unchanged",
            Badge::Success | Badge::TaskOk => "success",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CardsView {
    Empty,
    Cards(Vec<NodeCard>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeCard {
    pub key: String,
    pub title: String,
    /// Raw node URL.
    pub tooltip: String,
    pub last_updated: String,
    pub badges: Vec<Badge>,
    pub error: Option<String>,
    pub repos: Vec<RepoRow>,
    pub show_more: Option<ShowMore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShowMore {
    pub remaining: usize,
}

impl ShowMore {
    pub fn label(&self) -> String {
        format!("Show older statuses ({} more)", self.remaining)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepoRow {
    pub title: String,
    pub badges: Vec<Badge>,
    pub meta: String,
    pub error: Option<String>,
    pub tasks: Option<TaskDisclosure>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskDisclosure {
    pub expanded: bool,
    pub tasks: Vec<TaskRow>,
}

impl TaskDisclosure {
    pub fn label(&self) -> String {
        format!("Tasks ({})", self.tasks.len())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskRow {
    pub name: String,
    pub badge: Badge,
    /// Command tokens joined with spaces, unescaped.
    pub command: String,
    pub output: Option<String>,
}

pub fn build_view(
    nodes: &[NodeReport],
    pagination: &Pagination,
    disclosures: &Disclosures,
) -> CardsView {
    if nodes.is_empty() {
        return CardsView::Empty;
    }
    CardsView::Cards(
        nodes
            .iter()
            .zip(node_keys(nodes))
            .map(|(node, key)| build_card(node, key, pagination, disclosures))
            .collect(),
    )
}

fn build_card(
    node: &NodeReport,
    key: String,
    pagination: &Pagination,
    disclosures: &Disclosures,
) -> NodeCard {
    let error = non_empty(node.fetch_error.as_deref());

    let mut badges = Vec::new();
    if node.is_local {
        badges.push(Badge::Local);
    }
    if error.is_some() {
        badges.push(Badge::FetchError);
    }

    let repos = node.repositories_by_recency();
    let limit = pagination.visible_for(&key);
    let rows = repos
        .iter()
        .take(limit)
        .enumerate()
        .map(|(row, repo)| build_repo_row(repo, disclosures.is_open(&key, row)))
        .collect();
    let show_more = (repos.len() > limit).then(|| ShowMore {
        remaining: repos.len() - limit,
    });

    NodeCard {
        title: format_node_name(node.node_url.as_deref()),
        tooltip: node
            .node_url
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| UNKNOWN_NODE.to_string()),
        last_updated: format_timestamp(node.last_updated.as_deref()),
        badges,
        error,
        repos: rows,
        show_more,
        key,
    }
}

fn build_repo_row(repo: &RepoStatus, expanded: bool) -> RepoRow {
    let badges = if repo.changed {
        let outcome = if repo.success {
            Badge::Success
        } else {
            Badge::Error
        };
        vec![Badge::Changed, outcome]
    } else {
        vec![Badge::Unchanged]
    };

    let tasks = repo.shows_task_detail().then(|| TaskDisclosure {
        expanded,
        tasks: repo.task_statuses.iter().map(build_task_row).collect(),
    });

    RepoRow {
        title: non_empty(repo.name.as_deref()).unwrap_or_else(|| "repo".to_string()),
        badges,
        meta: repo_meta(repo),
        error: non_empty(repo.error_message.as_deref()),
        tasks,
    }
}

/// `sha <short> • <time> • <config path>`, skipping absent parts.
fn repo_meta(repo: &RepoStatus) -> String {
    let mut parts = Vec::new();
    if let Some(sha) = non_empty(repo.sha.as_deref()) {
        parts.push(format!("sha {}", short_sha(&sha)));
    }
    if let Some(time) = non_empty(repo.time.as_deref()) {
        parts.push(format_timestamp(Some(&time)));
    }
    if let Some(path) = non_empty(repo.config_path.as_deref()) {
        parts.push(path);
    }
    parts.join(META_SEPARATOR)
}

fn build_task_row(task: &TaskStatus) -> TaskRow {
    TaskRow {
        name: non_empty(task.task_name.as_deref()).unwrap_or_else(|| "task".to_string()),
        badge: if task.success {
            Badge::TaskOk
        } else {
            Badge::TaskFail
        },
        command: task.command.join(" "),
        output: non_empty(task.output.as_deref()),
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.filter(|v| !v.is_empty()).map(String::from)
}
