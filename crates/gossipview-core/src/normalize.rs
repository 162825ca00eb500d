//! Gossip payload normalization.
//!
//! Nodes have shipped their task list under two names over time. Both are
//! accepted here, in [`TASK_LIST_FIELDS`] order, so nothing downstream of
//! this module ever sees the difference.

use serde_json::{Map, Value};

use crate::report::{NodeReport, RepoStatus, TaskStatus};

/// Historical task-list field names, checked in order. The first one that
/// holds an array wins.
pub const TASK_LIST_FIELDS: [&str; 2] = ["TaskStatues", "TaskStatuses"];

/// Convert a raw gossip payload into the canonical model.
///
/// Any top level that is not an array yields an empty node list. Fields
/// with the wrong JSON type are treated as absent rather than failing the
/// node they belong to.
pub fn normalize(payload: &Value) -> Vec<NodeReport> {
    match payload {
        Value::Array(nodes) => nodes.iter().map(normalize_node).collect(),
        _ => Vec::new(),
    }
}

fn normalize_node(value: &Value) -> NodeReport {
    let Some(obj) = value.as_object() else {
        return NodeReport::default();
    };
    NodeReport {
        node_url: str_field(obj, "node_url"),
        last_updated: str_field(obj, "last_updated"),
        is_local: bool_field(obj, "is_local"),
        fetch_error: obj.get("fetch_error").and_then(error_text),
        repositories: array_field(obj, "repositories")
            .map(|items| items.iter().map(normalize_repo).collect())
            .unwrap_or_default(),
    }
}

fn normalize_repo(value: &Value) -> RepoStatus {
    let Some(obj) = value.as_object() else {
        return RepoStatus::default();
    };
    let repository = obj.get("Repository").and_then(Value::as_object);
    RepoStatus {
        name: repository.and_then(|r| str_field(r, "Name")),
        config_path: repository.and_then(|r| str_field(r, "ConfigPath")),
        sha: str_field(obj, "Sha1"),
        time: str_field(obj, "Time"),
        changed: bool_field(obj, "Changed"),
        success: bool_field(obj, "Success"),
        error_message: str_field(obj, "ErrorMessage"),
        task_statuses: task_list(obj)
            .map(|items| items.iter().map(normalize_task).collect())
            .unwrap_or_default(),
    }
}

fn task_list(obj: &Map<String, Value>) -> Option<&Vec<Value>> {
    TASK_LIST_FIELDS
        .iter()
        .find_map(|field| array_field(obj, field))
}

fn normalize_task(value: &Value) -> TaskStatus {
    let Some(obj) = value.as_object() else {
        return TaskStatus::default();
    };
    let task = obj.get("Task").and_then(Value::as_object);
    TaskStatus {
        task_name: task.and_then(|t| str_field(t, "Name")),
        command: task
            .and_then(|t| array_field(t, "Command"))
            .map(|tokens| tokens.iter().filter_map(token_text).collect())
            .unwrap_or_default(),
        success: bool_field(obj, "Success"),
        output: str_field(obj, "Output"),
    }
}

fn str_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(String::from)
}

/// Any truthy value marks a failed fetch. Non-string values are shown in
/// their JSON text form.
fn error_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn bool_field(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn array_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Vec<Value>> {
    obj.get(key).and_then(Value::as_array)
}

/// Command tokens are strings in practice; scalars are kept in their JSON
/// text form, nulls and containers dropped.
fn token_text(token: &Value) -> Option<String> {
    match token {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
