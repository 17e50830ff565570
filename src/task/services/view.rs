//! Caller-facing projection of a task.

use crate::task::domain::{TaskCode, TaskId, TaskNode, TaskStatus, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A task as returned to callers, with its hierarchy level and derived
/// child codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    /// Surrogate key.
    pub id: TaskId,
    /// Unique task code.
    pub code: TaskCode,
    /// Title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Status.
    pub status: TaskStatus,
    /// Optional assignment timestamp.
    pub assigned_date: Option<DateTime<Utc>>,
    /// Optional due timestamp.
    pub due_date: Option<DateTime<Utc>>,
    /// Optional creator.
    pub creator_id: Option<UserId>,
    /// Optional assignee.
    pub assignee_id: Option<UserId>,
    /// Parent code; omitted for roots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_code: Option<TaskCode>,
    /// Optional priority label.
    pub priority: Option<String>,
    /// Optional tag list.
    pub tags: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// 1-based depth, saturating at the hierarchy limit.
    pub hierarchy_level: usize,
    /// Codes of direct children in store order.
    pub child_codes: Vec<TaskCode>,
}

impl TaskView {
    /// Projects a stored node at the given hierarchy level.
    #[must_use]
    pub fn from_node(node: TaskNode, hierarchy_level: usize) -> Self {
        let (task, child_codes) = node.into_parts();
        let details = task.details();
        Self {
            id: task.id(),
            code: task.code().clone(),
            title: details.title().as_str().to_owned(),
            description: details.description().map(str::to_owned),
            status: details.status(),
            assigned_date: details.assigned_date(),
            due_date: details.due_date(),
            creator_id: task.creator_id(),
            assignee_id: details.assignee_id(),
            parent_code: task.parent_code().cloned(),
            priority: details.priority().map(str::to_owned),
            tags: details.tags().map(str::to_owned),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
            hierarchy_level,
            child_codes,
        }
    }
}
