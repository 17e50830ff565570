//! Diesel row models for task persistence.

use super::schema::tasks;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for task records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Surrogate key.
    pub id: i64,
    /// Task code.
    pub code: String,
    /// Title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Status.
    pub status: String,
    /// Optional assignment timestamp.
    pub assigned_date: Option<DateTime<Utc>>,
    /// Optional due timestamp.
    pub due_date: Option<DateTime<Utc>>,
    /// Optional creator reference.
    pub creator_id: Option<i64>,
    /// Optional assignee reference.
    pub assignee_id: Option<i64>,
    /// Optional parent task code.
    pub parent_code: Option<String>,
    /// Optional priority label.
    pub priority: Option<String>,
    /// Optional tag list.
    pub tags: Option<String>,
    /// Optimistic concurrency version.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert model for task records; the key comes from the sequence.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTaskRow {
    /// Task code.
    pub code: String,
    /// Title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Status.
    pub status: String,
    /// Optional assignment timestamp.
    pub assigned_date: Option<DateTime<Utc>>,
    /// Optional due timestamp.
    pub due_date: Option<DateTime<Utc>>,
    /// Optional creator reference.
    pub creator_id: Option<i64>,
    /// Optional assignee reference.
    pub assignee_id: Option<i64>,
    /// Optional parent task code.
    pub parent_code: Option<String>,
    /// Optional priority label.
    pub priority: Option<String>,
    /// Optional tag list.
    pub tags: Option<String>,
    /// Initial version.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Changeset written by updates. `None` clears nullable columns.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(treat_none_as_null = true)]
pub struct TaskChangeset {
    /// Title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Status.
    pub status: String,
    /// Optional assignment timestamp.
    pub assigned_date: Option<DateTime<Utc>>,
    /// Optional due timestamp.
    pub due_date: Option<DateTime<Utc>>,
    /// Optional assignee reference.
    pub assignee_id: Option<i64>,
    /// Optional parent task code.
    pub parent_code: Option<String>,
    /// Optional priority label.
    pub priority: Option<String>,
    /// Optional tag list.
    pub tags: Option<String>,
    /// Next version.
    pub version: i64,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Row shape of the recursive ancestor query.
#[derive(Debug, Clone, QueryableByName)]
pub struct AncestorRow {
    /// Ancestor task code.
    #[diesel(sql_type = diesel::sql_types::Varchar)]
    pub code: String,
}

/// Row shape of the recursive subtree-height query.
#[derive(Debug, Clone, Copy, QueryableByName)]
pub struct SubtreeHeightRow {
    /// Levels below and including the subtree root; zero for unknown codes.
    #[diesel(sql_type = diesel::sql_types::Integer)]
    pub height: i32,
}
