//! Task aggregate root and related task record types.

use super::{ParseTaskStatusError, TaskCode, TaskDomainError, TaskId, UserId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Task progress status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Work has not started.
    Pending,
    /// Work is under way.
    InProgress,
    /// Work is finished.
    Completed,
    /// Work was dropped.
    Cancelled,
}

impl TaskStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "PENDING" => Ok(Self::Pending),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

/// Non-empty task title.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskTitle(String);

impl TaskTitle {
    /// Creates a validated title, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyTitle`] if nothing remains after
    /// trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, TaskDomainError> {
        let raw = value.into();
        let normalized = raw.trim();
        if normalized.is_empty() {
            return Err(TaskDomainError::EmptyTitle);
        }
        Ok(Self(normalized.to_owned()))
    }

    /// Returns the title as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The mutable attributes of a task.
///
/// Every update replaces the whole set, so absent optional values clear the
/// stored ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDetails {
    title: TaskTitle,
    description: Option<String>,
    status: TaskStatus,
    assigned_date: Option<DateTime<Utc>>,
    due_date: Option<DateTime<Utc>>,
    assignee_id: Option<UserId>,
    priority: Option<String>,
    tags: Option<String>,
}

impl TaskDetails {
    /// Creates details with the required fields.
    #[must_use]
    pub const fn new(title: TaskTitle, status: TaskStatus) -> Self {
        Self {
            title,
            description: None,
            status,
            assigned_date: None,
            due_date: None,
            assignee_id: None,
            priority: None,
            tags: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Sets the assignment timestamp.
    #[must_use]
    pub const fn with_assigned_date(mut self, assigned_date: Option<DateTime<Utc>>) -> Self {
        self.assigned_date = assigned_date;
        self
    }

    /// Sets the due timestamp. No ordering against the assignment date is
    /// enforced.
    #[must_use]
    pub const fn with_due_date(mut self, due_date: Option<DateTime<Utc>>) -> Self {
        self.due_date = due_date;
        self
    }

    /// Sets the assignee.
    #[must_use]
    pub const fn with_assignee_id(mut self, assignee_id: Option<UserId>) -> Self {
        self.assignee_id = assignee_id;
        self
    }

    /// Sets the free-form priority label.
    #[must_use]
    pub fn with_priority(mut self, priority: Option<String>) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the free-form tag list.
    #[must_use]
    pub fn with_tags(mut self, tags: Option<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Returns the title.
    #[must_use]
    pub const fn title(&self) -> &TaskTitle {
        &self.title
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the assignment timestamp, if any.
    #[must_use]
    pub const fn assigned_date(&self) -> Option<DateTime<Utc>> {
        self.assigned_date
    }

    /// Returns the due timestamp, if any.
    #[must_use]
    pub const fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }

    /// Returns the assignee, if any.
    #[must_use]
    pub const fn assignee_id(&self) -> Option<UserId> {
        self.assignee_id
    }

    /// Returns the priority label, if any.
    #[must_use]
    pub fn priority(&self) -> Option<&str> {
        self.priority.as_deref()
    }

    /// Returns the tag list, if any.
    #[must_use]
    pub fn tags(&self) -> Option<&str> {
        self.tags.as_deref()
    }
}

/// A task that has not been persisted yet and therefore has no surrogate key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    code: TaskCode,
    details: TaskDetails,
    creator_id: Option<UserId>,
    parent_code: Option<TaskCode>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl NewTask {
    /// Creates an unsaved task stamped with the current clock time.
    #[must_use]
    pub fn new(
        code: TaskCode,
        details: TaskDetails,
        creator_id: Option<UserId>,
        parent_code: Option<TaskCode>,
        clock: &impl Clock,
    ) -> Self {
        let timestamp = clock.utc();
        Self {
            code,
            details,
            creator_id,
            parent_code,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Returns the assigned code.
    #[must_use]
    pub const fn code(&self) -> &TaskCode {
        &self.code
    }

    /// Returns the task attributes.
    #[must_use]
    pub const fn details(&self) -> &TaskDetails {
        &self.details
    }

    /// Returns the creator, if any.
    #[must_use]
    pub const fn creator_id(&self) -> Option<UserId> {
        self.creator_id
    }

    /// Returns the parent code, if any.
    #[must_use]
    pub const fn parent_code(&self) -> Option<&TaskCode> {
        self.parent_code.as_ref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last modification timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Promotes the draft to a persisted task once the store has assigned a
    /// key.
    #[must_use]
    pub fn into_persisted(self, id: TaskId) -> Task {
        Task::from_persisted(PersistedTaskData {
            id,
            code: self.code,
            details: self.details,
            creator_id: self.creator_id,
            parent_code: self.parent_code,
            version: Task::INITIAL_VERSION,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Task aggregate root.
///
/// The parent code is the only authoritative tree edge; children are derived
/// by the store and surfaced through [`TaskNode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: TaskId,
    code: TaskCode,
    details: TaskDetails,
    creator_id: Option<UserId>,
    parent_code: Option<TaskCode>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted surrogate key.
    pub id: TaskId,
    /// Persisted task code.
    pub code: TaskCode,
    /// Persisted attributes.
    pub details: TaskDetails,
    /// Persisted creator, if any.
    pub creator_id: Option<UserId>,
    /// Persisted parent code, if any.
    pub parent_code: Option<TaskCode>,
    /// Optimistic concurrency version.
    pub version: i64,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Version carried by a freshly inserted task.
    pub const INITIAL_VERSION: i64 = 1;

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            code: data.code,
            details: data.details,
            creator_id: data.creator_id,
            parent_code: data.parent_code,
            version: data.version,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the surrogate key.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the task code.
    #[must_use]
    pub const fn code(&self) -> &TaskCode {
        &self.code
    }

    /// Returns the task attributes.
    #[must_use]
    pub const fn details(&self) -> &TaskDetails {
        &self.details
    }

    /// Returns the creator, if any.
    #[must_use]
    pub const fn creator_id(&self) -> Option<UserId> {
        self.creator_id
    }

    /// Returns the parent code, if any.
    #[must_use]
    pub const fn parent_code(&self) -> Option<&TaskCode> {
        self.parent_code.as_ref()
    }

    /// Returns `true` when the task has no parent.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent_code.is_none()
    }

    /// Returns the optimistic concurrency version read from the store.
    #[must_use]
    pub const fn version(&self) -> i64 {
        self.version
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last modification timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Replaces the mutable attributes and parent edge.
    ///
    /// Code, key, and creator are never touched here. Hierarchy rules are
    /// checked by the caller before revising.
    pub fn revise(
        &mut self,
        details: TaskDetails,
        parent_code: Option<TaskCode>,
        clock: &impl Clock,
    ) {
        self.details = details;
        self.parent_code = parent_code;
        self.touch(clock);
    }

    /// Returns a copy carrying the next version, as stored after an update.
    #[must_use]
    pub fn with_next_version(mut self) -> Self {
        self.version += 1;
        self
    }

    /// Updates the `updated_at` timestamp to the current clock time.
    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}

/// A persisted task together with the codes of its direct children.
///
/// Child codes are derived from the parent edges of other tasks at read time
/// and are never written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskNode {
    task: Task,
    child_codes: Vec<TaskCode>,
}

impl TaskNode {
    /// Pairs a task with its derived child codes.
    #[must_use]
    pub const fn new(task: Task, child_codes: Vec<TaskCode>) -> Self {
        Self { task, child_codes }
    }

    /// Returns the task.
    #[must_use]
    pub const fn task(&self) -> &Task {
        &self.task
    }

    /// Returns the direct child codes in store order.
    #[must_use]
    pub fn child_codes(&self) -> &[TaskCode] {
        &self.child_codes
    }

    /// Splits the node into its parts.
    #[must_use]
    pub fn into_parts(self) -> (Task, Vec<TaskCode>) {
        (self.task, self.child_codes)
    }
}
