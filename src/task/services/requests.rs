//! Request payloads accepted by [`TaskManager`](super::TaskManager).

use crate::task::domain::{TaskCode, TaskDetails, TaskDomainError, TaskStatus, TaskTitle, UserId};
use chrono::{DateTime, Utc};

/// Payload for creating or updating a task.
///
/// On update every optional field replaces the stored value, and the creator
/// is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    title: String,
    description: Option<String>,
    status: TaskStatus,
    assigned_date: Option<DateTime<Utc>>,
    due_date: Option<DateTime<Utc>>,
    creator_id: Option<UserId>,
    assignee_id: Option<UserId>,
    parent_code: Option<String>,
    priority: Option<String>,
    tags: Option<String>,
}

impl TaskRequest {
    /// Creates a request with the required fields.
    #[must_use]
    pub fn new(title: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            title: title.into(),
            description: None,
            status,
            assigned_date: None,
            due_date: None,
            creator_id: None,
            assignee_id: None,
            parent_code: None,
            priority: None,
            tags: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the assignment timestamp.
    #[must_use]
    pub const fn with_assigned_date(mut self, assigned_date: DateTime<Utc>) -> Self {
        self.assigned_date = Some(assigned_date);
        self
    }

    /// Sets the due timestamp.
    #[must_use]
    pub const fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Sets the creator.
    #[must_use]
    pub const fn with_creator_id(mut self, creator_id: UserId) -> Self {
        self.creator_id = Some(creator_id);
        self
    }

    /// Sets the assignee.
    #[must_use]
    pub const fn with_assignee_id(mut self, assignee_id: UserId) -> Self {
        self.assignee_id = Some(assignee_id);
        self
    }

    /// Sets the parent code. An empty value means "no parent".
    #[must_use]
    pub fn with_parent_code(mut self, parent_code: impl Into<String>) -> Self {
        self.parent_code = Some(parent_code.into());
        self
    }

    /// Sets the priority label.
    #[must_use]
    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    /// Sets the tag list.
    #[must_use]
    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    /// Returns the creator, if any.
    #[must_use]
    pub const fn creator_id(&self) -> Option<UserId> {
        self.creator_id
    }

    /// Returns the requested parent, treating an absent or blank value as no
    /// parent.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidCode`] when a non-blank value is not a
    /// well-formed task code.
    pub fn parent_code(&self) -> Result<Option<TaskCode>, TaskDomainError> {
        match self.parent_code.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => TaskCode::parse(raw).map(Some),
        }
    }

    /// Builds the validated task attributes.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyTitle`] when the title is blank.
    pub fn details(&self) -> Result<TaskDetails, TaskDomainError> {
        let title = TaskTitle::new(self.title.as_str())?;
        Ok(TaskDetails::new(title, self.status)
            .with_description(self.description.clone())
            .with_assigned_date(self.assigned_date)
            .with_due_date(self.due_date)
            .with_assignee_id(self.assignee_id)
            .with_priority(self.priority.clone())
            .with_tags(self.tags.clone()))
    }
}

/// Paging and ordering options for task listings.
///
/// Unset options take the configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListTasksRequest {
    page: Option<u32>,
    size: Option<u32>,
    sort_by: Option<String>,
    sort_direction: Option<String>,
}

impl ListTasksRequest {
    /// Creates a request that uses every default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the zero-based page index.
    #[must_use]
    pub const fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Sets the page size.
    #[must_use]
    pub const fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Sets the ordering field by name, e.g. `createdAt` or `title`.
    #[must_use]
    pub fn with_sort_by(mut self, field: impl Into<String>) -> Self {
        self.sort_by = Some(field.into());
        self
    }

    /// Sets the ordering direction; `asc` in any case is ascending and any
    /// other value is descending.
    #[must_use]
    pub fn with_sort_direction(mut self, direction: impl Into<String>) -> Self {
        self.sort_direction = Some(direction.into());
        self
    }

    /// Returns the requested page index, if set.
    #[must_use]
    pub const fn page(&self) -> Option<u32> {
        self.page
    }

    /// Returns the requested page size, if set.
    #[must_use]
    pub const fn size(&self) -> Option<u32> {
        self.size
    }

    /// Returns the requested ordering field, if set.
    #[must_use]
    pub fn sort_by(&self) -> Option<&str> {
        self.sort_by.as_deref()
    }

    /// Returns the requested ordering direction, if set.
    #[must_use]
    pub fn sort_direction(&self) -> Option<&str> {
        self.sort_direction.as_deref()
    }
}
