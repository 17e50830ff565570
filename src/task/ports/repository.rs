//! Repository port for task persistence and hierarchy lookups.

use crate::task::domain::{HierarchyViolation, NewTask, Page, PageRequest, Task, TaskCode, TaskNode};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for task repository operations.
pub type TaskRepositoryResult<T> = Result<T, TaskRepositoryError>;

/// Task persistence contract.
///
/// Reads that return [`TaskNode`] carry the direct child codes derived from
/// parent edges, and a read issued after a successful write observes that
/// write. Implementations enforce referential integrity on their own: a task
/// may not point at a missing parent and a task with children may not be
/// removed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Stores a new task and assigns its surrogate key.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::DuplicateCode`] when the code is already
    /// taken, [`TaskRepositoryError::ParentNotFound`] when the parent code
    /// does not resolve, or [`TaskRepositoryError::Hierarchy`] when the parent
    /// already sits at the maximum level.
    async fn insert(&self, task: &NewTask) -> TaskRepositoryResult<Task>;

    /// Persists changes to an existing task and returns the stored version.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the task does not exist,
    /// [`TaskRepositoryError::VersionConflict`] when it changed since it was
    /// read, [`TaskRepositoryError::ParentNotFound`] when the new parent does
    /// not resolve, or [`TaskRepositoryError::Hierarchy`] when a changed
    /// parent would close a cycle or push the moved subtree past the maximum
    /// level. The hierarchy check runs atomically with the write.
    async fn update(&self, task: &Task) -> TaskRepositoryResult<Task>;

    /// Removes a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the task does not exist
    /// or [`TaskRepositoryError::HasChildren`] when other tasks still point at
    /// it.
    async fn delete(&self, task: &Task) -> TaskRepositoryResult<()>;

    /// Finds a task by code.
    ///
    /// Returns `None` when the task does not exist.
    async fn find_by_code(&self, code: &TaskCode) -> TaskRepositoryResult<Option<TaskNode>>;

    /// Returns one ordered page of all tasks.
    async fn find_all(&self, request: PageRequest) -> TaskRepositoryResult<Page<TaskNode>>;

    /// Returns the direct children of the given parent code in store order.
    async fn find_by_parent_code(&self, code: &TaskCode) -> TaskRepositoryResult<Vec<TaskNode>>;

    /// Returns every task without a parent.
    async fn find_root_tasks(&self) -> TaskRepositoryResult<Vec<TaskNode>>;

    /// Returns up to `limit` ancestor codes of the given task, nearest first.
    ///
    /// Returns an empty list for roots and for unknown codes.
    async fn find_ancestor_codes(
        &self,
        code: &TaskCode,
        limit: usize,
    ) -> TaskRepositoryResult<Vec<TaskCode>>;

    /// Returns the code of every stored task.
    async fn all_codes(&self) -> TaskRepositoryResult<Vec<TaskCode>>;
}

/// Errors returned by task repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskRepositoryError {
    /// A task with the same code already exists.
    #[error("duplicate task code: {0}")]
    DuplicateCode(TaskCode),

    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(TaskCode),

    /// The referenced parent task was not found.
    #[error("parent task not found: {0}")]
    ParentNotFound(TaskCode),

    /// The task still has children.
    #[error("task {code} still has {count} child task(s)")]
    HasChildren {
        /// Task that could not be removed.
        code: TaskCode,
        /// Number of remaining children.
        count: usize,
    },

    /// The write would break a hierarchy rule.
    #[error("hierarchy rule violated: {0}")]
    Hierarchy(HierarchyViolation),

    /// The task changed since it was read.
    #[error("task {0} was modified concurrently")]
    VersionConflict(TaskCode),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
