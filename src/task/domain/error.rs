//! Error types for task domain validation, parsing, and hierarchy rules.

use super::TaskCode;
use thiserror::Error;

/// Errors returned while constructing domain task values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The task title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,

    /// The value does not follow the `AA-00-xxxx` task code format.
    #[error("invalid task code '{0}', expected format AA-00-xxxx")]
    InvalidCode(String),

    /// The requested sort field is not supported.
    #[error("unknown sort field: {0}")]
    UnknownSortField(String),

    /// The requested page size is zero.
    #[error("page size must be at least 1")]
    InvalidPageSize,
}

/// Business-rule violations on the task hierarchy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HierarchyViolation {
    /// Attaching below the candidate parent would exceed the depth limit.
    #[error("maximum hierarchy level ({max}) reached")]
    MaxDepthReached {
        /// Configured hierarchy limit.
        max: usize,
    },

    /// Adopting the candidate parent would make the task its own ancestor.
    #[error("circular reference detected: {task} cannot be placed under {parent}")]
    CircularReference {
        /// Task being reparented.
        task: TaskCode,
        /// Rejected parent.
        parent: TaskCode,
    },

    /// The task still has direct children and cannot be deleted.
    #[error("task {code} has {count} child task(s); delete or reassign children first")]
    HasChildren {
        /// Task whose deletion was refused.
        code: TaskCode,
        /// Number of direct children.
        count: usize,
    },
}

/// Error returned while parsing task statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);
