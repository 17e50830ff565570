//! Service-level errors for task hierarchy operations.

use super::code_generator::CodeGenerationError;
use crate::task::{
    domain::{HierarchyViolation, TaskCode, TaskDomainError},
    ports::TaskRepositoryError,
};
use thiserror::Error;

/// Service-level errors for task manager operations.
#[derive(Debug, Error)]
pub enum TaskManagerError {
    /// No task has the requested code.
    #[error("task not found with code: {0}")]
    TaskNotFound(TaskCode),
    /// No task has the requested parent code.
    #[error("parent task not found with code: {0}")]
    ParentNotFound(TaskCode),
    /// A hierarchy rule was violated.
    #[error(transparent)]
    Hierarchy(#[from] HierarchyViolation),
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
    /// No unique code could be issued.
    #[error(transparent)]
    CodeGeneration(#[from] CodeGenerationError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] TaskRepositoryError),
}

/// Coarse classification of [`TaskManagerError`] for callers that map
/// failures onto transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskErrorKind {
    /// A referenced task or parent does not exist.
    NotFound,
    /// A business rule or input constraint was violated.
    ValidationFailure,
    /// The code space was exhausted.
    GenerationExhausted,
    /// A concurrent writer got there first.
    Conflict,
    /// The store failed.
    Internal,
}

impl TaskManagerError {
    /// Returns the failure classification.
    #[must_use]
    pub const fn kind(&self) -> TaskErrorKind {
        match self {
            Self::TaskNotFound(_) | Self::ParentNotFound(_) => TaskErrorKind::NotFound,
            Self::Hierarchy(_) | Self::Domain(_) => TaskErrorKind::ValidationFailure,
            Self::CodeGeneration(_) => TaskErrorKind::GenerationExhausted,
            Self::Repository(err) => match err {
                TaskRepositoryError::NotFound(_) | TaskRepositoryError::ParentNotFound(_) => {
                    TaskErrorKind::NotFound
                }
                TaskRepositoryError::HasChildren { .. } | TaskRepositoryError::Hierarchy(_) => {
                    TaskErrorKind::ValidationFailure
                }
                TaskRepositoryError::DuplicateCode(_) | TaskRepositoryError::VersionConflict(_) => {
                    TaskErrorKind::Conflict
                }
                TaskRepositoryError::Persistence(_) => TaskErrorKind::Internal,
            },
        }
    }

    /// Translates store errors that name a domain condition into their
    /// service-level counterparts.
    pub(crate) fn from_store(err: TaskRepositoryError) -> Self {
        match err {
            TaskRepositoryError::NotFound(code) => Self::TaskNotFound(code),
            TaskRepositoryError::ParentNotFound(code) => Self::ParentNotFound(code),
            TaskRepositoryError::HasChildren { code, count } => {
                Self::Hierarchy(HierarchyViolation::HasChildren { code, count })
            }
            TaskRepositoryError::Hierarchy(violation) => Self::Hierarchy(violation),
            other => Self::Repository(other),
        }
    }
}

/// Result type for task manager operations.
pub type TaskManagerResult<T> = Result<T, TaskManagerError>;
