//! Domain model for the task hierarchy.
//!
//! Tasks form a forest linked by parent codes. The domain owns the value
//! types, the code format, and the depth and cycle rules; persistence and
//! orchestration live outside this boundary.

mod code;
mod error;
pub mod hierarchy;
mod ids;
mod paging;
mod task;

pub use code::{CODE_LENGTH, CODE_SEPARATOR, TaskCode};
pub use error::{HierarchyViolation, ParseTaskStatusError, TaskDomainError};
pub use hierarchy::{Ancestry, MAX_HIERARCHY_LEVEL};
pub use ids::{TaskId, UserId};
pub use paging::{Page, PageRequest, SortDirection, TaskSort, TaskSortField};
pub use task::{
    NewTask, PersistedTaskData, Task, TaskDetails, TaskNode, TaskStatus, TaskTitle,
};
