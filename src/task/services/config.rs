//! Tunable defaults for [`TaskManager`](super::TaskManager).

use super::code_generator::MAX_GENERATION_ATTEMPTS;
use crate::task::domain::{SortDirection, TaskSortField};
use serde::Deserialize;

/// Default page size for listings.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Runtime settings for the task manager.
///
/// Missing fields fall back to their defaults when deserialized. The depth
/// limit and code format are fixed and not part of the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskManagerConfig {
    /// Page size used when a listing does not specify one.
    pub default_page_size: u32,
    /// Ordering field used when a listing does not specify one.
    pub default_sort_field: TaskSortField,
    /// Ordering direction used when a listing does not specify one.
    pub default_sort_direction: SortDirection,
    /// Candidates sampled per code before generation fails.
    pub max_generation_attempts: u32,
    /// Fresh codes tried after the store reports a code collision.
    pub max_code_conflict_retries: u32,
}

impl Default for TaskManagerConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            default_sort_field: TaskSortField::CreatedAt,
            default_sort_direction: SortDirection::Desc,
            max_generation_attempts: MAX_GENERATION_ATTEMPTS,
            max_code_conflict_retries: 3,
        }
    }
}

impl TaskManagerConfig {
    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when the document is malformed or names
    /// an unknown field.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
