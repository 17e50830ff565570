//! Paging and ordering requests for task listings.

use super::TaskDomainError;
use serde::{Deserialize, Serialize};

/// Task attribute a listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskSortField {
    /// Surrogate key, i.e. insertion order.
    Id,
    /// Task code.
    Code,
    /// Title.
    Title,
    /// Status.
    Status,
    /// Priority label.
    Priority,
    /// Assignment timestamp.
    AssignedDate,
    /// Due timestamp.
    DueDate,
    /// Creation timestamp.
    CreatedAt,
    /// Modification timestamp.
    UpdatedAt,
}

impl TryFrom<&str> for TaskSortField {
    type Error = TaskDomainError;

    /// Accepts both the camelCase and the `snake_case` spelling.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "id" => Ok(Self::Id),
            "code" => Ok(Self::Code),
            "title" => Ok(Self::Title),
            "status" => Ok(Self::Status),
            "priority" => Ok(Self::Priority),
            "assignedDate" | "assigned_date" => Ok(Self::AssignedDate),
            "dueDate" | "due_date" => Ok(Self::DueDate),
            "createdAt" | "created_at" => Ok(Self::CreatedAt),
            "updatedAt" | "updated_at" => Ok(Self::UpdatedAt),
            _ => Err(TaskDomainError::UnknownSortField(value.to_owned())),
        }
    }
}

/// Ordering direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first.
    Asc,
    /// Largest first.
    Desc,
}

impl SortDirection {
    /// Interprets a caller-supplied direction: `asc` in any letter case is
    /// ascending, anything else is descending.
    #[must_use]
    pub fn from_request(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }
}

/// Field and direction for a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskSort {
    field: TaskSortField,
    direction: SortDirection,
}

impl TaskSort {
    /// Creates an ordering.
    #[must_use]
    pub const fn new(field: TaskSortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Returns the ordering field.
    #[must_use]
    pub const fn field(self) -> TaskSortField {
        self.field
    }

    /// Returns the ordering direction.
    #[must_use]
    pub const fn direction(self) -> SortDirection {
        self.direction
    }
}

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    page: u32,
    size: u32,
    sort: TaskSort,
}

impl PageRequest {
    /// Creates a validated page request.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidPageSize`] when `size` is zero.
    pub const fn new(page: u32, size: u32, sort: TaskSort) -> Result<Self, TaskDomainError> {
        if size == 0 {
            return Err(TaskDomainError::InvalidPageSize);
        }
        Ok(Self { page, size, sort })
    }

    /// Returns the zero-based page index.
    #[must_use]
    pub const fn page(self) -> u32 {
        self.page
    }

    /// Returns the page size.
    #[must_use]
    pub const fn size(self) -> u32 {
        self.size
    }

    /// Returns the ordering.
    #[must_use]
    pub const fn sort(self) -> TaskSort {
        self.sort
    }

    /// Returns the number of items preceding this page.
    #[must_use]
    pub const fn offset(self) -> u64 {
        self.page as u64 * self.size as u64
    }
}

/// One page of an ordered listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    items: Vec<T>,
    page: u32,
    size: u32,
    total_items: u64,
}

impl<T> Page<T> {
    /// Assembles a page from its items and the request that produced it.
    #[must_use]
    pub const fn new(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        Self {
            items,
            page: request.page(),
            size: request.size(),
            total_items,
        }
    }

    /// Returns the items on this page.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Consumes the page, returning its items.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Returns the zero-based page index.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Returns the requested page size.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Returns the number of items across all pages.
    #[must_use]
    pub const fn total_items(&self) -> u64 {
        self.total_items
    }

    /// Returns the number of pages needed for all items.
    #[must_use]
    pub const fn total_pages(&self) -> u64 {
        self.total_items.div_ceil(self.size as u64)
    }

    /// Converts every item, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_items: self.total_items,
        }
    }

    /// Converts every item with a fallible function, keeping the paging
    /// metadata.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `f`.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        Ok(Page {
            items: self.items.into_iter().map(f).collect::<Result<_, _>>()?,
            page: self.page,
            size: self.size,
            total_items: self.total_items,
        })
    }
}
