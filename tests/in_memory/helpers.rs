//! Shared fixtures for in-memory task hierarchy integration tests.

use std::sync::Arc;

use mockable::DefaultClock;
use rstest::fixture;
use tasktree::task::{
    adapters::memory::InMemoryTaskRepository,
    domain::TaskStatus,
    services::{TaskManager, TaskManagerResult, TaskRequest, TaskView},
};

/// Manager type shared by the integration tests.
pub type TestManager = TaskManager<InMemoryTaskRepository, DefaultClock>;

/// Provides a fresh repository for each test.
#[fixture]
pub fn repository() -> Arc<InMemoryTaskRepository> {
    Arc::new(InMemoryTaskRepository::new())
}

/// Provides a manager over a fresh repository.
#[fixture]
pub fn manager(repository: Arc<InMemoryTaskRepository>) -> TestManager {
    TaskManager::new(repository, Arc::new(DefaultClock))
}

/// Creates a pending task, optionally below `parent`.
///
/// # Errors
///
/// Returns the manager's error when creation fails.
pub async fn create_task(
    manager: &TestManager,
    title: &str,
    parent: Option<&str>,
) -> TaskManagerResult<TaskView> {
    let request = TaskRequest::new(title, TaskStatus::Pending);
    let with_parent = match parent {
        Some(code) => request.with_parent_code(code),
        None => request,
    };
    manager.create(with_parent).await
}
