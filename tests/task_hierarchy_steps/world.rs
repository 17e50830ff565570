//! Shared world state for task hierarchy BDD scenarios.

use std::collections::HashMap;
use std::sync::Arc;

use mockable::DefaultClock;
use rstest::fixture;
use tasktree::task::{
    adapters::memory::InMemoryTaskRepository,
    domain::{TaskCode, TaskStatus},
    services::{TaskManager, TaskManagerError, TaskRequest, TaskView},
};

/// Manager type used by the BDD world.
pub type TestTaskManager = TaskManager<InMemoryTaskRepository, DefaultClock>;

/// Scenario world for task hierarchy behaviour tests.
pub struct TaskHierarchyWorld {
    pub manager: TestTaskManager,
    /// Issued codes keyed by the scenario's task names.
    pub codes: HashMap<String, TaskCode>,
    pub last_outcome: Option<Result<(), TaskManagerError>>,
}

impl TaskHierarchyWorld {
    /// Creates a world backed by an empty repository.
    #[must_use]
    pub fn new() -> Self {
        let manager = TaskManager::new(
            Arc::new(InMemoryTaskRepository::new()),
            Arc::new(DefaultClock),
        );

        Self {
            manager,
            codes: HashMap::new(),
            last_outcome: None,
        }
    }

    /// Returns the code issued for a named task.
    ///
    /// # Errors
    ///
    /// Returns an error if no task with that name was created in the
    /// scenario.
    pub fn code_of(&self, name: &str) -> Result<TaskCode, eyre::Report> {
        self.codes
            .get(name)
            .cloned()
            .ok_or_else(|| eyre::eyre!("no task named {name} in scenario world"))
    }

    /// Creates a task named `name`, optionally below `parent_code`, and
    /// records its code.
    ///
    /// # Errors
    ///
    /// Returns the manager's error when creation fails.
    pub fn create(
        &mut self,
        name: &str,
        parent_code: Option<&str>,
    ) -> Result<TaskView, TaskManagerError> {
        let request = TaskRequest::new(name, TaskStatus::Pending);
        let with_parent = match parent_code {
            Some(code) => request.with_parent_code(code),
            None => request,
        };
        let created = run_async(self.manager.create(with_parent))?;
        self.codes.insert(name.to_owned(), created.code.clone());
        Ok(created)
    }
}

impl Default for TaskHierarchyWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> TaskHierarchyWorld {
    TaskHierarchyWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
