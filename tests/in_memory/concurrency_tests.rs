//! Concurrent access to the task manager and the shared repository.

use std::collections::HashSet;
use std::sync::Arc;

use super::helpers::{TestManager, create_task, manager, repository};
use async_trait::async_trait;
use mockable::DefaultClock;
use rstest::rstest;
use tasktree::task::{
    adapters::memory::InMemoryTaskRepository,
    domain::{
        HierarchyViolation, NewTask, Page, PageRequest, Task, TaskCode, TaskNode, TaskStatus,
    },
    ports::{TaskRepository, TaskRepositoryResult},
    services::{
        ListTasksRequest, TaskErrorKind, TaskManager, TaskManagerError, TaskRequest, TaskView,
    },
};
use tokio::sync::Barrier;

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_receive_unique_codes(manager: TestManager) -> eyre::Result<()> {
    let shared = Arc::new(manager);
    let handles: Vec<_> = (0..32)
        .map(|index| {
            let worker = Arc::clone(&shared);
            tokio::spawn(async move { create_task(&worker, &format!("Task {index}"), None).await })
        })
        .collect();

    let mut codes = HashSet::new();
    for handle in handles {
        let created = handle.await??;
        eyre::ensure!(codes.insert(created.code), "duplicate code issued");
    }
    let stored = shared
        .list(&ListTasksRequest::new().with_size(100))
        .await?;
    eyre::ensure!(stored.total_items() == 32, "every create is stored");
    Ok(())
}

/// Races a child create against deleting its parent and checks that at most
/// one of them succeeds.
async fn race_create_child_against_delete(
    creator: Arc<TestManager>,
    deleter: Arc<TestManager>,
) -> eyre::Result<()> {
    let parent = create_task(&creator, "Parent", None).await?;
    let parent_code = parent.code.to_string();

    let create = {
        let code = parent_code.clone();
        let worker = Arc::clone(&creator);
        tokio::spawn(async move { create_task(&worker, "Child", Some(code.as_str())).await })
    };
    let delete = {
        let code = parent_code.clone();
        let worker = Arc::clone(&deleter);
        tokio::spawn(async move { worker.delete(&code).await })
    };
    let created = create.await?;
    let deleted = delete.await?;

    match (&created, &deleted) {
        (Ok(child), Err(err)) => {
            eyre::ensure!(err.kind() == TaskErrorKind::ValidationFailure, "{err:?}");
            let reloaded = creator.get_by_code(&parent_code).await?;
            eyre::ensure!(reloaded.child_codes == vec![child.code.clone()], "child linked");
        }
        (Err(err), Ok(())) => {
            eyre::ensure!(err.kind() == TaskErrorKind::NotFound, "{err:?}");
        }
        _ => {
            return Err(eyre::eyre!(
                "exactly one operation should win, got {created:?} and {deleted:?}"
            ));
        }
    }
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn create_under_parent_never_races_past_its_deletion(
    manager: TestManager,
) -> eyre::Result<()> {
    let shared = Arc::new(manager);
    for _ in 0..20 {
        race_create_child_against_delete(Arc::clone(&shared), Arc::clone(&shared)).await?;
    }
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn repository_integrity_holds_across_independent_managers(
    repository: Arc<InMemoryTaskRepository>,
) -> eyre::Result<()> {
    let first = Arc::new(TaskManager::new(
        Arc::clone(&repository),
        Arc::new(DefaultClock),
    ));
    let second = Arc::new(TaskManager::new(repository, Arc::new(DefaultClock)));
    for _ in 0..20 {
        race_create_child_against_delete(Arc::clone(&first), Arc::clone(&second)).await?;
    }
    Ok(())
}

/// Delegates to an in-memory store but holds every update until both writers
/// have finished their own validation, so neither sees the other's change.
struct RendezvousRepository {
    inner: InMemoryTaskRepository,
    updates: Barrier,
}

#[async_trait]
impl TaskRepository for RendezvousRepository {
    async fn insert(&self, task: &NewTask) -> TaskRepositoryResult<Task> {
        self.inner.insert(task).await
    }

    async fn update(&self, task: &Task) -> TaskRepositoryResult<Task> {
        self.updates.wait().await;
        self.inner.update(task).await
    }

    async fn delete(&self, task: &Task) -> TaskRepositoryResult<()> {
        self.inner.delete(task).await
    }

    async fn find_by_code(&self, code: &TaskCode) -> TaskRepositoryResult<Option<TaskNode>> {
        self.inner.find_by_code(code).await
    }

    async fn find_all(&self, request: PageRequest) -> TaskRepositoryResult<Page<TaskNode>> {
        self.inner.find_all(request).await
    }

    async fn find_by_parent_code(&self, code: &TaskCode) -> TaskRepositoryResult<Vec<TaskNode>> {
        self.inner.find_by_parent_code(code).await
    }

    async fn find_root_tasks(&self) -> TaskRepositoryResult<Vec<TaskNode>> {
        self.inner.find_root_tasks().await
    }

    async fn find_ancestor_codes(
        &self,
        code: &TaskCode,
        limit: usize,
    ) -> TaskRepositoryResult<Vec<TaskCode>> {
        self.inner.find_ancestor_codes(code, limit).await
    }

    async fn all_codes(&self) -> TaskRepositoryResult<Vec<TaskCode>> {
        self.inner.all_codes().await
    }
}

type RendezvousManager = TaskManager<RendezvousRepository, DefaultClock>;

fn spawn_move(
    manager: &Arc<RendezvousManager>,
    moved: &TaskView,
    new_parent: &TaskView,
) -> tokio::task::JoinHandle<Result<TaskView, TaskManagerError>> {
    let worker = Arc::clone(manager);
    let code = moved.code.to_string();
    let request = TaskRequest::new(moved.title.clone(), TaskStatus::Pending)
        .with_parent_code(new_parent.code.to_string());
    tokio::spawn(async move { worker.update(&code, request).await })
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn crossed_moves_from_two_managers_cannot_form_a_cycle() -> eyre::Result<()> {
    let repository = Arc::new(RendezvousRepository {
        inner: InMemoryTaskRepository::new(),
        updates: Barrier::new(2),
    });
    let first = Arc::new(TaskManager::new(
        Arc::clone(&repository),
        Arc::new(DefaultClock),
    ));
    let second = Arc::new(TaskManager::new(repository, Arc::new(DefaultClock)));
    let alpha = first
        .create(TaskRequest::new("Alpha", TaskStatus::Pending))
        .await?;
    let beta = first
        .create(TaskRequest::new("Beta", TaskStatus::Pending))
        .await?;

    let alpha_under_beta = spawn_move(&first, &alpha, &beta);
    let beta_under_alpha = spawn_move(&second, &beta, &alpha);
    let outcomes = [alpha_under_beta.await?, beta_under_alpha.await?];

    let winners = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    eyre::ensure!(winners == 1, "exactly one move should win: {outcomes:?}");
    let refused = outcomes
        .iter()
        .find_map(|outcome| outcome.as_ref().err())
        .ok_or_else(|| eyre::eyre!("one move should be refused"))?;
    eyre::ensure!(
        refused.kind() == TaskErrorKind::ValidationFailure,
        "{refused:?}"
    );
    eyre::ensure!(
        matches!(
            refused,
            TaskManagerError::Hierarchy(HierarchyViolation::CircularReference { .. })
        ),
        "{refused:?}"
    );

    let roots = first.list_roots().await?;
    eyre::ensure!(roots.len() == 1, "one of the two tasks stays a root");
    let child = roots
        .first()
        .and_then(|root| root.child_codes.first())
        .ok_or_else(|| eyre::eyre!("the root should have the other task as child"))?;
    let reloaded = second.get_by_code(child.as_str()).await?;
    eyre::ensure!(reloaded.hierarchy_level == 2, "{reloaded:?}");
    Ok(())
}
