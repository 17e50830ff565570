//! Orchestration of task creation, reparenting, deletion, and queries.
//!
//! Every mutation holds the manager's write gate for its whole
//! read-validate-write sequence, and every query holds the read side, so no
//! caller of the same manager can observe a half-applied change. Stores add
//! their own integrity checks for writers outside this process.

use super::{
    code_generator::CodeGenerator,
    config::TaskManagerConfig,
    error::{TaskManagerError, TaskManagerResult},
    requests::{ListTasksRequest, TaskRequest},
    view::TaskView,
};
use crate::task::{
    domain::{
        Ancestry, HierarchyViolation, MAX_HIERARCHY_LEVEL, NewTask, Page, PageRequest,
        SortDirection, Task, TaskCode, TaskNode, TaskSort, TaskSortField,
        hierarchy::{depth_of, detects_cycle, subtree_fits, would_exceed_max_depth},
    },
    ports::{TaskRepository, TaskRepositoryError},
};
use mockable::Clock;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Task hierarchy orchestration service.
#[derive(Clone)]
pub struct TaskManager<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    codes: Arc<CodeGenerator>,
    config: TaskManagerConfig,
    gate: Arc<RwLock<()>>,
}

impl<R, C> TaskManager<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    /// Creates a manager with the default configuration and a fresh code
    /// generator.
    #[must_use]
    pub fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self {
            repository,
            clock,
            codes: Arc::new(CodeGenerator::new()),
            config: TaskManagerConfig::default(),
            gate: Arc::new(RwLock::new(())),
        }
    }

    /// Applies a configuration, replacing the code generator with one that
    /// honours the configured attempt budget.
    #[must_use]
    pub fn with_config(mut self, config: TaskManagerConfig) -> Self {
        self.codes =
            Arc::new(CodeGenerator::new().with_max_attempts(config.max_generation_attempts));
        self.config = config;
        self
    }

    /// Uses a shared code generator. Call after [`with_config`](Self::with_config)
    /// when combining both.
    #[must_use]
    pub fn with_code_generator(mut self, codes: Arc<CodeGenerator>) -> Self {
        self.codes = codes;
        self
    }

    /// Returns the code generator backing this manager.
    #[must_use]
    pub const fn code_generator(&self) -> &Arc<CodeGenerator> {
        &self.codes
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &TaskManagerConfig {
        &self.config
    }

    /// Loads every persisted code into the generator's registry.
    ///
    /// Call once at startup so codes issued by earlier processes are never
    /// offered again. Returns the number of codes loaded.
    ///
    /// # Errors
    ///
    /// Returns [`TaskManagerError::Repository`] when the store cannot be read.
    pub async fn rehydrate_codes(&self) -> TaskManagerResult<usize> {
        let _read = self.gate.read().await;
        let codes = self.repository.all_codes().await?;
        self.codes.register_all(&codes);
        info!(count = codes.len(), "rehydrated task code registry");
        Ok(codes.len())
    }

    /// Creates a task, optionally below an existing parent.
    ///
    /// The code is reserved first and only marked as issued once the task is
    /// stored; any failure before that releases it and leaves no stored row.
    ///
    /// # Errors
    ///
    /// Returns [`TaskManagerError::ParentNotFound`] when the parent does not
    /// exist, [`TaskManagerError::Hierarchy`] when the parent already sits at
    /// the maximum level, [`TaskManagerError::Domain`] for malformed input,
    /// and [`TaskManagerError::CodeGeneration`] when no code can be issued.
    pub async fn create(&self, request: TaskRequest) -> TaskManagerResult<TaskView> {
        let _write = self.gate.write().await;
        let mut conflicts = 0;
        loop {
            let reservation = self.codes.reserve()?;
            debug!(code = %reservation.code(), "creating task");
            let new_task = self
                .prepare_new_task(reservation.code().clone(), &request)
                .await?;

            match self.repository.insert(&new_task).await {
                Ok(stored) => {
                    reservation.commit();
                    info!(code = %stored.code(), id = %stored.id(), "task created");
                    return self.reload(stored.code()).await;
                }
                Err(TaskRepositoryError::DuplicateCode(code))
                    if conflicts < self.config.max_code_conflict_retries =>
                {
                    warn!(%code, "task code already stored; retrying with a fresh code");
                    reservation.commit();
                    conflicts += 1;
                }
                Err(err) => return Err(TaskManagerError::from_store(err)),
            }
        }
    }

    /// Returns the task with the given code.
    ///
    /// # Errors
    ///
    /// Returns [`TaskManagerError::TaskNotFound`] when no task has the code.
    pub async fn get_by_code(&self, code: &str) -> TaskManagerResult<TaskView> {
        let _read = self.gate.read().await;
        let task_code = TaskCode::parse(code)?;
        debug!(code = %task_code, "fetching task");
        let node = self.require_task(&task_code).await?;
        self.view_of(node).await
    }

    /// Returns one page of tasks, ordered as requested.
    ///
    /// # Errors
    ///
    /// Returns [`TaskManagerError::Domain`] for an unknown sort field or a
    /// zero page size.
    pub async fn list(&self, request: &ListTasksRequest) -> TaskManagerResult<Page<TaskView>> {
        let _read = self.gate.read().await;
        let page_request = self.page_request(request)?;
        debug!(?page_request, "listing tasks");

        let page = self.repository.find_all(page_request).await?;
        let total = page.total_items();
        let views = self.views_of(page.into_items()).await?;
        Ok(Page::new(views, page_request, total))
    }

    /// Replaces a task's attributes and parent.
    ///
    /// A blank or absent parent code turns the task into a root. Code, key,
    /// and creator are never changed. Naming the task as its own parent is
    /// rejected as a circular reference, not treated as a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`TaskManagerError::TaskNotFound`] or
    /// [`TaskManagerError::ParentNotFound`] for unknown codes, and
    /// [`TaskManagerError::Hierarchy`] when the new parent would create a
    /// cycle or push any task in the moved subtree past the maximum level.
    pub async fn update(&self, code: &str, request: TaskRequest) -> TaskManagerResult<TaskView> {
        let _write = self.gate.write().await;
        let task_code = TaskCode::parse(code)?;
        debug!(code = %task_code, "updating task");

        let (mut task, _) = self.require_task(&task_code).await?.into_parts();
        let details = request.details()?;
        let parent_code = match request.parent_code()? {
            Some(parent_code) => {
                self.check_reparent(&task, &parent_code).await?;
                Some(parent_code)
            }
            None => None,
        };

        task.revise(details, parent_code, &*self.clock);
        let stored = self
            .repository
            .update(&task)
            .await
            .map_err(TaskManagerError::from_store)?;
        info!(code = %stored.code(), version = stored.version(), "task updated");
        self.reload(stored.code()).await
    }

    /// Deletes a task that has no children.
    ///
    /// # Errors
    ///
    /// Returns [`TaskManagerError::TaskNotFound`] for unknown codes and
    /// [`TaskManagerError::Hierarchy`] when the task still has children.
    pub async fn delete(&self, code: &str) -> TaskManagerResult<()> {
        let _write = self.gate.write().await;
        let task_code = TaskCode::parse(code)?;
        debug!(code = %task_code, "deleting task");

        let node = self.require_task(&task_code).await?;
        let children = self.repository.find_by_parent_code(&task_code).await?;
        if !children.is_empty() {
            return Err(reject(HierarchyViolation::HasChildren {
                code: task_code,
                count: children.len(),
            }));
        }

        self.repository
            .delete(node.task())
            .await
            .map_err(TaskManagerError::from_store)?;
        info!(code = %task_code, "task deleted");
        Ok(())
    }

    /// Returns the direct children of a task, in store order.
    ///
    /// # Errors
    ///
    /// Returns [`TaskManagerError::ParentNotFound`] when the parent does not
    /// exist.
    pub async fn list_children(&self, parent_code: &str) -> TaskManagerResult<Vec<TaskView>> {
        let _read = self.gate.read().await;
        let code = TaskCode::parse(parent_code)?;
        debug!(parent = %code, "listing child tasks");

        if self.repository.find_by_code(&code).await?.is_none() {
            return Err(TaskManagerError::ParentNotFound(code));
        }
        let children = self.repository.find_by_parent_code(&code).await?;
        self.views_of(children).await
    }

    /// Returns every task without a parent.
    ///
    /// # Errors
    ///
    /// Returns [`TaskManagerError::Repository`] when the store cannot be read.
    pub async fn list_roots(&self) -> TaskManagerResult<Vec<TaskView>> {
        let _read = self.gate.read().await;
        debug!("listing root tasks");
        let roots = self.repository.find_root_tasks().await?;
        self.views_of(roots).await
    }

    async fn prepare_new_task(
        &self,
        code: TaskCode,
        request: &TaskRequest,
    ) -> TaskManagerResult<NewTask> {
        let parent_code = match request.parent_code()? {
            Some(parent_code) => {
                if self.repository.find_by_code(&parent_code).await?.is_none() {
                    return Err(TaskManagerError::ParentNotFound(parent_code));
                }
                let parent = self.ancestry(&parent_code).await?;
                if would_exceed_max_depth(&parent) {
                    return Err(reject(HierarchyViolation::MaxDepthReached {
                        max: MAX_HIERARCHY_LEVEL,
                    }));
                }
                Some(parent_code)
            }
            None => None,
        };
        let details = request.details()?;
        Ok(NewTask::new(
            code,
            details,
            request.creator_id(),
            parent_code,
            &*self.clock,
        ))
    }

    async fn check_reparent(&self, task: &Task, parent_code: &TaskCode) -> TaskManagerResult<()> {
        if self.repository.find_by_code(parent_code).await?.is_none() {
            return Err(TaskManagerError::ParentNotFound(parent_code.clone()));
        }
        let parent = self.ancestry(parent_code).await?;
        if detects_cycle(task.code(), &parent) {
            return Err(reject(HierarchyViolation::CircularReference {
                task: task.code().clone(),
                parent: parent_code.clone(),
            }));
        }
        let max_depth = HierarchyViolation::MaxDepthReached {
            max: MAX_HIERARCHY_LEVEL,
        };
        if would_exceed_max_depth(&parent) {
            return Err(reject(max_depth));
        }
        let height = self.subtree_height(task.code()).await?;
        if !subtree_fits(depth_of(&parent), height) {
            return Err(reject(max_depth));
        }
        Ok(())
    }

    /// Counts the levels of the subtree rooted at `code`, stopping at the
    /// hierarchy limit.
    async fn subtree_height(&self, code: &TaskCode) -> TaskManagerResult<usize> {
        let mut height = 1;
        let mut frontier = vec![code.clone()];
        while height < MAX_HIERARCHY_LEVEL {
            let mut next = Vec::new();
            for parent in &frontier {
                let children = self.repository.find_by_parent_code(parent).await?;
                next.extend(children.into_iter().map(|child| child.task().code().clone()));
            }
            if next.is_empty() {
                break;
            }
            height += 1;
            frontier = next;
        }
        Ok(height)
    }

    async fn ancestry(&self, code: &TaskCode) -> TaskManagerResult<Ancestry> {
        let ancestors = self
            .repository
            .find_ancestor_codes(code, MAX_HIERARCHY_LEVEL)
            .await?;
        Ok(Ancestry::new(code.clone(), ancestors))
    }

    async fn require_task(&self, code: &TaskCode) -> TaskManagerResult<TaskNode> {
        self.repository
            .find_by_code(code)
            .await?
            .ok_or_else(|| TaskManagerError::TaskNotFound(code.clone()))
    }

    async fn reload(&self, code: &TaskCode) -> TaskManagerResult<TaskView> {
        let node = self.require_task(code).await?;
        self.view_of(node).await
    }

    async fn view_of(&self, node: TaskNode) -> TaskManagerResult<TaskView> {
        let ancestry = self.ancestry(node.task().code()).await?;
        Ok(TaskView::from_node(node, depth_of(&ancestry)))
    }

    async fn views_of(&self, nodes: Vec<TaskNode>) -> TaskManagerResult<Vec<TaskView>> {
        let mut views = Vec::with_capacity(nodes.len());
        for node in nodes {
            views.push(self.view_of(node).await?);
        }
        Ok(views)
    }

    fn page_request(&self, request: &ListTasksRequest) -> TaskManagerResult<PageRequest> {
        let field = request
            .sort_by()
            .map(TaskSortField::try_from)
            .transpose()?
            .unwrap_or(self.config.default_sort_field);
        let direction = request
            .sort_direction()
            .map_or(self.config.default_sort_direction, SortDirection::from_request);
        let size = request.size().unwrap_or(self.config.default_page_size);
        PageRequest::new(
            request.page().unwrap_or(0),
            size,
            TaskSort::new(field, direction),
        )
        .map_err(TaskManagerError::from)
    }
}

fn reject(violation: HierarchyViolation) -> TaskManagerError {
    warn!(%violation, "hierarchy rule rejected operation");
    TaskManagerError::Hierarchy(violation)
}
