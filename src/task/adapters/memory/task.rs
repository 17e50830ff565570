//! In-memory repository for task hierarchy tests and embedded use.

use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::task::{
    domain::{
        Ancestry, HierarchyViolation, MAX_HIERARCHY_LEVEL, NewTask, Page, PageRequest,
        SortDirection, Task, TaskCode, TaskId, TaskNode, TaskSort, TaskSortField,
        hierarchy::{depth_of, detects_cycle, subtree_fits, would_exceed_max_depth},
    },
    ports::{TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};

/// Thread-safe in-memory task repository.
///
/// Every operation runs under a single lock, so each call is atomic and reads
/// never observe a half-applied write. Depth and cycle rules are checked again
/// under that lock, so writers sharing one repository cannot together build a
/// chain that each alone would have been refused.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    state: Arc<RwLock<InMemoryTaskState>>,
}

#[derive(Debug, Default)]
struct InMemoryTaskState {
    last_id: i64,
    tasks: BTreeMap<TaskId, Task>,
    code_index: HashMap<TaskCode, TaskId>,
    /// Derived from task parent codes; ids keep children in insertion order.
    children_index: HashMap<TaskCode, BTreeSet<TaskId>>,
}

impl InMemoryTaskRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> TaskRepositoryResult<RwLockReadGuard<'_, InMemoryTaskState>> {
        self.state.read().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> TaskRepositoryResult<RwLockWriteGuard<'_, InMemoryTaskState>> {
        self.state.write().map_err(|err| {
            TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

impl InMemoryTaskState {
    fn task_by_code(&self, code: &TaskCode) -> Option<&Task> {
        self.code_index.get(code).and_then(|id| self.tasks.get(id))
    }

    fn child_codes(&self, code: &TaskCode) -> Vec<TaskCode> {
        self.children_index
            .get(code)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.tasks.get(id))
                    .map(|child| child.code().clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn node(&self, task: &Task) -> TaskNode {
        TaskNode::new(task.clone(), self.child_codes(task.code()))
    }

    fn ensure_parent_exists(&self, parent_code: Option<&TaskCode>) -> TaskRepositoryResult<()> {
        match parent_code {
            Some(parent) if !self.code_index.contains_key(parent) => {
                Err(TaskRepositoryError::ParentNotFound(parent.clone()))
            }
            _ => Ok(()),
        }
    }

    fn ancestor_codes(&self, code: &TaskCode, limit: usize) -> Vec<TaskCode> {
        let mut ancestors = Vec::new();
        let mut next = self.task_by_code(code).and_then(Task::parent_code);
        while let Some(parent_code) = next {
            if ancestors.len() >= limit {
                break;
            }
            ancestors.push(parent_code.clone());
            next = self.task_by_code(parent_code).and_then(Task::parent_code);
        }
        ancestors
    }

    fn ancestry(&self, code: &TaskCode) -> Ancestry {
        Ancestry::new(code.clone(), self.ancestor_codes(code, MAX_HIERARCHY_LEVEL))
    }

    /// Levels in the subtree rooted at `code`, capped one past the limit.
    fn subtree_height(&self, code: &TaskCode) -> usize {
        let mut height = 1;
        let mut frontier = vec![code.clone()];
        while height <= MAX_HIERARCHY_LEVEL {
            let next: Vec<TaskCode> = frontier
                .iter()
                .flat_map(|parent| self.child_codes(parent))
                .collect();
            if next.is_empty() {
                break;
            }
            height += 1;
            frontier = next;
        }
        height
    }

    fn ensure_room_below(&self, parent_code: &TaskCode) -> TaskRepositoryResult<()> {
        if would_exceed_max_depth(&self.ancestry(parent_code)) {
            return Err(max_depth_reached());
        }
        Ok(())
    }

    fn ensure_can_move(&self, task: &TaskCode, parent_code: &TaskCode) -> TaskRepositoryResult<()> {
        let parent = self.ancestry(parent_code);
        if detects_cycle(task, &parent) {
            return Err(TaskRepositoryError::Hierarchy(
                HierarchyViolation::CircularReference {
                    task: task.clone(),
                    parent: parent_code.clone(),
                },
            ));
        }
        if would_exceed_max_depth(&parent)
            || !subtree_fits(depth_of(&parent), self.subtree_height(task))
        {
            return Err(max_depth_reached());
        }
        Ok(())
    }

    fn link_child(&mut self, task: &Task) {
        if let Some(parent) = task.parent_code() {
            self.children_index
                .entry(parent.clone())
                .or_default()
                .insert(task.id());
        }
    }

    /// Removes a task ID from the children index, cleaning up the entry if
    /// empty.
    fn unlink_child(&mut self, task: &Task) {
        let Some(parent) = task.parent_code() else {
            return;
        };
        if let Some(ids) = self.children_index.get_mut(parent) {
            ids.remove(&task.id());
            if ids.is_empty() {
                self.children_index.remove(parent);
            }
        }
    }
}

const fn max_depth_reached() -> TaskRepositoryError {
    TaskRepositoryError::Hierarchy(HierarchyViolation::MaxDepthReached {
        max: MAX_HIERARCHY_LEVEL,
    })
}

fn compare_tasks(left: &Task, right: &Task, sort: TaskSort) -> Ordering {
    let (a, b) = (left.details(), right.details());
    let ordering = match sort.field() {
        TaskSortField::Id => left.id().cmp(&right.id()),
        TaskSortField::Code => left.code().cmp(right.code()),
        TaskSortField::Title => a.title().cmp(b.title()),
        TaskSortField::Status => a.status().as_str().cmp(b.status().as_str()),
        TaskSortField::Priority => a.priority().cmp(&b.priority()),
        TaskSortField::AssignedDate => a.assigned_date().cmp(&b.assigned_date()),
        TaskSortField::DueDate => a.due_date().cmp(&b.due_date()),
        TaskSortField::CreatedAt => left.created_at().cmp(&right.created_at()),
        TaskSortField::UpdatedAt => left.updated_at().cmp(&right.updated_at()),
    };
    let directed = match sort.direction() {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    };
    directed.then_with(|| left.id().cmp(&right.id()))
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn insert(&self, task: &NewTask) -> TaskRepositoryResult<Task> {
        let mut state = self.write()?;
        if state.code_index.contains_key(task.code()) {
            return Err(TaskRepositoryError::DuplicateCode(task.code().clone()));
        }
        state.ensure_parent_exists(task.parent_code())?;
        if let Some(parent_code) = task.parent_code() {
            state.ensure_room_below(parent_code)?;
        }

        state.last_id += 1;
        let stored = task.clone().into_persisted(TaskId::from_i64(state.last_id));
        state.code_index.insert(stored.code().clone(), stored.id());
        state.link_child(&stored);
        state.tasks.insert(stored.id(), stored.clone());
        Ok(stored)
    }

    async fn update(&self, task: &Task) -> TaskRepositoryResult<Task> {
        let mut state = self.write()?;
        let current = state
            .tasks
            .get(&task.id())
            .ok_or_else(|| TaskRepositoryError::NotFound(task.code().clone()))?
            .clone();
        if current.version() != task.version() {
            return Err(TaskRepositoryError::VersionConflict(task.code().clone()));
        }
        state.ensure_parent_exists(task.parent_code())?;
        let moved_to = task
            .parent_code()
            .filter(|parent_code| current.parent_code() != Some(*parent_code));
        if let Some(parent_code) = moved_to {
            state.ensure_can_move(task.code(), parent_code)?;
        }

        // Re-link under the new parent before storing the revision.
        state.unlink_child(&current);
        let stored = task.clone().with_next_version();
        state.link_child(&stored);
        state.tasks.insert(stored.id(), stored.clone());
        Ok(stored)
    }

    async fn delete(&self, task: &Task) -> TaskRepositoryResult<()> {
        let mut state = self.write()?;
        let current = state
            .task_by_code(task.code())
            .cloned()
            .ok_or_else(|| TaskRepositoryError::NotFound(task.code().clone()))?;
        let count = state
            .children_index
            .get(current.code())
            .map_or(0, BTreeSet::len);
        if count > 0 {
            return Err(TaskRepositoryError::HasChildren {
                code: current.code().clone(),
                count,
            });
        }

        state.unlink_child(&current);
        state.code_index.remove(current.code());
        state.tasks.remove(&current.id());
        Ok(())
    }

    async fn find_by_code(&self, code: &TaskCode) -> TaskRepositoryResult<Option<TaskNode>> {
        let state = self.read()?;
        Ok(state.task_by_code(code).map(|task| state.node(task)))
    }

    async fn find_all(&self, request: PageRequest) -> TaskRepositoryResult<Page<TaskNode>> {
        let state = self.read()?;
        let mut ordered: Vec<&Task> = state.tasks.values().collect();
        ordered.sort_by(|left, right| compare_tasks(left, right, request.sort()));

        let total = ordered.len();
        let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let size = usize::try_from(request.size()).unwrap_or(usize::MAX);
        let items = ordered
            .into_iter()
            .skip(offset)
            .take(size)
            .map(|task| state.node(task))
            .collect();
        Ok(Page::new(items, request, total as u64))
    }

    async fn find_by_parent_code(&self, code: &TaskCode) -> TaskRepositoryResult<Vec<TaskNode>> {
        let state = self.read()?;
        let children = state
            .children_index
            .get(code)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.tasks.get(id))
                    .map(|task| state.node(task))
                    .collect()
            })
            .unwrap_or_default();
        Ok(children)
    }

    async fn find_root_tasks(&self) -> TaskRepositoryResult<Vec<TaskNode>> {
        let state = self.read()?;
        Ok(state
            .tasks
            .values()
            .filter(|task| task.is_root())
            .map(|task| state.node(task))
            .collect())
    }

    async fn find_ancestor_codes(
        &self,
        code: &TaskCode,
        limit: usize,
    ) -> TaskRepositoryResult<Vec<TaskCode>> {
        Ok(self.read()?.ancestor_codes(code, limit))
    }

    async fn all_codes(&self) -> TaskRepositoryResult<Vec<TaskCode>> {
        let state = self.read()?;
        Ok(state.tasks.values().map(|task| task.code().clone()).collect())
    }
}
