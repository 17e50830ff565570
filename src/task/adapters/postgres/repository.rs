//! `PostgreSQL` repository implementation for task hierarchy storage.
//!
//! Writes run inside transactions and rely on the schema for integrity: a
//! unique index on `code`, a `parent_code` foreign key with `ON DELETE
//! RESTRICT`, and a `version` column for optimistic concurrency. Inserts and
//! updates re-check depth and cycle rules in the same serializable
//! transaction as the write, so concurrent writers cannot jointly build a
//! cycle or an over-deep chain. Reads run in read-only repeatable-read
//! transactions so a task and its derived children come from one snapshot.

use super::{
    models::{AncestorRow, NewTaskRow, SubtreeHeightRow, TaskChangeset, TaskRow},
    schema::tasks,
};
use crate::task::{
    domain::{
        Ancestry, HierarchyViolation, MAX_HIERARCHY_LEVEL, NewTask, Page, PageRequest,
        PersistedTaskData, SortDirection, Task, TaskCode, TaskDetails, TaskId, TaskNode,
        TaskSort, TaskSortField, TaskStatus, TaskTitle, UserId,
        hierarchy::{depth_of, detects_cycle, subtree_fits, would_exceed_max_depth},
    },
    ports::{TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};
use async_trait::async_trait;
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};
use std::collections::HashMap;

/// `PostgreSQL` connection pool type used by task adapters.
pub type TaskPgPool = Pool<ConnectionManager<PgConnection>>;

type BoxedTasks = tasks::BoxedQuery<'static, Pg>;

const ANCESTOR_CODES_SQL: &str = concat!(
    "WITH RECURSIVE chain (code, parent_code, hops) AS (",
    "SELECT code, parent_code, 0 FROM tasks WHERE code = $1 ",
    "UNION ALL ",
    "SELECT t.code, t.parent_code, chain.hops + 1 FROM tasks t ",
    "JOIN chain ON t.code = chain.parent_code ",
    "WHERE chain.hops < $2",
    ") SELECT code FROM chain WHERE hops > 0 ORDER BY hops",
);

const SUBTREE_HEIGHT_SQL: &str = concat!(
    "WITH RECURSIVE subtree (code, depth) AS (",
    "SELECT code, 1 FROM tasks WHERE code = $1 ",
    "UNION ALL ",
    "SELECT t.code, subtree.depth + 1 FROM tasks t ",
    "JOIN subtree ON t.parent_code = subtree.code ",
    "WHERE subtree.depth < $2",
    ") SELECT COALESCE(MAX(depth), 0) AS height FROM subtree",
);

/// `PostgreSQL`-backed task repository.
#[derive(Debug, Clone)]
pub struct PostgresTaskRepository {
    pool: TaskPgPool,
}

impl PostgresTaskRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> TaskRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TaskRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TaskRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(TaskRepositoryError::persistence)?
    }
}

impl From<DieselError> for TaskRepositoryError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn insert(&self, task: &NewTask) -> TaskRepositoryResult<Task> {
        let code = task.code().clone();
        let parent_code = task.parent_code().cloned();
        let new_row = to_new_row(task);

        self.run_blocking(move |connection| {
            serializable_write(connection, &code, |conn| {
                if let Some(parent) = parent_code.as_ref() {
                    let ancestry = ancestry_of(conn, parent)?;
                    if would_exceed_max_depth(&ancestry) {
                        return Err(max_depth_reached());
                    }
                }
                let row = diesel::insert_into(tasks::table)
                    .values(&new_row)
                    .returning(TaskRow::as_returning())
                    .get_result::<TaskRow>(conn)
                    .map_err(|err| map_write_error(err, &code, parent_code.as_ref()))?;
                row_to_task(row)
            })
        })
        .await
    }

    async fn update(&self, task: &Task) -> TaskRepositoryResult<Task> {
        let id = task.id().value();
        let code = task.code().clone();
        let parent_code = task.parent_code().cloned();
        let expected_version = task.version();
        let changeset = to_changeset(task);

        self.run_blocking(move |connection| {
            serializable_write(connection, &code, |conn| {
                let stored_parent = tasks::table
                    .filter(tasks::id.eq(id))
                    .select(tasks::parent_code)
                    .first::<Option<String>>(conn)
                    .optional()?
                    .ok_or_else(|| TaskRepositoryError::NotFound(code.clone()))?;
                let moved_to = parent_code
                    .as_ref()
                    .filter(|parent| stored_parent.as_deref() != Some(parent.as_str()));
                if let Some(parent) = moved_to {
                    ensure_can_move(conn, &code, parent)?;
                }

                let updated = diesel::update(
                    tasks::table
                        .filter(tasks::id.eq(id))
                        .filter(tasks::version.eq(expected_version)),
                )
                .set(&changeset)
                .returning(TaskRow::as_returning())
                .get_result::<TaskRow>(conn)
                .optional()
                .map_err(|err| map_write_error(err, &code, parent_code.as_ref()))?;

                // The row was read above, so a miss means the version moved on.
                updated
                    .ok_or_else(|| TaskRepositoryError::VersionConflict(code.clone()))
                    .and_then(row_to_task)
            })
        })
        .await
    }

    async fn delete(&self, task: &Task) -> TaskRepositoryResult<()> {
        let code = task.code().clone();

        self.run_blocking(move |connection| {
            connection.transaction(|conn| {
                let child_count = tasks::table
                    .filter(tasks::parent_code.eq(code.as_str()))
                    .count()
                    .get_result::<i64>(conn)?;
                if child_count > 0 {
                    return Err(TaskRepositoryError::HasChildren {
                        code: code.clone(),
                        count: usize::try_from(child_count).unwrap_or(usize::MAX),
                    });
                }

                let deleted = diesel::delete(tasks::table.filter(tasks::code.eq(code.as_str())))
                    .execute(conn)
                    .map_err(|err| match err {
                        // A child was attached between the count and the delete.
                        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                            TaskRepositoryError::VersionConflict(code.clone())
                        }
                        _ => TaskRepositoryError::persistence(err),
                    })?;
                if deleted == 0 {
                    return Err(TaskRepositoryError::NotFound(code.clone()));
                }
                Ok(())
            })
        })
        .await
    }

    async fn find_by_code(&self, code: &TaskCode) -> TaskRepositoryResult<Option<TaskNode>> {
        let lookup_code = code.clone();
        self.run_blocking(move |connection| {
            read_snapshot(connection, |conn| {
                let row = tasks::table
                    .filter(tasks::code.eq(lookup_code.as_str()))
                    .select(TaskRow::as_select())
                    .first::<TaskRow>(conn)
                    .optional()?;
                let Some(found) = row else {
                    return Ok(None);
                };
                let mut nodes = nodes_with_children(conn, vec![found])?;
                Ok(nodes.pop())
            })
        })
        .await
    }

    async fn find_all(&self, request: PageRequest) -> TaskRepositoryResult<Page<TaskNode>> {
        self.run_blocking(move |connection| {
            read_snapshot(connection, |conn| {
                let total = tasks::table.count().get_result::<i64>(conn)?;
                let offset =
                    i64::try_from(request.offset()).map_err(TaskRepositoryError::persistence)?;
                let rows = ordered(tasks::table.into_boxed(), request.sort())
                    .offset(offset)
                    .limit(i64::from(request.size()))
                    .select(TaskRow::as_select())
                    .load::<TaskRow>(conn)?;
                let nodes = nodes_with_children(conn, rows)?;
                Ok(Page::new(
                    nodes,
                    request,
                    u64::try_from(total).unwrap_or_default(),
                ))
            })
        })
        .await
    }

    async fn find_by_parent_code(&self, code: &TaskCode) -> TaskRepositoryResult<Vec<TaskNode>> {
        let parent_code = code.clone();
        self.run_blocking(move |connection| {
            read_snapshot(connection, |conn| {
                let rows = tasks::table
                    .filter(tasks::parent_code.eq(parent_code.as_str()))
                    .order(tasks::id.asc())
                    .select(TaskRow::as_select())
                    .load::<TaskRow>(conn)?;
                nodes_with_children(conn, rows)
            })
        })
        .await
    }

    async fn find_root_tasks(&self) -> TaskRepositoryResult<Vec<TaskNode>> {
        self.run_blocking(move |connection| {
            read_snapshot(connection, |conn| {
                let rows = tasks::table
                    .filter(tasks::parent_code.is_null())
                    .order(tasks::id.asc())
                    .select(TaskRow::as_select())
                    .load::<TaskRow>(conn)?;
                nodes_with_children(conn, rows)
            })
        })
        .await
    }

    async fn find_ancestor_codes(
        &self,
        code: &TaskCode,
        limit: usize,
    ) -> TaskRepositoryResult<Vec<TaskCode>> {
        let lookup_code = code.clone();
        self.run_blocking(move |connection| load_ancestor_codes(connection, &lookup_code, limit))
            .await
    }

    async fn all_codes(&self) -> TaskRepositoryResult<Vec<TaskCode>> {
        self.run_blocking(move |connection| {
            let codes = tasks::table
                .select(tasks::code)
                .order(tasks::id.asc())
                .load::<String>(connection)?;
            codes.into_iter().map(parse_code).collect()
        })
        .await
    }
}

/// Runs a write at `SERIALIZABLE` so the hierarchy reads it depends on
/// cannot be invalidated by a concurrent commit. A serialization failure is
/// reported as a version conflict on `code`.
fn serializable_write<T>(
    connection: &mut PgConnection,
    code: &TaskCode,
    f: impl FnOnce(&mut PgConnection) -> TaskRepositoryResult<T>,
) -> TaskRepositoryResult<T> {
    connection
        .build_transaction()
        .serializable()
        .run(f)
        .map_err(|err| match err {
            TaskRepositoryError::Persistence(ref source) if is_serialization_failure(&**source) => {
                TaskRepositoryError::VersionConflict(code.clone())
            }
            other => other,
        })
}

fn is_serialization_failure(err: &(dyn std::error::Error + Send + Sync + 'static)) -> bool {
    matches!(
        err.downcast_ref::<DieselError>(),
        Some(DieselError::DatabaseError(
            DatabaseErrorKind::SerializationFailure,
            _
        ))
    )
}

fn ancestry_of(connection: &mut PgConnection, code: &TaskCode) -> TaskRepositoryResult<Ancestry> {
    Ok(Ancestry::new(
        code.clone(),
        load_ancestor_codes(connection, code, MAX_HIERARCHY_LEVEL)?,
    ))
}

fn load_ancestor_codes(
    connection: &mut PgConnection,
    code: &TaskCode,
    limit: usize,
) -> TaskRepositoryResult<Vec<TaskCode>> {
    let max_hops = i32::try_from(limit).map_err(TaskRepositoryError::persistence)?;
    let rows = diesel::sql_query(ANCESTOR_CODES_SQL)
        .bind::<diesel::sql_types::Varchar, _>(code.as_str())
        .bind::<diesel::sql_types::Integer, _>(max_hops)
        .load::<AncestorRow>(connection)?;
    rows.into_iter().map(|row| parse_code(row.code)).collect()
}

/// Levels in the subtree rooted at `code`, capped one past the limit.
fn subtree_height(connection: &mut PgConnection, code: &TaskCode) -> TaskRepositoryResult<usize> {
    let cap = i32::try_from(MAX_HIERARCHY_LEVEL + 1).map_err(TaskRepositoryError::persistence)?;
    let row = diesel::sql_query(SUBTREE_HEIGHT_SQL)
        .bind::<diesel::sql_types::Varchar, _>(code.as_str())
        .bind::<diesel::sql_types::Integer, _>(cap)
        .get_result::<SubtreeHeightRow>(connection)?;
    usize::try_from(row.height).map_err(TaskRepositoryError::persistence)
}

fn ensure_can_move(
    connection: &mut PgConnection,
    code: &TaskCode,
    parent_code: &TaskCode,
) -> TaskRepositoryResult<()> {
    let parent = ancestry_of(connection, parent_code)?;
    if detects_cycle(code, &parent) {
        return Err(TaskRepositoryError::Hierarchy(
            HierarchyViolation::CircularReference {
                task: code.clone(),
                parent: parent_code.clone(),
            },
        ));
    }
    if would_exceed_max_depth(&parent)
        || !subtree_fits(depth_of(&parent), subtree_height(connection, code)?)
    {
        return Err(max_depth_reached());
    }
    Ok(())
}

const fn max_depth_reached() -> TaskRepositoryError {
    TaskRepositoryError::Hierarchy(HierarchyViolation::MaxDepthReached {
        max: MAX_HIERARCHY_LEVEL,
    })
}

fn read_snapshot<T>(
    connection: &mut PgConnection,
    f: impl FnOnce(&mut PgConnection) -> TaskRepositoryResult<T>,
) -> TaskRepositoryResult<T> {
    connection
        .build_transaction()
        .read_only()
        .repeatable_read()
        .run(f)
}

fn ordered(query: BoxedTasks, sort: TaskSort) -> BoxedTasks {
    let ascending = sort.direction() == SortDirection::Asc;
    let sorted = match sort.field() {
        TaskSortField::Id if ascending => query.order(tasks::id.asc()),
        TaskSortField::Id => query.order(tasks::id.desc()),
        TaskSortField::Code if ascending => query.order(tasks::code.asc()),
        TaskSortField::Code => query.order(tasks::code.desc()),
        TaskSortField::Title if ascending => query.order(tasks::title.asc()),
        TaskSortField::Title => query.order(tasks::title.desc()),
        TaskSortField::Status if ascending => query.order(tasks::status.asc()),
        TaskSortField::Status => query.order(tasks::status.desc()),
        TaskSortField::Priority if ascending => query.order(tasks::priority.asc()),
        TaskSortField::Priority => query.order(tasks::priority.desc()),
        TaskSortField::AssignedDate if ascending => query.order(tasks::assigned_date.asc()),
        TaskSortField::AssignedDate => query.order(tasks::assigned_date.desc()),
        TaskSortField::DueDate if ascending => query.order(tasks::due_date.asc()),
        TaskSortField::DueDate => query.order(tasks::due_date.desc()),
        TaskSortField::CreatedAt if ascending => query.order(tasks::created_at.asc()),
        TaskSortField::CreatedAt => query.order(tasks::created_at.desc()),
        TaskSortField::UpdatedAt if ascending => query.order(tasks::updated_at.asc()),
        TaskSortField::UpdatedAt => query.order(tasks::updated_at.desc()),
    };
    sorted.then_order_by(tasks::id.asc())
}

/// Attaches direct child codes to each row, preserving row order.
fn nodes_with_children(
    connection: &mut PgConnection,
    rows: Vec<TaskRow>,
) -> TaskRepositoryResult<Vec<TaskNode>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let parent_codes: Vec<String> = rows.iter().map(|row| row.code.clone()).collect();
    let links = tasks::table
        .filter(tasks::parent_code.eq_any(parent_codes))
        .order(tasks::id.asc())
        .select((tasks::parent_code, tasks::code))
        .load::<(Option<String>, String)>(connection)?;

    let mut children: HashMap<String, Vec<TaskCode>> = HashMap::new();
    for (parent, child) in links {
        if let Some(parent_code) = parent {
            children
                .entry(parent_code)
                .or_default()
                .push(parse_code(child)?);
        }
    }

    rows.into_iter()
        .map(|row| {
            let child_codes = children.remove(&row.code).unwrap_or_default();
            Ok(TaskNode::new(row_to_task(row)?, child_codes))
        })
        .collect()
}

fn map_write_error(
    err: DieselError,
    code: &TaskCode,
    parent_code: Option<&TaskCode>,
) -> TaskRepositoryError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
            if is_code_unique_violation(info.as_ref()) =>
        {
            TaskRepositoryError::DuplicateCode(code.clone())
        }
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
            match parent_code {
                Some(parent) => TaskRepositoryError::ParentNotFound(parent.clone()),
                None => TaskRepositoryError::persistence(err),
            }
        }
        _ => TaskRepositoryError::persistence(err),
    }
}

fn is_code_unique_violation(info: &dyn DatabaseErrorInformation) -> bool {
    info.constraint_name()
        .is_some_and(|name| name == "idx_tasks_code_unique")
}

fn to_new_row(task: &NewTask) -> NewTaskRow {
    let details = task.details();
    NewTaskRow {
        code: task.code().as_str().to_owned(),
        title: details.title().as_str().to_owned(),
        description: details.description().map(str::to_owned),
        status: details.status().as_str().to_owned(),
        assigned_date: details.assigned_date(),
        due_date: details.due_date(),
        creator_id: task.creator_id().map(UserId::value),
        assignee_id: details.assignee_id().map(UserId::value),
        parent_code: task.parent_code().map(|code| code.as_str().to_owned()),
        priority: details.priority().map(str::to_owned),
        tags: details.tags().map(str::to_owned),
        version: Task::INITIAL_VERSION,
        created_at: task.created_at(),
        updated_at: task.updated_at(),
    }
}

fn to_changeset(task: &Task) -> TaskChangeset {
    let details = task.details();
    TaskChangeset {
        title: details.title().as_str().to_owned(),
        description: details.description().map(str::to_owned),
        status: details.status().as_str().to_owned(),
        assigned_date: details.assigned_date(),
        due_date: details.due_date(),
        assignee_id: details.assignee_id().map(UserId::value),
        parent_code: task.parent_code().map(|code| code.as_str().to_owned()),
        priority: details.priority().map(str::to_owned),
        tags: details.tags().map(str::to_owned),
        version: task.version() + 1,
        updated_at: task.updated_at(),
    }
}

fn parse_code(value: String) -> TaskRepositoryResult<TaskCode> {
    TaskCode::parse(value).map_err(TaskRepositoryError::persistence)
}

fn row_to_task(row: TaskRow) -> TaskRepositoryResult<Task> {
    let TaskRow {
        id,
        code,
        title,
        description,
        status,
        assigned_date,
        due_date,
        creator_id,
        assignee_id,
        parent_code,
        priority,
        tags,
        version,
        created_at,
        updated_at,
    } = row;

    let task_title = TaskTitle::new(title).map_err(TaskRepositoryError::persistence)?;
    let task_status =
        TaskStatus::try_from(status.as_str()).map_err(TaskRepositoryError::persistence)?;
    let details = TaskDetails::new(task_title, task_status)
        .with_description(description)
        .with_assigned_date(assigned_date)
        .with_due_date(due_date)
        .with_assignee_id(assignee_id.map(UserId::from_i64))
        .with_priority(priority)
        .with_tags(tags);

    let data = PersistedTaskData {
        id: TaskId::from_i64(id),
        code: parse_code(code)?,
        details,
        creator_id: creator_id.map(UserId::from_i64),
        parent_code: parent_code.map(parse_code).transpose()?,
        version,
        created_at,
        updated_at,
    };
    Ok(Task::from_persisted(data))
}
