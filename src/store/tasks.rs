use sqlx::PgPool;
use uuid::Uuid;

use crate::models::task::{SortField, Task, TaskSort};

const TASK_COLUMNS: &str = "id, description, completed, owner, created_at, updated_at";

/// Listing options for [`list_for_owner`]. Absent values place no bound.
#[derive(Debug, Default)]
pub struct TaskFilter {
    pub completed: Option<bool>,
    pub sort: Option<TaskSort>,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}

pub async fn insert(
    pool: &PgPool,
    id: Uuid,
    description: &str,
    completed: bool,
    owner: i32,
) -> Result<Task, sqlx::Error> {
    sqlx::query_as::<_, Task>(&format!(
        "INSERT INTO tasks (id, description, completed, owner) VALUES ($1, $2, $3, $4) \
         RETURNING {TASK_COLUMNS}"
    ))
    .bind(id)
    .bind(description)
    .bind(completed)
    .bind(owner)
    .fetch_one(pool)
    .await
}

/// Tasks belonging to `owner`, filtered, ordered, and paginated.
///
/// The statement is assembled dynamically the same way the WHERE clause
/// grows: conditions and bind positions are appended together. The ORDER BY
/// column comes from the [`SortField`] whitelist, never from raw input.
pub async fn list_for_owner(
    pool: &PgPool,
    owner: i32,
    filter: &TaskFilter,
) -> Result<Vec<Task>, sqlx::Error> {
    let mut sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE owner = $1");
    let mut param_count = 2;

    if filter.completed.is_some() {
        sql.push_str(&format!(" AND completed = ${}", param_count));
        param_count += 1;
    }

    // Insertion order is the default sequence when no sort is requested.
    let sort = filter.sort.unwrap_or(TaskSort {
        field: SortField::CreatedAt,
        descending: false,
    });
    sql.push_str(" ORDER BY ");
    sql.push_str(sort.field.column());
    sql.push_str(if sort.descending { " DESC" } else { " ASC" });

    if filter.limit.is_some() {
        sql.push_str(&format!(" LIMIT ${}", param_count));
        param_count += 1;
    }
    if filter.skip.is_some() {
        sql.push_str(&format!(" OFFSET ${}", param_count));
    }

    let mut query = sqlx::query_as::<_, Task>(&sql).bind(owner);
    if let Some(completed) = filter.completed {
        query = query.bind(completed);
    }
    if let Some(limit) = filter.limit {
        query = query.bind(limit);
    }
    if let Some(skip) = filter.skip {
        query = query.bind(skip);
    }

    query.fetch_all(pool).await
}

/// A single task, found only when both the id and the owner match.
pub async fn find_owned(pool: &PgPool, id: Uuid, owner: i32) -> Result<Option<Task>, sqlx::Error> {
    sqlx::query_as::<_, Task>(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND owner = $2"
    ))
    .bind(id)
    .bind(owner)
    .fetch_optional(pool)
    .await
}

pub async fn update(pool: &PgPool, task: &Task) -> Result<Task, sqlx::Error> {
    sqlx::query_as::<_, Task>(&format!(
        "UPDATE tasks SET description = $1, completed = $2, updated_at = now() \
         WHERE id = $3 AND owner = $4 RETURNING {TASK_COLUMNS}"
    ))
    .bind(&task.description)
    .bind(task.completed)
    .bind(task.id)
    .bind(task.owner)
    .fetch_one(pool)
    .await
}

/// Deletes a task scoped by id and owner, returning the deleted record, or
/// `None` when it is absent or foreign-owned.
pub async fn delete_owned(
    pool: &PgPool,
    id: Uuid,
    owner: i32,
) -> Result<Option<Task>, sqlx::Error> {
    sqlx::query_as::<_, Task>(&format!(
        "DELETE FROM tasks WHERE id = $1 AND owner = $2 RETURNING {TASK_COLUMNS}"
    ))
    .bind(id)
    .bind(owner)
    .fetch_optional(pool)
    .await
}

/// Removes every task the owner holds; the cascade step of user deletion.
pub async fn delete_all_for_owner(pool: &PgPool, owner: i32) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM tasks WHERE owner = $1")
        .bind(owner)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
