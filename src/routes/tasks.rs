use crate::{
    auth::AuthSession,
    error::AppError,
    models::task::{TaskInput, TaskListQuery, TaskSort, TaskUpdate},
    store::{self, tasks::TaskFilter},
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Create a task for the authenticated user.
///
/// Whatever owner the body may carry is discarded; the owner is always the
/// caller.
#[post("/tasks")]
pub async fn create_task(
    pool: web::Data<PgPool>,
    session: AuthSession,
    body: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    let mut input = body.into_inner();
    input.normalize();
    input.validate()?;

    let task = store::tasks::insert(
        &pool,
        Uuid::new_v4(),
        &input.description,
        input.completed,
        session.user.id,
    )
    .await?;

    Ok(HttpResponse::Created().json(task))
}

/// List the caller's tasks.
///
/// ## Query Parameters:
/// - `completed` (optional): `"true"` keeps finished tasks, any other value
///   keeps unfinished ones.
/// - `sortBy` (optional): `field:dir`, e.g. `created_at:desc`. Direction
///   `desc` sorts descending, anything else ascending.
/// - `limit` / `skip` (optional): pagination bounds, each independently
///   optional.
///
/// An empty result is `200 []`, not an error.
#[get("/tasks")]
pub async fn list_tasks(
    pool: web::Data<PgPool>,
    session: AuthSession,
    query: web::Query<TaskListQuery>,
) -> Result<impl Responder, AppError> {
    let query = query.into_inner();

    let filter = TaskFilter {
        completed: query.completed.as_deref().map(|flag| flag == "true"),
        sort: query.sort_by.as_deref().map(TaskSort::parse).transpose()?,
        limit: query.limit,
        skip: query.skip,
    };

    let tasks = store::tasks::list_for_owner(&pool, session.user.id, &filter).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Read a single task by id.
///
/// A task owned by someone else responds 404, exactly like a task that does
/// not exist.
#[get("/tasks/{id}")]
pub async fn get_task(
    pool: web::Data<PgPool>,
    session: AuthSession,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = store::tasks::find_owned(&pool, task_id.into_inner(), session.user.id)
        .await?
        .ok_or_else(task_not_found)?;

    Ok(HttpResponse::Ok().json(task))
}

/// Update a task.
///
/// Accepts only {description, completed}; anything else in the body rejects
/// the whole request with 400 and leaves the task untouched.
#[patch("/tasks/{id}")]
pub async fn update_task(
    pool: web::Data<PgPool>,
    session: AuthSession,
    task_id: web::Path<Uuid>,
    body: web::Json<TaskUpdate>,
) -> Result<impl Responder, AppError> {
    let mut updates = body.into_inner();
    updates.normalize();
    updates.validate()?;

    let mut task = store::tasks::find_owned(&pool, task_id.into_inner(), session.user.id)
        .await?
        .ok_or_else(task_not_found)?;

    if let Some(description) = updates.description {
        task.description = description;
    }
    if let Some(completed) = updates.completed {
        task.completed = completed;
    }

    let task = store::tasks::update(&pool, &task).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Delete a task, responding with the deleted record.
#[delete("/tasks/{id}")]
pub async fn delete_task(
    pool: web::Data<PgPool>,
    session: AuthSession,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = store::tasks::delete_owned(&pool, task_id.into_inner(), session.user.id)
        .await?
        .ok_or_else(task_not_found)?;

    Ok(HttpResponse::Ok().json(task))
}

fn task_not_found() -> AppError {
    AppError::NotFound("Task not found".into())
}
