use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{CreateTaskRequest, ListQuery, TaskEnvelope, TaskList, UpdateTaskRequest},
    services,
};
use crate::{
    auth::AuthUser,
    error::ApiResult,
    response::{created, ok},
    state::AppState,
};

pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
}

#[instrument(skip(state, payload), fields(user_id = %user.id))]
pub async fn create_task(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult<TaskEnvelope> {
    let Json(payload) = payload?;
    let task = services::create(state.tasks.as_ref(), &user, payload).await?;
    Ok(created(TaskEnvelope {
        message: Some("Task created successfully".into()),
        task,
    }))
}

#[instrument(skip(state, query), fields(user_id = %user.id))]
pub async fn list_tasks(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<TaskList> {
    let Query(query) = query?;
    let tasks = services::list(state.tasks.as_ref(), &user, query).await?;
    Ok(ok(TaskList {
        count: tasks.len(),
        tasks,
    }))
}

#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn get_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<TaskEnvelope> {
    let task = services::get(state.tasks.as_ref(), &user, &id).await?;
    Ok(ok(TaskEnvelope { message: None, task }))
}

#[instrument(skip(state, payload), fields(user_id = %user.id))]
pub async fn update_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> ApiResult<TaskEnvelope> {
    let Json(payload) = payload?;
    let task = services::update(state.tasks.as_ref(), &user, &id, payload).await?;
    Ok(ok(TaskEnvelope {
        message: Some("Task updated successfully".into()),
        task,
    }))
}

#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn delete_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<TaskEnvelope> {
    let task = services::delete(state.tasks.as_ref(), &user, &id).await?;
    Ok(ok(TaskEnvelope {
        message: Some("Task deleted successfully".into()),
        task,
    }))
}
