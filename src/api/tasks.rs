/// Task endpoints
///
/// Subtasks are ordinary tasks with `parentTaskId` set; the child routes
/// only answer for a task that is visible to the caller.
use axum::{extract::State, routing::get, Json, Router};

use super::{ApiJson, ApiPath, ApiQuery, ApiResponse, AppState, Created};
use crate::{
    auth::AuthUser,
    error::AppResult,
    models::{Comment, CreateTask, Event, EventFilter, Task, TaskFilter, UpdateTask},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/{id}", get(get_task).put(update_task).delete(delete_task))
        .route("/api/tasks/{id}/subtasks", get(list_subtasks))
        .route("/api/tasks/{id}/comments", get(list_task_comments))
        .route("/api/tasks/{id}/events", get(list_task_events))
}

/// GET /api/tasks?projectId=&phaseId=&parentTaskId=&assigneeId=&status=
async fn list_tasks(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(filter): ApiQuery<TaskFilter>,
) -> AppResult<Json<ApiResponse<Vec<Task>>>> {
    let tasks = state.repos.tasks.list(user.site_id, &filter).await?;
    Ok(Json(ApiResponse::success(tasks)))
}

/// GET /api/tasks/{id}
async fn get_task(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<Task>>> {
    let task = state.repos.tasks.get(user.site_id, id).await?;
    Ok(Json(ApiResponse::success(task)))
}

/// POST /api/tasks
async fn create_task(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<CreateTask>,
) -> AppResult<Created<Task>> {
    input.validate()?;
    let task = state.repos.tasks.create(user.site_id, user.user_id, &input).await?;
    Ok(Created(task))
}

/// PUT /api/tasks/{id}
async fn update_task(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<UpdateTask>,
) -> AppResult<Json<ApiResponse<Task>>> {
    patch.validate()?;
    let task = state.repos.tasks.update(user.site_id, id, &patch).await?;
    Ok(Json(ApiResponse::success(task)))
}

/// DELETE /api/tasks/{id}
async fn delete_task(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.repos.tasks.delete(user.site_id, id).await?;
    Ok(Json(ApiResponse::message("Task deleted")))
}

async fn list_subtasks(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<Vec<Task>>>> {
    state.repos.tasks.get(user.site_id, id).await?;
    let filter = TaskFilter {
        parent_task_id: Some(id),
        ..Default::default()
    };
    let subtasks = state.repos.tasks.list(user.site_id, &filter).await?;
    Ok(Json(ApiResponse::success(subtasks)))
}

async fn list_task_comments(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<Vec<Comment>>>> {
    state.repos.tasks.get(user.site_id, id).await?;
    let comments = state.repos.comments.list(user.site_id, Some(id)).await?;
    Ok(Json(ApiResponse::success(comments)))
}

async fn list_task_events(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<Vec<Event>>>> {
    state.repos.tasks.get(user.site_id, id).await?;
    let filter = EventFilter {
        task_id: Some(id),
        ..Default::default()
    };
    let events = state.repos.events.list(user.site_id, &filter).await?;
    Ok(Json(ApiResponse::success(events)))
}
