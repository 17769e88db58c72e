/// Project endpoints, plus the phases and tasks that hang off a project
use axum::{extract::State, routing::get, Json, Router};

use super::{ApiJson, ApiPath, ApiQuery, ApiResponse, AppState, Created};
use crate::{
    auth::AuthUser,
    error::AppResult,
    models::{CreateProject, Phase, Project, ProjectFilter, Task, TaskFilter, UpdateProject},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/projects", get(list_projects).post(create_project))
        .route(
            "/api/projects/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/api/projects/{id}/phases", get(list_project_phases))
        .route("/api/projects/{id}/tasks", get(list_project_tasks))
}

/// GET /api/projects?categoryId=&spaceId=&status=
async fn list_projects(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(filter): ApiQuery<ProjectFilter>,
) -> AppResult<Json<ApiResponse<Vec<Project>>>> {
    let projects = state.repos.projects.list(user.site_id, &filter).await?;
    Ok(Json(ApiResponse::success(projects)))
}

/// GET /api/projects/{id}
async fn get_project(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<Project>>> {
    let project = state.repos.projects.get(user.site_id, id).await?;
    Ok(Json(ApiResponse::success(project)))
}

/// POST /api/projects
///
/// `categoryId` and `spaceId` must name live rows of the caller's site.
async fn create_project(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<CreateProject>,
) -> AppResult<Created<Project>> {
    input.validate()?;
    let project = state
        .repos
        .projects
        .create(user.site_id, user.user_id, &input)
        .await?;
    Ok(Created(project))
}

/// PUT /api/projects/{id}
async fn update_project(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<UpdateProject>,
) -> AppResult<Json<ApiResponse<Project>>> {
    patch.validate()?;
    let project = state.repos.projects.update(user.site_id, id, &patch).await?;
    Ok(Json(ApiResponse::success(project)))
}

/// DELETE /api/projects/{id}
async fn delete_project(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.repos.projects.delete(user.site_id, id).await?;
    tracing::info!("🗑️ Project {} deleted by user {}", id, user.user_id);
    Ok(Json(ApiResponse::message("Project deleted")))
}

/// GET /api/projects/{id}/phases
async fn list_project_phases(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<Vec<Phase>>>> {
    state.repos.projects.get(user.site_id, id).await?;
    let phases = state.repos.phases.list(user.site_id, Some(id)).await?;
    Ok(Json(ApiResponse::success(phases)))
}

/// GET /api/projects/{id}/tasks
async fn list_project_tasks(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<Vec<Task>>>> {
    state.repos.projects.get(user.site_id, id).await?;
    let filter = TaskFilter {
        project_id: Some(id),
        ..Default::default()
    };
    let tasks = state.repos.tasks.list(user.site_id, &filter).await?;
    Ok(Json(ApiResponse::success(tasks)))
}
