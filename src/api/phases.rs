use axum::{extract::State, routing::get, Json, Router};
use serde::Deserialize;

use super::{ApiJson, ApiPath, ApiQuery, ApiResponse, AppState, Created};
use crate::{
    auth::AuthUser,
    error::AppResult,
    models::{CreatePhase, Phase, UpdatePhase},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/phases", get(list_phases).post(create_phase))
        .route("/api/phases/{id}", get(get_phase).put(update_phase).delete(delete_phase))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhaseQuery {
    project_id: Option<i64>,
}

/// GET /api/phases?projectId=
async fn list_phases(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<PhaseQuery>,
) -> AppResult<Json<ApiResponse<Vec<Phase>>>> {
    let phases = state.repos.phases.list(user.site_id, query.project_id).await?;
    Ok(Json(ApiResponse::success(phases)))
}

async fn get_phase(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<Phase>>> {
    let phase = state.repos.phases.get(user.site_id, id).await?;
    Ok(Json(ApiResponse::success(phase)))
}

/// POST /api/phases
/// Body: { "projectId": 1, "name": "Design", "sortOrder": 2? }
async fn create_phase(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<CreatePhase>,
) -> AppResult<Created<Phase>> {
    input.validate()?;
    let phase = state.repos.phases.create(user.site_id, user.user_id, &input).await?;
    Ok(Created(phase))
}

async fn update_phase(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<UpdatePhase>,
) -> AppResult<Json<ApiResponse<Phase>>> {
    patch.validate()?;
    let phase = state.repos.phases.update(user.site_id, id, &patch).await?;
    Ok(Json(ApiResponse::success(phase)))
}

async fn delete_phase(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.repos.phases.delete(user.site_id, id).await?;
    Ok(Json(ApiResponse::message("Phase deleted")))
}
