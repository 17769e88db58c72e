use axum::{extract::State, routing::get, Json, Router};

use super::{ApiJson, ApiPath, ApiResponse, AppState, Created};
use crate::{
    auth::AuthUser,
    error::AppResult,
    models::{CreateSpace, Space, UpdateSpace},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/spaces", get(list_spaces).post(create_space))
        .route("/api/spaces/{id}", get(get_space).put(update_space).delete(delete_space))
}

async fn list_spaces(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<ApiResponse<Vec<Space>>>> {
    let spaces = state.repos.spaces.list(user.site_id).await?;
    Ok(Json(ApiResponse::success(spaces)))
}

async fn get_space(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<Space>>> {
    let space = state.repos.spaces.get(user.site_id, id).await?;
    Ok(Json(ApiResponse::success(space)))
}

async fn create_space(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<CreateSpace>,
) -> AppResult<Created<Space>> {
    input.validate()?;
    let space = state.repos.spaces.create(user.site_id, user.user_id, &input).await?;
    Ok(Created(space))
}

async fn update_space(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<UpdateSpace>,
) -> AppResult<Json<ApiResponse<Space>>> {
    patch.validate()?;
    let space = state.repos.spaces.update(user.site_id, id, &patch).await?;
    Ok(Json(ApiResponse::success(space)))
}

async fn delete_space(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.repos.spaces.delete(user.site_id, id).await?;
    Ok(Json(ApiResponse::message("Space deleted")))
}
