use axum::{extract::State, routing::get, Json, Router};

use super::{ApiJson, ApiPath, ApiResponse, AppState, Created};
use crate::{
    auth::AuthUser,
    error::AppResult,
    models::{Category, CreateCategory, UpdateCategory},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(list_categories).post(create_category))
        .route(
            "/api/categories/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
}

/// GET /api/categories
async fn list_categories(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<Category>>>> {
    let categories = state.repos.categories.list(user.site_id).await?;
    Ok(Json(ApiResponse::success(categories)))
}

/// GET /api/categories/{id}
async fn get_category(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let category = state.repos.categories.get(user.site_id, id).await?;
    Ok(Json(ApiResponse::success(category)))
}

/// POST /api/categories
async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<CreateCategory>,
) -> AppResult<Created<Category>> {
    input.validate()?;
    let category = state
        .repos
        .categories
        .create(user.site_id, user.user_id, &input)
        .await?;
    Ok(Created(category))
}

/// PUT /api/categories/{id}
async fn update_category(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<UpdateCategory>,
) -> AppResult<Json<ApiResponse<Category>>> {
    patch.validate()?;
    let category = state.repos.categories.update(user.site_id, id, &patch).await?;
    Ok(Json(ApiResponse::success(category)))
}

/// DELETE /api/categories/{id}
async fn delete_category(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.repos.categories.delete(user.site_id, id).await?;
    Ok(Json(ApiResponse::message("Category deleted")))
}
