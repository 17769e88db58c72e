use axum::{extract::State, routing::get, Json, Router};

use super::{ApiJson, ApiPath, ApiResponse, AppState, Created};
use crate::{
    auth::{AdminUser, AuthUser, CreateUserRequest},
    error::AppResult,
    models::User,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/{id}", get(get_user))
}

/// GET /api/users
async fn list_users(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<ApiResponse<Vec<User>>>> {
    let users = state.repos.users.list(user.site_id).await?;
    Ok(Json(ApiResponse::success(users)))
}

/// POST /api/users
///
/// Admin only; the account joins the admin's site.
async fn create_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(input): ApiJson<CreateUserRequest>,
) -> AppResult<Created<User>> {
    let user = state.auth.create_user(&admin, &input).await?;
    Ok(Created(user))
}

/// GET /api/users/{id}
async fn get_user(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<User>>> {
    let found = state.repos.users.get(user.site_id, id).await?;
    Ok(Json(ApiResponse::success(found)))
}
