/// Administrator-managed links between external subjects and local users
use axum::{
    extract::State,
    routing::{delete, get},
    Json, Router,
};

use super::{ApiJson, ApiPath, ApiResponse, AppState, Created};
use crate::{
    auth::AdminUser,
    error::AppResult,
    models::{CreateExternalIdentity, ExternalIdentity},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/external-identities", get(list_mappings).post(create_mapping))
        .route("/api/external-identities/{id}", delete(delete_mapping))
}

/// GET /api/external-identities
async fn list_mappings(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> AppResult<Json<ApiResponse<Vec<ExternalIdentity>>>> {
    let mappings = state.repos.external_identities.list(admin.site_id).await?;
    Ok(Json(ApiResponse::success(mappings)))
}

/// POST /api/external-identities
/// Body: { "providerUserId": "...", "userId": 12 }
async fn create_mapping(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(input): ApiJson<CreateExternalIdentity>,
) -> AppResult<Created<ExternalIdentity>> {
    input.validate()?;
    let mapping = state
        .repos
        .external_identities
        .create(admin.site_id, admin.user_id, &input)
        .await?;
    Ok(Created(mapping))
}

/// DELETE /api/external-identities/{id}
async fn delete_mapping(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.repos.external_identities.delete(admin.site_id, id).await?;
    tracing::info!("🔗 Removed external identity mapping {} in site {}", id, admin.site_id);
    Ok(Json(ApiResponse::message("External identity mapping deleted")))
}
