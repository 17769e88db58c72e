/// Authentication endpoints
///
/// POST /api/auth/register, POST /api/auth/login, GET /api/auth/me and the
/// external identity provider exchange under /api/auth/external/*.
use axum::{extract::State, Json};

use super::{ApiJson, ApiResponse, AppState, Created};
use crate::{
    auth::{AuthSession, AuthUser, ExternalLogin, ExternalSync, LoginRequest, RegisterRequest},
    error::AppResult,
    models::{MappedSite, User},
};

/// Open a new site named `siteName`; the caller becomes its admin
///
/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> AppResult<Created<AuthSession>> {
    let session = state.auth.register(&request).await?;
    Ok(Created(session))
}

/// POST /api/auth/login
/// Body: { "identifier": "jane@t0001.com", "password": "...", "siteCode": "T0001"? }
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthSession>>> {
    let session = state.auth.login(&request).await?;
    Ok(Json(ApiResponse::success(session)))
}

/// GET /api/auth/me
pub async fn me(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<ApiResponse<User>>> {
    let profile = state.auth.me(&user).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// Resolve the sites an external token can sign in to
///
/// POST /api/auth/external/sync
/// Returns: [{ "siteId", "siteCode", "siteName", "userId", "username", "displayName" }]
pub async fn external_sync(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ExternalSync>,
) -> AppResult<Json<ApiResponse<Vec<MappedSite>>>> {
    let sites = state.external.sync(&request).await?;
    Ok(Json(ApiResponse::success(sites)))
}

/// POST /api/auth/external/login
pub async fn external_login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ExternalLogin>,
) -> AppResult<Json<ApiResponse<AuthSession>>> {
    let session = state.external.login(&request).await?;
    Ok(Json(ApiResponse::success(session)))
}
