use axum::{extract::State, routing::get, Json, Router};

use super::{ApiJson, ApiPath, ApiQuery, ApiResponse, AppState, Created};
use crate::{
    auth::AuthUser,
    error::AppResult,
    models::{CreateDeal, Deal, DealFilter, UpdateDeal},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/deals", get(list_deals).post(create_deal))
        .route("/api/deals/{id}", get(get_deal).put(update_deal).delete(delete_deal))
}

/// GET /api/deals?customerId=&stage=
async fn list_deals(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(filter): ApiQuery<DealFilter>,
) -> AppResult<Json<ApiResponse<Vec<Deal>>>> {
    let deals = state.repos.deals.list(user.site_id, &filter).await?;
    Ok(Json(ApiResponse::success(deals)))
}

async fn get_deal(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<Deal>>> {
    let deal = state.repos.deals.get(user.site_id, id).await?;
    Ok(Json(ApiResponse::success(deal)))
}

/// POST /api/deals
///
/// Probability defaults from the stage when the body leaves it out.
async fn create_deal(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<CreateDeal>,
) -> AppResult<Created<Deal>> {
    input.validate()?;
    let deal = state.repos.deals.create(user.site_id, user.user_id, &input).await?;
    tracing::info!("💼 Deal '{}' opened on site {}", deal.title, user.site_id);
    Ok(Created(deal))
}

async fn update_deal(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<UpdateDeal>,
) -> AppResult<Json<ApiResponse<Deal>>> {
    patch.validate()?;
    let deal = state.repos.deals.update(user.site_id, id, &patch).await?;
    Ok(Json(ApiResponse::success(deal)))
}

async fn delete_deal(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.repos.deals.delete(user.site_id, id).await?;
    Ok(Json(ApiResponse::message("Deal deleted")))
}
