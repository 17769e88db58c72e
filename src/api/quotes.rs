/// Quote endpoints
///
/// A quote is always returned with its items and computed total.
use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use super::{ApiJson, ApiPath, ApiQuery, ApiResponse, AppState, Created};
use crate::{
    auth::AuthUser,
    error::AppResult,
    models::{quote::validate_items, CreateQuote, Quote, QuoteFilter, QuoteItemInput, UpdateQuote, Validator},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/quotes", get(list_quotes).post(create_quote))
        .route("/api/quotes/{id}", get(get_quote).put(update_quote).delete(delete_quote))
        .route("/api/quotes/{id}/items", put(replace_quote_items))
}

#[derive(Debug, Deserialize)]
struct ReplaceItems {
    items: Vec<QuoteItemInput>,
}

/// GET /api/quotes?dealId=&customerId=&status=
async fn list_quotes(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(filter): ApiQuery<QuoteFilter>,
) -> AppResult<Json<ApiResponse<Vec<Quote>>>> {
    let quotes = state.repos.quotes.list(user.site_id, &filter).await?;
    Ok(Json(ApiResponse::success(quotes)))
}

async fn get_quote(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<Quote>>> {
    let quote = state.repos.quotes.get(user.site_id, id).await?;
    Ok(Json(ApiResponse::success(quote)))
}

/// POST /api/quotes
///
/// The quote number is generated per site and year unless supplied.
async fn create_quote(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<CreateQuote>,
) -> AppResult<Created<Quote>> {
    input.validate()?;
    let quote = state.repos.quotes.create(user.site_id, user.user_id, &input).await?;
    Ok(Created(quote))
}

async fn update_quote(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<UpdateQuote>,
) -> AppResult<Json<ApiResponse<Quote>>> {
    patch.validate()?;
    let quote = state.repos.quotes.update(user.site_id, id, &patch).await?;
    Ok(Json(ApiResponse::success(quote)))
}

/// PUT /api/quotes/{id}/items
/// Body: { "items": [{ "description": "...", "quantity": 2, "unitPrice": 50 }] }
async fn replace_quote_items(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<ReplaceItems>,
) -> AppResult<Json<ApiResponse<Quote>>> {
    let mut validator = Validator::new();
    validate_items(&mut validator, &body.items);
    validator.finish()?;

    let quote = state.repos.quotes.replace_items(user.site_id, id, &body.items).await?;
    Ok(Json(ApiResponse::with_message(quote, "Quote items replaced")))
}

async fn delete_quote(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.repos.quotes.delete(user.site_id, id).await?;
    Ok(Json(ApiResponse::message("Quote deleted")))
}
