use axum::{extract::State, routing::get, Json, Router};

use super::{ApiJson, ApiPath, ApiQuery, ApiResponse, AppState, Created};
use crate::{
    auth::AuthUser,
    error::AppResult,
    models::{CreateEvent, Event, EventFilter, UpdateEvent},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/events", get(list_events).post(create_event))
        .route("/api/events/{id}", get(get_event).put(update_event).delete(delete_event))
}

/// GET /api/events?from=&to=&taskId=
///
/// `from`/`to` are RFC 3339 instants; an event is returned when it
/// overlaps the window.
async fn list_events(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(filter): ApiQuery<EventFilter>,
) -> AppResult<Json<ApiResponse<Vec<Event>>>> {
    let events = state.repos.events.list(user.site_id, &filter).await?;
    Ok(Json(ApiResponse::success(events)))
}

async fn get_event(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<Event>>> {
    let event = state.repos.events.get(user.site_id, id).await?;
    Ok(Json(ApiResponse::success(event)))
}

async fn create_event(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<CreateEvent>,
) -> AppResult<Created<Event>> {
    input.validate()?;
    let event = state.repos.events.create(user.site_id, user.user_id, &input).await?;
    Ok(Created(event))
}

async fn update_event(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<UpdateEvent>,
) -> AppResult<Json<ApiResponse<Event>>> {
    patch.validate()?;
    let event = state.repos.events.update(user.site_id, id, &patch).await?;
    Ok(Json(ApiResponse::success(event)))
}

async fn delete_event(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.repos.events.delete(user.site_id, id).await?;
    Ok(Json(ApiResponse::message("Event deleted")))
}
