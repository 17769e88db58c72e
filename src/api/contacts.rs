use axum::{extract::State, routing::get, Json, Router};

use super::{ApiJson, ApiPath, ApiQuery, ApiResponse, AppState, Created};
use crate::{
    auth::AuthUser,
    error::AppResult,
    models::{Contact, ContactFilter, CreateContact, UpdateContact},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/contacts", get(list_contacts).post(create_contact))
        .route(
            "/api/contacts/{id}",
            get(get_contact).put(update_contact).delete(delete_contact),
        )
}

/// GET /api/contacts?customerId=
async fn list_contacts(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(filter): ApiQuery<ContactFilter>,
) -> AppResult<Json<ApiResponse<Vec<Contact>>>> {
    let contacts = state.repos.contacts.list(user.site_id, &filter).await?;
    Ok(Json(ApiResponse::success(contacts)))
}

async fn get_contact(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<Contact>>> {
    let contact = state.repos.contacts.get(user.site_id, id).await?;
    Ok(Json(ApiResponse::success(contact)))
}

async fn create_contact(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<CreateContact>,
) -> AppResult<Created<Contact>> {
    input.validate()?;
    let contact = state
        .repos
        .contacts
        .create(user.site_id, user.user_id, &input)
        .await?;
    Ok(Created(contact))
}

async fn update_contact(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<UpdateContact>,
) -> AppResult<Json<ApiResponse<Contact>>> {
    patch.validate()?;
    let contact = state.repos.contacts.update(user.site_id, id, &patch).await?;
    Ok(Json(ApiResponse::success(contact)))
}

async fn delete_contact(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.repos.contacts.delete(user.site_id, id).await?;
    Ok(Json(ApiResponse::message("Contact deleted")))
}
