/// Customer endpoints and the CRM records attached to a customer
use axum::{extract::State, routing::get, Json, Router};

use super::{ApiJson, ApiPath, ApiResponse, AppState, Created};
use crate::{
    auth::AuthUser,
    error::AppResult,
    models::{Contact, ContactFilter, CreateCustomer, Customer, Deal, DealFilter, UpdateCustomer},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/customers", get(list_customers).post(create_customer))
        .route(
            "/api/customers/{id}",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
        .route("/api/customers/{id}/contacts", get(list_customer_contacts))
        .route("/api/customers/{id}/deals", get(list_customer_deals))
}

async fn list_customers(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<Customer>>>> {
    let customers = state.repos.customers.list(user.site_id).await?;
    Ok(Json(ApiResponse::success(customers)))
}

async fn get_customer(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<Customer>>> {
    let customer = state.repos.customers.get(user.site_id, id).await?;
    Ok(Json(ApiResponse::success(customer)))
}

async fn create_customer(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<CreateCustomer>,
) -> AppResult<Created<Customer>> {
    input.validate()?;
    let customer = state
        .repos
        .customers
        .create(user.site_id, user.user_id, &input)
        .await?;
    Ok(Created(customer))
}

async fn update_customer(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<UpdateCustomer>,
) -> AppResult<Json<ApiResponse<Customer>>> {
    patch.validate()?;
    let customer = state.repos.customers.update(user.site_id, id, &patch).await?;
    Ok(Json(ApiResponse::success(customer)))
}

async fn delete_customer(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.repos.customers.delete(user.site_id, id).await?;
    Ok(Json(ApiResponse::message("Customer deleted")))
}

/// GET /api/customers/{id}/contacts
async fn list_customer_contacts(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<Vec<Contact>>>> {
    state.repos.customers.get(user.site_id, id).await?;
    let filter = ContactFilter { customer_id: Some(id) };
    let contacts = state.repos.contacts.list(user.site_id, &filter).await?;
    Ok(Json(ApiResponse::success(contacts)))
}

/// GET /api/customers/{id}/deals
async fn list_customer_deals(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<Vec<Deal>>>> {
    state.repos.customers.get(user.site_id, id).await?;
    let filter = DealFilter {
        customer_id: Some(id),
        ..Default::default()
    };
    let deals = state.repos.deals.list(user.site_id, &filter).await?;
    Ok(Json(ApiResponse::success(deals)))
}
