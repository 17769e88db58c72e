//! Resource API integration tests
//!
//! - Tenant isolation across sites
//! - Soft delete, cross-tenant references and child routes
//! - Quotes with items, comments, formulas
//! - Envelope shape for malformed requests

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use jsonwebtoken::{encode, EncodingKey, Header};
use pretty_assertions::assert_eq;
use serde_json::json;

use common::*;

// ---------------------------------------------------------------------------
// Tenant isolation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn projects_are_invisible_to_other_tenants() {
    let app = app().await;
    let acme = register_site(&app, "T0001", "Acme", "alice").await;
    let globex = register_site(&app, "T0002", "Globex", "bob").await;

    let created = post(&app, "/api/projects", &acme, json!({"name": "Launch"})).await;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = id_of(&created);

    let listed = get(&app, "/api/projects", &globex).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body["data"], json!([]));

    let fetched = get(&app, &format!("/api/projects/{id}"), &globex).await;
    assert_eq!(fetched.status, StatusCode::NOT_FOUND);
    assert_eq!(fetched.body["success"], false);

    let own = get(&app, &format!("/api/projects/{id}"), &acme).await;
    assert_eq!(own.status, StatusCode::OK);
    assert_eq!(own.body["data"]["name"], "Launch");
}

#[tokio::test]
async fn foreign_updates_and_deletes_are_not_found() {
    let app = app().await;
    let acme = register_site(&app, "T0001", "Acme", "alice").await;
    let globex = register_site(&app, "T0002", "Globex", "bob").await;

    let id = id_of(&post(&app, "/api/customers", &acme, json!({"name": "Initech"})).await);

    let update = put(&app, &format!("/api/customers/{id}"), &globex, json!({"name": "Hijacked"})).await;
    assert_eq!(update.status, StatusCode::NOT_FOUND);
    let removed = delete(&app, &format!("/api/customers/{id}"), &globex).await;
    assert_eq!(removed.status, StatusCode::NOT_FOUND);

    let still = get(&app, &format!("/api/customers/{id}"), &acme).await;
    assert_eq!(still.body["data"]["name"], "Initech");
}

#[tokio::test]
async fn token_without_site_is_rejected() {
    let app = app().await;
    register_site(&app, "T0001", "Acme", "alice").await;

    let now = chrono::Utc::now().timestamp();
    let claims = json!({
        "sub": "1",
        "iss": "taskflow",
        "aud": "taskflow-web",
        "iat": now,
        "exp": now + 600,
    });
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();

    let response = get(&app, "/api/projects", &token).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["success"], false);
}

#[tokio::test]
async fn requests_without_token_are_rejected() {
    let app = app().await;
    let response = send(&app, Method::GET, "/api/tasks", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "unauthorized");
}

// ---------------------------------------------------------------------------
// Soft delete and references
// ---------------------------------------------------------------------------

#[tokio::test]
async fn soft_deleted_task_cannot_be_updated() {
    let app = app().await;
    let token = register_site(&app, "T0001", "Acme", "alice").await;

    let id = id_of(&post(&app, "/api/tasks", &token, json!({"title": "Write brief"})).await);
    let removed = delete(&app, &format!("/api/tasks/{id}"), &token).await;
    assert_eq!(removed.status, StatusCode::OK);
    assert_eq!(removed.body["message"], "Task deleted");

    let update = put(&app, &format!("/api/tasks/{id}"), &token, json!({"progress": 50})).await;
    assert_eq!(update.status, StatusCode::NOT_FOUND);

    let listed = get(&app, "/api/tasks", &token).await;
    assert_eq!(listed.body["data"], json!([]));
}

#[tokio::test]
async fn task_status_updates_after_its_project_is_deleted() {
    let app = app().await;
    let token = register_site(&app, "T0001", "Acme", "alice").await;

    let project = id_of(&post(&app, "/api/projects", &token, json!({"name": "Launch"})).await);
    let task = id_of(
        &post(&app, "/api/tasks", &token, json!({"title": "Mockups", "projectId": project})).await,
    );
    let removed = delete(&app, &format!("/api/projects/{project}"), &token).await;
    assert_eq!(removed.status, StatusCode::OK);

    let update = put(&app, &format!("/api/tasks/{task}"), &token, json!({"status": "done"})).await;
    assert_eq!(update.status, StatusCode::OK, "{:?}", update.body);
    assert_eq!(update.body["data"]["status"], "done");
}

#[tokio::test]
async fn task_referencing_foreign_project_is_rejected() {
    let app = app().await;
    let acme = register_site(&app, "T0001", "Acme", "alice").await;
    let globex = register_site(&app, "T0002", "Globex", "bob").await;

    let project = id_of(&post(&app, "/api/projects", &acme, json!({"name": "Launch"})).await);

    let response = post(
        &app,
        "/api/tasks",
        &globex,
        json!({"title": "Steal", "projectId": project}),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "validation_error");
    assert_eq!(response.body["data"][0]["field"], "projectId");
}

#[tokio::test]
async fn child_routes_follow_the_parent() {
    let app = app().await;
    let acme = register_site(&app, "T0001", "Acme", "alice").await;
    let globex = register_site(&app, "T0002", "Globex", "bob").await;

    let project = id_of(&post(&app, "/api/projects", &acme, json!({"name": "Launch"})).await);
    post(&app, "/api/phases", &acme, json!({"projectId": project, "name": "Design"})).await;
    let task = id_of(
        &post(&app, "/api/tasks", &acme, json!({"title": "Mockups", "projectId": project})).await,
    );
    post(
        &app,
        "/api/tasks",
        &acme,
        json!({"title": "Hero image", "projectId": project, "parentTaskId": task}),
    )
    .await;

    let phases = get(&app, &format!("/api/projects/{project}/phases"), &acme).await;
    assert_eq!(phases.body["data"].as_array().unwrap().len(), 1);

    let tasks = get(&app, &format!("/api/projects/{project}/tasks"), &acme).await;
    assert_eq!(tasks.body["data"].as_array().unwrap().len(), 2);

    let subtasks = get(&app, &format!("/api/tasks/{task}/subtasks"), &acme).await;
    assert_eq!(subtasks.body["data"][0]["title"], "Hero image");

    let foreign = get(&app, &format!("/api/projects/{project}/tasks"), &globex).await;
    assert_eq!(foreign.status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// CRM
// ---------------------------------------------------------------------------

#[tokio::test]
async fn quote_items_are_replaced_as_a_whole() {
    let app = app().await;
    let token = register_site(&app, "T0001", "Acme", "alice").await;

    let customer = id_of(&post(&app, "/api/customers", &token, json!({"name": "Initech"})).await);
    let created = post(
        &app,
        "/api/quotes",
        &token,
        json!({
            "customerId": customer,
            "items": [
                {"description": "Setup", "quantity": 1, "unitPrice": 250},
                {"description": "Hours", "quantity": 2, "unitPrice": 50}
            ]
        }),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = id_of(&created);
    assert_eq!(created.body["data"]["total"], 350.0);
    let year = chrono::Utc::now().format("%Y").to_string();
    assert_eq!(created.body["data"]["quoteNumber"], format!("Q-{year}-0001"));

    let replaced = put(
        &app,
        &format!("/api/quotes/{id}/items"),
        &token,
        json!({"items": [{"description": "Retainer", "quantity": 1, "unitPrice": 900}]}),
    )
    .await;
    assert_eq!(replaced.status, StatusCode::OK);
    assert_eq!(replaced.body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(replaced.body["data"]["total"], 900.0);

    let invalid = put(
        &app,
        &format!("/api/quotes/{id}/items"),
        &token,
        json!({"items": [{"description": "Free", "quantity": 0, "unitPrice": 10}]}),
    )
    .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid.body["data"][0]["field"], "items[0].quantity");
}

#[tokio::test]
async fn customer_children_are_listed() {
    let app = app().await;
    let token = register_site(&app, "T0001", "Acme", "alice").await;

    let customer = id_of(&post(&app, "/api/customers", &token, json!({"name": "Initech"})).await);
    let contact = id_of(
        &post(
            &app,
            "/api/contacts",
            &token,
            json!({"customerId": customer, "firstName": "Peter"}),
        )
        .await,
    );
    let deal = post(
        &app,
        "/api/deals",
        &token,
        json!({"customerId": customer, "contactId": contact, "title": "Renewal"}),
    )
    .await;
    assert_eq!(deal.status, StatusCode::CREATED);
    assert_eq!(deal.body["data"]["stage"], "lead");

    let contacts = get(&app, &format!("/api/customers/{customer}/contacts"), &token).await;
    assert_eq!(contacts.body["data"][0]["firstName"], "Peter");
    let deals = get(&app, &format!("/api/customers/{customer}/deals"), &token).await;
    assert_eq!(deals.body["data"][0]["title"], "Renewal");
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[tokio::test]
async fn only_the_author_edits_a_comment() {
    let app = app().await;
    let alice = register_site(&app, "T0001", "Acme", "alice").await;
    let carol = register_member(&app, &alice, "T0001", "carol").await;

    let task = id_of(&post(&app, "/api/tasks", &alice, json!({"title": "Review"})).await);
    let comment = id_of(
        &post(&app, "/api/comments", &alice, json!({"taskId": task, "body": "Looks good"})).await,
    );

    let denied = put(&app, &format!("/api/comments/{comment}"), &carol, json!({"body": "Edited"})).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    let denied = delete(&app, &format!("/api/comments/{comment}"), &carol).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let edited = put(&app, &format!("/api/comments/{comment}"), &alice, json!({"body": "Ship it"})).await;
    assert_eq!(edited.status, StatusCode::OK);

    let listed = get(&app, &format!("/api/tasks/{task}/comments"), &carol).await;
    assert_eq!(listed.body["data"][0]["body"], "Ship it");
}

// ---------------------------------------------------------------------------
// Formulas
// ---------------------------------------------------------------------------

#[tokio::test]
async fn formula_endpoint_evaluates_against_row() {
    let app = app().await;
    let token = register_site(&app, "T0001", "Acme", "alice").await;

    let response = post(
        &app,
        "/api/formulas/evaluate",
        &token,
        json!({"expression": "{qty} * {price} + 1", "row": {"qty": 3, "price": 2.5}}),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["value"], 8.5);

    let broken = post(
        &app,
        "/api/formulas/evaluate",
        &token,
        json!({"expression": "1 / 0"}),
    )
    .await;
    assert_eq!(broken.status, StatusCode::BAD_REQUEST);
    assert_eq!(broken.body["data"][0]["field"], "expression");
}

#[tokio::test]
async fn long_operator_chain_is_rejected_not_fatal() {
    let app = app().await;
    let token = register_site(&app, "T0001", "Acme", "alice").await;

    let chain = vec!["1"; 2048].join("+");
    let response = post(
        &app,
        "/api/formulas/evaluate",
        &token,
        json!({"expression": chain}),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["data"][0]["field"], "expression");

    let health = send(&app, Method::GET, "/api/health", None, None).await;
    assert_eq!(health.status, StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_json_is_a_400_envelope() {
    let app = app().await;
    let token = register_site(&app, "T0001", "Acme", "alice").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/projects")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();
    let response = send_request(&app, request).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["error"], "bad_request");
}

#[tokio::test]
async fn non_numeric_id_is_a_400_envelope() {
    let app = app().await;
    let token = register_site(&app, "T0001", "Acme", "alice").await;

    let response = get(&app, "/api/tasks/abc", &token).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
}

#[tokio::test]
async fn health_reports_database() {
    let app = app().await;

    let plain = send(&app, Method::GET, "/healthz", None, None).await;
    assert_eq!(plain.status, StatusCode::OK);

    let detailed = send(&app, Method::GET, "/api/health", None, None).await;
    assert_eq!(detailed.status, StatusCode::OK);
    assert_eq!(detailed.body["data"]["database"], "ok");
}
