//! Shared harness for the HTTP integration tests
//!
//! Each test gets its own in-memory database and drives the router
//! in-process with `oneshot`.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use taskflow::{
    auth::ExternalTokenValidator, config::Config, create_app_with_state, db::Database, AppState,
};
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration-test-secret";
pub const PASSWORD: &str = "correct-horse-battery";

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.jwt_secret = JWT_SECRET.to_string();
    config
}

pub async fn app() -> Router {
    app_with(test_config(), None).await
}

pub async fn app_with(config: Config, validator: Option<ExternalTokenValidator>) -> Router {
    let db = Database::connect(&config.database).await.unwrap();
    let state = AppState::with_validator(db, &config, validator);
    create_app_with_state(state, &config)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> TestResponse {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    send_request(app, request).await
}

pub async fn send_request(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    TestResponse { status, headers, body }
}

pub async fn get(app: &Router, uri: &str, token: &str) -> TestResponse {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post(app: &Router, uri: &str, token: &str, body: Value) -> TestResponse {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put(app: &Router, uri: &str, token: &str, body: Value) -> TestResponse {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn delete(app: &Router, uri: &str, token: &str) -> TestResponse {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Register `username` on `site_code`, creating the site; returns the session token
pub async fn register_site(app: &Router, site_code: &str, site_name: &str, username: &str) -> String {
    let response = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "siteCode": site_code,
            "siteName": site_name,
            "username": username,
            "email": format!("{username}@{}.com", site_code.to_lowercase()),
            "password": PASSWORD,
        })),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    token_of(&response)
}

/// Have a site admin add a member, then sign the member in; returns the session token
pub async fn register_member(app: &Router, admin_token: &str, site_code: &str, username: &str) -> String {
    let created = post(
        app,
        "/api/users",
        admin_token,
        json!({
            "username": username,
            "email": format!("{username}@{}.com", site_code.to_lowercase()),
            "password": PASSWORD,
        }),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED, "{:?}", created.body);

    let response = send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({
            "identifier": username,
            "password": PASSWORD,
            "siteCode": site_code,
        })),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    token_of(&response)
}

pub fn token_of(response: &TestResponse) -> String {
    response.body["data"]["token"]
        .as_str()
        .expect("session token in response")
        .to_string()
}

pub fn id_of(response: &TestResponse) -> i64 {
    response.body["data"]["id"].as_i64().expect("id in response")
}
