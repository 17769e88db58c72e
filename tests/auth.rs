//! Authentication integration tests
//!
//! - Registration, login and the session endpoint
//! - Rate limiting of the public auth routes
//! - External identity provider sync, login and explicit mappings

mod common;

use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Method, Request, StatusCode},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{encode, jwk::JwkSet, Algorithm, EncodingKey, Header};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use taskflow::auth::{ExternalTokenValidator, StaticKeySetProvider};

use common::*;

const PROVIDER_SECRET: &[u8] = b"taskflow-external-provider-secret!!!";
const PROVIDER_ISSUER: &str = "https://id.example.com";

async fn login(app: &axum::Router, identifier: &str, password: &str) -> TestResponse {
    send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"identifier": identifier, "password": password})),
    )
    .await
}

async fn federated_app() -> axum::Router {
    let mut config = test_config();
    config.external.issuer = Some(PROVIDER_ISSUER.into());
    config.external.audience = Some("taskflow".into());
    config.external.algorithms = vec!["HS256".into()];
    config.external.email_auto_mapping = true;

    let keys: JwkSet = serde_json::from_value(json!({
        "keys": [{"kty": "oct", "kid": "k1", "alg": "HS256", "k": URL_SAFE_NO_PAD.encode(PROVIDER_SECRET)}]
    }))
    .unwrap();
    let validator = ExternalTokenValidator::new(
        Arc::new(StaticKeySetProvider::new(keys)),
        &config.external,
    );
    app_with(config, Some(validator)).await
}

fn provider_token(sub: &str, email: &str) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some("k1".into());
    let claims = json!({
        "sub": sub,
        "email": email,
        "iss": PROVIDER_ISSUER,
        "aud": "taskflow",
        "exp": chrono::Utc::now().timestamp() + 600,
    });
    encode(&header, &claims, &EncodingKey::from_secret(PROVIDER_SECRET)).unwrap()
}

// ---------------------------------------------------------------------------
// Local accounts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_login_and_me() {
    let app = app().await;
    let token = register_site(&app, "T0001", "Acme", "alice").await;

    let me = get(&app, "/api/auth/me", &token).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["data"]["username"], "alice");
    assert_eq!(me.body["data"]["role"], "admin");
    assert!(me.body["data"].get("passwordHash").is_none());

    // Site code comes from the email domain when none is given.
    let session = login(&app, "alice@t0001.com", PASSWORD).await;
    assert_eq!(session.status, StatusCode::OK);
    assert_eq!(session.body["data"]["tokenType"], "Bearer");
    assert_eq!(session.body["data"]["user"]["siteId"], me.body["data"]["siteId"]);

    // A short site code is normalized before lookup.
    let by_username = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"identifier": "alice", "password": PASSWORD, "siteCode": "t1"})),
    )
    .await;
    assert_eq!(by_username.status, StatusCode::OK);
}

#[tokio::test]
async fn registration_cannot_join_an_existing_site() {
    let app = app().await;
    register_site(&app, "T0001", "Acme", "alice").await;

    for site_name in [None, Some("Acme")] {
        let mut body = json!({
            "siteCode": "T0001",
            "username": "mallory",
            "email": "mallory@t0001.com",
            "password": PASSWORD,
        });
        if let Some(name) = site_name {
            body["siteName"] = json!(name);
        }
        let response = send(&app, Method::POST, "/api/auth/register", None, Some(body)).await;
        assert_eq!(response.status, StatusCode::CONFLICT);
        assert_eq!(response.body["error"], "conflict");
    }

    let mallory = login(&app, "mallory@t0001.com", PASSWORD).await;
    assert_eq!(mallory.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admins_add_members_to_their_site() {
    let app = app().await;
    let alice = register_site(&app, "T0001", "Acme", "alice").await;
    let carol = register_member(&app, &alice, "T0001", "carol").await;

    let me = get(&app, "/api/auth/me", &carol).await;
    assert_eq!(me.body["data"]["role"], "member");

    let users = get(&app, "/api/users", &carol).await;
    assert_eq!(users.body["data"].as_array().unwrap().len(), 2);

    // Members cannot add accounts themselves
    let refused = post(
        &app,
        "/api/users",
        &carol,
        json!({"username": "dave", "email": "dave@t0001.com", "password": PASSWORD}),
    )
    .await;
    assert_eq!(refused.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn bad_credentials_look_the_same() {
    let app = app().await;
    register_site(&app, "T0001", "Acme", "alice").await;

    let wrong_password = login(&app, "alice@t0001.com", "not-the-password").await;
    let unknown_user = login(&app, "nobody@t0001.com", PASSWORD).await;
    let unknown_site = login(&app, "alice@t0999.com", PASSWORD).await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body, unknown_user.body);
    assert_eq!(wrong_password.body, unknown_site.body);
}

#[tokio::test]
async fn registration_on_unknown_site_without_name_is_rejected() {
    let app = app().await;
    let response = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "siteCode": "T0042",
            "username": "eve",
            "email": "eve@t0042.com",
            "password": PASSWORD,
        })),
    )
    .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

fn login_attempt(peer: [u8; 4], forwarded_for: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", forwarded_for)
        .extension(ConnectInfo(SocketAddr::from((peer, 40_000))))
        .body(Body::from(
            json!({"identifier": "x@t0001.com", "password": "whatever"}).to_string(),
        ))
        .unwrap()
}

async fn rate_limited_app(trusted_proxies: Vec<IpAddr>) -> axum::Router {
    let mut config = test_config();
    config.rate_limit.max_requests = 3;
    config.rate_limit.window_secs = 60;
    config.rate_limit.trusted_proxies = trusted_proxies;
    app_with(config, None).await
}

#[tokio::test]
async fn login_is_rate_limited_per_client_behind_trusted_proxy() {
    let proxy = [10, 0, 0, 1];
    let app = rate_limited_app(vec![IpAddr::from(proxy)]).await;

    for _ in 0..3 {
        let response = send_request(&app, login_attempt(proxy, "203.0.113.7")).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }

    let limited = send_request(&app, login_attempt(proxy, "203.0.113.7")).await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.body["error"], "rate_limited");
    let retry_after: u64 = limited.headers[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));

    let other = send_request(&app, login_attempt(proxy, "198.51.100.2")).await;
    assert_eq!(other.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rotating_forwarded_headers_does_not_reset_the_limit() {
    let app = rate_limited_app(Vec::new()).await;
    let peer = [198, 51, 100, 77];

    for n in 0..3 {
        let spoofed = format!("203.0.113.{n}");
        let response = send_request(&app, login_attempt(peer, &spoofed)).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }
    for n in 3..10 {
        let spoofed = format!("203.0.113.{n}");
        let response = send_request(&app, login_attempt(peer, &spoofed)).await;
        assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    }
}

// ---------------------------------------------------------------------------
// External identity provider
// ---------------------------------------------------------------------------

#[tokio::test]
async fn external_sync_auto_maps_once_and_logs_in() {
    let app = federated_app().await;
    register_site(&app, "T0001", "Acme", "alice").await;
    let token = provider_token("ext-1", "alice@t00001.com");

    let body = json!({"token": token});
    let first = send(&app, Method::POST, "/api/auth/external/sync", None, Some(body.clone())).await;
    assert_eq!(first.status, StatusCode::OK, "{:?}", first.body);
    let sites = first.body["data"].as_array().unwrap().clone();
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0]["siteCode"], "T0001");
    assert_eq!(sites[0]["username"], "alice");

    let second = send(&app, Method::POST, "/api/auth/external/sync", None, Some(body)).await;
    assert_eq!(second.body["data"], Value::Array(sites.clone()));

    let site_id = sites[0]["siteId"].as_i64().unwrap();
    let session = send(
        &app,
        Method::POST,
        "/api/auth/external/login",
        None,
        Some(json!({"token": token, "siteId": site_id})),
    )
    .await;
    assert_eq!(session.status, StatusCode::OK);
    let me = get(&app, "/api/auth/me", &token_of(&session)).await;
    assert_eq!(me.body["data"]["username"], "alice");

    let elsewhere = send(
        &app,
        Method::POST,
        "/api/auth/external/login",
        None,
        Some(json!({"token": token, "siteId": site_id + 1})),
    )
    .await;
    assert_eq!(elsewhere.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn external_sync_rejects_mismatched_subject() {
    let app = federated_app().await;
    let response = send(
        &app,
        Method::POST,
        "/api/auth/external/sync",
        None,
        Some(json!({"token": provider_token("ext-1", "a@t0001.com"), "externalUserId": "ext-2"})),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn external_sync_is_unavailable_without_provider() {
    let app = app().await;
    let response = send(
        &app,
        Method::POST,
        "/api/auth/external/sync",
        None,
        Some(json!({"token": provider_token("ext-1", "a@t0001.com")})),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["success"], false);
}

#[tokio::test]
async fn admins_manage_explicit_mappings() {
    let app = federated_app().await;
    let admin = register_site(&app, "T0001", "Acme", "alice").await;
    let carol = register_member(&app, &admin, "T0001", "carol").await;
    let carol_id = get(&app, "/api/auth/me", &carol).await.body["data"]["id"]
        .as_i64()
        .unwrap();

    let denied = post(
        &app,
        "/api/external-identities",
        &carol,
        json!({"providerUserId": "ext-9", "userId": carol_id}),
    )
    .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let created = post(
        &app,
        "/api/external-identities",
        &admin,
        json!({"providerUserId": "ext-9", "userId": carol_id}),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let mapping = id_of(&created);

    let duplicate = post(
        &app,
        "/api/external-identities",
        &admin,
        json!({"providerUserId": "ext-9", "userId": carol_id}),
    )
    .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    // Explicit mappings win over the email heuristic.
    let sync = send(
        &app,
        Method::POST,
        "/api/auth/external/sync",
        None,
        Some(json!({"token": provider_token("ext-9", "someone@t0001.com")})),
    )
    .await;
    assert_eq!(sync.body["data"][0]["username"], "carol");

    let removed = delete(&app, &format!("/api/external-identities/{mapping}"), &admin).await;
    assert_eq!(removed.status, StatusCode::OK);
    let listed = get(&app, "/api/external-identities", &admin).await;
    assert_eq!(listed.body["data"], json!([]));
}
