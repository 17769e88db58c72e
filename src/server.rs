/// Server setup and initialization
///
/// Wires together storage, authentication and the HTTP routes, and adds the
/// request tracing, CORS and panic-catching layers.

use crate::{
    api::{create_api_routes, health, ApiResponse, AppState},
    config::Config,
    db::Database,
    error::INTERNAL_ERROR_MESSAGE,
};
use anyhow::{Context, Result};
use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::{any::Any, net::SocketAddr};
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, Any as AnyOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

/// Create the main Axum application with all routes and middleware
///
/// Opens the database (creating the schema if needed) and builds the
/// shared state before wiring the routes.
pub async fn create_app(config: Config) -> Result<Router> {
    tracing::info!("🗄️ Initializing database");
    let db = Database::connect(&config.database).await?;

    tracing::info!("🏗️ Creating application state");
    let state = AppState::new(db, &config)?;

    let app = create_app_with_state(state, &config);
    tracing::info!("✅ Application initialized successfully");
    Ok(app)
}

/// Router over an already-built state; used directly by the tests
pub fn create_app_with_state(state: AppState, config: &Config) -> Router {
    tracing::info!("📡 Creating HTTP router with all endpoints");
    Router::new()
        .route("/healthz", get(health::health_check))
        .merge(create_api_routes(state))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
}

/// Install the global `tracing` subscriber (`RUST_LOG` overrides the filter)
///
/// Call before reading configuration so its warnings are not lost.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("taskflow=info,tower_http=info")),
        )
        .with_target(false)
        .with_level(true)
        .init();
}

/// Start the HTTP server with the given configuration
///
/// Builds the application and serves it until Ctrl-C. Expects
/// [`init_tracing`] to have run.
pub async fn start_server(config: Config) -> Result<()> {
    tracing::info!("Starting TaskFlow server...");

    let app = create_app(config.clone()).await?;

    let bind_addr = config.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;

    tracing::info!("Server listening on http://{}", bind_addr);

    // Client addresses feed the auth rate limiter.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("👋 Server stopped");
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(AnyOrigin).allow_headers(AnyOrigin);
    if origins.is_empty() {
        return layer.allow_origin(AnyOrigin);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("⚠️ Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("💥 Handler panicked: {}", detail);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::failure("internal_error", INTERNAL_ERROR_MESSAGE)),
    )
        .into_response()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("❌ Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("🛑 Shutdown signal received");
}
