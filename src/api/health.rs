use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use super::{ApiResponse, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
}

/// Liveness check
///
/// GET /healthz
pub async fn health_check() -> &'static str {
    "ok"
}

/// Readiness, including a database round trip
///
/// GET /api/health
pub async fn api_health(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse<HealthStatus>>) {
    let database_ok = match state.db.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("❌ Health check database ping failed: {}", e);
            false
        }
    };
    let status = HealthStatus {
        status: if database_ok { "ok" } else { "degraded" },
        database: if database_ok { "ok" } else { "unavailable" },
        version: env!("CARGO_PKG_VERSION"),
    };
    let code = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(ApiResponse::success(status)))
}
