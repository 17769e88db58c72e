use axum::{routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ApiJson, ApiResponse, AppState};
use crate::{auth::AuthUser, error::{AppError, AppResult}, formula};

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/formulas/evaluate", post(evaluate))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRequest {
    pub expression: String,
    #[serde(default)]
    pub row: Value,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub value: Value,
}

/// Evaluate a computed-column formula against one row
///
/// POST /api/formulas/evaluate
/// Body: { "expression": "{price} * {qty}", "row": { "price": 2, "qty": 3 } }
async fn evaluate(
    _user: AuthUser,
    ApiJson(request): ApiJson<EvaluateRequest>,
) -> AppResult<Json<ApiResponse<EvaluateResponse>>> {
    let value = formula::evaluate(&request.expression, &request.row)
        .map_err(|e| AppError::invalid("expression", e.to_string()))?;
    Ok(Json(ApiResponse::success(EvaluateResponse { value })))
}
