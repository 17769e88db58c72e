use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// A tenant: an isolated customer organisation
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: i64,
    /// Canonical tenant code (e.g. "T0001")
    pub code: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
