use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Validator;
use crate::error::AppResult;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub site_id: i64,
    pub task_id: i64,
    pub body: String,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateComment {
    pub task_id: i64,
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateComment {
    pub body: String,
}

impl CreateComment {
    pub fn validate(&self) -> AppResult<()> {
        Validator::new().required("body", &self.body, 10_000).finish()
    }
}

impl UpdateComment {
    pub fn validate(&self) -> AppResult<()> {
        Validator::new().required("body", &self.body, 10_000).finish()
    }
}
