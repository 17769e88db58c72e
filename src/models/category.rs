use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Validator;
use crate::error::AppResult;

/// Project category (e.g. "Marketing", "Internal")
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub site_id: i64,
    pub name: String,
    pub color: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategory {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub color: Option<String>,
}

impl CreateCategory {
    pub fn validate(&self) -> AppResult<()> {
        Validator::new()
            .required("name", &self.name, 100)
            .max_len("color", self.color.as_deref(), 20)
            .finish()
    }
}

impl UpdateCategory {
    pub fn validate(&self) -> AppResult<()> {
        Validator::new()
            .optional_required("name", self.name.as_deref(), 100)
            .max_len("color", self.color.as_deref(), 20)
            .finish()
    }
}
