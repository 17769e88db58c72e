use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{project::dates_ordered, Validator};
use crate::error::AppResult;

/// An ordered stage within a project
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    pub id: i64,
    pub site_id: i64,
    pub project_id: i64,
    pub name: String,
    pub sort_order: i64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePhase {
    pub project_id: i64,
    pub name: String,
    pub sort_order: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePhase {
    pub name: Option<String>,
    pub sort_order: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl CreatePhase {
    pub fn validate(&self) -> AppResult<()> {
        Validator::new()
            .required("name", &self.name, 200)
            .check(
                dates_ordered(self.start_date, self.end_date),
                "endDate",
                "must not be before startDate",
            )
            .finish()
    }
}

impl UpdatePhase {
    pub fn validate(&self) -> AppResult<()> {
        Validator::new()
            .optional_required("name", self.name.as_deref(), 200)
            .finish()
    }
}

impl Phase {
    pub fn apply(&mut self, patch: &UpdatePhase) {
        if let Some(name) = &patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(order) = patch.sort_order {
            self.sort_order = order;
        }
        if patch.start_date.is_some() {
            self.start_date = patch.start_date;
        }
        if patch.end_date.is_some() {
            self.end_date = patch.end_date;
        }
    }
}
