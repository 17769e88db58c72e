use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Validator;
use crate::error::AppResult;

/// A calendar entry, optionally tied to a task
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub site_id: i64,
    pub task_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub all_day: bool,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEvent {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub task_id: Option<i64>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEvent {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub task_id: Option<i64>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub all_day: Option<bool>,
}

/// Calendar window; events overlapping `[from, to]` are returned
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub task_id: Option<i64>,
}

impl CreateEvent {
    pub fn validate(&self) -> AppResult<()> {
        Validator::new()
            .required("title", &self.title, 300)
            .max_len("location", self.location.as_deref(), 300)
            .check(self.end_at >= self.start_at, "endAt", "must not be before startAt")
            .finish()
    }
}

impl UpdateEvent {
    pub fn validate(&self) -> AppResult<()> {
        Validator::new()
            .optional_required("title", self.title.as_deref(), 300)
            .max_len("location", self.location.as_deref(), 300)
            .finish()
    }
}

impl Event {
    pub fn apply(&mut self, patch: &UpdateEvent) {
        if let Some(title) = &patch.title {
            self.title = title.trim().to_string();
        }
        if patch.description.is_some() {
            self.description = patch.description.clone();
        }
        if patch.location.is_some() {
            self.location = patch.location.clone();
        }
        if patch.task_id.is_some() {
            self.task_id = patch.task_id;
        }
        if let Some(start) = patch.start_at {
            self.start_at = start;
        }
        if let Some(end) = patch.end_at {
            self.end_at = end;
        }
        if let Some(all_day) = patch.all_day {
            self.all_day = all_day;
        }
    }
}
