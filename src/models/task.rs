use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

use super::{project::dates_ordered, Validator};
use crate::error::AppResult;

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, Default)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Review,
    Done,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, Default)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub site_id: i64,
    pub project_id: Option<i64>,
    pub phase_id: Option<i64>,
    pub parent_task_id: Option<i64>,
    pub assignee_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    /// Completion percentage, 0–100
    pub progress: i64,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub project_id: Option<i64>,
    pub phase_id: Option<i64>,
    pub parent_task_id: Option<i64>,
    pub assignee_id: Option<i64>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub progress: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub project_id: Option<i64>,
    pub phase_id: Option<i64>,
    pub parent_task_id: Option<i64>,
    pub assignee_id: Option<i64>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub progress: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    pub project_id: Option<i64>,
    pub phase_id: Option<i64>,
    pub parent_task_id: Option<i64>,
    pub assignee_id: Option<i64>,
    pub status: Option<TaskStatus>,
}

impl CreateTask {
    pub fn validate(&self) -> AppResult<()> {
        Validator::new()
            .required("title", &self.title, 300)
            .max_len("description", self.description.as_deref(), 10_000)
            .range("progress", self.progress, 0, 100)
            .check(
                dates_ordered(self.start_date, self.due_date),
                "dueDate",
                "must not be before startDate",
            )
            .finish()
    }
}

impl UpdateTask {
    pub fn validate(&self) -> AppResult<()> {
        Validator::new()
            .optional_required("title", self.title.as_deref(), 300)
            .max_len("description", self.description.as_deref(), 10_000)
            .range("progress", self.progress, 0, 100)
            .finish()
    }
}

impl Task {
    pub fn apply(&mut self, patch: &UpdateTask) {
        if let Some(title) = &patch.title {
            self.title = title.trim().to_string();
        }
        if patch.description.is_some() {
            self.description = patch.description.clone();
        }
        if patch.project_id.is_some() {
            self.project_id = patch.project_id;
        }
        if patch.phase_id.is_some() {
            self.phase_id = patch.phase_id;
        }
        if patch.parent_task_id.is_some() {
            self.parent_task_id = patch.parent_task_id;
        }
        if patch.assignee_id.is_some() {
            self.assignee_id = patch.assignee_id;
        }
        if let Some(status) = patch.status {
            self.status = status;
            if status == TaskStatus::Done && patch.progress.is_none() {
                self.progress = 100;
            }
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(progress) = patch.progress {
            self.progress = progress;
        }
        if patch.start_date.is_some() {
            self.start_date = patch.start_date;
        }
        if patch.due_date.is_some() {
            self.due_date = patch.due_date;
        }
    }
}
