use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

use super::Validator;
use crate::error::AppResult;

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, Default)]
#[sqlx(type_name = "project_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Planning,
    Active,
    OnHold,
    Completed,
    Archived,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    pub site_id: i64,
    pub category_id: Option<i64>,
    pub space_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub space_id: Option<i64>,
    pub status: Option<ProjectStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub space_id: Option<i64>,
    pub status: Option<ProjectStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFilter {
    pub category_id: Option<i64>,
    pub space_id: Option<i64>,
    pub status: Option<ProjectStatus>,
}

impl CreateProject {
    pub fn validate(&self) -> AppResult<()> {
        Validator::new()
            .required("name", &self.name, 200)
            .max_len("description", self.description.as_deref(), 4000)
            .check(
                dates_ordered(self.start_date, self.end_date),
                "endDate",
                "must not be before startDate",
            )
            .finish()
    }
}

impl UpdateProject {
    pub fn validate(&self) -> AppResult<()> {
        Validator::new()
            .optional_required("name", self.name.as_deref(), 200)
            .max_len("description", self.description.as_deref(), 4000)
            .finish()
    }
}

impl Project {
    /// Apply a partial update; omitted fields keep their value
    pub fn apply(&mut self, patch: &UpdateProject) {
        if let Some(name) = &patch.name {
            self.name = name.trim().to_string();
        }
        if patch.description.is_some() {
            self.description = patch.description.clone();
        }
        if patch.category_id.is_some() {
            self.category_id = patch.category_id;
        }
        if patch.space_id.is_some() {
            self.space_id = patch.space_id;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if patch.start_date.is_some() {
            self.start_date = patch.start_date;
        }
        if patch.end_date.is_some() {
            self.end_date = patch.end_date;
        }
    }
}

/// `true` unless both dates are set and `end` precedes `start`
pub fn dates_ordered(start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    match (start, end) {
        (Some(start), Some(end)) => end >= start,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn status_uses_snake_case() {
        assert_eq!(serde_json::to_value(ProjectStatus::OnHold).unwrap(), "on_hold");
    }

    #[test]
    fn end_before_start_is_rejected() {
        let input = CreateProject {
            name: "Website".into(),
            description: None,
            category_id: None,
            space_id: None,
            status: None,
            start_date: Some(date("2024-05-01")),
            end_date: Some(date("2024-04-01")),
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn apply_keeps_omitted_fields() {
        let now = Utc::now();
        let mut project = Project {
            id: 1,
            site_id: 1,
            category_id: Some(3),
            space_id: None,
            name: "Website".into(),
            description: Some("Relaunch".into()),
            status: ProjectStatus::Planning,
            start_date: None,
            end_date: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        };
        project.apply(&UpdateProject {
            status: Some(ProjectStatus::Active),
            ..Default::default()
        });
        assert_eq!(project.status, ProjectStatus::Active);
        assert_eq!(project.category_id, Some(3));
        assert_eq!(project.description.as_deref(), Some("Relaunch"));
    }
}
