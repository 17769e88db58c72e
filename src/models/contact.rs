use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Validator;
use crate::error::AppResult;

/// A person, optionally working for a customer
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: i64,
    pub site_id: i64,
    pub customer_id: Option<i64>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContact {
    pub customer_id: Option<i64>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContact {
    pub customer_id: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactFilter {
    pub customer_id: Option<i64>,
}

impl CreateContact {
    pub fn validate(&self) -> AppResult<()> {
        Validator::new()
            .required("firstName", &self.first_name, 100)
            .max_len("lastName", self.last_name.as_deref(), 100)
            .email("email", self.email.as_deref())
            .max_len("phone", self.phone.as_deref(), 50)
            .finish()
    }
}

impl UpdateContact {
    pub fn validate(&self) -> AppResult<()> {
        Validator::new()
            .optional_required("firstName", self.first_name.as_deref(), 100)
            .max_len("lastName", self.last_name.as_deref(), 100)
            .email("email", self.email.as_deref())
            .max_len("phone", self.phone.as_deref(), 50)
            .finish()
    }
}

impl Contact {
    pub fn apply(&mut self, patch: &UpdateContact) {
        if patch.customer_id.is_some() {
            self.customer_id = patch.customer_id;
        }
        if let Some(first_name) = &patch.first_name {
            self.first_name = first_name.trim().to_string();
        }
        for (target, value) in [
            (&mut self.last_name, &patch.last_name),
            (&mut self.email, &patch.email),
            (&mut self.phone, &patch.phone),
            (&mut self.position, &patch.position),
        ] {
            if value.is_some() {
                target.clone_from(value);
            }
        }
    }
}
