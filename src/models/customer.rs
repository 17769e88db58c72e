use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Validator;
use crate::error::AppResult;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: i64,
    pub site_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomer {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomer {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl CreateCustomer {
    pub fn validate(&self) -> AppResult<()> {
        Validator::new()
            .required("name", &self.name, 200)
            .email("email", self.email.as_deref())
            .max_len("phone", self.phone.as_deref(), 50)
            .max_len("company", self.company.as_deref(), 200)
            .finish()
    }
}

impl UpdateCustomer {
    pub fn validate(&self) -> AppResult<()> {
        Validator::new()
            .optional_required("name", self.name.as_deref(), 200)
            .email("email", self.email.as_deref())
            .max_len("phone", self.phone.as_deref(), 50)
            .max_len("company", self.company.as_deref(), 200)
            .finish()
    }
}

impl Customer {
    pub fn apply(&mut self, patch: &UpdateCustomer) {
        if let Some(name) = &patch.name {
            self.name = name.trim().to_string();
        }
        for (target, value) in [
            (&mut self.email, &patch.email),
            (&mut self.phone, &patch.phone),
            (&mut self.company, &patch.company),
            (&mut self.address, &patch.address),
            (&mut self.notes, &patch.notes),
        ] {
            if value.is_some() {
                target.clone_from(value);
            }
        }
    }
}
