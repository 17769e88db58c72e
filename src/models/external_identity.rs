use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Validator;
use crate::error::AppResult;

/// Link between an external identity provider subject and a local user
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalIdentity {
    pub id: i64,
    /// Subject (`sub`) issued by the external provider
    pub provider_user_id: String,
    pub site_id: i64,
    pub user_id: i64,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Admin request to map a provider subject onto a user of the admin's site
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExternalIdentity {
    pub provider_user_id: String,
    pub user_id: i64,
}

impl CreateExternalIdentity {
    pub fn validate(&self) -> AppResult<()> {
        Validator::new()
            .required("providerUserId", &self.provider_user_id, 255)
            .finish()
    }
}

/// One tenant/user pair an external subject resolves to
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappedSite {
    pub site_id: i64,
    pub site_code: String,
    pub site_name: String,
    pub user_id: i64,
    pub username: String,
    pub display_name: Option<String>,
}
