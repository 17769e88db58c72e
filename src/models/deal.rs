use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

use super::Validator;
use crate::error::AppResult;

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, Default)]
#[sqlx(type_name = "deal_stage", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DealStage {
    #[default]
    Lead,
    Qualified,
    Proposal,
    Negotiation,
    Won,
    Lost,
}

impl DealStage {
    /// Win probability implied by a stage when none is given
    pub fn default_probability(self) -> i64 {
        match self {
            Self::Lead => 10,
            Self::Qualified => 25,
            Self::Proposal => 50,
            Self::Negotiation => 75,
            Self::Won => 100,
            Self::Lost => 0,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: i64,
    pub site_id: i64,
    pub customer_id: Option<i64>,
    pub contact_id: Option<i64>,
    pub title: String,
    pub value: f64,
    pub stage: DealStage,
    pub probability: i64,
    pub expected_close_date: Option<NaiveDate>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeal {
    pub title: String,
    pub customer_id: Option<i64>,
    pub contact_id: Option<i64>,
    pub value: Option<f64>,
    pub stage: Option<DealStage>,
    pub probability: Option<i64>,
    pub expected_close_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDeal {
    pub title: Option<String>,
    pub customer_id: Option<i64>,
    pub contact_id: Option<i64>,
    pub value: Option<f64>,
    pub stage: Option<DealStage>,
    pub probability: Option<i64>,
    pub expected_close_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealFilter {
    pub customer_id: Option<i64>,
    pub stage: Option<DealStage>,
}

fn valid_amount(value: Option<f64>) -> bool {
    value.map_or(true, |v| v.is_finite() && v >= 0.0)
}

impl CreateDeal {
    pub fn validate(&self) -> AppResult<()> {
        Validator::new()
            .required("title", &self.title, 200)
            .check(valid_amount(self.value), "value", "must be a non-negative number")
            .range("probability", self.probability, 0, 100)
            .finish()
    }
}

impl UpdateDeal {
    pub fn validate(&self) -> AppResult<()> {
        Validator::new()
            .optional_required("title", self.title.as_deref(), 200)
            .check(valid_amount(self.value), "value", "must be a non-negative number")
            .range("probability", self.probability, 0, 100)
            .finish()
    }
}

impl Deal {
    pub fn apply(&mut self, patch: &UpdateDeal) {
        if let Some(title) = &patch.title {
            self.title = title.trim().to_string();
        }
        if patch.customer_id.is_some() {
            self.customer_id = patch.customer_id;
        }
        if patch.contact_id.is_some() {
            self.contact_id = patch.contact_id;
        }
        if let Some(value) = patch.value {
            self.value = value;
        }
        if let Some(stage) = patch.stage {
            self.stage = stage;
            if patch.probability.is_none() {
                self.probability = stage.default_probability();
            }
        }
        if let Some(probability) = patch.probability {
            self.probability = probability;
        }
        if patch.expected_close_date.is_some() {
            self.expected_close_date = patch.expected_close_date;
        }
    }
}
