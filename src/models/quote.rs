use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

use super::Validator;
use crate::error::AppResult;

#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, Default)]
#[sqlx(type_name = "quote_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    #[default]
    Draft,
    Sent,
    Accepted,
    Rejected,
    Expired,
}

/// Quote header row; `items` and `total` are filled in by the repository
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: i64,
    pub site_id: i64,
    pub deal_id: Option<i64>,
    pub customer_id: Option<i64>,
    pub quote_number: String,
    pub status: QuoteStatus,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub items: Vec<QuoteItem>,
    #[sqlx(skip)]
    pub total: f64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteItem {
    pub id: i64,
    pub quote_id: i64,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub sort_order: i64,
}

impl QuoteItem {
    pub fn line_total(&self) -> f64 {
        self.quantity * self.unit_price
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteItemInput {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuote {
    /// Generated as `Q-<year>-<seq>` when omitted
    pub quote_number: Option<String>,
    pub deal_id: Option<i64>,
    pub customer_id: Option<i64>,
    pub status: Option<QuoteStatus>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<QuoteItemInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuote {
    pub quote_number: Option<String>,
    pub deal_id: Option<i64>,
    pub customer_id: Option<i64>,
    pub status: Option<QuoteStatus>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteFilter {
    pub deal_id: Option<i64>,
    pub customer_id: Option<i64>,
    pub status: Option<QuoteStatus>,
}

pub fn validate_items(validator: &mut Validator, items: &[QuoteItemInput]) {
    for (i, item) in items.iter().enumerate() {
        validator
            .required(&format!("items[{i}].description"), &item.description, 500)
            .check(
                item.quantity.is_finite() && item.quantity > 0.0,
                &format!("items[{i}].quantity"),
                "must be greater than 0",
            )
            .check(
                item.unit_price.is_finite() && item.unit_price >= 0.0,
                &format!("items[{i}].unitPrice"),
                "must be a non-negative number",
            );
    }
}

impl CreateQuote {
    pub fn validate(&self) -> AppResult<()> {
        let mut validator = Validator::new();
        validator
            .optional_required("quoteNumber", self.quote_number.as_deref(), 50)
            .max_len("notes", self.notes.as_deref(), 4000);
        validate_items(&mut validator, &self.items);
        validator.finish()
    }
}

impl UpdateQuote {
    pub fn validate(&self) -> AppResult<()> {
        Validator::new()
            .optional_required("quoteNumber", self.quote_number.as_deref(), 50)
            .max_len("notes", self.notes.as_deref(), 4000)
            .finish()
    }
}

impl Quote {
    pub fn apply(&mut self, patch: &UpdateQuote) {
        if let Some(number) = &patch.quote_number {
            self.quote_number = number.trim().to_string();
        }
        if patch.deal_id.is_some() {
            self.deal_id = patch.deal_id;
        }
        if patch.customer_id.is_some() {
            self.customer_id = patch.customer_id;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if patch.valid_until.is_some() {
            self.valid_until = patch.valid_until;
        }
        if patch.notes.is_some() {
            self.notes = patch.notes.clone();
        }
    }

    /// Attach line items and recompute the total
    pub fn with_items(mut self, items: Vec<QuoteItem>) -> Self {
        self.total = items.iter().map(QuoteItem::line_total).sum();
        self.items = items;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: f64, unit_price: f64) -> QuoteItem {
        QuoteItem {
            id: 0,
            quote_id: 1,
            description: "Consulting".into(),
            quantity,
            unit_price,
            sort_order: 0,
        }
    }

    #[test]
    fn total_sums_line_items() {
        let now = Utc::now();
        let quote = Quote {
            id: 1,
            site_id: 1,
            deal_id: None,
            customer_id: None,
            quote_number: "Q-2024-0001".into(),
            status: QuoteStatus::Draft,
            valid_until: None,
            notes: None,
            created_by: None,
            created_at: now,
            updated_at: now,
            items: Vec::new(),
            total: 0.0,
        }
        .with_items(vec![item(2.0, 150.0), item(1.5, 100.0)]);
        assert_eq!(quote.total, 450.0);
        assert_eq!(quote.items.len(), 2);
    }

    #[test]
    fn item_errors_name_their_index() {
        let input = CreateQuote {
            quote_number: None,
            deal_id: None,
            customer_id: None,
            status: None,
            valid_until: None,
            notes: None,
            items: vec![
                QuoteItemInput {
                    description: "Setup".into(),
                    quantity: 1.0,
                    unit_price: 10.0,
                },
                QuoteItemInput {
                    description: "Licence".into(),
                    quantity: 0.0,
                    unit_price: 10.0,
                },
            ],
        };
        match input.validate().unwrap_err() {
            crate::error::AppError::Validation(fields) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].field, "items[1].quantity");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
