use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};

use super::References;
use crate::{
    db::{Database, Table},
    error::{AppError, AppResult},
    models::{CreateDeal, Deal, DealFilter, UpdateDeal},
};

const COLUMNS: &str = "id, site_id, customer_id, contact_id, title, value, stage, probability, expected_close_date, created_by, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct DealRepository {
    db: Database,
}

impl DealRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self, site_id: i64, filter: &DealFilter) -> AppResult<Vec<Deal>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {COLUMNS} FROM deals WHERE is_deleted = 0 AND site_id = "
        ));
        query.push_bind(site_id);
        if let Some(customer_id) = filter.customer_id {
            query.push(" AND customer_id = ").push_bind(customer_id);
        }
        if let Some(stage) = filter.stage {
            query.push(" AND stage = ").push_bind(stage);
        }
        query.push(" ORDER BY expected_close_date IS NULL, expected_close_date, id");

        let rows = query.build_query_as::<Deal>().fetch_all(self.db.pool()).await?;
        Ok(rows)
    }

    pub async fn get(&self, site_id: i64, id: i64) -> AppResult<Deal> {
        sqlx::query_as::<_, Deal>(&format!(
            "SELECT {COLUMNS} FROM deals WHERE id = ? AND site_id = ? AND is_deleted = 0"
        ))
        .bind(id)
        .bind(site_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| AppError::not_found("Deal"))
    }

    pub async fn create(&self, site_id: i64, user_id: i64, input: &CreateDeal) -> AppResult<Deal> {
        let links = (input.customer_id, input.contact_id);
        self.check_references(site_id, links, links).await?;

        let stage = input.stage.unwrap_or_default();
        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO deals (site_id, customer_id, contact_id, title, value, stage, probability, expected_close_date, created_by, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(site_id)
        .bind(input.customer_id)
        .bind(input.contact_id)
        .bind(input.title.trim())
        .bind(input.value.unwrap_or(0.0))
        .bind(stage)
        .bind(input.probability.unwrap_or_else(|| stage.default_probability()))
        .bind(input.expected_close_date)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await?
        .last_insert_rowid();
        tracing::info!("💼 Created deal {} in site {}", id, site_id);
        self.get(site_id, id).await
    }

    pub async fn update(&self, site_id: i64, id: i64, patch: &UpdateDeal) -> AppResult<Deal> {
        let mut deal = self.get(site_id, id).await?;
        deal.apply(patch);
        self.check_references(
            site_id,
            (patch.customer_id, patch.contact_id),
            (deal.customer_id, deal.contact_id),
        )
        .await?;

        sqlx::query(
            "UPDATE deals SET customer_id = ?, contact_id = ?, title = ?, value = ?, stage = ?, probability = ?, \
             expected_close_date = ?, updated_at = ? WHERE id = ? AND site_id = ? AND is_deleted = 0",
        )
        .bind(deal.customer_id)
        .bind(deal.contact_id)
        .bind(&deal.title)
        .bind(deal.value)
        .bind(deal.stage)
        .bind(deal.probability)
        .bind(deal.expected_close_date)
        .bind(Utc::now())
        .bind(id)
        .bind(site_id)
        .execute(self.db.pool())
        .await?;
        self.get(site_id, id).await
    }

    pub async fn delete(&self, site_id: i64, id: i64) -> AppResult<()> {
        if super::soft_delete(&self.db, Table::Deals, site_id, id).await? {
            Ok(())
        } else {
            Err(AppError::not_found("Deal"))
        }
    }

    /// Same-tenant existence for the `changed` (customer, contact) pair; the
    /// `merged` contact must work for the merged customer
    async fn check_references(
        &self,
        site_id: i64,
        changed: (Option<i64>, Option<i64>),
        merged: (Option<i64>, Option<i64>),
    ) -> AppResult<()> {
        let mut refs = References::new(&self.db, site_id);
        refs.check("customerId", Table::Customers, changed.0).await?;
        refs.check("contactId", Table::Contacts, changed.1).await?;
        if !refs.is_clean() {
            return refs.finish();
        }

        if let (Some(customer_id), Some(contact_id)) = merged {
            let contact_customer: Option<i64> = sqlx::query_scalar(
                "SELECT customer_id FROM contacts WHERE id = ? AND site_id = ?",
            )
            .bind(contact_id)
            .bind(site_id)
            .fetch_optional(self.db.pool())
            .await?
            .flatten();
            if contact_customer.is_some_and(|c| c != customer_id) {
                refs.fail("contactId", "must belong to the deal's customer");
            }
        }
        refs.finish()
    }
}
