use chrono::Utc;

use crate::{
    db::{Database, Table},
    error::{AppError, AppResult},
    models::{clean, CreateCustomer, Customer, UpdateCustomer},
};

const COLUMNS: &str = "id, site_id, name, email, phone, company, address, notes, created_by, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    db: Database,
}

impl CustomerRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self, site_id: i64) -> AppResult<Vec<Customer>> {
        let rows = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {COLUMNS} FROM customers WHERE site_id = ? AND is_deleted = 0 ORDER BY name, id"
        ))
        .bind(site_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    pub async fn get(&self, site_id: i64, id: i64) -> AppResult<Customer> {
        sqlx::query_as::<_, Customer>(&format!(
            "SELECT {COLUMNS} FROM customers WHERE id = ? AND site_id = ? AND is_deleted = 0"
        ))
        .bind(id)
        .bind(site_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| AppError::not_found("Customer"))
    }

    pub async fn create(&self, site_id: i64, user_id: i64, input: &CreateCustomer) -> AppResult<Customer> {
        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO customers (site_id, name, email, phone, company, address, notes, created_by, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(site_id)
        .bind(input.name.trim())
        .bind(clean(input.email.as_deref()))
        .bind(clean(input.phone.as_deref()))
        .bind(clean(input.company.as_deref()))
        .bind(clean(input.address.as_deref()))
        .bind(clean(input.notes.as_deref()))
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await?
        .last_insert_rowid();
        tracing::info!("🤝 Created customer {} in site {}", id, site_id);
        self.get(site_id, id).await
    }

    pub async fn update(&self, site_id: i64, id: i64, patch: &UpdateCustomer) -> AppResult<Customer> {
        let mut customer = self.get(site_id, id).await?;
        customer.apply(patch);
        sqlx::query(
            "UPDATE customers SET name = ?, email = ?, phone = ?, company = ?, address = ?, notes = ?, updated_at = ? \
             WHERE id = ? AND site_id = ? AND is_deleted = 0",
        )
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.company)
        .bind(&customer.address)
        .bind(&customer.notes)
        .bind(Utc::now())
        .bind(id)
        .bind(site_id)
        .execute(self.db.pool())
        .await?;
        self.get(site_id, id).await
    }

    pub async fn delete(&self, site_id: i64, id: i64) -> AppResult<()> {
        if super::soft_delete(&self.db, Table::Customers, site_id, id).await? {
            Ok(())
        } else {
            Err(AppError::not_found("Customer"))
        }
    }
}
