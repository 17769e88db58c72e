use chrono::Utc;

use super::References;
use crate::{
    db::{Database, Table},
    error::{AppError, AppResult},
    models::{clean, Contact, ContactFilter, CreateContact, UpdateContact},
};

const COLUMNS: &str = "id, site_id, customer_id, first_name, last_name, email, phone, position, created_by, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct ContactRepository {
    db: Database,
}

impl ContactRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self, site_id: i64, filter: &ContactFilter) -> AppResult<Vec<Contact>> {
        let rows = sqlx::query_as::<_, Contact>(&format!(
            "SELECT {COLUMNS} FROM contacts \
             WHERE site_id = ? AND is_deleted = 0 AND (? IS NULL OR customer_id = ?) \
             ORDER BY first_name, last_name, id"
        ))
        .bind(site_id)
        .bind(filter.customer_id)
        .bind(filter.customer_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    pub async fn get(&self, site_id: i64, id: i64) -> AppResult<Contact> {
        sqlx::query_as::<_, Contact>(&format!(
            "SELECT {COLUMNS} FROM contacts WHERE id = ? AND site_id = ? AND is_deleted = 0"
        ))
        .bind(id)
        .bind(site_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| AppError::not_found("Contact"))
    }

    pub async fn create(&self, site_id: i64, user_id: i64, input: &CreateContact) -> AppResult<Contact> {
        let mut refs = References::new(&self.db, site_id);
        refs.check("customerId", Table::Customers, input.customer_id).await?;
        refs.finish()?;

        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO contacts (site_id, customer_id, first_name, last_name, email, phone, position, created_by, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(site_id)
        .bind(input.customer_id)
        .bind(input.first_name.trim())
        .bind(clean(input.last_name.as_deref()))
        .bind(clean(input.email.as_deref()))
        .bind(clean(input.phone.as_deref()))
        .bind(clean(input.position.as_deref()))
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await?
        .last_insert_rowid();
        self.get(site_id, id).await
    }

    pub async fn update(&self, site_id: i64, id: i64, patch: &UpdateContact) -> AppResult<Contact> {
        let mut contact = self.get(site_id, id).await?;
        contact.apply(patch);

        let mut refs = References::new(&self.db, site_id);
        refs.check("customerId", Table::Customers, patch.customer_id).await?;
        refs.finish()?;

        sqlx::query(
            "UPDATE contacts SET customer_id = ?, first_name = ?, last_name = ?, email = ?, phone = ?, position = ?, updated_at = ? \
             WHERE id = ? AND site_id = ? AND is_deleted = 0",
        )
        .bind(contact.customer_id)
        .bind(&contact.first_name)
        .bind(&contact.last_name)
        .bind(&contact.email)
        .bind(&contact.phone)
        .bind(&contact.position)
        .bind(Utc::now())
        .bind(id)
        .bind(site_id)
        .execute(self.db.pool())
        .await?;
        self.get(site_id, id).await
    }

    pub async fn delete(&self, site_id: i64, id: i64) -> AppResult<()> {
        if super::soft_delete(&self.db, Table::Contacts, site_id, id).await? {
            Ok(())
        } else {
            Err(AppError::not_found("Contact"))
        }
    }
}
