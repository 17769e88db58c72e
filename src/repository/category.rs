use chrono::Utc;

use crate::{
    db::{Database, Table},
    error::{AppError, AppResult},
    models::{clean, Category, CreateCategory, UpdateCategory},
};

const COLUMNS: &str = "id, site_id, name, color, created_by, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    db: Database,
}

impl CategoryRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self, site_id: i64) -> AppResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>(&format!(
            "SELECT {COLUMNS} FROM categories WHERE site_id = ? AND is_deleted = 0 ORDER BY name"
        ))
        .bind(site_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    pub async fn get(&self, site_id: i64, id: i64) -> AppResult<Category> {
        sqlx::query_as::<_, Category>(&format!(
            "SELECT {COLUMNS} FROM categories WHERE id = ? AND site_id = ? AND is_deleted = 0"
        ))
        .bind(id)
        .bind(site_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| AppError::not_found("Category"))
    }

    pub async fn create(&self, site_id: i64, user_id: i64, input: &CreateCategory) -> AppResult<Category> {
        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO categories (site_id, name, color, created_by, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(site_id)
        .bind(input.name.trim())
        .bind(clean(input.color.as_deref()))
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await?
        .last_insert_rowid();
        self.get(site_id, id).await
    }

    pub async fn update(&self, site_id: i64, id: i64, patch: &UpdateCategory) -> AppResult<Category> {
        let mut category = self.get(site_id, id).await?;
        if let Some(name) = &patch.name {
            category.name = name.trim().to_string();
        }
        if patch.color.is_some() {
            category.color = clean(patch.color.as_deref());
        }
        sqlx::query("UPDATE categories SET name = ?, color = ?, updated_at = ? WHERE id = ? AND site_id = ?")
            .bind(&category.name)
            .bind(&category.color)
            .bind(Utc::now())
            .bind(id)
            .bind(site_id)
            .execute(self.db.pool())
            .await?;
        self.get(site_id, id).await
    }

    pub async fn delete(&self, site_id: i64, id: i64) -> AppResult<()> {
        if super::soft_delete(&self.db, Table::Categories, site_id, id).await? {
            Ok(())
        } else {
            Err(AppError::not_found("Category"))
        }
    }
}
