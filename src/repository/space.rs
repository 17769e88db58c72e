use chrono::Utc;

use crate::{
    db::{Database, Table},
    error::{AppError, AppResult},
    models::{clean, CreateSpace, Space, UpdateSpace},
};

const COLUMNS: &str = "id, site_id, name, description, color, created_by, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct SpaceRepository {
    db: Database,
}

impl SpaceRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self, site_id: i64) -> AppResult<Vec<Space>> {
        let rows = sqlx::query_as::<_, Space>(&format!(
            "SELECT {COLUMNS} FROM spaces WHERE site_id = ? AND is_deleted = 0 ORDER BY name"
        ))
        .bind(site_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    pub async fn get(&self, site_id: i64, id: i64) -> AppResult<Space> {
        sqlx::query_as::<_, Space>(&format!(
            "SELECT {COLUMNS} FROM spaces WHERE id = ? AND site_id = ? AND is_deleted = 0"
        ))
        .bind(id)
        .bind(site_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| AppError::not_found("Space"))
    }

    pub async fn create(&self, site_id: i64, user_id: i64, input: &CreateSpace) -> AppResult<Space> {
        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO spaces (site_id, name, description, color, created_by, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(site_id)
        .bind(input.name.trim())
        .bind(clean(input.description.as_deref()))
        .bind(clean(input.color.as_deref()))
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await?
        .last_insert_rowid();
        self.get(site_id, id).await
    }

    pub async fn update(&self, site_id: i64, id: i64, patch: &UpdateSpace) -> AppResult<Space> {
        let mut space = self.get(site_id, id).await?;
        if let Some(name) = &patch.name {
            space.name = name.trim().to_string();
        }
        if patch.description.is_some() {
            space.description = clean(patch.description.as_deref());
        }
        if patch.color.is_some() {
            space.color = clean(patch.color.as_deref());
        }
        sqlx::query(
            "UPDATE spaces SET name = ?, description = ?, color = ?, updated_at = ? WHERE id = ? AND site_id = ?",
        )
        .bind(&space.name)
        .bind(&space.description)
        .bind(&space.color)
        .bind(Utc::now())
        .bind(id)
        .bind(site_id)
        .execute(self.db.pool())
        .await?;
        self.get(site_id, id).await
    }

    pub async fn delete(&self, site_id: i64, id: i64) -> AppResult<()> {
        if super::soft_delete(&self.db, Table::Spaces, site_id, id).await? {
            Ok(())
        } else {
            Err(AppError::not_found("Space"))
        }
    }
}
