use chrono::Utc;

use super::References;
use crate::{
    db::{Database, Table},
    error::{AppError, AppResult},
    models::{CreateExternalIdentity, ExternalIdentity, MappedSite},
};

const COLUMNS: &str = "id, provider_user_id, site_id, user_id, created_by, created_at";

#[derive(Debug, Clone)]
pub struct ExternalIdentityRepository {
    db: Database,
}

impl ExternalIdentityRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self, site_id: i64) -> AppResult<Vec<ExternalIdentity>> {
        let rows = sqlx::query_as::<_, ExternalIdentity>(&format!(
            "SELECT {COLUMNS} FROM external_identities WHERE site_id = ? ORDER BY id"
        ))
        .bind(site_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    pub async fn get(&self, site_id: i64, id: i64) -> AppResult<ExternalIdentity> {
        sqlx::query_as::<_, ExternalIdentity>(&format!(
            "SELECT {COLUMNS} FROM external_identities WHERE id = ? AND site_id = ?"
        ))
        .bind(id)
        .bind(site_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| AppError::not_found("External identity"))
    }

    /// Explicit mapping created by a site admin
    pub async fn create(
        &self,
        site_id: i64,
        admin_id: i64,
        input: &CreateExternalIdentity,
    ) -> AppResult<ExternalIdentity> {
        let mut refs = References::new(&self.db, site_id);
        refs.check("userId", Table::Users, Some(input.user_id)).await?;
        refs.finish()?;

        let id = sqlx::query(
            "INSERT INTO external_identities (provider_user_id, site_id, user_id, created_by, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(input.provider_user_id.trim())
        .bind(site_id)
        .bind(input.user_id)
        .bind(admin_id)
        .bind(Utc::now())
        .execute(self.db.pool())
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict(
                "this subject or user is already mapped on this site".into(),
            ),
            other => other,
        })?
        .last_insert_rowid();
        tracing::info!(
            "🔗 Mapped external subject to user {} in site {}",
            input.user_id,
            site_id
        );
        self.get(site_id, id).await
    }

    pub async fn delete(&self, site_id: i64, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM external_identities WHERE id = ? AND site_id = ?")
            .bind(id)
            .bind(site_id)
            .execute(self.db.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("External identity"));
        }
        Ok(())
    }

    /// Every site (and local user) the subject is mapped to, by site code
    pub async fn sites_for_subject(&self, provider_user_id: &str) -> AppResult<Vec<MappedSite>> {
        let rows = sqlx::query_as::<_, MappedSite>(
            "SELECT s.id AS site_id, s.code AS site_code, s.name AS site_name, \
                    u.id AS user_id, u.username, u.display_name \
             FROM external_identities e \
             JOIN sites s ON s.id = e.site_id \
             JOIN users u ON u.id = e.user_id AND u.site_id = e.site_id \
             WHERE e.provider_user_id = ? AND u.is_deleted = 0 AND u.is_active = 1 \
             ORDER BY s.code",
        )
        .bind(provider_user_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    /// Local user the subject is mapped to in one site
    pub async fn user_for_subject(&self, provider_user_id: &str, site_id: i64) -> AppResult<Option<i64>> {
        let user_id = sqlx::query_scalar(
            "SELECT user_id FROM external_identities WHERE provider_user_id = ? AND site_id = ?",
        )
        .bind(provider_user_id)
        .bind(site_id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(user_id)
    }

    /// Insert an automatic mapping; `false` when a concurrent insert already won
    pub async fn link(&self, provider_user_id: &str, site_id: i64, user_id: i64) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO external_identities (provider_user_id, site_id, user_id, created_by, created_at) \
             VALUES (?, ?, ?, NULL, ?) ON CONFLICT DO NOTHING",
        )
        .bind(provider_user_id)
        .bind(site_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
