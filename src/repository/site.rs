use chrono::Utc;

use crate::{
    db::Database,
    error::{AppError, AppResult},
    models::Site,
};

#[derive(Debug, Clone)]
pub struct SiteRepository {
    db: Database,
}

impl SiteRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Look up a site by its code (case-insensitive)
    pub async fn find_by_code(&self, code: &str) -> AppResult<Option<Site>> {
        let site = sqlx::query_as::<_, Site>(
            "SELECT id, code, name, created_at FROM sites WHERE code = ?",
        )
        .bind(code)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(site)
    }

    pub async fn get(&self, id: i64) -> AppResult<Site> {
        sqlx::query_as::<_, Site>("SELECT id, code, name, created_at FROM sites WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| AppError::not_found("Site"))
    }

    pub async fn create(&self, code: &str, name: &str) -> AppResult<Site> {
        let id = sqlx::query("INSERT INTO sites (code, name, created_at) VALUES (?, ?, ?)")
            .bind(code)
            .bind(name)
            .bind(Utc::now())
            .execute(self.db.pool())
            .await?
            .last_insert_rowid();
        tracing::info!("🏢 Created site {} ({})", code, id);
        self.get(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::seeded;

    #[tokio::test]
    async fn code_lookup_ignores_case() {
        let (_, repos) = seeded().await;
        let site = repos.sites.find_by_code("t0001").await.unwrap().unwrap();
        assert_eq!(site.code, "T0001");
        assert!(repos.sites.find_by_code("T9999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_code_is_a_conflict() {
        let (_, repos) = seeded().await;
        let err = repos.sites.create("t0001", "Dup").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
