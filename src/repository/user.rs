use chrono::Utc;

use crate::{
    db::Database,
    error::{AppError, AppResult},
    models::{User, UserRole},
};

const COLUMNS: &str = "id, site_id, username, email, display_name, password_hash, role, is_active, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct UserRepository {
    db: Database,
}

impl UserRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self, site_id: i64) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {COLUMNS} FROM users WHERE site_id = ? AND is_deleted = 0 ORDER BY username"
        ))
        .bind(site_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(users)
    }

    pub async fn get(&self, site_id: i64, id: i64) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {COLUMNS} FROM users WHERE id = ? AND site_id = ? AND is_deleted = 0"
        ))
        .bind(id)
        .bind(site_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| AppError::not_found("User"))
    }

    /// Find a user by username or email within one site
    pub async fn find_by_login(&self, site_id: i64, identifier: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {COLUMNS} FROM users \
             WHERE site_id = ? AND is_deleted = 0 AND (username = ? OR email = ?) \
             ORDER BY id LIMIT 1"
        ))
        .bind(site_id)
        .bind(identifier)
        .bind(identifier)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(user)
    }

    /// Active user of `site_id` without an external identity mapping
    ///
    /// Prefers the user whose email matches `email`, then the oldest account.
    pub async fn find_unmapped(&self, site_id: i64, email: Option<&str>) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {COLUMNS} FROM users u \
             WHERE u.site_id = ? AND u.is_deleted = 0 AND u.is_active = 1 \
               AND NOT EXISTS (SELECT 1 FROM external_identities e WHERE e.site_id = u.site_id AND e.user_id = u.id) \
             ORDER BY CASE WHEN u.email = ? THEN 0 ELSE 1 END, u.id \
             LIMIT 1"
        ))
        .bind(site_id)
        .bind(email.unwrap_or_default())
        .fetch_optional(self.db.pool())
        .await?;
        Ok(user)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        site_id: i64,
        username: &str,
        email: &str,
        display_name: Option<&str>,
        password_hash: &str,
        role: UserRole,
        created_by: Option<i64>,
    ) -> AppResult<User> {
        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO users (site_id, username, email, display_name, password_hash, role, is_active, created_by, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?, ?)",
        )
        .bind(site_id)
        .bind(username)
        .bind(email)
        .bind(display_name)
        .bind(password_hash)
        .bind(role)
        .bind(created_by)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => {
                AppError::Conflict("username or email is already registered on this site".into())
            }
            other => other,
        })?
        .last_insert_rowid();
        tracing::info!("👤 Created user {} in site {}", username, site_id);
        self.get(site_id, id).await
    }
}
