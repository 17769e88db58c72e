/// SQLite database access for all tenants
///
/// A single pool serves every site; isolation comes from the `site_id`
/// column that every repository filters on.

pub mod schema;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::config::DatabaseConfig;

/// Shared connection pool plus schema management
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

/// Tenant-owned tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Users,
    Categories,
    Spaces,
    Projects,
    Phases,
    Tasks,
    Events,
    Comments,
    Customers,
    Contacts,
    Deals,
    Quotes,
}

impl Table {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Categories => "categories",
            Self::Spaces => "spaces",
            Self::Projects => "projects",
            Self::Phases => "phases",
            Self::Tasks => "tasks",
            Self::Events => "events",
            Self::Comments => "comments",
            Self::Customers => "customers",
            Self::Contacts => "contacts",
            Self::Deals => "deals",
            Self::Quotes => "quotes",
        }
    }
}

impl Database {
    /// Open (creating if needed) the database and initialise its schema
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let in_memory = config.url.contains(":memory:");

        let mut options = SqliteConnectOptions::from_str(&config.url)
            .with_context(|| format!("Invalid database URL '{}'", config.url))?
            .create_if_missing(true)
            .foreign_keys(true);

        let mut pool_options = SqlitePoolOptions::new();
        if in_memory {
            // Every connection to :memory: is a separate database, so keep exactly one alive.
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else {
            options = options.journal_mode(SqliteJournalMode::Wal);
            if let Some(dir) = options.get_filename().parent() {
                if !dir.as_os_str().is_empty() {
                    std::fs::create_dir_all(dir).with_context(|| {
                        format!("Failed to create database directory '{}'", dir.display())
                    })?;
                }
            }
            pool_options = pool_options.max_connections(config.max_connections.max(1));
        }

        tracing::info!("🗄️ Opening database: {}", config.url);
        let pool = pool_options
            .connect_with(options)
            .await
            .context("Failed to open database pool")?;

        let db = Self { pool };
        db.init_schema().await?;
        tracing::info!("✅ Database ready");
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create all tables and indexes; safe to call repeatedly
    pub async fn init_schema(&self) -> Result<()> {
        for statement in schema::STATEMENTS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Schema statement failed: {}", first_line(statement)))?;
        }
        Ok(())
    }

    /// Liveness check used by the health endpoint
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map(|_| ())
    }

    /// Whether a live (not soft-deleted) row with `id` exists in `site_id`
    pub async fn exists_in_site(
        &self,
        table: Table,
        site_id: i64,
        id: i64,
    ) -> Result<bool, sqlx::Error> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ? AND site_id = ? AND is_deleted = 0)",
            table.name()
        );
        let found: i64 = sqlx::query_scalar(&sql)
            .bind(id)
            .bind(site_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(found != 0)
    }
}

fn first_line(statement: &str) -> &str {
    statement
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_init_is_idempotent() {
        let db = Database::connect(&DatabaseConfig {
            url: "sqlite::memory:".into(),
            max_connections: 1,
        })
        .await
        .unwrap();
        db.init_schema().await.unwrap();
        db.ping().await.unwrap();
    }

    #[tokio::test]
    async fn exists_in_site_respects_tenant_and_soft_delete() {
        let db = Database::connect(&DatabaseConfig {
            url: "sqlite::memory:".into(),
            max_connections: 1,
        })
        .await
        .unwrap();
        let now = chrono::Utc::now();
        for (code, name) in [("T0001", "One"), ("T0002", "Two")] {
            sqlx::query("INSERT INTO sites (code, name, created_at) VALUES (?, ?, ?)")
                .bind(code)
                .bind(name)
                .bind(now)
                .execute(db.pool())
                .await
                .unwrap();
        }
        sqlx::query(
            "INSERT INTO spaces (site_id, name, created_at, updated_at) VALUES (1, 'Ops', ?, ?)",
        )
        .bind(now)
        .bind(now)
        .execute(db.pool())
        .await
        .unwrap();

        assert!(db.exists_in_site(Table::Spaces, 1, 1).await.unwrap());
        assert!(!db.exists_in_site(Table::Spaces, 2, 1).await.unwrap());

        sqlx::query("UPDATE spaces SET is_deleted = 1 WHERE id = 1")
            .execute(db.pool())
            .await
            .unwrap();
        assert!(!db.exists_in_site(Table::Spaces, 1, 1).await.unwrap());
    }
}
