use chrono::Utc;

use super::References;
use crate::{
    db::{Database, Table},
    error::{AppError, AppResult},
    models::{project::dates_ordered, CreatePhase, Phase, UpdatePhase},
};

const COLUMNS: &str = "id, site_id, project_id, name, sort_order, start_date, end_date, created_by, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PhaseRepository {
    db: Database,
}

impl PhaseRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self, site_id: i64, project_id: Option<i64>) -> AppResult<Vec<Phase>> {
        let rows = sqlx::query_as::<_, Phase>(&format!(
            "SELECT {COLUMNS} FROM phases \
             WHERE site_id = ? AND is_deleted = 0 AND (? IS NULL OR project_id = ?) \
             ORDER BY project_id, sort_order, id"
        ))
        .bind(site_id)
        .bind(project_id)
        .bind(project_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    pub async fn get(&self, site_id: i64, id: i64) -> AppResult<Phase> {
        sqlx::query_as::<_, Phase>(&format!(
            "SELECT {COLUMNS} FROM phases WHERE id = ? AND site_id = ? AND is_deleted = 0"
        ))
        .bind(id)
        .bind(site_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| AppError::not_found("Phase"))
    }

    pub async fn create(&self, site_id: i64, user_id: i64, input: &CreatePhase) -> AppResult<Phase> {
        let mut refs = References::new(&self.db, site_id);
        refs.check("projectId", Table::Projects, Some(input.project_id)).await?;
        refs.finish()?;

        // New phases go to the end unless an explicit position is given.
        let sort_order = match input.sort_order {
            Some(order) => order,
            None => {
                let max: Option<i64> = sqlx::query_scalar(
                    "SELECT MAX(sort_order) FROM phases WHERE site_id = ? AND project_id = ? AND is_deleted = 0",
                )
                .bind(site_id)
                .bind(input.project_id)
                .fetch_one(self.db.pool())
                .await?;
                max.map_or(0, |m| m + 1)
            }
        };

        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO phases (site_id, project_id, name, sort_order, start_date, end_date, created_by, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(site_id)
        .bind(input.project_id)
        .bind(input.name.trim())
        .bind(sort_order)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await?
        .last_insert_rowid();
        self.get(site_id, id).await
    }

    pub async fn update(&self, site_id: i64, id: i64, patch: &UpdatePhase) -> AppResult<Phase> {
        let mut phase = self.get(site_id, id).await?;
        phase.apply(patch);
        if !dates_ordered(phase.start_date, phase.end_date) {
            return Err(AppError::invalid("endDate", "must not be before startDate"));
        }

        sqlx::query(
            "UPDATE phases SET name = ?, sort_order = ?, start_date = ?, end_date = ?, updated_at = ? \
             WHERE id = ? AND site_id = ? AND is_deleted = 0",
        )
        .bind(&phase.name)
        .bind(phase.sort_order)
        .bind(phase.start_date)
        .bind(phase.end_date)
        .bind(Utc::now())
        .bind(id)
        .bind(site_id)
        .execute(self.db.pool())
        .await?;
        self.get(site_id, id).await
    }

    pub async fn delete(&self, site_id: i64, id: i64) -> AppResult<()> {
        if super::soft_delete(&self.db, Table::Phases, site_id, id).await? {
            Ok(())
        } else {
            Err(AppError::not_found("Phase"))
        }
    }
}
