use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};

use super::References;
use crate::{
    db::{Database, Table},
    error::{AppError, AppResult},
    models::{clean, CreateEvent, Event, EventFilter, UpdateEvent},
};

const COLUMNS: &str = "id, site_id, task_id, title, description, location, start_at, end_at, all_day, created_by, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct EventRepository {
    db: Database,
}

impl EventRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Events overlapping the requested window, earliest first
    pub async fn list(&self, site_id: i64, filter: &EventFilter) -> AppResult<Vec<Event>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {COLUMNS} FROM events WHERE is_deleted = 0 AND site_id = "
        ));
        query.push_bind(site_id);
        if let Some(from) = filter.from {
            query.push(" AND end_at >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            query.push(" AND start_at <= ").push_bind(to);
        }
        if let Some(task_id) = filter.task_id {
            query.push(" AND task_id = ").push_bind(task_id);
        }
        query.push(" ORDER BY start_at, id");

        let rows = query.build_query_as::<Event>().fetch_all(self.db.pool()).await?;
        Ok(rows)
    }

    pub async fn get(&self, site_id: i64, id: i64) -> AppResult<Event> {
        sqlx::query_as::<_, Event>(&format!(
            "SELECT {COLUMNS} FROM events WHERE id = ? AND site_id = ? AND is_deleted = 0"
        ))
        .bind(id)
        .bind(site_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| AppError::not_found("Event"))
    }

    pub async fn create(&self, site_id: i64, user_id: i64, input: &CreateEvent) -> AppResult<Event> {
        let mut refs = References::new(&self.db, site_id);
        refs.check("taskId", Table::Tasks, input.task_id).await?;
        refs.finish()?;

        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO events (site_id, task_id, title, description, location, start_at, end_at, all_day, created_by, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(site_id)
        .bind(input.task_id)
        .bind(input.title.trim())
        .bind(clean(input.description.as_deref()))
        .bind(clean(input.location.as_deref()))
        .bind(input.start_at)
        .bind(input.end_at)
        .bind(input.all_day)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await?
        .last_insert_rowid();
        self.get(site_id, id).await
    }

    pub async fn update(&self, site_id: i64, id: i64, patch: &UpdateEvent) -> AppResult<Event> {
        let mut event = self.get(site_id, id).await?;
        event.apply(patch);

        let mut refs = References::new(&self.db, site_id);
        refs.check("taskId", Table::Tasks, patch.task_id).await?;
        if event.end_at < event.start_at {
            refs.fail("endAt", "must not be before startAt");
        }
        refs.finish()?;

        sqlx::query(
            "UPDATE events SET task_id = ?, title = ?, description = ?, location = ?, start_at = ?, end_at = ?, all_day = ?, updated_at = ? \
             WHERE id = ? AND site_id = ? AND is_deleted = 0",
        )
        .bind(event.task_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.start_at)
        .bind(event.end_at)
        .bind(event.all_day)
        .bind(Utc::now())
        .bind(id)
        .bind(site_id)
        .execute(self.db.pool())
        .await?;
        self.get(site_id, id).await
    }

    pub async fn delete(&self, site_id: i64, id: i64) -> AppResult<()> {
        if super::soft_delete(&self.db, Table::Events, site_id, id).await? {
            Ok(())
        } else {
            Err(AppError::not_found("Event"))
        }
    }
}
