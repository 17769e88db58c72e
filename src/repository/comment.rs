use chrono::Utc;

use super::References;
use crate::{
    db::{Database, Table},
    error::{AppError, AppResult},
    models::{Comment, CreateComment, UpdateComment},
};

const COLUMNS: &str = "id, site_id, task_id, body, created_by, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct CommentRepository {
    db: Database,
}

impl CommentRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self, site_id: i64, task_id: Option<i64>) -> AppResult<Vec<Comment>> {
        let rows = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COLUMNS} FROM comments \
             WHERE site_id = ? AND is_deleted = 0 AND (? IS NULL OR task_id = ?) \
             ORDER BY created_at, id"
        ))
        .bind(site_id)
        .bind(task_id)
        .bind(task_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    pub async fn get(&self, site_id: i64, id: i64) -> AppResult<Comment> {
        sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COLUMNS} FROM comments WHERE id = ? AND site_id = ? AND is_deleted = 0"
        ))
        .bind(id)
        .bind(site_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| AppError::not_found("Comment"))
    }

    pub async fn create(&self, site_id: i64, user_id: i64, input: &CreateComment) -> AppResult<Comment> {
        let mut refs = References::new(&self.db, site_id);
        refs.check("taskId", Table::Tasks, Some(input.task_id)).await?;
        refs.finish()?;

        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO comments (site_id, task_id, body, created_by, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(site_id)
        .bind(input.task_id)
        .bind(input.body.trim())
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await?
        .last_insert_rowid();
        self.get(site_id, id).await
    }

    /// Only the author may edit a comment
    pub async fn update(
        &self,
        site_id: i64,
        user_id: i64,
        id: i64,
        input: &UpdateComment,
    ) -> AppResult<Comment> {
        let comment = self.get(site_id, id).await?;
        if comment.created_by != Some(user_id) {
            return Err(AppError::Forbidden("only the author can edit a comment".into()));
        }
        sqlx::query("UPDATE comments SET body = ?, updated_at = ? WHERE id = ? AND site_id = ?")
            .bind(input.body.trim())
            .bind(Utc::now())
            .bind(id)
            .bind(site_id)
            .execute(self.db.pool())
            .await?;
        self.get(site_id, id).await
    }

    pub async fn delete(&self, site_id: i64, id: i64) -> AppResult<()> {
        if super::soft_delete(&self.db, Table::Comments, site_id, id).await? {
            Ok(())
        } else {
            Err(AppError::not_found("Comment"))
        }
    }
}
