use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};

use super::References;
use crate::{
    db::{Database, Table},
    error::{AppError, AppResult},
    models::{clean, project::dates_ordered, CreateTask, Task, TaskFilter, TaskStatus, UpdateTask},
};

const COLUMNS: &str = "id, site_id, project_id, phase_id, parent_task_id, assignee_id, title, description, status, priority, progress, start_date, due_date, created_by, created_at, updated_at";

/// Guard against runaway parent chains in corrupted data
const MAX_TASK_DEPTH: usize = 256;

/// The foreign keys a task carries
struct TaskLinks {
    project_id: Option<i64>,
    phase_id: Option<i64>,
    parent_task_id: Option<i64>,
    assignee_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct TaskRepository {
    db: Database,
}

impl TaskRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self, site_id: i64, filter: &TaskFilter) -> AppResult<Vec<Task>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {COLUMNS} FROM tasks WHERE is_deleted = 0 AND site_id = "
        ));
        query.push_bind(site_id);
        if let Some(project_id) = filter.project_id {
            query.push(" AND project_id = ").push_bind(project_id);
        }
        if let Some(phase_id) = filter.phase_id {
            query.push(" AND phase_id = ").push_bind(phase_id);
        }
        if let Some(parent_id) = filter.parent_task_id {
            query.push(" AND parent_task_id = ").push_bind(parent_id);
        }
        if let Some(assignee_id) = filter.assignee_id {
            query.push(" AND assignee_id = ").push_bind(assignee_id);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        query.push(" ORDER BY due_date IS NULL, due_date, id");

        let rows = query.build_query_as::<Task>().fetch_all(self.db.pool()).await?;
        Ok(rows)
    }

    pub async fn get(&self, site_id: i64, id: i64) -> AppResult<Task> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {COLUMNS} FROM tasks WHERE id = ? AND site_id = ? AND is_deleted = 0"
        ))
        .bind(id)
        .bind(site_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| AppError::not_found("Task"))
    }

    pub async fn create(&self, site_id: i64, user_id: i64, input: &CreateTask) -> AppResult<Task> {
        let links = TaskLinks {
            project_id: input.project_id,
            phase_id: input.phase_id,
            parent_task_id: input.parent_task_id,
            assignee_id: input.assignee_id,
        };
        self.check_references(site_id, None, &links, &links).await?;

        let status = input.status.unwrap_or_default();
        let progress = input
            .progress
            .unwrap_or(if status == TaskStatus::Done { 100 } else { 0 });

        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO tasks (site_id, project_id, phase_id, parent_task_id, assignee_id, title, description, status, priority, progress, start_date, due_date, created_by, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(site_id)
        .bind(input.project_id)
        .bind(input.phase_id)
        .bind(input.parent_task_id)
        .bind(input.assignee_id)
        .bind(input.title.trim())
        .bind(clean(input.description.as_deref()))
        .bind(status)
        .bind(input.priority.unwrap_or_default())
        .bind(progress)
        .bind(input.start_date)
        .bind(input.due_date)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await?
        .last_insert_rowid();

        tracing::info!("📝 Created task {} in site {}", id, site_id);
        self.get(site_id, id).await
    }

    pub async fn update(&self, site_id: i64, id: i64, patch: &UpdateTask) -> AppResult<Task> {
        let mut task = self.get(site_id, id).await?;
        task.apply(patch);

        if !dates_ordered(task.start_date, task.due_date) {
            return Err(AppError::invalid("dueDate", "must not be before startDate"));
        }
        // Only references named in the patch must still exist; untouched ones may be deleted by now.
        let changed = TaskLinks {
            project_id: patch.project_id,
            phase_id: patch.phase_id,
            parent_task_id: patch.parent_task_id,
            assignee_id: patch.assignee_id,
        };
        let merged = TaskLinks {
            project_id: task.project_id,
            phase_id: task.phase_id,
            parent_task_id: task.parent_task_id,
            assignee_id: task.assignee_id,
        };
        self.check_references(site_id, Some(id), &changed, &merged).await?;

        sqlx::query(
            "UPDATE tasks SET project_id = ?, phase_id = ?, parent_task_id = ?, assignee_id = ?, title = ?, description = ?, \
             status = ?, priority = ?, progress = ?, start_date = ?, due_date = ?, updated_at = ? \
             WHERE id = ? AND site_id = ? AND is_deleted = 0",
        )
        .bind(task.project_id)
        .bind(task.phase_id)
        .bind(task.parent_task_id)
        .bind(task.assignee_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status)
        .bind(task.priority)
        .bind(task.progress)
        .bind(task.start_date)
        .bind(task.due_date)
        .bind(Utc::now())
        .bind(id)
        .bind(site_id)
        .execute(self.db.pool())
        .await?;

        self.get(site_id, id).await
    }

    pub async fn delete(&self, site_id: i64, id: i64) -> AppResult<()> {
        if super::soft_delete(&self.db, Table::Tasks, site_id, id).await? {
            tracing::info!("🗑️ Deleted task {} in site {}", id, site_id);
            Ok(())
        } else {
            Err(AppError::not_found("Task"))
        }
    }

    /// Same-tenant existence for `changed`; phase/project agreement and
    /// parent acyclicity on the `merged` row
    async fn check_references(
        &self,
        site_id: i64,
        task_id: Option<i64>,
        changed: &TaskLinks,
        merged: &TaskLinks,
    ) -> AppResult<()> {
        let mut refs = References::new(&self.db, site_id);
        refs.check("projectId", Table::Projects, changed.project_id).await?;
        refs.check("phaseId", Table::Phases, changed.phase_id).await?;
        refs.check("parentTaskId", Table::Tasks, changed.parent_task_id).await?;
        refs.check("assigneeId", Table::Users, changed.assignee_id).await?;
        if !refs.is_clean() {
            return refs.finish();
        }

        if let (Some(phase_id), Some(project_id)) = (merged.phase_id, merged.project_id) {
            let phase_project: Option<i64> = sqlx::query_scalar(
                "SELECT project_id FROM phases WHERE id = ? AND site_id = ?",
            )
            .bind(phase_id)
            .bind(site_id)
            .fetch_optional(self.db.pool())
            .await?;
            if phase_project != Some(project_id) {
                refs.fail("phaseId", "must belong to the task's project");
            }
        }

        if let (Some(parent_id), Some(task_id)) = (merged.parent_task_id, task_id) {
            if self.is_ancestor_or_self(site_id, task_id, parent_id).await? {
                refs.fail("parentTaskId", "would create a cycle");
            }
        }

        refs.finish()
    }

    /// Whether `task_id` appears on the parent chain starting at `start`
    async fn is_ancestor_or_self(&self, site_id: i64, task_id: i64, start: i64) -> AppResult<bool> {
        let mut current = Some(start);
        let mut depth = 0;
        while let Some(id) = current {
            if id == task_id {
                return Ok(true);
            }
            depth += 1;
            if depth > MAX_TASK_DEPTH {
                return Ok(true);
            }
            current = sqlx::query_scalar::<_, Option<i64>>(
                "SELECT parent_task_id FROM tasks WHERE id = ? AND site_id = ?",
            )
            .bind(id)
            .bind(site_id)
            .fetch_optional(self.db.pool())
            .await?
            .flatten();
        }
        Ok(false)
    }
}
