use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};

use super::References;
use crate::{
    db::{Database, Table},
    error::{AppError, AppResult},
    models::{
        clean, project::dates_ordered, CreateProject, Project, ProjectFilter, UpdateProject,
    },
};

const COLUMNS: &str = "id, site_id, category_id, space_id, name, description, status, start_date, end_date, created_by, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct ProjectRepository {
    db: Database,
}

impl ProjectRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self, site_id: i64, filter: &ProjectFilter) -> AppResult<Vec<Project>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {COLUMNS} FROM projects WHERE is_deleted = 0 AND site_id = "
        ));
        query.push_bind(site_id);
        if let Some(category_id) = filter.category_id {
            query.push(" AND category_id = ").push_bind(category_id);
        }
        if let Some(space_id) = filter.space_id {
            query.push(" AND space_id = ").push_bind(space_id);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        query.push(" ORDER BY updated_at DESC, id DESC");

        let rows = query
            .build_query_as::<Project>()
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows)
    }

    pub async fn get(&self, site_id: i64, id: i64) -> AppResult<Project> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {COLUMNS} FROM projects WHERE id = ? AND site_id = ? AND is_deleted = 0"
        ))
        .bind(id)
        .bind(site_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| AppError::not_found("Project"))
    }

    pub async fn create(&self, site_id: i64, user_id: i64, input: &CreateProject) -> AppResult<Project> {
        let mut refs = References::new(&self.db, site_id);
        refs.check("categoryId", Table::Categories, input.category_id).await?;
        refs.check("spaceId", Table::Spaces, input.space_id).await?;
        refs.finish()?;

        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO projects (site_id, category_id, space_id, name, description, status, start_date, end_date, created_by, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(site_id)
        .bind(input.category_id)
        .bind(input.space_id)
        .bind(input.name.trim())
        .bind(clean(input.description.as_deref()))
        .bind(input.status.unwrap_or_default())
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await?
        .last_insert_rowid();

        tracing::info!("📁 Created project {} in site {}", id, site_id);
        self.get(site_id, id).await
    }

    pub async fn update(&self, site_id: i64, id: i64, patch: &UpdateProject) -> AppResult<Project> {
        let mut project = self.get(site_id, id).await?;
        project.apply(patch);

        let mut refs = References::new(&self.db, site_id);
        refs.check("categoryId", Table::Categories, patch.category_id).await?;
        refs.check("spaceId", Table::Spaces, patch.space_id).await?;
        if !dates_ordered(project.start_date, project.end_date) {
            refs.fail("endDate", "must not be before startDate");
        }
        refs.finish()?;

        sqlx::query(
            "UPDATE projects SET category_id = ?, space_id = ?, name = ?, description = ?, status = ?, \
             start_date = ?, end_date = ?, updated_at = ? WHERE id = ? AND site_id = ? AND is_deleted = 0",
        )
        .bind(project.category_id)
        .bind(project.space_id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.status)
        .bind(project.start_date)
        .bind(project.end_date)
        .bind(Utc::now())
        .bind(id)
        .bind(site_id)
        .execute(self.db.pool())
        .await?;

        self.get(site_id, id).await
    }

    pub async fn delete(&self, site_id: i64, id: i64) -> AppResult<()> {
        if super::soft_delete(&self.db, Table::Projects, site_id, id).await? {
            tracing::info!("🗑️ Deleted project {} in site {}", id, site_id);
            Ok(())
        } else {
            Err(AppError::not_found("Project"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateCategory, ProjectStatus};
    use crate::repository::test_support::seeded;

    fn new_project(name: &str) -> CreateProject {
        CreateProject {
            name: name.into(),
            description: None,
            category_id: None,
            space_id: None,
            status: None,
            start_date: None,
            end_date: None,
        }
    }

    #[tokio::test]
    async fn projects_are_isolated_by_site() {
        let (_, repos) = seeded().await;
        let created = repos.projects.create(1, 1, &new_project("Website")).await.unwrap();

        assert_eq!(repos.projects.list(1, &ProjectFilter::default()).await.unwrap().len(), 1);
        assert!(repos.projects.list(2, &ProjectFilter::default()).await.unwrap().is_empty());
        assert!(matches!(
            repos.projects.get(2, created.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn category_from_other_site_is_rejected() {
        let (_, repos) = seeded().await;
        let foreign = repos
            .categories
            .create(2, 2, &CreateCategory { name: "Ops".into(), color: None })
            .await
            .unwrap();
        let mut input = new_project("Website");
        input.category_id = Some(foreign.id);
        let err = repos.projects.create(1, 1, &input).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref f) if f[0].field == "categoryId"));
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let (_, repos) = seeded().await;
        let mut active = new_project("Active");
        active.status = Some(ProjectStatus::Active);
        repos.projects.create(1, 1, &active).await.unwrap();
        repos.projects.create(1, 1, &new_project("Planned")).await.unwrap();

        let filter = ProjectFilter {
            status: Some(ProjectStatus::Active),
            ..Default::default()
        };
        let rows = repos.projects.list(1, &filter).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Active");
    }

    #[tokio::test]
    async fn deleted_project_is_gone() {
        let (_, repos) = seeded().await;
        let created = repos.projects.create(1, 1, &new_project("Website")).await.unwrap();
        repos.projects.delete(1, created.id).await.unwrap();
        assert!(repos.projects.get(1, created.id).await.is_err());
        assert!(matches!(
            repos.projects.delete(1, created.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
