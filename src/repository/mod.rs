/// Tenant-scoped data access
///
/// One repository per entity. Every query is filtered by `site_id` and
/// ignores soft-deleted rows, so a row of another tenant and a deleted row
/// are indistinguishable: both are "not found".

pub mod category;
pub mod comment;
pub mod contact;
pub mod customer;
pub mod deal;
pub mod event;
pub mod external_identity;
pub mod phase;
pub mod project;
pub mod quote;
pub mod site;
pub mod space;
pub mod task;
pub mod user;

pub use category::CategoryRepository;
pub use comment::CommentRepository;
pub use contact::ContactRepository;
pub use customer::CustomerRepository;
pub use deal::DealRepository;
pub use event::EventRepository;
pub use external_identity::ExternalIdentityRepository;
pub use phase::PhaseRepository;
pub use project::ProjectRepository;
pub use quote::QuoteRepository;
pub use site::SiteRepository;
pub use space::SpaceRepository;
pub use task::TaskRepository;
pub use user::UserRepository;

use crate::{
    db::{Database, Table},
    error::{AppError, AppResult, FieldError},
};

/// All repositories over one shared database
#[derive(Debug, Clone)]
pub struct Repositories {
    pub sites: SiteRepository,
    pub users: UserRepository,
    pub external_identities: ExternalIdentityRepository,
    pub categories: CategoryRepository,
    pub spaces: SpaceRepository,
    pub projects: ProjectRepository,
    pub phases: PhaseRepository,
    pub tasks: TaskRepository,
    pub events: EventRepository,
    pub comments: CommentRepository,
    pub customers: CustomerRepository,
    pub contacts: ContactRepository,
    pub deals: DealRepository,
    pub quotes: QuoteRepository,
}

impl Repositories {
    pub fn new(db: Database) -> Self {
        Self {
            sites: SiteRepository::new(db.clone()),
            users: UserRepository::new(db.clone()),
            external_identities: ExternalIdentityRepository::new(db.clone()),
            categories: CategoryRepository::new(db.clone()),
            spaces: SpaceRepository::new(db.clone()),
            projects: ProjectRepository::new(db.clone()),
            phases: PhaseRepository::new(db.clone()),
            tasks: TaskRepository::new(db.clone()),
            events: EventRepository::new(db.clone()),
            comments: CommentRepository::new(db.clone()),
            customers: CustomerRepository::new(db.clone()),
            contacts: ContactRepository::new(db.clone()),
            deals: DealRepository::new(db.clone()),
            quotes: QuoteRepository::new(db),
        }
    }
}

/// Checks that referenced rows exist in the caller's tenant
///
/// Collects one field error per dangling reference and fails with a single
/// 400 listing all of them.
pub(crate) struct References<'a> {
    db: &'a Database,
    site_id: i64,
    errors: Vec<FieldError>,
}

impl<'a> References<'a> {
    pub(crate) fn new(db: &'a Database, site_id: i64) -> Self {
        Self {
            db,
            site_id,
            errors: Vec::new(),
        }
    }

    pub(crate) async fn check(
        &mut self,
        field: &str,
        table: Table,
        id: Option<i64>,
    ) -> AppResult<&mut Self> {
        if let Some(id) = id {
            if !self.db.exists_in_site(table, self.site_id, id).await? {
                self.errors
                    .push(FieldError::new(field, "does not reference an existing record"));
            }
        }
        Ok(self)
    }

    pub(crate) fn fail(&mut self, field: &str, message: &str) {
        self.errors.push(FieldError::new(field, message));
    }

    pub(crate) fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn finish(self) -> AppResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}

/// Soft-delete a tenant row; `false` when nothing matched
pub(crate) async fn soft_delete(
    db: &Database,
    table: Table,
    site_id: i64,
    id: i64,
) -> Result<bool, sqlx::Error> {
    let sql = format!(
        "UPDATE {} SET is_deleted = 1, updated_at = ? WHERE id = ? AND site_id = ? AND is_deleted = 0",
        table.name()
    );
    let result = sqlx::query(&sql)
        .bind(chrono::Utc::now())
        .bind(id)
        .bind(site_id)
        .execute(db.pool())
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::models::UserRole;

    /// Fresh in-memory database with two sites and one admin user in each
    pub(crate) async fn seeded() -> (Database, Repositories) {
        let db = Database::connect(&DatabaseConfig {
            url: "sqlite::memory:".into(),
            max_connections: 1,
        })
        .await
        .unwrap();
        let repos = Repositories::new(db.clone());
        for (code, name, user) in [("T0001", "Acme", "alice"), ("T0002", "Globex", "bob")] {
            let site = repos.sites.create(code, name).await.unwrap();
            repos
                .users
                .create(
                    site.id,
                    user,
                    &format!("{user}@{}.com", code.to_lowercase()),
                    None,
                    "not-a-password-hash",
                    UserRole::Admin,
                    None,
                )
                .await
                .unwrap();
        }
        (db, repos)
    }
}
