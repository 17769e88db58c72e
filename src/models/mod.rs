/// Entity records and request payloads
///
/// Records map one-to-one onto table rows (`sqlx::FromRow`) and serialize
/// in camelCase for the web client. `Create*` / `Update*` payloads carry
/// their own field validation; cross-row checks live in the repositories.

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

pub use category::{Category, CreateCategory, UpdateCategory};
pub use comment::{Comment, CreateComment, UpdateComment};
pub use contact::{Contact, ContactFilter, CreateContact, UpdateContact};
pub use customer::{CreateCustomer, Customer, UpdateCustomer};
pub use deal::{CreateDeal, Deal, DealFilter, DealStage, UpdateDeal};
pub use event::{CreateEvent, Event, EventFilter, UpdateEvent};
pub use external_identity::{CreateExternalIdentity, ExternalIdentity, MappedSite};
pub use phase::{CreatePhase, Phase, UpdatePhase};
pub use project::{CreateProject, Project, ProjectFilter, ProjectStatus, UpdateProject};
pub use quote::{CreateQuote, Quote, QuoteFilter, QuoteItem, QuoteItemInput, QuoteStatus, UpdateQuote};
pub use site::Site;
pub use space::{CreateSpace, Space, UpdateSpace};
pub use task::{CreateTask, Task, TaskFilter, TaskPriority, TaskStatus, UpdateTask};
pub use user::{User, UserRole};

use crate::error::{AppError, AppResult, FieldError};

/// Collects field errors so a request reports every problem at once
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    /// Non-blank and at most `max` characters
    pub fn required(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        if value.trim().is_empty() {
            self.errors.push(FieldError::new(field, "is required"));
        } else {
            self.max_len(field, Some(value), max);
        }
        self
    }

    /// When present, non-blank and at most `max` characters
    pub fn optional_required(&mut self, field: &str, value: Option<&str>, max: usize) -> &mut Self {
        if let Some(value) = value {
            self.required(field, value, max);
        }
        self
    }

    pub fn max_len(&mut self, field: &str, value: Option<&str>, max: usize) -> &mut Self {
        if let Some(value) = value {
            if value.chars().count() > max {
                self.errors
                    .push(FieldError::new(field, format!("must be at most {max} characters")));
            }
        }
        self
    }

    pub fn range(&mut self, field: &str, value: Option<i64>, min: i64, max: i64) -> &mut Self {
        if let Some(value) = value {
            if value < min || value > max {
                self.errors
                    .push(FieldError::new(field, format!("must be between {min} and {max}")));
            }
        }
        self
    }

    pub fn email(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            if !looks_like_email(value) {
                self.errors.push(FieldError::new(field, "must be a valid email address"));
            }
        }
        self
    }

    pub fn finish(&mut self) -> AppResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}

/// `local@domain.tld` with no whitespace
pub fn looks_like_email(value: &str) -> bool {
    let value = value.trim();
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .rsplit_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    }
}

/// Trimmed copy of an optional string, with blanks collapsed to `None`
pub fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
