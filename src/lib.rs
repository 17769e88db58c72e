/// TaskFlow: multi-tenant task, project and CRM management API
///
/// Every record belongs to a site (tenant); the site is taken from the
/// caller's session token and scopes every query.

// Configuration and setup
pub mod config;

// Storage: pool, schema and the tenant-scoped repositories on top of it
pub mod db;
pub mod models;
pub mod repository;

// Errors rendered through the response envelope
pub mod error;

// Session tokens, passwords and the external identity provider
pub mod auth;
pub mod rate_limit;

// Computed-column expressions
pub mod formula;

// HTTP API layer
pub mod api;

// Server setup and initialization
pub mod server;

pub use api::AppState;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use server::{create_app, create_app_with_state, start_server};
