/// HTTP API layer
///
/// Thin axum handlers per resource. Handlers authenticate through the
/// `AuthUser` extractor, validate payloads, and delegate to the
/// repositories and auth services held in [`AppState`].

pub mod auth;
pub mod categories;
pub mod comments;
pub mod contacts;
pub mod customers;
pub mod deals;
pub mod events;
pub mod extract;
pub mod external_identities;
pub mod formulas;
pub mod health;
pub mod phases;
pub mod projects;
pub mod quotes;
pub mod response;
pub mod spaces;
pub mod tasks;
pub mod users;

pub use extract::{ApiJson, ApiPath, ApiQuery};
pub use response::{ApiResponse, Created};

use std::sync::Arc;

use axum::{
    extract::FromRef,
    middleware,
    routing::{get, post},
    Router,
};

use crate::{
    auth::{AuthService, ExternalIdentityService, ExternalTokenValidator, TokenService},
    config::Config,
    db::Database,
    rate_limit::{self, RateLimiter},
    repository::Repositories,
};

/// Shared resources handed to every handler
#[derive(Clone, FromRef)]
pub struct AppState {
    pub db: Database,
    pub repos: Repositories,
    pub tokens: TokenService,
    pub auth: AuthService,
    pub external: Arc<ExternalIdentityService>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// State for `config`, with the external provider's keys fetched from its JWKS URL
    pub fn new(db: Database, config: &Config) -> anyhow::Result<Self> {
        let validator = ExternalTokenValidator::from_config(&config.external)?;
        Ok(Self::with_validator(db, config, validator))
    }

    /// State with an explicitly supplied external token validator
    pub fn with_validator(
        db: Database,
        config: &Config,
        validator: Option<ExternalTokenValidator>,
    ) -> Self {
        let repos = Repositories::new(db.clone());
        let tokens = TokenService::new(&config.auth);
        let auth = AuthService::new(repos.clone(), tokens.clone());
        let external = ExternalIdentityService::new(
            repos.clone(),
            auth.clone(),
            validator,
            config.external.email_auto_mapping,
        );
        Self {
            db,
            repos,
            tokens,
            auth,
            external: Arc::new(external),
            rate_limiter: Arc::new(RateLimiter::new(&config.rate_limit)),
        }
    }
}

/// All `/api/*` routes
///
/// Login, registration and external sign-in sit behind the rate limiter;
/// everything else except the health check requires a session token.
pub fn create_api_routes(state: AppState) -> Router {
    let public_auth = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/external/sync", post(auth::external_sync))
        .route("/api/auth/external/login", post(auth::external_login))
        .route_layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit::limit_requests,
        ));

    Router::new()
        .route("/api/health", get(health::api_health))
        .route("/api/auth/me", get(auth::me))
        .merge(public_auth)
        .merge(users::routes())
        .merge(external_identities::routes())
        .merge(categories::routes())
        .merge(spaces::routes())
        .merge(projects::routes())
        .merge(phases::routes())
        .merge(tasks::routes())
        .merge(events::routes())
        .merge(comments::routes())
        .merge(customers::routes())
        .merge(contacts::routes())
        .merge(deals::routes())
        .merge(quotes::routes())
        .merge(formulas::routes())
        .with_state(state)
}
