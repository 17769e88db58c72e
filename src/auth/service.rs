use serde::{Deserialize, Serialize};

use super::{
    password::{hash_password, verify_dummy, verify_password},
    tenant_code::{normalize_tenant_code, tenant_code_from_email},
    AuthUser, TokenService,
};
use crate::{
    error::{AppError, AppResult},
    models::{clean, Site, User, UserRole, Validator},
    repository::Repositories,
};

const INVALID_CREDENTIALS: &str = "invalid credentials";
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub site_code: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
    /// Name of the site to create; required because registration only opens new sites
    pub site_name: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> AppResult<()> {
        Validator::new()
            .required("siteCode", &self.site_code, 50)
            .required("username", &self.username, 100)
            .required("email", &self.email, 255)
            .email("email", Some(&self.email))
            .check(
                self.password.chars().count() >= MIN_PASSWORD_LEN,
                "password",
                "must be at least 8 characters",
            )
            .max_len("displayName", self.display_name.as_deref(), 200)
            .max_len("siteName", self.site_name.as_deref(), 200)
            .finish()
    }
}

/// Account an admin adds to their own site
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
    /// Defaults to member
    #[serde(default)]
    pub role: UserRole,
}

impl CreateUserRequest {
    pub fn validate(&self) -> AppResult<()> {
        Validator::new()
            .required("username", &self.username, 100)
            .required("email", &self.email, 255)
            .email("email", Some(&self.email))
            .check(
                self.password.chars().count() >= MIN_PASSWORD_LEN,
                "password",
                "must be at least 8 characters",
            )
            .max_len("displayName", self.display_name.as_deref(), 200)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Username or email
    pub identifier: String,
    pub password: String,
    pub site_code: Option<String>,
}

/// Issued session plus the signed-in user
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: User,
}

/// Password registration and login against local accounts
#[derive(Debug, Clone)]
pub struct AuthService {
    repos: Repositories,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(repos: Repositories, tokens: TokenService) -> Self {
        Self { repos, tokens }
    }

    /// Open a new site with the caller as its first admin
    ///
    /// Existing sites are closed to self-registration; their admins add
    /// accounts through [`AuthService::create_user`].
    pub async fn register(&self, request: &RegisterRequest) -> AppResult<AuthSession> {
        request.validate()?;

        let code = normalize_tenant_code(&request.site_code);
        if self.repos.sites.find_by_code(&code).await?.is_some() {
            tracing::warn!("🚫 Registration refused: site {} already exists", code);
            return Err(AppError::Conflict(format!(
                "site {code} already exists; ask a site admin for an account"
            )));
        }
        let Some(name) = clean(request.site_name.as_deref()) else {
            return Err(AppError::not_found("Site"));
        };
        let site = self.repos.sites.create(&code, &name).await?;

        let user = self
            .repos
            .users
            .create(
                site.id,
                request.username.trim(),
                request.email.trim(),
                clean(request.display_name.as_deref()).as_deref(),
                &hash_password(&request.password)?,
                UserRole::Admin,
                None,
            )
            .await?;
        tracing::info!("📝 Registered {} as admin of new site {}", user.username, site.code);
        self.session(user)
    }

    /// Add an account to the admin's own site
    pub async fn create_user(&self, admin: &AuthUser, request: &CreateUserRequest) -> AppResult<User> {
        request.validate()?;
        let user = self
            .repos
            .users
            .create(
                admin.site_id,
                request.username.trim(),
                request.email.trim(),
                clean(request.display_name.as_deref()).as_deref(),
                &hash_password(&request.password)?,
                request.role,
                Some(admin.user_id),
            )
            .await?;
        tracing::info!(
            "👤 {} added {} to site {} as {}",
            admin.name,
            user.username,
            admin.site_id,
            user.role.as_str()
        );
        Ok(user)
    }

    /// Every failure mode answers with the same 401
    pub async fn login(&self, request: &LoginRequest) -> AppResult<AuthSession> {
        let identifier = request.identifier.trim();
        let Some(site) = self.resolve_site(identifier, request.site_code.as_deref()).await? else {
            tracing::warn!("🚫 Login failed: no site for '{}'", identifier);
            verify_dummy(&request.password);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        };

        let user = self.repos.users.find_by_login(site.id, identifier).await?;
        let verified = match &user {
            Some(user) => verify_password(&request.password, &user.password_hash) && user.is_active,
            None => {
                verify_dummy(&request.password);
                false
            }
        };
        match user {
            Some(user) if verified => {
                tracing::info!("🔓 {} signed in to site {}", user.username, site.code);
                self.session(user)
            }
            _ => {
                tracing::warn!("🚫 Login failed for '{}' in site {}", identifier, site.code);
                Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()))
            }
        }
    }

    pub async fn me(&self, caller: &AuthUser) -> AppResult<User> {
        self.repos
            .users
            .get(caller.site_id, caller.user_id)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => AppError::Unauthorized("account no longer exists".into()),
                other => other,
            })
    }

    /// Session token for an already authenticated user
    pub(crate) fn session(&self, user: User) -> AppResult<AuthSession> {
        Ok(AuthSession {
            token: self.tokens.issue(&user)?,
            token_type: "Bearer",
            expires_in: self.tokens.ttl_secs(),
            user,
        })
    }

    /// Explicit site code first, then the tenant code in an email identifier
    async fn resolve_site(&self, identifier: &str, site_code: Option<&str>) -> AppResult<Option<Site>> {
        let code = match clean(site_code) {
            Some(code) => normalize_tenant_code(&code),
            None => match tenant_code_from_email(identifier) {
                Some(code) => code,
                None => return Ok(None),
            },
        };
        self.repos.sites.find_by_code(&code).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AuthConfig, repository::test_support::seeded};

    async fn service() -> AuthService {
        let (_, repos) = seeded().await;
        let tokens = TokenService::new(&AuthConfig {
            jwt_secret: "unit-test-secret".into(),
            issuer: "taskflow".into(),
            audience: "taskflow-web".into(),
            token_ttl_minutes: 30,
        });
        AuthService::new(repos, tokens)
    }

    fn registration(site_code: &str, username: &str, site_name: Option<&str>) -> RegisterRequest {
        RegisterRequest {
            site_code: site_code.into(),
            username: username.into(),
            email: format!("{username}@{}.com", site_code.to_lowercase()),
            password: "s3cret-pass".into(),
            display_name: None,
            site_name: site_name.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn register_into_new_site_makes_admin() {
        let auth = service().await;
        let session = auth
            .register(&registration("t9", "zoe", Some("Zeta Corp")))
            .await
            .unwrap();
        assert_eq!(session.user.role, UserRole::Admin);
        assert_eq!(session.token_type, "Bearer");
        let site = auth.repos.sites.find_by_code("T0009").await.unwrap().unwrap();
        assert_eq!(site.id, session.user.site_id);
    }

    #[tokio::test]
    async fn register_into_unknown_site_without_name_is_not_found() {
        let auth = service().await;
        let err = auth.register(&registration("T0042", "zoe", None)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn register_into_existing_site_is_refused() {
        let auth = service().await;
        for site_name in [None, Some("Acme Again")] {
            let err = auth
                .register(&registration("T00001", "mallory", site_name))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Conflict(_)), "{err:?}");
        }
        let site = auth.repos.sites.find_by_code("T0001").await.unwrap().unwrap();
        let users = auth.repos.users.list(site.id).await.unwrap();
        assert!(users.iter().all(|u| u.username != "mallory"));
    }

    #[tokio::test]
    async fn register_rejects_short_password() {
        let auth = service().await;
        let mut request = registration("T0009", "zoe", Some("Zeta Corp"));
        request.password = "short".into();
        let err = auth.register(&request).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref f) if f[0].field == "password"));
    }

    async fn acme_admin(auth: &AuthService) -> AuthUser {
        let site = auth.repos.sites.find_by_code("T0001").await.unwrap().unwrap();
        let alice = auth.repos.users.find_by_login(site.id, "alice").await.unwrap().unwrap();
        AuthUser {
            user_id: alice.id,
            site_id: site.id,
            role: alice.role,
            name: alice.username,
        }
    }

    async fn add_carol(auth: &AuthService) -> User {
        let admin = acme_admin(auth).await;
        auth.create_user(
            &admin,
            &CreateUserRequest {
                username: "carol".into(),
                email: "carol@t0001.com".into(),
                password: "s3cret-pass".into(),
                display_name: None,
                role: UserRole::default(),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn admins_add_members_to_their_own_site() {
        let auth = service().await;
        let admin = acme_admin(&auth).await;
        let carol = add_carol(&auth).await;
        assert_eq!(carol.site_id, admin.site_id);
        assert_eq!(carol.role, UserRole::Member);
        assert!(carol.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn login_resolves_site_from_email_domain() {
        let auth = service().await;
        add_carol(&auth).await;

        let session = auth
            .login(&LoginRequest {
                identifier: "carol@t00001.com".into(),
                password: "s3cret-pass".into(),
                site_code: None,
            })
            .await
            .unwrap();
        assert_eq!(session.user.username, "carol");
        assert_eq!(session.user.role, UserRole::Member);
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let auth = service().await;
        add_carol(&auth).await;

        let attempts = [
            ("carol", "wrong-password", Some("T0001")),
            ("nobody", "s3cret-pass", Some("T0001")),
            ("carol", "s3cret-pass", Some("T0404")),
            ("carol", "s3cret-pass", None),
        ];
        for (identifier, password, site_code) in attempts {
            let err = auth
                .login(&LoginRequest {
                    identifier: identifier.into(),
                    password: password.into(),
                    site_code: site_code.map(str::to_string),
                })
                .await
                .unwrap_err();
            match err {
                AppError::Unauthorized(message) => assert_eq!(message, INVALID_CREDENTIALS),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }
}
