use serde::Deserialize;

use super::{
    tenant_code::tenant_code_from_email, AuthError, AuthService, AuthSession, ExternalTokenValidator,
};
use crate::{
    error::{AppError, AppResult},
    models::{clean, MappedSite},
    repository::Repositories,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSync {
    /// Token issued by the external identity provider
    pub token: String,
    pub email: Option<String>,
    /// Must equal the token's `sub` when sent
    pub external_user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalLogin {
    pub token: String,
    pub site_id: i64,
}

/// Resolves external provider subjects to local users, site by site
pub struct ExternalIdentityService {
    repos: Repositories,
    auth: AuthService,
    validator: Option<ExternalTokenValidator>,
    email_auto_mapping: bool,
}

impl ExternalIdentityService {
    pub fn new(
        repos: Repositories,
        auth: AuthService,
        validator: Option<ExternalTokenValidator>,
        email_auto_mapping: bool,
    ) -> Self {
        Self {
            repos,
            auth,
            validator,
            email_auto_mapping,
        }
    }

    /// Sites the caller can enter with this external token
    ///
    /// With email auto-mapping on, a subject not yet mapped in the tenant
    /// named by its email domain is attached to one unmapped user there.
    pub async fn sync(&self, request: &ExternalSync) -> AppResult<Vec<MappedSite>> {
        let validator = self.validator.as_ref().ok_or(AuthError::ExternalDisabled)?;
        let claims = validator.validate(&request.token).await?;

        if let Some(claimed) = clean(request.external_user_id.as_deref()) {
            if claimed != claims.sub {
                tracing::warn!("🚫 External sync with mismatched subject");
                return Err(AuthError::SubjectMismatch.into());
            }
        }

        let email = clean(claims.email.as_deref()).or_else(|| clean(request.email.as_deref()));
        if self.email_auto_mapping {
            if let Some(email) = &email {
                self.auto_map(&claims.sub, email).await?;
            }
        }

        let sites = self.repos.external_identities.sites_for_subject(&claims.sub).await?;
        tracing::debug!("🔗 External subject resolves to {} site(s)", sites.len());
        Ok(sites)
    }

    /// Local session for a subject already mapped in `site_id`
    pub async fn login(&self, request: &ExternalLogin) -> AppResult<AuthSession> {
        let validator = self.validator.as_ref().ok_or(AuthError::ExternalDisabled)?;
        let claims = validator.validate(&request.token).await?;

        let unmapped = || AppError::Unauthorized("no account is linked for this site".into());
        let user_id = self
            .repos
            .external_identities
            .user_for_subject(&claims.sub, request.site_id)
            .await?
            .ok_or_else(unmapped)?;
        let user = match self.repos.users.get(request.site_id, user_id).await {
            Ok(user) if user.is_active => user,
            Ok(_) | Err(AppError::NotFound(_)) => return Err(unmapped()),
            Err(other) => return Err(other),
        };

        tracing::info!("🔓 {} signed in to site {} via external identity", user.username, request.site_id);
        self.auth.session(user)
    }

    async fn auto_map(&self, subject: &str, email: &str) -> AppResult<()> {
        let Some(code) = tenant_code_from_email(email) else {
            return Ok(());
        };
        let Some(site) = self.repos.sites.find_by_code(&code).await? else {
            tracing::debug!("No site for tenant code {}", code);
            return Ok(());
        };
        if self
            .repos
            .external_identities
            .user_for_subject(subject, site.id)
            .await?
            .is_some()
        {
            return Ok(());
        }

        let Some(user) = self.repos.users.find_unmapped(site.id, Some(email)).await? else {
            return Ok(());
        };
        if self.repos.external_identities.link(subject, site.id, user.id).await? {
            tracing::info!("🔗 Auto-mapped external subject to {} in site {}", user.username, site.code);
        }
        Ok(())
    }
}
