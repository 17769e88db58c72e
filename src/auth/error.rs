use thiserror::Error;

use crate::error::AppError;

/// Failures while authenticating a caller
///
/// Everything here surfaces to clients as a 401; the variant only decides
/// what ends up in the log.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token has no usable siteId claim")]
    MissingSite,

    #[error("external identity provider is not configured")]
    ExternalDisabled,

    #[error("JWKS fetch failed: {0}")]
    JwksFetch(String),

    #[error("no signing key for kid '{0}'")]
    UnknownKey(String),

    #[error("signing algorithm {0} is not accepted")]
    AlgorithmRejected(String),

    #[error("externalUserId does not match the token subject")]
    SubjectMismatch,
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::InvalidToken(err.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => AppError::Unauthorized("authentication required".into()),
            AuthError::ExternalDisabled => {
                AppError::Unauthorized("external sign-in is not enabled".into())
            }
            AuthError::SubjectMismatch => AppError::Unauthorized(err.to_string()),
            AuthError::JwksFetch(_) => {
                tracing::error!("❌ {}", err);
                AppError::Unauthorized("external token could not be verified".into())
            }
            other => {
                tracing::debug!("🔒 Rejected token: {}", other);
                AppError::Unauthorized("invalid or expired token".into())
            }
        }
    }
}
