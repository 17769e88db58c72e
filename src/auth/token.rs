use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::{AuthError, AuthUser};
use crate::{
    config::AuthConfig,
    models::{User, UserRole},
};

/// Claims carried by a local session token
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    /// User id as a decimal string
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: UserRole,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and validates HS256 session tokens
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            ttl: Duration::minutes(config.token_ttl_minutes.max(1)),
        }
    }

    /// Token lifetime in seconds, as reported to clients
    pub fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user.id.to_string(),
            site_id: Some(user.site_id),
            name: user.name().to_string(),
            role: user.role,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Verify signature, issuer, audience and expiry, then the tenant claims
    pub fn validate(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claims = decode::<SessionClaims>(token, &self.decoding, &self.validation)?.claims;
        let site_id = claims.site_id.ok_or(AuthError::MissingSite)?;
        let user_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AuthError::InvalidToken("sub is not a user id".into()))?;
        Ok(AuthUser {
            user_id,
            site_id,
            role: claims.role,
            name: claims.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret-test-secret-test-secret".into(),
            issuer: "taskflow".into(),
            audience: "taskflow-web".into(),
            token_ttl_minutes: 60,
        }
    }

    fn user() -> User {
        let now = Utc::now();
        User {
            id: 7,
            site_id: 3,
            username: "jane".into(),
            email: "jane@t0003.com".into(),
            display_name: Some("Jane Doe".into()),
            password_hash: String::new(),
            role: UserRole::Admin,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn sign(claims: serde_json::Value, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn issued_token_round_trips_identity() {
        let tokens = TokenService::new(&config());
        let token = tokens.issue(&user()).unwrap();
        let caller = tokens.validate(&token).unwrap();
        assert_eq!(caller.user_id, 7);
        assert_eq!(caller.site_id, 3);
        assert_eq!(caller.role, UserRole::Admin);
        assert_eq!(caller.name, "Jane Doe");
    }

    #[test]
    fn token_without_site_is_rejected() {
        let tokens = TokenService::new(&config());
        let exp = Utc::now().timestamp() + 600;
        let token = sign(
            json!({"sub": "7", "iss": "taskflow", "aud": "taskflow-web", "iat": 0, "exp": exp}),
            "test-secret-test-secret-test-secret",
        );
        assert!(matches!(tokens.validate(&token), Err(AuthError::MissingSite)));
    }

    #[test]
    fn foreign_signature_and_audience_are_rejected() {
        let tokens = TokenService::new(&config());
        let exp = Utc::now().timestamp() + 600;
        let claims = json!({"sub": "7", "siteId": 3, "iss": "taskflow", "aud": "taskflow-web", "iat": 0, "exp": exp});
        assert!(tokens.validate(&sign(claims, "another-secret")).is_err());

        let wrong_aud = json!({"sub": "7", "siteId": 3, "iss": "taskflow", "aud": "elsewhere", "iat": 0, "exp": exp});
        assert!(tokens
            .validate(&sign(wrong_aud, "test-secret-test-secret-test-secret"))
            .is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = TokenService::new(&config());
        let exp = Utc::now().timestamp() - 3600;
        let token = sign(
            json!({"sub": "7", "siteId": 3, "iss": "taskflow", "aud": "taskflow-web", "iat": 0, "exp": exp}),
            "test-secret-test-secret-test-secret",
        );
        assert!(tokens.validate(&token).is_err());
    }

    #[test]
    fn non_numeric_subject_is_rejected() {
        let tokens = TokenService::new(&config());
        let exp = Utc::now().timestamp() + 600;
        let token = sign(
            json!({"sub": "jane", "siteId": 3, "iss": "taskflow", "aud": "taskflow-web", "iat": 0, "exp": exp}),
            "test-secret-test-secret-test-secret",
        );
        assert!(matches!(tokens.validate(&token), Err(AuthError::InvalidToken(_))));
    }
}
