/// Configuration management for the TaskFlow API
///
/// Handles server binding, database connection, session token signing,
/// external identity provider settings and auth rate limiting.
/// Every value can be overridden with a `TASKFLOW_*` environment variable.

use serde::{Deserialize, Serialize};
use std::{net::IpAddr, str::FromStr};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Session token configuration
    pub auth: AuthConfig,
    /// External identity provider (OIDC) configuration
    pub external: ExternalIdentityConfig,
    /// Rate limiting for unauthenticated auth endpoints
    pub rate_limit: RateLimitConfig,
    /// Allowed CORS origins; empty means any origin
    pub cors_origins: Vec<String>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL (e.g., "sqlite://data/taskflow.db" or "sqlite::memory:")
    pub url: String,
    /// Upper bound on pooled connections
    pub max_connections: u32,
}

/// Session token (HS256 JWT) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC signing secret
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    /// `iss` claim written to and required on session tokens
    pub issuer: String,
    /// `aud` claim written to and required on session tokens
    pub audience: String,
    /// Session token lifetime in minutes
    pub token_ttl_minutes: i64,
}

/// External identity provider settings used for federated login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalIdentityConfig {
    /// Published JWKS endpoint; federation is disabled when unset
    pub jwks_url: Option<String>,
    /// Expected `iss` of external tokens
    pub issuer: Option<String>,
    /// Expected `aud` of external tokens
    pub audience: Option<String>,
    /// Accepted signing algorithms (e.g., ["RS256", "ES256"])
    pub algorithms: Vec<String>,
    /// How long a fetched key set stays fresh
    pub jwks_cache_secs: u64,
    /// Allow provisioning mappings from the tenant code embedded in an email domain
    pub email_auto_mapping: bool,
}

/// Fixed-window limits for login/registration/federation endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per client per window
    pub max_requests: u32,
    /// Window length in seconds
    pub window_secs: u64,
    /// Peers whose `X-Forwarded-For` / `X-Real-IP` headers are believed
    pub trusted_proxies: Vec<IpAddr>,
}

impl Config {
    /// Build configuration from `TASKFLOW_*` environment variables
    ///
    /// Unset or unparseable values fall back to the defaults below.
    pub fn from_env() -> Self {
        let jwt_secret = match std::env::var("TASKFLOW_JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                tracing::warn!(
                    "⚠️ TASKFLOW_JWT_SECRET is not set, using a random per-process secret (sessions will not survive restarts)"
                );
                random_secret()
            }
        };

        Self {
            server: ServerConfig {
                host: env_or("TASKFLOW_HOST", "0.0.0.0".to_string()),
                port: env_or("TASKFLOW_PORT", 5000),
            },
            database: DatabaseConfig {
                url: env_or("TASKFLOW_DATABASE_URL", "sqlite://data/taskflow.db".to_string()),
                max_connections: env_or("TASKFLOW_DB_MAX_CONNECTIONS", 10),
            },
            auth: AuthConfig {
                jwt_secret,
                issuer: env_or("TASKFLOW_JWT_ISSUER", "taskflow".to_string()),
                audience: env_or("TASKFLOW_JWT_AUDIENCE", "taskflow-web".to_string()),
                token_ttl_minutes: env_or("TASKFLOW_TOKEN_TTL_MINUTES", 480),
            },
            external: ExternalIdentityConfig {
                jwks_url: env_opt("TASKFLOW_EXTERNAL_JWKS_URL"),
                issuer: env_opt("TASKFLOW_EXTERNAL_ISSUER"),
                audience: env_opt("TASKFLOW_EXTERNAL_AUDIENCE"),
                algorithms: env_list("TASKFLOW_EXTERNAL_ALGORITHMS")
                    .unwrap_or_else(|| vec!["RS256".to_string(), "ES256".to_string()]),
                jwks_cache_secs: env_or("TASKFLOW_JWKS_CACHE_SECS", 3600),
                email_auto_mapping: env_or("TASKFLOW_EXTERNAL_EMAIL_AUTO_MAPPING", false),
            },
            rate_limit: RateLimitConfig {
                max_requests: env_or("TASKFLOW_AUTH_RATE_LIMIT", 20),
                window_secs: env_or("TASKFLOW_AUTH_RATE_WINDOW_SECS", 60),
                trusted_proxies: env_ips("TASKFLOW_TRUSTED_PROXIES"),
            },
            cors_origins: env_list("TASKFLOW_CORS_ORIGINS").unwrap_or_default(),
        }
    }

    /// Address the HTTP listener binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Config {
    /// In-memory configuration used by tests and local experiments
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
            },
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
            },
            auth: AuthConfig {
                jwt_secret: random_secret(),
                issuer: "taskflow".to_string(),
                audience: "taskflow-web".to_string(),
                token_ttl_minutes: 480,
            },
            external: ExternalIdentityConfig {
                jwks_url: None,
                issuer: None,
                audience: None,
                algorithms: vec!["RS256".to_string(), "ES256".to_string()],
                jwks_cache_secs: 3600,
                email_auto_mapping: false,
            },
            rate_limit: RateLimitConfig {
                max_requests: 20,
                window_secs: 60,
                trusted_proxies: Vec::new(),
            },
            cors_origins: Vec::new(),
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env_opt(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_list(key: &str) -> Option<Vec<String>> {
    env_opt(key).map(|v| {
        v.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

fn env_ips(key: &str) -> Vec<IpAddr> {
    env_list(key)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|entry| match entry.parse() {
            Ok(ip) => Some(ip),
            Err(_) => {
                tracing::warn!("⚠️ Ignoring invalid address {:?} in {}", entry, key);
                None
            }
        })
        .collect()
}

fn random_secret() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_in_memory_sqlite() {
        let config = Config::default();
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.database.max_connections, 1);
        assert!(!config.external.email_auto_mapping);
        assert_eq!(config.auth.jwt_secret.len(), 64);
        assert!(config.rate_limit.trusted_proxies.is_empty());
    }

    #[test]
    fn random_secrets_differ() {
        assert_ne!(random_secret(), random_secret());
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn from_env_reports_missing_secret_and_bad_proxies() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        std::env::remove_var("TASKFLOW_JWT_SECRET");
        std::env::set_var("TASKFLOW_TRUSTED_PROXIES", "10.0.0.1, not-an-ip");
        let config = tracing::subscriber::with_default(subscriber, Config::from_env);
        std::env::remove_var("TASKFLOW_TRUSTED_PROXIES");

        assert_eq!(
            config.rate_limit.trusted_proxies,
            vec!["10.0.0.1".parse::<IpAddr>().unwrap()]
        );
        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("TASKFLOW_JWT_SECRET is not set"));
        assert!(logs.contains("not-an-ip"));
    }

    #[test]
    fn bind_addr_joins_host_and_port() {
        let mut config = Config::default();
        config.server.host = "0.0.0.0".into();
        config.server.port = 8080;
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }
}
