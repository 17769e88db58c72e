/// Fixed-window rate limiting for the unauthenticated auth endpoints
///
/// Clients are keyed by peer address. `X-Forwarded-For` (first hop) and
/// `X-Real-IP` are only believed when the peer is a configured trusted
/// proxy. Over-limit requests get a 429 with `Retry-After`.
use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use tokio::sync::Mutex;

use crate::{config::RateLimitConfig, error::AppError};

/// Upper bound on tracked clients; stale windows are swept when it is reached
const MAX_TRACKED_CLIENTS: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    trusted_proxies: Vec<IpAddr>,
    capacity: usize,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests.max(1),
            window: Duration::from_secs(config.window_secs.max(1)),
            trusted_proxies: config.trusted_proxies.clone(),
            capacity: MAX_TRACKED_CLIENTS,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request for `key`; `Err(retry_after_secs)` once over the limit
    pub async fn check(&self, key: &str) -> Result<(), u64> {
        self.check_at(key, Instant::now()).await
    }

    async fn check_at(&self, key: &str, now: Instant) -> Result<(), u64> {
        let mut windows = self.windows.lock().await;
        if !windows.contains_key(key) && windows.len() >= self.capacity {
            let window = self.window;
            windows.retain(|_, w| now.duration_since(w.started) < window);
            // Still full: new clients wait until the oldest window lapses
            if windows.len() >= self.capacity {
                let oldest = windows.values().map(|w| w.started).min().unwrap_or(now);
                return Err(self.retry_after(oldest, now));
            }
        }

        let entry = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count >= self.max_requests {
            return Err(self.retry_after(entry.started, now));
        }
        entry.count += 1;
        Ok(())
    }

    fn retry_after(&self, started: Instant, now: Instant) -> u64 {
        let remaining = self.window.saturating_sub(now.duration_since(started));
        // Round up so clients never retry a moment too early
        let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
        secs.max(1)
    }

    /// Key for the client behind `request`
    fn client_key(&self, request: &Request) -> String {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        match peer {
            Some(ip) if self.trusted_proxies.contains(&ip) => {
                forwarded_client(request).unwrap_or_else(|| ip.to_string())
            }
            Some(ip) => ip.to_string(),
            None => "unknown".to_string(),
        }
    }
}

/// Middleware guarding a router with a shared [`RateLimiter`]
pub async fn limit_requests(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = limiter.client_key(&request);
    if let Err(retry_after) = limiter.check(&key).await {
        tracing::warn!("🚦 Rate limit hit for {} on {}", key, request.uri().path());
        return Err(AppError::RateLimited { retry_after });
    }
    Ok(next.run(request).await)
}

fn forwarded_client(request: &Request) -> Option<String> {
    let headers = request.headers();
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    forwarded.or(real_ip).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn limiter(max_requests: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            max_requests,
            window_secs,
            trusted_proxies: vec!["10.0.0.1".parse().unwrap()],
        })
    }

    fn request_from(peer: [u8; 4], forwarded_for: &str) -> Request {
        Request::builder()
            .header("x-forwarded-for", forwarded_for)
            .header("x-real-ip", "10.0.0.2")
            .extension(ConnectInfo(SocketAddr::from((peer, 40_000))))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn blocks_after_limit_and_reports_retry_after() {
        let limiter = limiter(2, 60);
        let start = Instant::now();
        assert!(limiter.check_at("a", start).await.is_ok());
        assert!(limiter.check_at("a", start).await.is_ok());
        assert_eq!(
            limiter.check_at("a", start + Duration::from_secs(15)).await,
            Err(45)
        );
        // Other clients have their own window
        assert!(limiter.check_at("b", start).await.is_ok());
    }

    #[tokio::test]
    async fn window_resets_after_expiry() {
        let limiter = limiter(1, 10);
        let start = Instant::now();
        assert!(limiter.check_at("a", start).await.is_ok());
        assert!(limiter.check_at("a", start).await.is_err());
        assert!(limiter
            .check_at("a", start + Duration::from_secs(10))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn full_table_turns_away_new_clients_until_windows_lapse() {
        let mut limiter = limiter(5, 30);
        limiter.capacity = 2;
        let start = Instant::now();
        assert!(limiter.check_at("a", start).await.is_ok());
        assert!(limiter.check_at("b", start).await.is_ok());

        // Known clients keep their own windows
        assert!(limiter.check_at("a", start).await.is_ok());
        assert_eq!(
            limiter.check_at("c", start + Duration::from_secs(10)).await,
            Err(20)
        );
        assert_eq!(limiter.windows.lock().await.len(), 2);

        // Lapsed windows are swept to make room
        assert!(limiter
            .check_at("c", start + Duration::from_secs(30))
            .await
            .is_ok());
        assert_eq!(limiter.windows.lock().await.len(), 1);
    }

    #[test]
    fn forwarded_headers_only_count_from_trusted_proxies() {
        let limiter = limiter(1, 60);
        assert_eq!(
            limiter.client_key(&request_from([10, 0, 0, 1], "203.0.113.7, 10.0.0.1")),
            "203.0.113.7"
        );
        assert_eq!(
            limiter.client_key(&request_from([198, 51, 100, 9], "203.0.113.7")),
            "198.51.100.9"
        );

        let bare = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(limiter.client_key(&bare), "unknown");
    }
}
