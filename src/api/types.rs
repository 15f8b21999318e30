//! Shared types for the HTTP API layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::api::error::ApiError;
use crate::core_state::CoreState;
use crate::identity::Session;

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
/// Wraps `CoreState` plus API-specific caches.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self {
            core,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new())),
        }
    }

    /// Run blocking DB or key-derivation work on a dedicated thread so the
    /// async workers stay free.
    pub async fn blocking<T, F>(&self, work: F) -> Result<T, ApiError>
    where
        F: FnOnce(&CoreState) -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        let core = self.core.clone();
        tokio::task::spawn_blocking(move || work(&core))
            .await
            .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
    }
}

// ═══════════════════════════════════════════════════════════
// Session context: injected by auth middleware
// ═══════════════════════════════════════════════════════════

/// Authenticated caller, injected into request extensions by the auth
/// middleware after the bearer token resolved to a live session.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub token: String,
    pub session: Session,
}

/// Extract the bearer token from an `Authorization` header value.
pub fn bearer_token(header: Option<&axum::http::HeaderValue>) -> Option<&str> {
    header
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

// ═══════════════════════════════════════════════════════════
// Rate limiter: per-client sliding window
// ═══════════════════════════════════════════════════════════

const HOUR: Duration = Duration::from_secs(3600);

/// Tracked clients above which idle windows are swept on the next check.
const RATE_CLEANUP_THRESHOLD: usize = 1000;

/// Per-client rate limiter with per-minute and per-hour limits.
/// Clients are keyed by peer address, never by anything the caller
/// can vary freely.
pub struct RateLimiter {
    windows: HashMap<String, Vec<Instant>>,
    per_minute: u32,
    per_hour: u32,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_limits(100, 1000)
    }

    pub fn with_limits(per_minute: u32, per_hour: u32) -> Self {
        Self {
            windows: HashMap::new(),
            per_minute,
            per_hour,
        }
    }

    /// Check if a client is within rate limits. Returns `Ok(())` or
    /// `Err(retry_after_secs)` if exceeded.
    pub fn check(&mut self, client: &str) -> Result<(), u64> {
        if self.windows.len() > RATE_CLEANUP_THRESHOLD {
            self.cleanup();
        }

        let now = Instant::now();
        let entries = self.windows.entry(client.to_string()).or_default();

        // Clean entries older than 1 hour
        entries.retain(|ts| now.duration_since(*ts) < HOUR);

        let last_minute = entries
            .iter()
            .filter(|ts| now.duration_since(**ts) < Duration::from_secs(60))
            .count() as u32;
        if last_minute >= self.per_minute {
            return Err(60);
        }

        if entries.len() as u32 >= self.per_hour {
            return Err(3600);
        }

        entries.push(now);
        Ok(())
    }

    /// Number of clients currently holding a window.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Drop every client with no request in the last hour.
    pub fn cleanup(&mut self) {
        let now = Instant::now();
        self.windows.retain(|_, entries| {
            entries.retain(|ts| now.duration_since(*ts) < HOUR);
            !entries.is_empty()
        });
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn rate_limiter_allows_within_limit() {
        let mut limiter = RateLimiter::new();
        for _ in 0..99 {
            assert!(limiter.check("client-1").is_ok());
        }
    }

    #[test]
    fn rate_limiter_blocks_at_minute_limit() {
        let mut limiter = RateLimiter::with_limits(3, 1000);
        for _ in 0..3 {
            limiter.check("client-1").unwrap();
        }
        assert_eq!(limiter.check("client-1"), Err(60));
    }

    #[test]
    fn rate_limiter_blocks_at_hour_limit() {
        let mut limiter = RateLimiter::with_limits(1000, 5);
        for _ in 0..5 {
            limiter.check("client-1").unwrap();
        }
        assert_eq!(limiter.check("client-1"), Err(3600));
    }

    #[test]
    fn rate_limiter_separate_clients() {
        let mut limiter = RateLimiter::with_limits(1, 10);
        limiter.check("client-1").unwrap();
        assert!(limiter.check("client-1").is_err());
        assert!(limiter.check("client-2").is_ok());
    }

    #[test]
    fn cleanup_drops_idle_clients_only() {
        let mut limiter = RateLimiter::new();
        limiter.check("10.0.0.1").unwrap();
        limiter
            .windows
            .insert("10.0.0.2".into(), vec![Instant::now() - Duration::from_secs(3700)]);
        limiter.windows.insert("10.0.0.3".into(), Vec::new());

        limiter.cleanup();
        assert_eq!(limiter.tracked_clients(), 1);
        assert!(limiter.windows.contains_key("10.0.0.1"));
    }

    #[test]
    fn large_client_map_is_swept_on_check() {
        let mut limiter = RateLimiter::new();
        let stale = Instant::now() - Duration::from_secs(3700);
        for i in 0..=RATE_CLEANUP_THRESHOLD {
            limiter.windows.insert(format!("stale-{i}"), vec![stale]);
        }
        limiter.check("fresh").unwrap();
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn bearer_token_parsing() {
        let good = HeaderValue::from_static("Bearer abc123");
        assert_eq!(bearer_token(Some(&good)), Some("abc123"));

        let basic = HeaderValue::from_static("Basic abc123");
        assert_eq!(bearer_token(Some(&basic)), None);

        let empty = HeaderValue::from_static("Bearer ");
        assert_eq!(bearer_token(Some(&empty)), None);
        assert_eq!(bearer_token(None), None);
    }
}
