//! In-memory request rate limiting keyed by client IP.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::HeaderMap;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Default cap on tracked keys before stale entries are swept out.
const DEFAULT_MAX_TRACKED_KEYS: usize = 10_000;

/// Decides whether a request identified by `key` may proceed.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Returns `true` if the request is within the limit. A `true` result
    /// counts the request against the caller's window.
    async fn allow(&self, key: &str) -> bool;
}

/// Fixed-window limiter holding per-key hit timestamps in memory.
///
/// State is process-local. Counts reset on restart, which is acceptable
/// for the abuse ceilings this enforces.
pub struct FixedWindowLimiter {
    limit: usize,
    window: Duration,
    max_tracked_keys: usize,
    hits: Mutex<HashMap<String, Vec<Instant>>>,
}

impl FixedWindowLimiter {
    pub fn new(limit: u32, window_secs: u64) -> Self {
        Self {
            limit: limit as usize,
            window: Duration::from_secs(window_secs),
            max_tracked_keys: DEFAULT_MAX_TRACKED_KEYS,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Overrides the tracked-key cap before stale entries are evicted.
    pub fn with_max_tracked_keys(mut self, max: usize) -> Self {
        self.max_tracked_keys = max;
        self
    }

    async fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut hits = self.hits.lock().await;

        // Bound memory under key churn: drop keys whose newest hit has
        // already aged out of the window.
        if hits.len() > self.max_tracked_keys {
            let window = self.window;
            hits.retain(|_, stamps| {
                matches!(stamps.last(), Some(last) if now.duration_since(*last) < window)
            });
        }

        let stamps = hits.entry(key.to_string()).or_default();
        stamps.retain(|stamp| now.duration_since(*stamp) < self.window);

        if stamps.len() >= self.limit {
            return false;
        }

        stamps.push(now);
        true
    }
}

#[async_trait]
impl RateLimiter for FixedWindowLimiter {
    async fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now()).await
    }
}

/// Extracts the client IP from proxy headers, in trust order:
/// `CF-Connecting-IP`, then `X-Real-IP`, then the first entry of
/// `X-Forwarded-For`. Falls back to `0.0.0.0` when none is present.
pub fn client_ip(headers: &HeaderMap) -> String {
    for name in ["cf-connecting-ip", "x-real-ip"] {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            let value = value.trim();
            if !value.is_empty() {
                return value.to_string();
            }
        }
    }

    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    "0.0.0.0".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn allows_up_to_limit_then_denies() {
        let limiter = FixedWindowLimiter::new(3, 60);

        assert!(limiter.allow("1.2.3.4").await);
        assert!(limiter.allow("1.2.3.4").await);
        assert!(limiter.allow("1.2.3.4").await);
        assert!(!limiter.allow("1.2.3.4").await);

        // Other keys are unaffected.
        assert!(limiter.allow("5.6.7.8").await);
    }

    #[tokio::test(start_paused = true)]
    async fn window_expiry_frees_the_key() {
        let limiter = FixedWindowLimiter::new(2, 60);

        assert!(limiter.allow("1.2.3.4").await);
        assert!(limiter.allow("1.2.3.4").await);
        assert!(!limiter.allow("1.2.3.4").await);

        tokio::time::advance(Duration::from_secs(61)).await;

        assert!(limiter.allow("1.2.3.4").await);
    }

    #[tokio::test(start_paused = true)]
    async fn evicts_stale_keys_past_the_cap() {
        let limiter = FixedWindowLimiter::new(5, 60).with_max_tracked_keys(2);

        assert!(limiter.allow("a").await);
        assert!(limiter.allow("b").await);
        assert!(limiter.allow("c").await);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(limiter.allow("d").await);

        let hits = limiter.hits.lock().await;
        assert_eq!(hits.len(), 1);
        assert!(hits.contains_key("d"));
    }

    #[test]
    fn client_ip_prefers_cf_header() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("203.0.113.9"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.1"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("192.0.2.1, 10.0.0.2"));

        assert_eq!(client_ip(&headers), "203.0.113.9");
    }

    #[test]
    fn client_ip_takes_first_forwarded_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static(" 192.0.2.1 , 10.0.0.2"),
        );

        assert_eq!(client_ip(&headers), "192.0.2.1");
    }

    #[test]
    fn client_ip_defaults_when_absent() {
        assert_eq!(client_ip(&HeaderMap::new()), "0.0.0.0");
    }
}
