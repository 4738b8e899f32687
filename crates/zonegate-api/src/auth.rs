//! Admin authentication and request metering

use crate::error::ApiError;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use zonegate_common::{Config, Error};
use zonegate_core::{client_ip, FixedWindowLimiter, MirrorClient, RateLimiter};
use zonegate_storage::DatabasePool;

/// Header carrying the admin key for privileged endpoints
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Shared state for API routes
pub struct AppState {
    pub db_pool: DatabasePool,
    pub config: Arc<Config>,
    pub limiter: FixedWindowLimiter,
    pub mirror: MirrorClient,
}

impl AppState {
    pub fn new(config: Arc<Config>, db_pool: DatabasePool) -> Self {
        Self {
            limiter: FixedWindowLimiter::new(
                config.api.rate_limit,
                config.api.rate_limit_window_secs,
            ),
            mirror: MirrorClient::new(config.mirror.clone()),
            db_pool,
            config,
        }
    }
}

/// Hash a per-record management key. Only the hash is stored, and
/// ownership checks compare hashes.
pub fn hash_user_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check the admin header against the configured key.
///
/// Admin endpoints answer 503 while no key is configured, 401 when the
/// header is missing and 403 when it does not match.
pub fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let configured = match state.config.api.admin_key.as_deref() {
        Some(key) if !key.is_empty() => key,
        _ => {
            return Err(ApiError(Error::ServiceUnavailable(
                "Admin endpoints are not configured".to_string(),
            )))
        }
    };

    let presented = headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if presented.is_empty() {
        return Err(ApiError(Error::Auth("Admin key required".to_string())));
    }

    if presented != configured {
        return Err(ApiError(Error::PermissionDenied(
            "Invalid admin key".to_string(),
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use pretty_assertions::assert_eq;
    use zonegate_common::config::{ApiConfig, DatabaseConfig};

    fn test_state(admin_key: Option<&str>) -> AppState {
        let config = Config {
            server: Default::default(),
            database: DatabaseConfig {
                url: Some("postgres://localhost:1/zonegate_test".to_string()),
                ..Default::default()
            },
            gateway: Default::default(),
            api: ApiConfig {
                admin_key: admin_key.map(String::from),
                ..Default::default()
            },
            mail: Default::default(),
            dns: Default::default(),
            links: Default::default(),
            mirror: Default::default(),
            cleanup: Default::default(),
            logging: Default::default(),
        };

        let db_pool = DatabasePool::new_lazy(&config.database).unwrap();
        AppState::new(Arc::new(config), db_pool)
    }

    fn headers_with_key(key: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ADMIN_KEY_HEADER, HeaderValue::from_str(key).unwrap());
        headers
    }

    #[test]
    fn test_hash_user_key_is_stable_hex() {
        let hash = hash_user_key("my-secret-key");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, hash_user_key("my-secret-key"));
        assert_ne!(hash, hash_user_key("other-key"));
    }

    #[tokio::test]
    async fn test_admin_unconfigured_is_unavailable() {
        let state = test_state(None);
        let err = require_admin(&state, &HeaderMap::new()).unwrap_err();
        assert_eq!(err.0.status_code(), 503);
    }

    #[tokio::test]
    async fn test_admin_missing_key_is_unauthorized() {
        let state = test_state(Some("supersecret"));
        let err = require_admin(&state, &HeaderMap::new()).unwrap_err();
        assert_eq!(err.0.status_code(), 401);
    }

    #[tokio::test]
    async fn test_admin_wrong_key_is_forbidden() {
        let state = test_state(Some("supersecret"));
        let err = require_admin(&state, &headers_with_key("guess")).unwrap_err();
        assert_eq!(err.0.status_code(), 403);
    }

    #[tokio::test]
    async fn test_admin_matching_key_passes() {
        let state = test_state(Some("supersecret"));
        assert!(require_admin(&state, &headers_with_key("supersecret")).is_ok());
    }
}

/// Middleware guarding admin-only route groups
pub async fn admin_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    require_admin(&state, request.headers())?;
    Ok(next.run(request).await)
}

/// Blanket per-client limit across the API surface
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_ip(request.headers());
    if !state.limiter.allow(&key).await {
        let retry_after = state.config.api.rate_limit_window_secs;
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, retry_after.to_string())],
            Json(json!({
                "success": false,
                "error": "Rate limit exceeded",
                "code": "RATE_LIMITED",
                "retry_after_secs": retry_after,
            })),
        )
            .into_response();
    }

    next.run(request).await
}
