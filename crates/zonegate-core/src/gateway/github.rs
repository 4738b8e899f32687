//! GitHub acceleration proxy: the catch-all for unclaimed paths.
//!
//! Tooling traffic (git, package managers, browsers) is relayed to the
//! upstream; account and bulk-download paths are refused so the host
//! does not become a generic mirror.

use axum::extract::Request;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::warn;

use super::{
    body_expected, forward_request_headers, outbound_method, relay_response, GatewayState,
};
use crate::ratelimit::{client_ip, RateLimiter};

/// A user agent must contain one of these fragments to pass.
const ALLOWED_USER_AGENTS: &[&str] = &[
    "git/",
    "curl/",
    "wget/",
    "libcurl/",
    "go-http-client",
    "python-requests",
    "axios/",
    "node-fetch",
    "mozilla/",
];

/// Paths never proxied: account surfaces and repo internals.
const BLOCKED_PATHS: &[&str] = &[
    "/login",
    "/logout",
    "/signup",
    "/join",
    "/sessions",
    "/settings",
    "/password_reset",
    "/users/",
    "/orgs/",
    "/.git/config",
];

/// Bulk artifact extensions kept off this proxy.
const BLOCKED_EXTENSIONS: &[&str] = &[
    ".zip", ".tar.gz", ".tgz", ".exe", ".dmg", ".pkg", ".deb", ".rpm", ".msi", ".iso",
];

const DEFAULT_USER_AGENT: &str = "git/2.40.0";

const CORS_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

pub fn is_allowed_user_agent(user_agent: &str) -> bool {
    let ua = user_agent.to_ascii_lowercase();
    !ua.is_empty() && ALLOWED_USER_AGENTS.iter().any(|allowed| ua.contains(allowed))
}

pub fn is_blocked_path(path: &str) -> bool {
    let path = path.to_ascii_lowercase();
    BLOCKED_PATHS.iter().any(|blocked| path.contains(blocked))
        || BLOCKED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

pub async fn handle(state: &GatewayState, request: Request, host: &str) -> Response {
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !is_allowed_user_agent(user_agent) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({
                "success": false,
                "error": "User agent not allowed",
                "hint": "Use git, curl, wget or a regular browser",
            })),
        )
            .into_response();
    }

    if is_blocked_path(request.uri().path()) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({
                "success": false,
                "error": "This path cannot be proxied",
            })),
        )
            .into_response();
    }

    let key = client_ip(request.headers());
    if !state.github_limiter.allow(&key).await {
        let window = state.config.github.rate_limit_window_secs;
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, window.to_string())],
            Json(json!({
                "success": false,
                "error": "Rate limit exceeded",
                "retry_after_secs": window,
            })),
        )
            .into_response();
    }

    let upstream_base = state.config.github.upstream.trim_end_matches('/').to_string();
    let path_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/")
        .to_string();
    let url = format!("{}{}", upstream_base, path_query);

    let (parts, body) = request.into_parts();
    let mut outbound = state
        .fetch_client
        .request(outbound_method(&parts.method), &url);
    outbound = forward_request_headers(outbound, &parts.headers, &["host"]);
    if !parts.headers.contains_key(header::USER_AGENT) {
        outbound = outbound.header(header::USER_AGENT.as_str(), DEFAULT_USER_AGENT);
    }

    if body_expected(&parts.method) {
        outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
    }

    match outbound.send().await {
        Ok(upstream) => {
            let mut response = relay_response(upstream, &[]);
            decorate_response(state, &mut response, host, &upstream_base);
            response
        }
        Err(e) => {
            warn!("GitHub proxy fetch for {} failed: {}", url, e);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "success": false,
                    "error": "Upstream fetch failed",
                    "url": url,
                })),
            )
                .into_response()
        }
    }
}

/// Stamps CORS and rate-limit headers, and points upstream redirects
/// back at this host so clients stay on the proxy.
fn decorate_response(
    state: &GatewayState,
    response: &mut Response,
    host: &str,
    upstream_base: &str,
) {
    let origin = super::request_origin(state, host);
    let headers = response.headers_mut();

    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(CORS_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("*"),
    );

    if let Ok(limit) = HeaderValue::try_from(state.config.github.rate_limit.to_string()) {
        headers.insert("x-ratelimit-limit", limit);
    }
    if let Ok(window) =
        HeaderValue::try_from(format!("{}s", state.config.github.rate_limit_window_secs))
    {
        headers.insert("x-ratelimit-window", window);
    }

    let location = headers
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    if let Some(location) = location {
        if location.contains(upstream_base) {
            if let Ok(rewritten) = HeaderValue::try_from(location.replace(upstream_base, &origin)) {
                headers.insert(header::LOCATION, rewritten);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tooling_and_browser_agents_pass() {
        assert!(is_allowed_user_agent("git/2.43.0"));
        assert!(is_allowed_user_agent("curl/8.4.0"));
        assert!(is_allowed_user_agent("Wget/1.21"));
        assert!(is_allowed_user_agent("Go-Http-Client/2.0"));
        assert!(is_allowed_user_agent(
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36"
        ));
    }

    #[test]
    fn unknown_or_empty_agents_are_refused() {
        assert!(!is_allowed_user_agent(""));
        assert!(!is_allowed_user_agent("evil-scraper/1.0"));
        assert!(!is_allowed_user_agent("Java/17"));
    }

    #[test]
    fn account_paths_are_blocked() {
        assert!(is_blocked_path("/login"));
        assert!(is_blocked_path("/settings/profile"));
        assert!(is_blocked_path("/users/octocat"));
        assert!(is_blocked_path("/USERS/octocat"));
        assert!(is_blocked_path("/torvalds/linux/.git/config"));
    }

    #[test]
    fn artifact_extensions_are_blocked() {
        assert!(is_blocked_path("/owner/repo/archive/main.zip"));
        assert!(is_blocked_path("/owner/repo/releases/download/v1/app.tar.gz"));
        assert!(is_blocked_path("/owner/repo/releases/download/v1/setup.exe"));
    }

    #[test]
    fn repository_paths_pass() {
        assert!(!is_blocked_path("/torvalds/linux"));
        assert!(!is_blocked_path("/torvalds/linux.git/info/refs"));
        assert!(!is_blocked_path("/owner/repo/releases"));
    }
}
