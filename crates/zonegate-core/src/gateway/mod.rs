//! Wildcard edge gateway.
//!
//! Every request lands in one fallback handler, gets classified by host
//! and path, and is dispatched to a record resolver or one of the proxy
//! surfaces. There is no silent default: unmatched traffic ends at the
//! GitHub catch-all or the service index, never at a hidden backend.

pub mod classifier;
pub mod docker;
pub mod file_proxy;
pub mod forwarder;
pub mod github;
pub mod resolver;

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use zonegate_common::{config::GatewayConfig, Config, Error, Result};
use zonegate_storage::{DatabasePool, LinkRepository, LinkRepositoryTrait};
use zonegate_web::Pages;

use crate::ratelimit::FixedWindowLimiter;
use classifier::RouteTarget;

const CORS_METHODS: &str = "GET, POST, DELETE, OPTIONS";
const CORS_HEADERS: &str = "Content-Type, X-Admin-Key";

/// Response headers that describe the hop, not the payload. Never
/// relayed from an upstream.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Shared state for the gateway. Cloned per request, so everything
/// heavier than a handle lives behind an `Arc`.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<GatewayConfig>,
    pub db: DatabasePool,
    pub pages: Arc<Pages>,
    pub github_limiter: Arc<FixedWindowLimiter>,
    /// Client for hop-faithful proxying. Redirects are relayed to the
    /// caller, never followed.
    pub(crate) proxy_client: reqwest::Client,
    /// Client for fetch-style surfaces that follow redirects.
    pub(crate) fetch_client: reqwest::Client,
}

impl GatewayState {
    pub fn new(config: GatewayConfig, db: DatabasePool) -> Self {
        let connect_timeout = std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS);

        let proxy_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(connect_timeout)
            .build()
            .expect("Failed to create HTTP client");

        let fetch_client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .expect("Failed to create HTTP client");

        let github_limiter = Arc::new(FixedWindowLimiter::new(
            config.github.rate_limit,
            config.github.rate_limit_window_secs,
        ));

        Self {
            config: Arc::new(config),
            db,
            pages: Arc::new(Pages::new()),
            github_limiter,
            proxy_client,
            fetch_client,
        }
    }
}

/// Builds the gateway router: a single fallback handler behind tracing.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the gateway listener and serves until the task is aborted.
pub async fn run(config: &Config, db: DatabasePool) -> Result<()> {
    let state = GatewayState::new(config.gateway.clone(), db);
    let addr = format!("{}:{}", config.server.bind_address, config.gateway.port);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind gateway listener on {addr}: {e}")))?;

    info!("Gateway listening on {}", addr);

    axum::serve(listener, router(state))
        .await
        .map_err(|e| Error::Internal(format!("Gateway server error: {e}")))
}

async fn dispatch(State(state): State<GatewayState>, request: Request) -> Response {
    if request.method() == Method::OPTIONS {
        return preflight(request.uri().path(), state.config.docker.enabled);
    }

    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let path = request.uri().path().to_string();

    match classifier::classify(&host, &path, &state.config.zones) {
        RouteTarget::ZoneRecord { subdomain, zone } => {
            resolver::serve_zone(&state, request, &subdomain, &zone).await
        }
        RouteTarget::Api => forward_api(&state, request).await,
        RouteTarget::Docs => {
            if wants_json(request.headers()) {
                service_index(&state)
            } else {
                let origin = request_origin(&state, &host);
                state.pages.docs(&origin, display_host(&host), &state.config.zones)
            }
        }
        RouteTarget::FileProxy => file_proxy::handle(&state, request).await,
        RouteTarget::ShortLink { code } => follow_short_link(&state, &code).await,
        RouteTarget::Docker => {
            if state.config.docker.enabled {
                docker::handle(&state, request).await
            } else {
                github::handle(&state, request, &host).await
            }
        }
        RouteTarget::GitHub => github::handle(&state, request, &host).await,
        RouteTarget::ServiceIndex => service_index(&state),
    }
}

fn preflight(path: &str, docker_enabled: bool) -> Response {
    if docker_enabled && (path == "/v2" || path.starts_with("/v2/")) {
        return docker::preflight();
    }

    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, CORS_METHODS),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, CORS_HEADERS),
        ],
    )
        .into_response()
}

fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.contains("application/json"))
        .unwrap_or(false)
}

fn request_origin(state: &GatewayState, host: &str) -> String {
    format!("{}://{}", state.config.public_scheme, display_host(host))
}

fn display_host(host: &str) -> &str {
    if host.is_empty() {
        "localhost"
    } else {
        host
    }
}

fn service_index(state: &GatewayState) -> Response {
    Json(json!({
        "success": true,
        "service": "zonegate",
        "status": "running",
        "zones": *state.config.zones,
        "endpoints": {
            "api": "/api",
            "docs": "/",
            "file_proxy": "/proxy/?url=",
            "short_links": "/s/{code}",
            "docker_mirror": "/v2/",
            "github_proxy": "/{owner}/{repo}",
        },
    }))
    .into_response()
}

/// Redirects `/s/{code}`, counting the click. Unknown codes render a 404
/// page, expired ones a 410.
async fn follow_short_link(state: &GatewayState, code: &str) -> Response {
    let links = LinkRepository::new(state.db.clone());

    match links.resolve_and_touch(code).await {
        Ok(Some(link)) => (
            StatusCode::FOUND,
            [
                (header::LOCATION, link.original_url),
                (header::CACHE_CONTROL, "no-cache".to_string()),
            ],
        )
            .into_response(),
        Ok(None) => match links.get_by_code(code).await {
            Ok(Some(_)) => state.pages.link_error(
                StatusCode::GONE,
                Some(code),
                "This short link has expired.",
            ),
            Ok(None) => {
                state
                    .pages
                    .link_error(StatusCode::NOT_FOUND, Some(code), "Short link not found.")
            }
            Err(e) => {
                error!("Short link lookup for {} failed: {}", code, e);
                state.pages.link_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    None,
                    "Short links are temporarily unavailable.",
                )
            }
        },
        Err(e) => {
            error!("Short link resolve for {} failed: {}", code, e);
            state.pages.link_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                None,
                "Short links are temporarily unavailable.",
            )
        }
    }
}

/// Relays `/api/*` and `/health*` to the REST backend unchanged, with
/// permissive CORS stamped on the way out.
async fn forward_api(state: &GatewayState, request: Request) -> Response {
    let path_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/")
        .to_string();
    let url = format!(
        "{}{}",
        state.config.api_upstream.trim_end_matches('/'),
        path_query
    );

    let (parts, body) = request.into_parts();
    let mut outbound = state
        .proxy_client
        .request(outbound_method(&parts.method), &url);
    outbound = forward_request_headers(outbound, &parts.headers, &["host"]);

    if body_expected(&parts.method) {
        outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
    }

    match outbound.send().await {
        Ok(upstream) => {
            let mut response = relay_response(upstream, &[]);
            set_cors(response.headers_mut());
            response
        }
        Err(e) => {
            warn!("API passthrough to {} failed: {}", url, e);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "success": false,
                    "error": "API backend unreachable",
                })),
            )
                .into_response()
        }
    }
}

pub(crate) fn set_cors(headers: &mut HeaderMap) {
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
        HeaderValue::from_static(CORS_HEADERS),
    );
}

pub(crate) fn outbound_method(method: &Method) -> reqwest::Method {
    reqwest::Method::from_bytes(method.as_str().as_bytes()).unwrap_or(reqwest::Method::GET)
}

pub(crate) fn body_expected(method: &Method) -> bool {
    method != Method::GET && method != Method::HEAD
}

/// Copies request headers onto an outbound builder, skipping hop-by-hop
/// headers and any name in `skip`.
pub(crate) fn forward_request_headers(
    mut outbound: reqwest::RequestBuilder,
    headers: &HeaderMap,
    skip: &[&str],
) -> reqwest::RequestBuilder {
    for (name, value) in headers {
        let name_str = name.as_str();
        if HOP_BY_HOP_HEADERS.contains(&name_str)
            || skip.iter().any(|s| s.eq_ignore_ascii_case(name_str))
        {
            continue;
        }
        outbound = outbound.header(name_str, value.as_bytes());
    }
    outbound
}

/// Turns an upstream response into a streamed client response. Hop-by-hop
/// headers are always dropped; `strip` removes surface-specific ones.
pub(crate) fn relay_response(upstream: reqwest::Response, strip: &[&str]) -> Response {
    let status =
        StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);

    let mut headers = HeaderMap::new();
    for (name, value) in upstream.headers() {
        let name_str = name.as_str();
        if HOP_BY_HOP_HEADERS.contains(&name_str)
            || strip.iter().any(|s| s.eq_ignore_ascii_case(name_str))
        {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name_str.as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            headers.append(name, value);
        }
    }

    (status, headers, Body::from_stream(upstream.bytes_stream())).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;
    use pretty_assertions::assert_eq;
    use zonegate_common::config::DatabaseConfig;

    fn test_state() -> GatewayState {
        let mut gateway = GatewayConfig::default();
        gateway.zones = vec!["example.site".to_string()];
        gateway.docker.enabled = false;

        let db_config = DatabaseConfig {
            url: Some("postgres://localhost:1/zonegate_test".to_string()),
            ..Default::default()
        };
        let db = DatabasePool::new_lazy(&db_config).unwrap();

        GatewayState::new(gateway, db)
    }

    fn test_server() -> TestServer {
        TestServer::new(router(test_state())).unwrap()
    }

    #[tokio::test]
    async fn root_serves_the_docs_page() {
        let server = test_server();
        let response = server.get("/").await;

        assert_eq!(response.status_code(), StatusCode::OK);
        assert!(response.text().contains("Zonegate"));
    }

    #[tokio::test]
    async fn root_serves_json_when_asked() {
        let server = test_server();
        let response = server
            .get("/")
            .add_header(header::ACCEPT, HeaderValue::from_static("application/json"))
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["service"], "zonegate");
    }

    #[test]
    fn options_preflight_carries_cors_headers() {
        let response = preflight("/api/domains", false);

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            CORS_METHODS
        );
    }

    #[test]
    fn registry_preflight_exposes_docker_headers() {
        let response = preflight("/v2/", true);

        let headers = response.headers();
        let methods = headers
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert!(methods.contains("PUT"));
        assert!(headers.contains_key(header::ACCESS_CONTROL_EXPOSE_HEADERS));
    }

    #[test]
    fn disabled_registry_preflight_is_generic() {
        let response = preflight("/v2/", false);

        let headers = response.headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            CORS_METHODS
        );
    }

    #[tokio::test]
    async fn file_proxy_without_url_is_a_400() {
        let server = test_server();
        let response = server.get("/proxy/").await;

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn catch_all_rejects_unknown_user_agents() {
        let server = test_server();
        let response = server.get("/torvalds/linux").await;

        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn disabled_docker_surface_falls_to_the_catch_all() {
        let server = test_server();
        let response = server.get("/v2/").await;

        // The catch-all's user-agent gate answers, not the registry.
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn zone_subdomain_renders_the_resolver_error_page_without_a_store() {
        let server = test_server();
        let response = server
            .get("/")
            .add_header(header::HOST, HeaderValue::from_static("app.example.site"))
            .await;

        assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.text().contains("Record lookup failed"));
    }
}
