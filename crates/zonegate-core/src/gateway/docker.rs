//! Container registry mirror under `/v2/`.
//!
//! A near-transparent relay to the configured registry. Auth challenges
//! pass through untouched; clients follow the `WWW-Authenticate` realm
//! to the registry's own token service.

use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::warn;

use super::{body_expected, forward_request_headers, outbound_method, relay_response, GatewayState};

/// Headers not forwarded to the registry. Edge-added client metadata
/// stays on this side, and the upstream negotiates its own encoding.
const STRIPPED_REQUEST_HEADERS: &[&str] = &[
    "host",
    "accept-encoding",
    "cf-connecting-ip",
    "cf-ray",
    "cf-visitor",
    "cf-ipcountry",
];

const STRIPPED_RESPONSE_HEADERS: &[&str] = &["content-encoding"];

const REGISTRY_CORS_METHODS: &str = "GET, HEAD, POST, PUT, DELETE, OPTIONS";
const REGISTRY_CORS_HEADERS: &str = "Authorization, Content-Type, X-Requested-With";
const REGISTRY_CORS_EXPOSE: &str =
    "Docker-Content-Digest, Content-Length, Content-Range, WWW-Authenticate";

pub fn preflight() -> Response {
    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, REGISTRY_CORS_METHODS),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, REGISTRY_CORS_HEADERS),
            (header::ACCESS_CONTROL_EXPOSE_HEADERS, REGISTRY_CORS_EXPOSE),
        ],
    )
        .into_response()
}

pub async fn handle(state: &GatewayState, request: Request) -> Response {
    let mirror = state.config.docker.mirror.trim_end_matches('/').to_string();
    let path_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/")
        .to_string();
    let url = format!("{}{}", mirror, path_query);

    let (parts, body) = request.into_parts();
    let mut outbound = state
        .fetch_client
        .request(outbound_method(&parts.method), &url);
    outbound = forward_request_headers(outbound, &parts.headers, STRIPPED_REQUEST_HEADERS);

    if body_expected(&parts.method) {
        outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
    }

    match outbound.send().await {
        Ok(upstream) => {
            let mut response = relay_response(upstream, STRIPPED_RESPONSE_HEADERS);
            let headers = response.headers_mut();
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                header::HeaderValue::from_static("*"),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                header::HeaderValue::from_static(REGISTRY_CORS_METHODS),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                header::HeaderValue::from_static(REGISTRY_CORS_HEADERS),
            );
            headers.insert(
                header::ACCESS_CONTROL_EXPOSE_HEADERS,
                header::HeaderValue::from_static(REGISTRY_CORS_EXPOSE),
            );
            response
        }
        Err(e) => {
            warn!("Registry mirror request to {} failed: {}", url, e);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "success": false,
                    "error": "Registry mirror unreachable",
                    "mirror": mirror,
                })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use zonegate_common::config::{DatabaseConfig, GatewayConfig};
    use zonegate_storage::DatabasePool;

    fn test_state(mirror: String) -> GatewayState {
        let mut gateway = GatewayConfig::default();
        gateway.docker.mirror = mirror;

        let db_config = DatabaseConfig {
            url: Some("postgres://localhost:1/zonegate_test".to_string()),
            ..Default::default()
        };
        let db = DatabasePool::new_lazy(&db_config).unwrap();

        GatewayState::new(gateway, db)
    }

    #[tokio::test]
    async fn auth_challenges_pass_through_with_registry_cors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/"))
            .respond_with(ResponseTemplate::new(401).insert_header(
                "www-authenticate",
                "Bearer realm=\"https://auth.example.io/token\",service=\"registry.example.io\"",
            ))
            .mount(&server)
            .await;

        let state = test_state(server.uri());
        let request = Request::builder()
            .uri("/v2/")
            .body(Body::empty())
            .unwrap();
        let response = handle(&state, request).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let headers = response.headers();
        assert!(headers
            .get(header::WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .contains("auth.example.io"));
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        assert!(headers
            .get(header::ACCESS_CONTROL_EXPOSE_HEADERS)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .contains("Docker-Content-Digest"));
    }

    #[tokio::test]
    async fn manifests_are_relayed_with_path_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/library/alpine/manifests/latest"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{\"schemaVersion\":2}")
                    .insert_header(
                        "content-type",
                        "application/vnd.docker.distribution.manifest.v2+json",
                    ),
            )
            .mount(&server)
            .await;

        let state = test_state(server.uri());
        let request = Request::builder()
            .uri("/v2/library/alpine/manifests/latest")
            .body(Body::empty())
            .unwrap();
        let response = handle(&state, request).await;

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"{\"schemaVersion\":2}");
    }

    #[tokio::test]
    async fn unreachable_mirror_names_itself_in_the_502() {
        let state = test_state("http://127.0.0.1:1".to_string());
        let request = Request::builder()
            .uri("/v2/")
            .body(Body::empty())
            .unwrap();
        let response = handle(&state, request).await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["mirror"], "http://127.0.0.1:1");
    }
}
