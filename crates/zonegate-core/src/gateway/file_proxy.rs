//! Remote file fetch proxy under `/proxy/?url=...`.
//!
//! Fetches a caller-supplied URL and streams it back with permissive
//! CORS. Loopback and private-network targets are refused so the proxy
//! cannot be aimed at internal services.

use std::net::{IpAddr, Ipv6Addr};

use axum::extract::{Query, Request};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use ipnet::Ipv6Net;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::GatewayState;

/// Response headers copied from the origin. Everything else is replaced
/// by this hop's own framing.
const RESPONSE_HEADER_ALLOW_LIST: &[&str] = &[
    "content-type",
    "content-length",
    "content-disposition",
    "accept-ranges",
    "content-range",
    "etag",
    "last-modified",
];

const FETCH_USER_AGENT: &str = "Mozilla/5.0";

#[derive(Debug, Default, Deserialize)]
struct ProxyParams {
    url: Option<String>,
}

pub async fn handle(state: &GatewayState, request: Request) -> Response {
    let params = Query::<ProxyParams>::try_from_uri(request.uri())
        .map(|q| q.0)
        .unwrap_or_default();

    let Some(target) = params.url.filter(|u| !u.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": "Missing url parameter",
                "usage": "/proxy/?url=https://example.com/path/to/file",
            })),
        )
            .into_response();
    };

    let parsed = match reqwest::Url::parse(&target) {
        Ok(parsed) => parsed,
        Err(_) => return bad_request("Invalid URL"),
    };

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return bad_request("Only http and https URLs are supported");
    }

    let Some(host) = parsed.host_str() else {
        return bad_request("Invalid URL");
    };

    if is_blocked_host(host, &state.config.file_proxy.blocked_hosts) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({
                "success": false,
                "error": "This host cannot be proxied",
            })),
        )
            .into_response();
    }

    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .filter(|ua| !ua.is_empty())
        .unwrap_or(FETCH_USER_AGENT)
        .to_string();

    let mut outbound = state
        .fetch_client
        .get(parsed.clone())
        .timeout(std::time::Duration::from_secs(
            state.config.file_proxy.timeout_secs,
        ))
        .header(header::USER_AGENT.as_str(), user_agent);

    if let Some(range) = request.headers().get(header::RANGE) {
        outbound = outbound.header(header::RANGE.as_str(), range.as_bytes());
    }

    match outbound.send().await {
        Ok(upstream) => file_response(upstream, &parsed),
        Err(e) if e.is_timeout() => (
            StatusCode::GATEWAY_TIMEOUT,
            Json(json!({
                "success": false,
                "error": "Upstream fetch timed out",
                "url": target,
            })),
        )
            .into_response(),
        Err(e) => {
            warn!("File proxy fetch for {} failed: {}", target, e);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "success": false,
                    "error": "Upstream fetch failed",
                    "url": target,
                })),
            )
                .into_response()
        }
    }
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "success": false,
            "error": message,
        })),
    )
        .into_response()
}

fn file_response(upstream: reqwest::Response, url: &reqwest::Url) -> Response {
    let status =
        StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("*"),
    );

    for name in RESPONSE_HEADER_ALLOW_LIST {
        if let Some(value) = upstream.headers().get(*name) {
            if let (Ok(name), Ok(value)) = (
                header::HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_bytes(value.as_bytes()),
            ) {
                headers.insert(name, value);
            }
        }
    }

    if !headers.contains_key(header::CONTENT_DISPOSITION) {
        if let Some(name) = attachment_name(url) {
            if let Ok(value) =
                HeaderValue::try_from(format!("attachment; filename=\"{}\"", name))
            {
                headers.insert(header::CONTENT_DISPOSITION, value);
            }
        }
    }

    (
        status,
        headers,
        axum::body::Body::from_stream(upstream.bytes_stream()),
    )
        .into_response()
}

/// Refuses configured hosts plus anything that resolves textually to a
/// loopback, private, or unspecified address.
fn is_blocked_host(host: &str, blocked: &[String]) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');

    if blocked.iter().any(|b| b.eq_ignore_ascii_case(host)) {
        return true;
    }

    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => {
            v4.is_loopback() || v4.is_unspecified() || v4.is_private() || v4.is_link_local()
        }
        Ok(IpAddr::V6(v6)) => v6.is_loopback() || v6.is_unspecified() || unique_local().contains(&v6),
        Err(_) => false,
    }
}

/// fc00::/7, the IPv6 unique-local range.
fn unique_local() -> Ipv6Net {
    Ipv6Net::new(Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, 0), 7).expect("valid prefix length")
}

/// Filename for a synthesized Content-Disposition: the last path segment
/// when it looks like a file.
fn attachment_name(url: &reqwest::Url) -> Option<String> {
    let name = url.path_segments()?.filter(|s| !s.is_empty()).last()?;

    if !name.contains('.') {
        return None;
    }

    let clean: String = name
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect();

    if clean.is_empty() {
        None
    } else {
        Some(clean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn blocked() -> Vec<String> {
        vec![
            "localhost".to_string(),
            "127.0.0.1".to_string(),
            "0.0.0.0".to_string(),
            "::1".to_string(),
        ]
    }

    #[test]
    fn configured_hosts_are_blocked_case_insensitively() {
        assert!(is_blocked_host("localhost", &blocked()));
        assert!(is_blocked_host("LOCALHOST", &blocked()));
        assert!(is_blocked_host("::1", &blocked()));
    }

    #[test]
    fn loopback_and_private_ranges_are_blocked() {
        assert!(is_blocked_host("127.0.0.2", &blocked()));
        assert!(is_blocked_host("10.1.2.3", &blocked()));
        assert!(is_blocked_host("192.168.0.10", &blocked()));
        assert!(is_blocked_host("169.254.1.1", &blocked()));
        assert!(is_blocked_host("fc00::1", &blocked()));
        assert!(is_blocked_host("[fd12::34]", &blocked()));
    }

    #[test]
    fn public_hosts_pass() {
        assert!(!is_blocked_host("example.com", &blocked()));
        assert!(!is_blocked_host("203.0.113.9", &blocked()));
        assert!(!is_blocked_host("2001:db8::1", &blocked()));
    }

    #[test]
    fn lookalike_host_names_are_not_substring_blocked() {
        assert!(!is_blocked_host("localhost.example.com", &blocked()));
        assert!(!is_blocked_host("not-localhost.net", &blocked()));
    }

    #[test]
    fn attachment_names_come_from_file_like_segments() {
        let url = reqwest::Url::parse("https://example.com/releases/app-1.2.tar").unwrap();
        assert_eq!(attachment_name(&url), Some("app-1.2.tar".to_string()));

        let url = reqwest::Url::parse("https://example.com/just/a/dir/").unwrap();
        assert_eq!(attachment_name(&url), None);

        let url = reqwest::Url::parse("https://example.com/noext").unwrap();
        assert_eq!(attachment_name(&url), None);
    }

    #[test]
    fn attachment_names_keep_the_encoded_segment() {
        // The URL parser percent-encodes path segments, so quotes never
        // reach the header raw.
        let url = reqwest::Url::parse("https://example.com/we%22ird.bin").unwrap();
        assert_eq!(attachment_name(&url), Some("we%22ird.bin".to_string()));
    }
}
