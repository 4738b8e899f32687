//! Reverse proxy for subdomains whose CNAME points at a reachable origin.
//!
//! Plain HTTP to the target, one hop. Redirects from the origin are
//! relayed to the caller rather than followed.

use axum::extract::Request;
use axum::http::{header, HeaderName, HeaderValue};
use axum::response::Response;
use tracing::warn;

use super::{body_expected, outbound_method, relay_response, GatewayState};

/// Request headers carried through to the origin. Everything else is
/// dropped so the origin sees a clean hop.
const FORWARDED_REQUEST_HEADERS: &[HeaderName] = &[
    header::USER_AGENT,
    header::ACCEPT,
    header::ACCEPT_LANGUAGE,
];

/// The body is re-framed by this hop, so payload-transform headers from
/// the origin would lie to the client.
const STRIPPED_RESPONSE_HEADERS: &[&str] = &["content-encoding"];

const PROXY_MARKER: HeaderName = HeaderName::from_static("x-proxied-by");

pub async fn forward(
    state: &GatewayState,
    request: Request,
    subdomain: &str,
    zone: &str,
    target: &str,
) -> Response {
    let path_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/")
        .to_string();
    let url = format!("http://{}{}", target, path_query);

    let (parts, body) = request.into_parts();

    let mut outbound = state
        .proxy_client
        .request(outbound_method(&parts.method), &url)
        .timeout(std::time::Duration::from_secs(
            state.config.forward_timeout_secs,
        ))
        .header(header::HOST.as_str(), target)
        .header(header::CONNECTION.as_str(), "close")
        .header(header::ACCEPT_ENCODING.as_str(), "identity");

    for name in FORWARDED_REQUEST_HEADERS {
        if let Some(value) = parts.headers.get(name) {
            outbound = outbound.header(name.as_str(), value.as_bytes());
        }
    }

    if body_expected(&parts.method) {
        outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
    }

    match outbound.send().await {
        Ok(upstream) => {
            let mut response = relay_response(upstream, STRIPPED_RESPONSE_HEADERS);
            response
                .headers_mut()
                .insert(PROXY_MARKER, HeaderValue::from_static("zonegate"));
            response
        }
        Err(e) if e.is_timeout() => {
            warn!("Forward for {}.{} to {} timed out", subdomain, zone, target);
            state.pages.cname_error(
                subdomain,
                zone,
                target,
                axum::http::StatusCode::GATEWAY_TIMEOUT,
                None,
            )
        }
        Err(e) => {
            warn!("Forward for {}.{} to {} failed: {}", subdomain, zone, target, e);
            state.pages.cname_error(
                subdomain,
                zone,
                target,
                axum::http::StatusCode::BAD_GATEWAY,
                Some(&e.to_string()),
            )
        }
    }
}
