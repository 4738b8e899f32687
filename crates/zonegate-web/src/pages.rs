//! Page rendering
//!
//! Wraps the template engine with one method per gateway page. Handlers
//! get a ready `Response` with the right status; a template failure is
//! logged and turned into a minimal 500 page.

use crate::templates::Templates;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::Serialize;

const FALLBACK_HTML: &str =
    "<!DOCTYPE html><html><body><h1>500 - Internal error</h1></body></html>";

/// One row of the DNS info table
#[derive(Debug, Clone, Serialize)]
pub struct RecordRow {
    #[serde(rename = "type")]
    pub record_type: String,
    pub value: String,
    pub ttl: i32,
    pub priority: i32,
}

/// Gateway page renderer
pub struct Pages {
    templates: Templates,
}

impl Pages {
    pub fn new() -> Self {
        Self {
            templates: Templates::new(),
        }
    }

    fn render(&self, name: &str, status: StatusCode, context: &serde_json::Value) -> Response {
        match self.templates.render(name, context) {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!(template = name, "Template error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, Html(FALLBACK_HTML)).into_response()
            }
        }
    }

    /// Service documentation page served at `/`
    pub fn docs(&self, origin: &str, host: &str, zones: &[String]) -> Response {
        let context = serde_json::json!({
            "origin": origin,
            "host": host,
            "zones": zones,
        });
        self.render("docs", StatusCode::OK, &context)
    }

    /// 404 page for a zone subdomain without active records
    pub fn subdomain_not_found(
        &self,
        subdomain: &str,
        zone: &str,
        reason: Option<&str>,
    ) -> Response {
        let fqdn = format!("{}.{}", subdomain, zone);
        let context = serde_json::json!({
            "fqdn": fqdn,
            "subdomain": subdomain,
            "zone": zone,
            "reason": reason,
        });
        self.render("subdomain_404", StatusCode::NOT_FOUND, &context)
    }

    /// 503 page when the record store cannot be queried
    pub fn resolver_unavailable(&self, subdomain: &str, zone: &str) -> Response {
        let context = serde_json::json!({
            "fqdn": format!("{}.{}", subdomain, zone),
        });
        self.render("resolver_error", StatusCode::SERVICE_UNAVAILABLE, &context)
    }

    /// Landing page for a CNAME bound to a hosting platform
    pub fn cname_bound(&self, subdomain: &str, zone: &str, target: &str) -> Response {
        let context = serde_json::json!({
            "fqdn": format!("{}.{}", subdomain, zone),
            "target": target,
        });
        self.render("cname_bound", StatusCode::OK, &context)
    }

    /// 502/504 page when a proxied CNAME target fails
    pub fn cname_error(
        &self,
        subdomain: &str,
        zone: &str,
        target: &str,
        status: StatusCode,
        detail: Option<&str>,
    ) -> Response {
        let context = serde_json::json!({
            "fqdn": format!("{}.{}", subdomain, zone),
            "target": target,
            "status": status.as_u16(),
            "detail": detail,
        });
        self.render("cname_error", status, &context)
    }

    /// Info page listing active records for a name
    pub fn dns_info(&self, subdomain: &str, zone: &str, records: &[RecordRow]) -> Response {
        let context = serde_json::json!({
            "fqdn": format!("{}.{}", subdomain, zone),
            "records": records,
        });
        self.render("dns_info", StatusCode::OK, &context)
    }

    /// Short link error page (unknown, expired, or backend failure)
    pub fn link_error(&self, status: StatusCode, code: Option<&str>, message: &str) -> Response {
        let context = serde_json::json!({
            "status": status.as_u16(),
            "code": code,
            "message": message,
        });
        self.render("link_error", status, &context)
    }
}

impl Default for Pages {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_docs_page_mentions_origin() {
        let pages = Pages::new();
        let response = pages.docs("https://gw.example.site", "gw.example.site", &[]);
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_of(response).await;
        assert!(body.contains("https://gw.example.site/api/emails"));
    }

    #[tokio::test]
    async fn test_subdomain_404_names_the_fqdn() {
        let pages = Pages::new();
        let response = pages.subdomain_not_found("blog", "example.site", None);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_of(response).await;
        assert!(body.contains("blog.example.site"));
    }

    #[tokio::test]
    async fn test_cname_error_picks_timeout_wording() {
        let pages = Pages::new();
        let response = pages.cname_error(
            "app",
            "example.site",
            "origin.internal",
            StatusCode::GATEWAY_TIMEOUT,
            None,
        );
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let body = body_of(response).await;
        assert!(body.contains("timed out"));
    }

    #[tokio::test]
    async fn test_dns_info_lists_records() {
        let pages = Pages::new();
        let rows = vec![RecordRow {
            record_type: "MX".to_string(),
            value: "mx1.example.net".to_string(),
            ttl: 3600,
            priority: 10,
        }];
        let body = body_of(pages.dns_info("mail", "example.site", &rows)).await;
        assert!(body.contains("mx1.example.net"));
        assert!(body.contains("MX"));
    }
}
