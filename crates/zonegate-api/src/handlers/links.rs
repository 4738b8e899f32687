//! Short link handlers

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use rand::Rng as _;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, OnceLock};
use url::Url;
use zonegate_common::Error;
use zonegate_storage::{CreateShortLink, LinkRepository, LinkRepositoryTrait, ShortLink};

fn custom_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{3,20}$").expect("valid pattern"))
}

#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub custom_code: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub expires_in_hours: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LinkBody {
    pub code: String,
    pub short_url: String,
    pub original_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub success: bool,
    pub link: LinkBody,
}

/// Public URL for a code, built from the first configured zone
fn short_url(state: &AppState, code: &str) -> String {
    let host = state
        .config
        .gateway
        .zones
        .first()
        .unwrap_or(&state.config.server.hostname);
    format!(
        "{}://{}/s/{}",
        state.config.gateway.public_scheme, host, code
    )
}

fn link_body(state: &AppState, link: &ShortLink) -> LinkBody {
    LinkBody {
        code: link.code.clone(),
        short_url: short_url(state, &link.code),
        original_url: link.original_url.clone(),
        title: link.title.clone(),
        expires_at: link.expires_at,
    }
}

fn generate_code(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(rand::distributions::Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Create a short link, honoring a requested custom code
pub async fn create_link(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateLinkRequest>,
) -> ApiResult<(StatusCode, Json<LinkResponse>)> {
    let target = input.url.trim();
    let parsed = Url::parse(target).map_err(|_| ApiError::validation("Invalid URL"))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ApiError::validation(
            "Only http and https URLs can be shortened",
        ));
    }

    let expires_at = match input.expires_in_hours {
        Some(hours) if hours <= 0 => {
            return Err(ApiError::validation("expires_in_hours must be positive"))
        }
        Some(hours) => Some(Utc::now() + Duration::hours(hours)),
        None => None,
    };

    let repo = LinkRepository::new(state.db_pool.clone());

    let code = match input.custom_code {
        Some(requested) => {
            let requested = requested.trim().to_string();
            if !custom_code_pattern().is_match(&requested) {
                return Err(ApiError::validation(
                    "Custom codes are 3-20 letters, digits, hyphens or underscores",
                ));
            }
            if repo.code_exists(&requested).await? {
                return Err(ApiError::conflict("That code is already taken"));
            }
            requested
        }
        None => {
            let mut generated = None;
            for _ in 0..state.config.links.max_generate_attempts {
                let candidate = generate_code(state.config.links.code_length);
                if !repo.code_exists(&candidate).await? {
                    generated = Some(candidate);
                    break;
                }
            }
            generated.ok_or_else(|| {
                ApiError(Error::Internal(
                    "Could not generate an unused code".to_string(),
                ))
            })?
        }
    };

    let link = repo
        .create(CreateShortLink {
            code,
            original_url: target.to_string(),
            title: input.title,
            expires_at,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LinkResponse {
            success: true,
            link: link_body(&state, &link),
        }),
    ))
}

/// Details for a code, expired or not
pub async fn get_link(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> ApiResult<Json<LinkResponse>> {
    let repo = LinkRepository::new(state.db_pool.clone());
    let link = repo
        .get_by_code(&code)
        .await?
        .ok_or_else(|| ApiError::not_found("Short link not found"))?;

    Ok(Json(LinkResponse {
        success: true,
        link: link_body(&state, &link),
    }))
}

/// Resolve a code to its target and count the click
pub async fn resolve_link(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> ApiResult<Response> {
    let repo = LinkRepository::new(state.db_pool.clone());
    if let Some(link) = repo.resolve_and_touch(&code).await? {
        return Ok(Json(json!({ "success": true, "url": link.original_url })).into_response());
    }

    // Tell a dead code apart from one that was never issued
    if repo.get_by_code(&code).await?.is_some() {
        Ok((
            StatusCode::GONE,
            Json(json!({
                "success": false,
                "error": "Short link has expired",
                "code": "GONE",
            })),
        )
            .into_response())
    } else {
        Err(ApiError::not_found("Short link not found"))
    }
}

/// Click statistics for a code
pub async fn link_stats(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let repo = LinkRepository::new(state.db_pool.clone());
    let link = repo
        .get_by_code(&code)
        .await?
        .ok_or_else(|| ApiError::not_found("Short link not found"))?;

    Ok(Json(json!({
        "success": true,
        "stats": {
            "code": link.code,
            "original_url": link.original_url,
            "title": link.title,
            "clicks": link.clicks,
            "created_at": link.created_at,
            "expires_at": link.expires_at,
            "is_expired": link.is_expired(),
        }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use zonegate_common::config::{Config, DatabaseConfig, GatewayConfig};
    use zonegate_storage::DatabasePool;

    fn test_state(zones: Vec<&str>) -> AppState {
        let config = Config {
            server: Default::default(),
            database: DatabaseConfig {
                url: Some("postgres://localhost:1/zonegate_test".to_string()),
                ..Default::default()
            },
            gateway: GatewayConfig {
                zones: zones.into_iter().map(String::from).collect(),
                ..Default::default()
            },
            api: Default::default(),
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

    #[test]
    fn test_generated_codes_are_alphanumeric() {
        for _ in 0..20 {
            let code = generate_code(6);
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn test_custom_code_pattern() {
        assert!(custom_code_pattern().is_match("my-link_1"));
        assert!(custom_code_pattern().is_match("abc"));
        assert!(!custom_code_pattern().is_match("ab"));
        assert!(!custom_code_pattern().is_match("has space"));
        assert!(!custom_code_pattern().is_match("way-too-long-for-a-code-x"));
        assert!(!custom_code_pattern().is_match("no/slash"));
    }

    #[tokio::test]
    async fn test_short_url_uses_first_zone() {
        let state = test_state(vec!["example.site", "example.dev"]);
        assert_eq!(
            short_url(&state, "abc123"),
            "https://example.site/s/abc123"
        );
    }

    #[tokio::test]
    async fn test_short_url_falls_back_to_hostname() {
        let state = test_state(vec![]);
        assert_eq!(short_url(&state, "abc123"), "https://localhost/s/abc123");
    }
}
