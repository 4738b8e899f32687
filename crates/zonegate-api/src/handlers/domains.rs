//! Mail domain directory handlers

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use zonegate_storage::{CreateDomain, Domain, DomainRepository, DomainRepositoryTrait};

#[derive(Debug, Serialize)]
pub struct DomainsResponse {
    pub success: bool,
    pub domains: Vec<Domain>,
}

/// List the domains the mailbox service accepts mail for
pub async fn list_domains(State(state): State<Arc<AppState>>) -> ApiResult<Json<DomainsResponse>> {
    let repo = DomainRepository::new(state.db_pool.clone());
    let domains = repo.list().await?;

    Ok(Json(DomainsResponse {
        success: true,
        domains,
    }))
}

/// Register a domain and its upstream API base
pub async fn create_domain(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateDomain>,
) -> ApiResult<(StatusCode, Json<DomainsResponse>)> {
    let name = input.name.trim().to_lowercase();
    let api_base = input.api_base.trim().to_string();
    if name.is_empty() || api_base.is_empty() {
        return Err(ApiError::validation("Both name and api_base are required"));
    }

    let repo = DomainRepository::new(state.db_pool.clone());
    repo.create(CreateDomain { name, api_base }).await?;
    let domains = repo.list().await?;

    Ok((
        StatusCode::CREATED,
        Json(DomainsResponse {
            success: true,
            domains,
        }),
    ))
}

/// Remove a domain from the directory (admin only)
pub async fn delete_domain(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<DomainsResponse>> {
    let name = name.trim().to_lowercase();

    let repo = DomainRepository::new(state.db_pool.clone());
    if !repo.delete_by_name(&name).await? {
        return Err(ApiError::not_found(format!(
            "Domain {} is not registered",
            name
        )));
    }
    let domains = repo.list().await?;

    Ok(Json(DomainsResponse {
        success: true,
        domains,
    }))
}
