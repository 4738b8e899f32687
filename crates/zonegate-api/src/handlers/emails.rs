//! Mailbox handlers

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use zonegate_common::types::{EmailAddress, MessageId};
use zonegate_storage::{CreateEmail, Email, EmailRepository, EmailRepositoryTrait};

#[derive(Debug, Default, Deserialize)]
pub struct ListEmailsParams {
    #[serde(default)]
    pub hide_spam: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EmailListResponse {
    pub success: bool,
    pub email: String,
    pub count: usize,
    pub emails: Vec<Email>,
}

#[derive(Debug, Deserialize)]
pub struct IngestEmailRequest {
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub raw: Option<String>,
    #[serde(default)]
    pub verification_code: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub is_spam: bool,
    #[serde(default)]
    pub language: Option<String>,
}

/// List stored messages for a mailbox, newest first
pub async fn list_emails(
    State(state): State<Arc<AppState>>,
    Path(recipient): Path<String>,
    Query(params): Query<ListEmailsParams>,
) -> ApiResult<Json<EmailListResponse>> {
    let recipient = recipient.trim().to_lowercase();
    let hide_spam = params.hide_spam.as_deref() == Some("true");

    let repo = EmailRepository::new(state.db_pool.clone());
    let emails = repo
        .list_for_recipient(&recipient, hide_spam, state.config.mail.list_limit)
        .await?;

    Ok(Json(EmailListResponse {
        success: true,
        email: recipient,
        count: emails.len(),
        emails,
    }))
}

/// Store an inbound message. The retention clock starts now.
pub async fn ingest_email(
    State(state): State<Arc<AppState>>,
    Json(input): Json<IngestEmailRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let recipient = match EmailAddress::parse(input.to.trim()) {
        Some(address) => address.to_string().to_lowercase(),
        None => {
            return Err(ApiError::validation(
                "A valid recipient address is required",
            ))
        }
    };

    let sender = input.from.trim().to_string();
    if sender.is_empty() {
        return Err(ApiError::validation("Sender address is required"));
    }

    let expires_at = Utc::now() + Duration::hours(state.config.mail.retention_hours);

    let repo = EmailRepository::new(state.db_pool.clone());
    let stored = repo
        .create(CreateEmail {
            recipient,
            sender,
            subject: input.subject,
            text_body: input.text,
            html_body: input.html,
            raw_body: input.raw,
            verification_code: input.verification_code,
            summary: input.summary,
            is_spam: input.is_spam,
            language: input.language,
            expires_at,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "email": stored })),
    ))
}

/// Delete a message from its own mailbox
pub async fn delete_email(
    State(state): State<Arc<AppState>>,
    Path((recipient, id)): Path<(String, MessageId)>,
) -> ApiResult<Json<Value>> {
    let recipient = recipient.trim().to_lowercase();

    let repo = EmailRepository::new(state.db_pool.clone());
    if !repo.delete_owned(&recipient, id).await? {
        return Err(ApiError::not_found("No such message in this mailbox"));
    }

    Ok(Json(json!({ "success": true })))
}
