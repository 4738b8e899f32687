//! Mailbox message repository

use crate::db::DatabasePool;
use crate::models::{CreateEmail, Email};
use async_trait::async_trait;
use uuid::Uuid;
use zonegate_common::types::MessageId;
use zonegate_common::{Error, Result};

/// Mailbox message repository trait
#[async_trait]
pub trait EmailRepository: Send + Sync {
    async fn create(&self, input: CreateEmail) -> Result<Email>;
    async fn list_for_recipient(
        &self,
        recipient: &str,
        hide_spam: bool,
        limit: i64,
    ) -> Result<Vec<Email>>;
    async fn delete_owned(&self, recipient: &str, id: MessageId) -> Result<bool>;
    async fn purge_expired(&self) -> Result<u64>;
}

/// Database mailbox message repository
pub struct DbEmailRepository {
    pool: DatabasePool,
}

impl DbEmailRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmailRepository for DbEmailRepository {
    async fn create(&self, input: CreateEmail) -> Result<Email> {
        let id = Uuid::now_v7();
        let now = chrono::Utc::now();

        sqlx::query(
            r#"
            INSERT INTO emails (
                id, recipient, sender, subject, text_body, html_body, raw_body,
                verification_code, summary, is_spam, language, received_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(id)
        .bind(&input.recipient)
        .bind(&input.sender)
        .bind(&input.subject)
        .bind(&input.text_body)
        .bind(&input.html_body)
        .bind(&input.raw_body)
        .bind(&input.verification_code)
        .bind(&input.summary)
        .bind(input.is_spam)
        .bind(&input.language)
        .bind(now)
        .bind(input.expires_at)
        .execute(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        sqlx::query_as::<_, Email>("SELECT * FROM emails WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?
            .ok_or_else(|| Error::Internal("Failed to store message".to_string()))
    }

    async fn list_for_recipient(
        &self,
        recipient: &str,
        hide_spam: bool,
        limit: i64,
    ) -> Result<Vec<Email>> {
        let query = if hide_spam {
            r#"
            SELECT * FROM emails
            WHERE recipient = $1 AND is_spam = FALSE
            ORDER BY received_at DESC
            LIMIT $2
            "#
        } else {
            r#"
            SELECT * FROM emails
            WHERE recipient = $1
            ORDER BY received_at DESC
            LIMIT $2
            "#
        };

        sqlx::query_as::<_, Email>(query)
            .bind(recipient)
            .bind(limit)
            .fetch_all(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn delete_owned(&self, recipient: &str, id: MessageId) -> Result<bool> {
        // Ownership enforced in the statement itself
        let result = sqlx::query("DELETE FROM emails WHERE id = $1 AND recipient = $2")
            .bind(id)
            .bind(recipient)
            .execute(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM emails WHERE expires_at < NOW()")
            .execute(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
