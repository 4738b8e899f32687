//! Short link repository

use crate::db::DatabasePool;
use crate::models::{CreateShortLink, ShortLink};
use async_trait::async_trait;
use uuid::Uuid;
use zonegate_common::{Error, Result};

/// Short link repository trait
#[async_trait]
pub trait LinkRepository: Send + Sync {
    async fn create(&self, input: CreateShortLink) -> Result<ShortLink>;
    async fn get_by_code(&self, code: &str) -> Result<Option<ShortLink>>;
    async fn code_exists(&self, code: &str) -> Result<bool>;
    async fn resolve_and_touch(&self, code: &str) -> Result<Option<ShortLink>>;
    async fn purge_expired(&self) -> Result<u64>;
}

/// Database short link repository
pub struct DbLinkRepository {
    pool: DatabasePool,
}

impl DbLinkRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkRepository for DbLinkRepository {
    async fn create(&self, input: CreateShortLink) -> Result<ShortLink> {
        let id = Uuid::now_v7();
        let now = chrono::Utc::now();

        sqlx::query(
            r#"
            INSERT INTO short_links (id, code, original_url, title, clicks, created_at, expires_at)
            VALUES ($1, $2, $3, $4, 0, $5, $6)
            "#,
        )
        .bind(id)
        .bind(&input.code)
        .bind(&input.original_url)
        .bind(&input.title)
        .bind(now)
        .bind(input.expires_at)
        .execute(self.pool.pool())
        .await
        .map_err(|e| super::map_insert_err(e, "Short link code"))?;

        sqlx::query_as::<_, ShortLink>("SELECT * FROM short_links WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?
            .ok_or_else(|| Error::Internal("Failed to create short link".to_string()))
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<ShortLink>> {
        sqlx::query_as::<_, ShortLink>("SELECT * FROM short_links WHERE code = $1")
            .bind(code)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn code_exists(&self, code: &str) -> Result<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM short_links WHERE code = $1)")
            .bind(code)
            .fetch_one(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    /// Count the click and return the link in one statement. Only links
    /// that are still valid are touched; expired and unknown codes both
    /// come back as `None` and the caller tells them apart via
    /// [`LinkRepository::get_by_code`].
    async fn resolve_and_touch(&self, code: &str) -> Result<Option<ShortLink>> {
        sqlx::query_as::<_, ShortLink>(
            r#"
            UPDATE short_links
            SET clicks = clicks + 1
            WHERE code = $1 AND (expires_at IS NULL OR expires_at > NOW())
            RETURNING *
            "#,
        )
        .bind(code)
        .fetch_optional(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn purge_expired(&self) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM short_links WHERE expires_at IS NOT NULL AND expires_at < NOW()")
                .execute(self.pool.pool())
                .await
                .map_err(|e| Error::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
