//! Domain repository

use crate::db::DatabasePool;
use crate::models::{CreateDomain, Domain};
use async_trait::async_trait;
use uuid::Uuid;
use zonegate_common::{Error, Result};

/// Domain repository trait
#[async_trait]
pub trait DomainRepository: Send + Sync {
    async fn create(&self, input: CreateDomain) -> Result<Domain>;
    async fn get_by_name(&self, name: &str) -> Result<Option<Domain>>;
    async fn list(&self) -> Result<Vec<Domain>>;
    async fn delete_by_name(&self, name: &str) -> Result<bool>;
}

/// Database domain repository
pub struct DbDomainRepository {
    pool: DatabasePool,
}

impl DbDomainRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DomainRepository for DbDomainRepository {
    async fn create(&self, input: CreateDomain) -> Result<Domain> {
        let id = Uuid::now_v7();
        let now = chrono::Utc::now();

        sqlx::query(
            r#"
            INSERT INTO domains (id, name, api_base, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.api_base)
        .bind(now)
        .execute(self.pool.pool())
        .await
        .map_err(|e| super::map_insert_err(e, "Domain"))?;

        sqlx::query_as::<_, Domain>("SELECT * FROM domains WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?
            .ok_or_else(|| Error::Internal("Failed to create domain".to_string()))
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Domain>> {
        sqlx::query_as::<_, Domain>("SELECT * FROM domains WHERE name = $1")
            .bind(name)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn list(&self) -> Result<Vec<Domain>> {
        sqlx::query_as::<_, Domain>("SELECT * FROM domains ORDER BY created_at")
            .fetch_all(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn delete_by_name(&self, name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM domains WHERE name = $1")
            .bind(name)
            .execute(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
