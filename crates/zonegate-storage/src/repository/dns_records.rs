//! DNS record repository

use crate::db::DatabasePool;
use crate::models::{CreateDnsRecord, DnsRecord};
use async_trait::async_trait;
use uuid::Uuid;
use zonegate_common::types::DnsRecordId;
use zonegate_common::{Error, Result};

/// DNS record repository trait
#[async_trait]
pub trait DnsRecordRepository: Send + Sync {
    async fn create(&self, input: CreateDnsRecord) -> Result<DnsRecord>;
    async fn get(&self, id: DnsRecordId) -> Result<Option<DnsRecord>>;
    async fn list_active(&self, subdomain: &str, zone: &str) -> Result<Vec<DnsRecord>>;
    async fn has_any(&self, subdomain: &str, zone: &str) -> Result<bool>;
    async fn exists(&self, subdomain: &str, zone: &str, record_type: &str, value: &str)
        -> Result<bool>;
    async fn has_active_cname(&self, subdomain: &str, zone: &str) -> Result<bool>;
    async fn has_active_other(&self, subdomain: &str, zone: &str) -> Result<bool>;
    async fn set_external_id(&self, id: DnsRecordId, external_id: &str) -> Result<()>;
    async fn update_record(
        &self,
        id: DnsRecordId,
        value: &str,
        ttl: i32,
        priority: i32,
        proxied: bool,
    ) -> Result<()>;
    async fn delete(&self, id: DnsRecordId) -> Result<bool>;
    async fn list_all(&self) -> Result<Vec<DnsRecord>>;
}

/// Database DNS record repository
pub struct DbDnsRecordRepository {
    pool: DatabasePool,
}

impl DbDnsRecordRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DnsRecordRepository for DbDnsRecordRepository {
    async fn create(&self, input: CreateDnsRecord) -> Result<DnsRecord> {
        let id = Uuid::now_v7();
        let now = chrono::Utc::now();

        sqlx::query(
            r#"
            INSERT INTO dns_records (
                id, subdomain, zone, record_type, value, ttl, priority, proxied,
                active, owner_email, user_key_hash, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE, $9, $10, $11, $12)
            "#,
        )
        .bind(id)
        .bind(&input.subdomain)
        .bind(&input.zone)
        .bind(input.record_type.as_str())
        .bind(&input.value)
        .bind(input.ttl)
        .bind(input.priority)
        .bind(input.proxied)
        .bind(&input.owner_email)
        .bind(&input.user_key_hash)
        .bind(now)
        .bind(now)
        .execute(self.pool.pool())
        .await
        .map_err(|e| super::map_insert_err(e, "DNS record"))?;

        sqlx::query_as::<_, DnsRecord>("SELECT * FROM dns_records WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?
            .ok_or_else(|| Error::Internal("Failed to create DNS record".to_string()))
    }

    async fn get(&self, id: DnsRecordId) -> Result<Option<DnsRecord>> {
        sqlx::query_as::<_, DnsRecord>("SELECT * FROM dns_records WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn list_active(&self, subdomain: &str, zone: &str) -> Result<Vec<DnsRecord>> {
        sqlx::query_as::<_, DnsRecord>(
            r#"
            SELECT * FROM dns_records
            WHERE subdomain = $1 AND zone = $2 AND active = TRUE
            ORDER BY priority ASC, created_at ASC
            "#,
        )
        .bind(subdomain)
        .bind(zone)
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn has_any(&self, subdomain: &str, zone: &str) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM dns_records WHERE subdomain = $1 AND zone = $2)",
        )
        .bind(subdomain)
        .bind(zone)
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn exists(
        &self,
        subdomain: &str,
        zone: &str,
        record_type: &str,
        value: &str,
    ) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM dns_records
                WHERE subdomain = $1 AND zone = $2
                  AND record_type = $3 AND value = $4
            )
            "#,
        )
        .bind(subdomain)
        .bind(zone)
        .bind(record_type)
        .bind(value)
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn has_active_cname(&self, subdomain: &str, zone: &str) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM dns_records
                WHERE subdomain = $1 AND zone = $2
                  AND record_type = 'CNAME' AND active = TRUE
            )
            "#,
        )
        .bind(subdomain)
        .bind(zone)
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn has_active_other(&self, subdomain: &str, zone: &str) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM dns_records
                WHERE subdomain = $1 AND zone = $2
                  AND record_type != 'CNAME' AND active = TRUE
            )
            "#,
        )
        .bind(subdomain)
        .bind(zone)
        .fetch_one(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn set_external_id(&self, id: DnsRecordId, external_id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE dns_records SET external_record_id = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(external_id)
        .bind(chrono::Utc::now())
        .execute(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    async fn update_record(
        &self,
        id: DnsRecordId,
        value: &str,
        ttl: i32,
        priority: i32,
        proxied: bool,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE dns_records
            SET value = $2, ttl = $3, priority = $4, proxied = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(value)
        .bind(ttl)
        .bind(priority)
        .bind(proxied)
        .bind(chrono::Utc::now())
        .execute(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, id: DnsRecordId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM dns_records WHERE id = $1")
            .bind(id)
            .execute(self.pool.pool())
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_all(&self) -> Result<Vec<DnsRecord>> {
        sqlx::query_as::<_, DnsRecord>(
            "SELECT * FROM dns_records ORDER BY zone, subdomain, record_type",
        )
        .fetch_all(self.pool.pool())
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }
}
