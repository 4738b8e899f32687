//! DNS record management handlers
//!
//! Records are self-service: whoever registers a name supplies a
//! management key, and later changes prove ownership by presenting the
//! same key. Provider mirroring is two-phase, with the local row
//! authoritative and mirror failures logged rather than surfaced.

use crate::auth::{hash_user_key, require_admin, AppState};
use crate::error::{ApiError, ApiResult};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};
use tracing::warn;
use url::Url;
use zonegate_common::types::DnsRecordId;
use zonegate_common::Error;
use zonegate_core::MirrorUpsert;
use zonegate_storage::{
    CreateDnsRecord, DnsRecord, DnsRecordRepository, DnsRecordRepositoryTrait, DnsRecordType,
};

struct Validators {
    subdomain: Regex,
    hostname: Regex,
    ipv6_full: Regex,
    ipv6_compressed: Regex,
    srv: Regex,
    caa: Regex,
}

fn validators() -> &'static Validators {
    static VALIDATORS: OnceLock<Validators> = OnceLock::new();
    VALIDATORS.get_or_init(|| Validators {
        subdomain: Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").expect("valid pattern"),
        hostname: Regex::new(
            r"(?i)^[a-z0-9]([a-z0-9-]*[a-z0-9])?(\.[a-z0-9]([a-z0-9-]*[a-z0-9])?)*\.?$",
        )
        .expect("valid pattern"),
        ipv6_full: Regex::new(r"(?i)^([0-9a-f]{1,4}:){7}[0-9a-f]{1,4}$").expect("valid pattern"),
        ipv6_compressed: Regex::new(
            r"(?i)^([0-9a-f]{1,4}(:[0-9a-f]{1,4})*)?::([0-9a-f]{1,4}(:[0-9a-f]{1,4})*)?$",
        )
        .expect("valid pattern"),
        srv: Regex::new(r"(?i)^\d+\s+\d+\s+\d+\s+[a-z0-9.-]+$").expect("valid pattern"),
        caa: Regex::new(r"(?i)^\d+\s+(issue|issuewild|iodef)\s+.+$").expect("valid pattern"),
    })
}

fn valid_subdomain(subdomain: &str) -> bool {
    subdomain == "@" || validators().subdomain.is_match(subdomain)
}

/// Per-type value syntax; the message is surfaced in a 400
fn validate_value(record_type: DnsRecordType, value: &str) -> Result<(), String> {
    match record_type {
        DnsRecordType::A => {
            let octets: Vec<&str> = value.split('.').collect();
            let ok = octets.len() == 4
                && octets.iter().all(|octet| {
                    !octet.is_empty()
                        && octet.len() <= 3
                        && octet.chars().all(|c| c.is_ascii_digit())
                        && octet.parse::<u16>().map(|n| n <= 255).unwrap_or(false)
                });
            if ok {
                Ok(())
            } else {
                Err("A records need a valid IPv4 address".to_string())
            }
        }
        DnsRecordType::Aaaa => {
            let v = validators();
            if v.ipv6_full.is_match(value)
                || (value.contains("::") && v.ipv6_compressed.is_match(value))
            {
                Ok(())
            } else {
                Err("AAAA records need a valid IPv6 address".to_string())
            }
        }
        DnsRecordType::Cname | DnsRecordType::Ns | DnsRecordType::Mx => {
            if validators().hostname.is_match(value) {
                Ok(())
            } else {
                Err(format!("{} records need a hostname target", record_type))
            }
        }
        DnsRecordType::Txt => {
            if value.chars().count() > 1024 {
                Err("TXT records are limited to 1024 characters".to_string())
            } else {
                Ok(())
            }
        }
        DnsRecordType::Redirect => match Url::parse(value) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(()),
            _ => Err("REDIRECT records need an http or https URL".to_string()),
        },
        DnsRecordType::Srv => {
            if validators().srv.is_match(value) {
                Ok(())
            } else {
                Err("SRV records use: priority weight port target".to_string())
            }
        }
        DnsRecordType::Caa => {
            if validators().caa.is_match(value) {
                Ok(())
            } else {
                Err("CAA records use: flags issue|issuewild|iodef value".to_string())
            }
        }
    }
}

/// Pick the zone to operate on, defaulting to the first configured one
fn resolve_zone(state: &AppState, requested: Option<&str>) -> Result<String, ApiError> {
    match requested {
        Some(zone) => {
            let zone = zone.trim().to_lowercase();
            if state
                .config
                .gateway
                .zones
                .iter()
                .any(|z| z.eq_ignore_ascii_case(&zone))
            {
                Ok(zone)
            } else {
                Err(ApiError::validation(format!("Unknown zone: {}", zone)))
            }
        }
        None => state.config.gateway.zones.first().cloned().ok_or_else(|| {
            ApiError(Error::ServiceUnavailable(
                "No zones are configured".to_string(),
            ))
        }),
    }
}

async fn mirror_create(state: &AppState, upsert: &MirrorUpsert<'_>) -> Option<String> {
    if !state.mirror.is_enabled_for(upsert.zone) || !upsert.record_type.mirror_supported() {
        return None;
    }

    match state.mirror.create_record(upsert).await {
        Ok(id) => Some(id),
        Err(e) => {
            warn!(
                "Mirror create for {}.{} failed: {}",
                upsert.subdomain, upsert.zone, e
            );
            None
        }
    }
}

async fn mirror_delete(state: &AppState, record: &DnsRecord) {
    if let Some(external_id) = record.external_record_id.as_deref() {
        if state.mirror.is_enabled_for(&record.zone) {
            if let Err(e) = state.mirror.delete_record(&record.zone, external_id).await {
                warn!("Mirror delete for {} failed: {}", record.fqdn(), e);
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRecordRequest {
    #[serde(default)]
    pub subdomain: String,
    #[serde(default)]
    pub zone: String,
    #[serde(rename = "type", default)]
    pub record_type: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub ttl: Option<i32>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub proxied: bool,
    #[serde(default)]
    pub owner_email: Option<String>,
    #[serde(default)]
    pub user_key: String,
}

#[derive(Debug, Serialize)]
pub struct RecordBody {
    pub id: DnsRecordId,
    pub subdomain: String,
    pub zone: String,
    pub fqdn: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub value: String,
    pub ttl: i32,
    pub priority: i32,
    pub proxied: bool,
    pub mirrored: bool,
}

impl RecordBody {
    fn from_record(record: &DnsRecord) -> Self {
        Self {
            id: record.id,
            subdomain: record.subdomain.clone(),
            zone: record.zone.clone(),
            fqdn: record.fqdn(),
            record_type: record.record_type.clone(),
            value: record.value.clone(),
            ttl: record.ttl,
            priority: record.priority,
            proxied: record.proxied,
            mirrored: record.external_record_id.is_some(),
        }
    }
}

/// Register a record. The caller's key becomes the management credential.
pub async fn create_dns_record(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateRecordRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let user_key = input.user_key.trim();
    let min_key = state.config.dns.min_key_len;
    if user_key.chars().count() < min_key {
        return Err(ApiError::validation(format!(
            "user_key must be at least {} characters",
            min_key
        )));
    }

    let zone = input.zone.trim().to_lowercase();
    if !state
        .config
        .gateway
        .zones
        .iter()
        .any(|z| z.eq_ignore_ascii_case(&zone))
    {
        return Err(ApiError::validation(format!("Unknown zone: {}", zone)));
    }

    let subdomain = input.subdomain.trim().to_lowercase();
    let value = input.value.trim().to_string();
    let type_raw = input.record_type.trim();
    if subdomain.is_empty() || type_raw.is_empty() || value.is_empty() {
        return Err(ApiError::validation(
            "subdomain, type and value are required",
        ));
    }

    let record_type: DnsRecordType = type_raw.parse()?;

    if !valid_subdomain(&subdomain) {
        return Err(ApiError::validation(
            "Subdomains are 1-63 lowercase letters, digits or hyphens",
        ));
    }

    if let Err(message) = validate_value(record_type, &value) {
        return Err(ApiError::validation(message));
    }

    let ttl = input.ttl.unwrap_or(3600);
    let (min_ttl, max_ttl) = (state.config.dns.min_ttl, state.config.dns.max_ttl);
    if ttl < min_ttl || ttl > max_ttl {
        return Err(ApiError::validation(format!(
            "TTL must be between {} and {} seconds",
            min_ttl, max_ttl
        )));
    }

    if subdomain != "@"
        && state
            .config
            .dns
            .reserved_subdomains
            .iter()
            .any(|reserved| reserved == &subdomain)
    {
        return Err(ApiError::forbidden(format!(
            "The subdomain {} is reserved",
            subdomain
        )));
    }

    let repo = DnsRecordRepository::new(state.db_pool.clone());

    // CNAME is exclusive with every other type on the same name
    if record_type == DnsRecordType::Cname {
        if repo.has_active_other(&subdomain, &zone).await? {
            return Err(ApiError::conflict(
                "A CNAME cannot coexist with other records on this name",
            ));
        }
    } else if repo.has_active_cname(&subdomain, &zone).await? {
        return Err(ApiError::conflict(
            "This name already has a CNAME; remove it first",
        ));
    }

    if repo
        .exists(&subdomain, &zone, record_type.as_str(), &value)
        .await?
    {
        return Err(ApiError::conflict("An identical record already exists"));
    }

    let priority = input.priority.unwrap_or(0);

    // The local row is authoritative and lands first; the provider write
    // follows and its failure is logged, never unwound
    let record = repo
        .create(CreateDnsRecord {
            subdomain,
            zone,
            record_type,
            value,
            ttl,
            priority,
            proxied: input.proxied,
            owner_email: input.owner_email,
            user_key_hash: hash_user_key(user_key),
        })
        .await?;

    let external_id = mirror_create(
        &state,
        &MirrorUpsert {
            subdomain: &record.subdomain,
            zone: &record.zone,
            record_type,
            value: &record.value,
            ttl: record.ttl,
            priority: record.priority,
            proxied: record.proxied,
        },
    )
    .await;
    if let Some(ref external_id) = external_id {
        repo.set_external_id(record.id, external_id).await?;
    }

    let mut body = RecordBody::from_record(&record);
    body.mirrored = external_id.is_some();

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "record": body })),
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct ZoneParams {
    #[serde(default)]
    pub zone: Option<String>,
}

/// Availability probe used by the registration form
pub async fn check_subdomain(
    State(state): State<Arc<AppState>>,
    Path(subdomain): Path<String>,
    Query(params): Query<ZoneParams>,
) -> ApiResult<Json<Value>> {
    let zone = resolve_zone(&state, params.zone.as_deref())?;
    let subdomain = subdomain.trim().to_lowercase();

    let unavailable =
        |reason: &str| Json(json!({ "success": true, "available": false, "reason": reason }));

    if subdomain != "@" {
        if subdomain.chars().count() < 2 {
            return Ok(unavailable("too short"));
        }
        if !validators().subdomain.is_match(&subdomain) {
            return Ok(unavailable("invalid format"));
        }
        if state
            .config
            .dns
            .reserved_subdomains
            .iter()
            .any(|reserved| reserved == &subdomain)
        {
            return Ok(unavailable("reserved"));
        }
    }

    let repo = DnsRecordRepository::new(state.db_pool.clone());
    if repo.has_any(&subdomain, &zone).await? {
        return Ok(unavailable("taken"));
    }

    Ok(Json(json!({ "success": true, "available": true })))
}

#[derive(Debug, Default, Deserialize)]
pub struct ResolveParams {
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(rename = "type", default)]
    pub record_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResolvedRecord {
    #[serde(rename = "type")]
    pub record_type: String,
    pub value: String,
    pub ttl: i32,
    pub priority: i32,
    pub proxied: bool,
}

/// Active records for a name, unmasked, in priority order
pub async fn resolve_records(
    State(state): State<Arc<AppState>>,
    Path(subdomain): Path<String>,
    Query(params): Query<ResolveParams>,
) -> ApiResult<Json<Value>> {
    let zone = resolve_zone(&state, params.zone.as_deref())?;
    let subdomain = subdomain.trim().to_lowercase();

    let type_filter = match params.record_type.as_deref() {
        Some(raw) => Some(raw.parse::<DnsRecordType>()?),
        None => None,
    };

    let repo = DnsRecordRepository::new(state.db_pool.clone());
    let records: Vec<ResolvedRecord> = repo
        .list_active(&subdomain, &zone)
        .await?
        .into_iter()
        .filter(|record| match type_filter {
            Some(wanted) => record.record_type() == Some(wanted),
            None => true,
        })
        .map(|record| ResolvedRecord {
            record_type: record.record_type,
            value: record.value,
            ttl: record.ttl,
            priority: record.priority,
            proxied: record.proxied,
        })
        .collect();

    if records.is_empty() {
        return Err(ApiError::not_found("No active records found"));
    }

    Ok(Json(json!({ "success": true, "records": records })))
}

/// Public directory of registered names, with values masked
pub async fn list_public_records(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let repo = DnsRecordRepository::new(state.db_pool.clone());
    let records: Vec<Value> = repo
        .list_all()
        .await?
        .iter()
        .map(|record| {
            json!({
                "subdomain": record.subdomain,
                "zone": record.zone,
                "fqdn": record.fqdn(),
                "type": record.record_type,
                "value": record.masked_value(),
                "ttl": record.ttl,
                "proxied": record.proxied,
                "active": record.active,
                "created_at": record.created_at,
            })
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "total": records.len(),
        "records": records,
    })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRecordRequest {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub ttl: Option<i32>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub proxied: Option<bool>,
    #[serde(default)]
    pub user_key: String,
}

/// Update an owned record. The stored type is fixed; the new value is
/// validated against it.
pub async fn update_dns_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DnsRecordId>,
    Json(input): Json<UpdateRecordRequest>,
) -> ApiResult<Json<Value>> {
    let repo = DnsRecordRepository::new(state.db_pool.clone());
    let record = repo
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Record not found"))?;

    if hash_user_key(input.user_key.trim()) != record.user_key_hash {
        return Err(ApiError::forbidden("The key does not match this record"));
    }

    let record_type = record.record_type().ok_or_else(|| {
        ApiError(Error::Internal(format!(
            "Stored record {} has an unknown type",
            record.id
        )))
    })?;

    let value = match input.value {
        Some(new_value) => {
            let new_value = new_value.trim().to_string();
            if let Err(message) = validate_value(record_type, &new_value) {
                return Err(ApiError::validation(message));
            }
            new_value
        }
        None => record.value.clone(),
    };

    let ttl = input.ttl.unwrap_or(record.ttl);
    if ttl < state.config.dns.min_ttl || ttl > state.config.dns.max_ttl {
        return Err(ApiError::validation(format!(
            "TTL must be between {} and {} seconds",
            state.config.dns.min_ttl, state.config.dns.max_ttl
        )));
    }
    let priority = input.priority.unwrap_or(record.priority);
    let proxied = input.proxied.unwrap_or(record.proxied);

    repo.update_record(id, &value, ttl, priority, proxied)
        .await?;
    let updated = repo
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Record not found"))?;

    if let Some(external_id) = updated.external_record_id.as_deref() {
        if state.mirror.is_enabled_for(&updated.zone) {
            let upsert = MirrorUpsert {
                subdomain: &updated.subdomain,
                zone: &updated.zone,
                record_type,
                value: &updated.value,
                ttl: updated.ttl,
                priority: updated.priority,
                proxied: updated.proxied,
            };
            if let Err(e) = state.mirror.update_record(external_id, &upsert).await {
                warn!("Mirror update for {} failed: {}", updated.fqdn(), e);
            }
        }
    }

    Ok(Json(json!({
        "success": true,
        "record": RecordBody::from_record(&updated),
    })))
}

#[derive(Debug, Deserialize)]
pub struct DeleteRecordRequest {
    #[serde(default)]
    pub user_key: String,
}

/// Delete a record by presenting its management key
pub async fn delete_own_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DnsRecordId>,
    Json(input): Json<DeleteRecordRequest>,
) -> ApiResult<Json<Value>> {
    let repo = DnsRecordRepository::new(state.db_pool.clone());
    let record = repo
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Record not found"))?;

    if hash_user_key(input.user_key.trim()) != record.user_key_hash {
        return Err(ApiError::forbidden("The key does not match this record"));
    }

    repo.delete(id).await?;
    mirror_delete(&state, &record).await;

    Ok(Json(json!({ "success": true })))
}

/// Admin removal of any record
pub async fn admin_delete_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DnsRecordId>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    require_admin(&state, &headers)?;

    let repo = DnsRecordRepository::new(state.db_pool.clone());
    let record = repo
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Record not found"))?;

    repo.delete(id).await?;
    mirror_delete(&state, &record).await;

    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subdomain_shapes() {
        assert!(valid_subdomain("blog"));
        assert!(valid_subdomain("my-app-2"));
        assert!(valid_subdomain("@"));
        assert!(valid_subdomain("a1"));

        assert!(!valid_subdomain(""));
        assert!(!valid_subdomain("-leading"));
        assert!(!valid_subdomain("trailing-"));
        assert!(!valid_subdomain("has.dot"));
        assert!(!valid_subdomain("UPPER"));
        assert!(!valid_subdomain(&"x".repeat(64)));
    }

    #[test]
    fn test_a_record_values() {
        assert!(validate_value(DnsRecordType::A, "192.0.2.1").is_ok());
        assert!(validate_value(DnsRecordType::A, "255.255.255.255").is_ok());

        assert!(validate_value(DnsRecordType::A, "256.0.0.1").is_err());
        assert!(validate_value(DnsRecordType::A, "1.2.3").is_err());
        assert!(validate_value(DnsRecordType::A, "1.2.3.4.5").is_err());
        assert!(validate_value(DnsRecordType::A, "a.b.c.d").is_err());
        assert!(validate_value(DnsRecordType::A, "1.2.3.").is_err());
    }

    #[test]
    fn test_aaaa_record_values() {
        assert!(validate_value(DnsRecordType::Aaaa, "2001:0db8:0000:0000:0000:0000:0000:0001").is_ok());
        assert!(validate_value(DnsRecordType::Aaaa, "2001:db8::1").is_ok());
        assert!(validate_value(DnsRecordType::Aaaa, "::1").is_ok());
        assert!(validate_value(DnsRecordType::Aaaa, "fe80::").is_ok());
        assert!(validate_value(DnsRecordType::Aaaa, "::").is_ok());

        assert!(validate_value(DnsRecordType::Aaaa, "1::2::3").is_err());
        assert!(validate_value(DnsRecordType::Aaaa, ":::").is_err());
        assert!(validate_value(DnsRecordType::Aaaa, "g::1").is_err());
        assert!(validate_value(DnsRecordType::Aaaa, "12345::1").is_err());
        assert!(validate_value(DnsRecordType::Aaaa, "192.0.2.1").is_err());
    }

    #[test]
    fn test_hostname_record_values() {
        assert!(validate_value(DnsRecordType::Cname, "my-project.pages.dev").is_ok());
        assert!(validate_value(DnsRecordType::Cname, "example.com.").is_ok());
        assert!(validate_value(DnsRecordType::Mx, "mail.example.com").is_ok());
        assert!(validate_value(DnsRecordType::Ns, "ns1.example.com").is_ok());

        assert!(validate_value(DnsRecordType::Cname, "-bad.example.com").is_err());
        assert!(validate_value(DnsRecordType::Cname, "spaced out.com").is_err());
        assert!(validate_value(DnsRecordType::Cname, "").is_err());
    }

    #[test]
    fn test_txt_record_length() {
        assert!(validate_value(DnsRecordType::Txt, "v=spf1 -all").is_ok());
        assert!(validate_value(DnsRecordType::Txt, &"x".repeat(1024)).is_ok());
        assert!(validate_value(DnsRecordType::Txt, &"x".repeat(1025)).is_err());
    }

    #[test]
    fn test_redirect_record_values() {
        assert!(validate_value(DnsRecordType::Redirect, "https://example.com/landing").is_ok());
        assert!(validate_value(DnsRecordType::Redirect, "http://example.com").is_ok());

        assert!(validate_value(DnsRecordType::Redirect, "ftp://example.com").is_err());
        assert!(validate_value(DnsRecordType::Redirect, "not a url").is_err());
        assert!(validate_value(DnsRecordType::Redirect, "example.com").is_err());
    }

    #[test]
    fn test_srv_and_caa_record_values() {
        assert!(validate_value(DnsRecordType::Srv, "10 5 8080 target.example.com").is_ok());
        assert!(validate_value(DnsRecordType::Srv, "0 0 443 host").is_ok());
        assert!(validate_value(DnsRecordType::Srv, "10 5 abc host").is_err());
        assert!(validate_value(DnsRecordType::Srv, "10 5080").is_err());

        assert!(validate_value(DnsRecordType::Caa, "0 issue letsencrypt.org").is_ok());
        assert!(validate_value(DnsRecordType::Caa, "128 iodef mailto:ops@example.com").is_ok());
        assert!(validate_value(DnsRecordType::Caa, "0 grant anything").is_err());
    }
}
