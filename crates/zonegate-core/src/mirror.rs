//! Client for the upstream DNS provider that mirrors locally created records.
//!
//! Mirroring is two-phase everywhere: the local row is the source of truth
//! and a mirror failure never rolls it back. Callers log and carry on.

use serde::{Deserialize, Serialize};
use zonegate_common::{config::MirrorConfig, Error, Result};
use zonegate_storage::DnsRecordType;

const MIRROR_TIMEOUT_SECS: u64 = 10;

/// Record fields pushed to the provider on create and update.
#[derive(Debug, Clone, Copy)]
pub struct MirrorUpsert<'a> {
    pub subdomain: &'a str,
    pub zone: &'a str,
    pub record_type: DnsRecordType,
    pub value: &'a str,
    pub ttl: i32,
    pub priority: i32,
    pub proxied: bool,
}

#[derive(Debug, Serialize)]
struct RecordPayload<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: String,
    content: &'a str,
    ttl: i32,
    proxied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    success: bool,
    #[serde(default)]
    errors: Vec<ProviderError>,
    result: Option<ProviderRecord>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ProviderRecord {
    id: String,
}

/// HTTP client for the provider's zone record API.
pub struct MirrorClient {
    config: MirrorConfig,
    client: reqwest::Client,
}

impl MirrorClient {
    pub fn new(config: MirrorConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(MIRROR_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Whether records in `zone` should be mirrored at all.
    pub fn is_enabled_for(&self, zone: &str) -> bool {
        self.config.enabled
            && !self.config.api_token.is_empty()
            && self.config.zone_ids.contains_key(zone)
    }

    /// Creates the record upstream and returns the provider's record id.
    ///
    /// Callers gate on [`DnsRecordType::mirror_supported`]; unsupported
    /// types are kept local-only.
    pub async fn create_record(&self, upsert: &MirrorUpsert<'_>) -> Result<String> {
        let url = format!(
            "{}/zones/{}/dns_records",
            self.config.api_base,
            self.zone_id(upsert.zone)?
        );

        let request = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_token)
            .json(&payload(upsert));

        let response = self.execute(request, "record create").await?;
        match response.result {
            Some(record) => Ok(record.id),
            None => Err(Error::Upstream(
                "DNS mirror created a record but returned no id".to_string(),
            )),
        }
    }

    /// Replaces the mirrored record identified by `external_id`.
    pub async fn update_record(&self, external_id: &str, upsert: &MirrorUpsert<'_>) -> Result<()> {
        let url = format!(
            "{}/zones/{}/dns_records/{}",
            self.config.api_base,
            self.zone_id(upsert.zone)?,
            external_id
        );

        let request = self
            .client
            .put(&url)
            .bearer_auth(&self.config.api_token)
            .json(&payload(upsert));

        self.execute(request, "record update").await?;
        Ok(())
    }

    /// Removes the mirrored record identified by `external_id`.
    pub async fn delete_record(&self, zone: &str, external_id: &str) -> Result<()> {
        let url = format!(
            "{}/zones/{}/dns_records/{}",
            self.config.api_base,
            self.zone_id(zone)?,
            external_id
        );

        let request = self
            .client
            .delete(&url)
            .bearer_auth(&self.config.api_token);

        self.execute(request, "record delete").await?;
        Ok(())
    }

    fn zone_id(&self, zone: &str) -> Result<&str> {
        self.config
            .zone_ids
            .get(zone)
            .map(String::as_str)
            .ok_or_else(|| Error::Config(format!("No mirror zone id configured for {zone}")))
    }

    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
        action: &str,
    ) -> Result<ProviderResponse> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("DNS mirror {action} request failed: {e}")))?;

        let status = response.status();
        let parsed: ProviderResponse = response.json().await.map_err(|e| {
            Error::Upstream(format!(
                "DNS mirror returned an unreadable response ({status}): {e}"
            ))
        })?;

        if !parsed.success {
            let detail = if parsed.errors.is_empty() {
                format!("status {status}")
            } else {
                parsed
                    .errors
                    .iter()
                    .map(|e| format!("{} (code {})", e.message, e.code))
                    .collect::<Vec<_>>()
                    .join("; ")
            };
            return Err(Error::Upstream(format!(
                "DNS mirror rejected {action}: {detail}"
            )));
        }

        Ok(parsed)
    }
}

fn payload<'a>(upsert: &MirrorUpsert<'a>) -> RecordPayload<'a> {
    let proxied = upsert.proxied && upsert.record_type.can_proxy();
    let name = if upsert.subdomain == "@" {
        upsert.zone.to_string()
    } else {
        format!("{}.{}", upsert.subdomain, upsert.zone)
    };

    RecordPayload {
        record_type: upsert.record_type.as_str(),
        name,
        content: upsert.value,
        // Proxied records hand TTL control to the provider.
        ttl: if proxied { 1 } else { upsert.ttl },
        proxied,
        priority: (upsert.record_type == DnsRecordType::Mx).then_some(upsert.priority),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(api_base: String) -> MirrorConfig {
        let mut zone_ids = std::collections::HashMap::new();
        zone_ids.insert("example.site".to_string(), "zone123".to_string());

        MirrorConfig {
            enabled: true,
            api_base,
            api_token: "test-token".to_string(),
            zone_ids,
        }
    }

    fn upsert(record_type: DnsRecordType, value: &str) -> MirrorUpsert<'_> {
        MirrorUpsert {
            subdomain: "app",
            zone: "example.site",
            record_type,
            value,
            ttl: 3600,
            priority: 0,
            proxied: false,
        }
    }

    #[test]
    fn enabled_requires_token_and_zone_id() {
        let client = MirrorClient::new(test_config("http://127.0.0.1:1".to_string()));
        assert!(client.is_enabled_for("example.site"));
        assert!(!client.is_enabled_for("other.zone"));

        let mut config = test_config("http://127.0.0.1:1".to_string());
        config.api_token = String::new();
        let client = MirrorClient::new(config);
        assert!(!client.is_enabled_for("example.site"));
    }

    #[test]
    fn proxied_records_force_provider_ttl() {
        let mut record = upsert(DnsRecordType::A, "203.0.113.9");
        record.proxied = true;

        let body = payload(&record);
        assert_eq!(body.ttl, 1);
        assert!(body.proxied);

        // TXT cannot be proxied even when asked.
        let mut record = upsert(DnsRecordType::Txt, "v=spf1 -all");
        record.proxied = true;
        let body = payload(&record);
        assert_eq!(body.ttl, 3600);
        assert!(!body.proxied);
    }

    #[tokio::test]
    async fn create_posts_record_and_returns_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/zones/zone123/dns_records"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_json(json!({
                "type": "A",
                "name": "app.example.site",
                "content": "203.0.113.9",
                "ttl": 3600,
                "proxied": false,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "errors": [],
                "result": { "id": "ext-abc123" },
            })))
            .mount(&server)
            .await;

        let client = MirrorClient::new(test_config(server.uri()));
        let id = client
            .create_record(&upsert(DnsRecordType::A, "203.0.113.9"))
            .await
            .unwrap();

        assert_eq!(id, "ext-abc123");
    }

    #[tokio::test]
    async fn mx_records_carry_priority() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/zones/zone123/dns_records"))
            .and(body_json(json!({
                "type": "MX",
                "name": "app.example.site",
                "content": "mail.example.net",
                "ttl": 3600,
                "proxied": false,
                "priority": 10,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "errors": [],
                "result": { "id": "ext-mx" },
            })))
            .mount(&server)
            .await;

        let client = MirrorClient::new(test_config(server.uri()));
        let mut record = upsert(DnsRecordType::Mx, "mail.example.net");
        record.priority = 10;

        assert_eq!(client.create_record(&record).await.unwrap(), "ext-mx");
    }

    #[tokio::test]
    async fn provider_rejection_surfaces_messages() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/zones/zone123/dns_records"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "success": false,
                "errors": [{ "code": 81057, "message": "Record already exists." }],
                "result": null,
            })))
            .mount(&server)
            .await;

        let client = MirrorClient::new(test_config(server.uri()));
        let err = client
            .create_record(&upsert(DnsRecordType::A, "203.0.113.9"))
            .await
            .unwrap_err();

        match err {
            Error::Upstream(message) => {
                assert!(message.contains("Record already exists."));
                assert!(message.contains("81057"));
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_targets_the_external_id() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/zones/zone123/dns_records/ext-abc123"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "errors": [],
                "result": { "id": "ext-abc123" },
            })))
            .mount(&server)
            .await;

        let client = MirrorClient::new(test_config(server.uri()));
        client
            .delete_record("example.site", "ext-abc123")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unknown_zone_is_a_config_error() {
        let client = MirrorClient::new(test_config("http://127.0.0.1:1".to_string()));
        let err = client
            .delete_record("other.zone", "ext-abc123")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Config(_)));
    }
}
