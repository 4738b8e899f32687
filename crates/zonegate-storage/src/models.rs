//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use zonegate_common::types::{DnsRecordId, DomainId, LinkId, MessageId};

/// Domain model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Domain {
    pub id: DomainId,
    pub name: String,
    pub api_base: String,
    pub created_at: DateTime<Utc>,
}

/// Stored mailbox message
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Email {
    pub id: MessageId,
    pub recipient: String,
    pub sender: String,
    pub subject: Option<String>,
    pub text_body: Option<String>,
    pub html_body: Option<String>,
    pub raw_body: Option<String>,
    pub verification_code: Option<String>,
    pub summary: Option<String>,
    pub is_spam: bool,
    pub language: Option<String>,
    pub received_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Short link model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ShortLink {
    pub id: LinkId,
    pub code: String,
    pub original_url: String,
    pub title: Option<String>,
    pub clicks: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ShortLink {
    /// Whether the link has passed its expiry time
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => at < Utc::now(),
            None => false,
        }
    }
}

/// DNS record types served by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DnsRecordType {
    A,
    Aaaa,
    Cname,
    Mx,
    Txt,
    Ns,
    Srv,
    Caa,
    Redirect,
}

impl DnsRecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DnsRecordType::A => "A",
            DnsRecordType::Aaaa => "AAAA",
            DnsRecordType::Cname => "CNAME",
            DnsRecordType::Mx => "MX",
            DnsRecordType::Txt => "TXT",
            DnsRecordType::Ns => "NS",
            DnsRecordType::Srv => "SRV",
            DnsRecordType::Caa => "CAA",
            DnsRecordType::Redirect => "REDIRECT",
        }
    }

    /// All accepted types, for error messages
    pub fn all() -> &'static [DnsRecordType] {
        &[
            DnsRecordType::A,
            DnsRecordType::Aaaa,
            DnsRecordType::Cname,
            DnsRecordType::Mx,
            DnsRecordType::Txt,
            DnsRecordType::Ns,
            DnsRecordType::Srv,
            DnsRecordType::Caa,
            DnsRecordType::Redirect,
        ]
    }

    /// Whether the external mirror accepts this type
    pub fn mirror_supported(&self) -> bool {
        matches!(
            self,
            DnsRecordType::A
                | DnsRecordType::Aaaa
                | DnsRecordType::Cname
                | DnsRecordType::Txt
                | DnsRecordType::Mx
        )
    }

    /// Whether the mirror may serve this type through its own proxy
    pub fn can_proxy(&self) -> bool {
        matches!(
            self,
            DnsRecordType::A | DnsRecordType::Aaaa | DnsRecordType::Cname
        )
    }
}

impl std::fmt::Display for DnsRecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DnsRecordType {
    type Err = zonegate_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(DnsRecordType::A),
            "AAAA" => Ok(DnsRecordType::Aaaa),
            "CNAME" => Ok(DnsRecordType::Cname),
            "MX" => Ok(DnsRecordType::Mx),
            "TXT" => Ok(DnsRecordType::Txt),
            "NS" => Ok(DnsRecordType::Ns),
            "SRV" => Ok(DnsRecordType::Srv),
            "CAA" => Ok(DnsRecordType::Caa),
            "REDIRECT" => Ok(DnsRecordType::Redirect),
            other => Err(zonegate_common::Error::Validation(format!(
                "Unknown record type: {}",
                other
            ))),
        }
    }
}

/// DNS record model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DnsRecord {
    pub id: DnsRecordId,
    pub subdomain: String,
    pub zone: String,
    pub record_type: String,
    pub value: String,
    pub ttl: i32,
    pub priority: i32,
    pub proxied: bool,
    pub active: bool,
    pub owner_email: Option<String>,
    pub user_key_hash: String,
    pub external_record_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DnsRecord {
    /// Typed view of the stored record type column
    pub fn record_type(&self) -> Option<DnsRecordType> {
        self.record_type.parse().ok()
    }

    /// Fully qualified name; `@` stands for the zone apex
    pub fn fqdn(&self) -> String {
        if self.subdomain == "@" {
            self.zone.clone()
        } else {
            format!("{}.{}", self.subdomain, self.zone)
        }
    }

    /// Value with the middle hidden, for the public listing. Values at or
    /// below the revealed width are masked entirely.
    pub fn masked_value(&self) -> String {
        let value = self.value.as_str();
        let chars: Vec<char> = value.chars().collect();

        match self.record_type() {
            Some(DnsRecordType::Txt) => {
                if chars.len() > 10 {
                    format!("{}...", chars[..10].iter().collect::<String>())
                } else {
                    "***".to_string()
                }
            }
            Some(DnsRecordType::A) | Some(DnsRecordType::Aaaa) => {
                let parts: Vec<&str> = value.split('.').collect();
                if parts.len() == 4 {
                    format!("{}.***.***.{}", parts[0], parts[3])
                } else if chars.len() > 4 {
                    format!("{}***", chars[..4].iter().collect::<String>())
                } else {
                    "***".to_string()
                }
            }
            Some(DnsRecordType::Cname) | Some(DnsRecordType::Redirect) => {
                if chars.len() > 15 {
                    format!(
                        "{}***{}",
                        chars[..6].iter().collect::<String>(),
                        chars[chars.len() - 6..].iter().collect::<String>()
                    )
                } else {
                    "***".to_string()
                }
            }
            _ => {
                if chars.len() > 8 {
                    format!("{}***", chars[..4].iter().collect::<String>())
                } else {
                    "***".to_string()
                }
            }
        }
    }
}

/// Input for creating a domain
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDomain {
    pub name: String,
    pub api_base: String,
}

/// Input for storing a message
#[derive(Debug, Clone)]
pub struct CreateEmail {
    pub recipient: String,
    pub sender: String,
    pub subject: Option<String>,
    pub text_body: Option<String>,
    pub html_body: Option<String>,
    pub raw_body: Option<String>,
    pub verification_code: Option<String>,
    pub summary: Option<String>,
    pub is_spam: bool,
    pub language: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// Input for creating a short link
#[derive(Debug, Clone)]
pub struct CreateShortLink {
    pub code: String,
    pub original_url: String,
    pub title: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Input for creating a DNS record. The row starts without an external
/// mirror id; a later provider write annotates it.
#[derive(Debug, Clone)]
pub struct CreateDnsRecord {
    pub subdomain: String,
    pub zone: String,
    pub record_type: DnsRecordType,
    pub value: String,
    pub ttl: i32,
    pub priority: i32,
    pub proxied: bool,
    pub owner_email: Option<String>,
    pub user_key_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn record(rtype: &str, value: &str) -> DnsRecord {
        DnsRecord {
            id: Uuid::now_v7(),
            subdomain: "blog".to_string(),
            zone: "example.site".to_string(),
            record_type: rtype.to_string(),
            value: value.to_string(),
            ttl: 3600,
            priority: 0,
            proxied: false,
            active: true,
            owner_email: None,
            user_key_hash: "hash".to_string(),
            external_record_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_record_type_roundtrip() {
        assert_eq!("AAAA".parse::<DnsRecordType>().unwrap(), DnsRecordType::Aaaa);
        assert_eq!("cname".parse::<DnsRecordType>().unwrap(), DnsRecordType::Cname);
        assert_eq!(DnsRecordType::Redirect.as_str(), "REDIRECT");
        assert!("SPF".parse::<DnsRecordType>().is_err());
    }

    #[test]
    fn test_mirror_supported_types() {
        assert!(DnsRecordType::A.mirror_supported());
        assert!(DnsRecordType::Txt.mirror_supported());
        assert!(!DnsRecordType::Redirect.mirror_supported());
        assert!(!DnsRecordType::Srv.mirror_supported());
    }

    #[test]
    fn test_fqdn_apex() {
        let mut r = record("A", "192.0.2.1");
        assert_eq!(r.fqdn(), "blog.example.site");
        r.subdomain = "@".to_string();
        assert_eq!(r.fqdn(), "example.site");
    }

    #[test]
    fn test_masked_ipv4_keeps_outer_octets() {
        let r = record("A", "203.0.113.25");
        assert_eq!(r.masked_value(), "203.***.***.25");
    }

    #[test]
    fn test_masked_cname_hides_middle() {
        let r = record("CNAME", "my-project.pages.dev");
        assert_eq!(r.masked_value(), "my-pro***es.dev");
    }

    #[test]
    fn test_masked_short_values_reveal_nothing() {
        assert_eq!(record("CNAME", "a.io").masked_value(), "***");
        assert_eq!(record("TXT", "short").masked_value(), "***");
        assert_eq!(record("MX", "mx.test").masked_value(), "***");
    }

    #[test]
    fn test_masked_long_txt_truncates() {
        let r = record("TXT", "v=spf1 include:example.com ~all");
        assert_eq!(r.masked_value(), "v=spf1 inc...");
    }

    #[test]
    fn test_short_link_expiry() {
        let link = ShortLink {
            id: Uuid::now_v7(),
            code: "abc123".to_string(),
            original_url: "https://example.com".to_string(),
            title: None,
            clicks: 0,
            created_at: Utc::now(),
            expires_at: Some(Utc::now() - chrono::Duration::hours(1)),
        };
        assert!(link.is_expired());

        let open_ended = ShortLink {
            expires_at: None,
            ..link
        };
        assert!(!open_ended.is_expired());
    }
}
