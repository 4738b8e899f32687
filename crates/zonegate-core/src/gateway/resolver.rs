//! Turns a subdomain's DNS records into gateway behavior.

use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::error;
use zonegate_storage::{DnsRecord, DnsRecordRepository, DnsRecordRepositoryTrait, DnsRecordType};
use zonegate_web::RecordRow;

use super::{forwarder, GatewayState};

/// What the first active record says this name should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordAction {
    /// REDIRECT record: permanent redirect to its URL.
    Redirect { location: String, ttl: i32 },
    /// CNAME onto a hosting platform; traffic already terminates there.
    PlatformBound { target: String },
    /// Ordinary CNAME: reverse-proxy to the target.
    ForwardCname { target: String },
    /// Records that only make sense as data; show the info page.
    InfoPage,
    /// TXT record served as plain text.
    TxtValue { value: String },
}

/// Decides the action from the record list. The first record (lowest
/// priority, oldest) wins; `None` means the name has nothing active.
pub fn action_for(records: &[DnsRecord], platform_suffixes: &[String]) -> Option<RecordAction> {
    let first = records.first()?;

    let action = match first.record_type() {
        Some(DnsRecordType::Redirect) => RecordAction::Redirect {
            location: first.value.clone(),
            ttl: first.ttl,
        },
        Some(DnsRecordType::Cname) => {
            if platform_suffixes
                .iter()
                .any(|suffix| first.value.contains(suffix.as_str()))
            {
                RecordAction::PlatformBound {
                    target: first.value.clone(),
                }
            } else {
                RecordAction::ForwardCname {
                    target: first.value.clone(),
                }
            }
        }
        Some(DnsRecordType::Txt) => RecordAction::TxtValue {
            value: first.value.clone(),
        },
        // A, AAAA, MX, NS, SRV, CAA and anything unrecognized get the
        // info page; the gateway cannot terminate those itself.
        _ => RecordAction::InfoPage,
    };

    Some(action)
}

/// Serves a request for `subdomain.zone` according to its records.
pub async fn serve_zone(
    state: &GatewayState,
    request: Request,
    subdomain: &str,
    zone: &str,
) -> Response {
    let repo = DnsRecordRepository::new(state.db.clone());

    let records = match repo.list_active(subdomain, zone).await {
        Ok(records) => records,
        Err(e) => {
            error!("Record lookup for {}.{} failed: {}", subdomain, zone, e);
            return state.pages.resolver_unavailable(subdomain, zone);
        }
    };

    match action_for(&records, &state.config.platform_suffixes) {
        None => state.pages.subdomain_not_found(subdomain, zone, None),
        Some(RecordAction::Redirect { location, ttl }) => {
            let cache = format!("public, max-age={}", ttl.max(0));
            (
                StatusCode::MOVED_PERMANENTLY,
                [
                    (header::LOCATION, location),
                    (header::CACHE_CONTROL, cache),
                ],
            )
                .into_response()
        }
        Some(RecordAction::PlatformBound { target }) => {
            state.pages.cname_bound(subdomain, zone, &target)
        }
        Some(RecordAction::ForwardCname { target }) => {
            forwarder::forward(state, request, subdomain, zone, &target).await
        }
        Some(RecordAction::TxtValue { value }) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            value,
        )
            .into_response(),
        Some(RecordAction::InfoPage) => {
            let rows: Vec<RecordRow> = records
                .iter()
                .map(|record| RecordRow {
                    record_type: record.record_type.clone(),
                    value: record.masked_value(),
                    ttl: record.ttl,
                    priority: record.priority,
                })
                .collect();
            state.pages.dns_info(subdomain, zone, &rows)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn record(record_type: &str, value: &str) -> DnsRecord {
        DnsRecord {
            id: Uuid::nil(),
            subdomain: "app".to_string(),
            zone: "example.site".to_string(),
            record_type: record_type.to_string(),
            value: value.to_string(),
            ttl: 300,
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

    fn suffixes() -> Vec<String> {
        vec!["workers.dev".to_string(), "pages.dev".to_string()]
    }

    #[test]
    fn no_records_is_none() {
        assert_eq!(action_for(&[], &suffixes()), None);
    }

    #[test]
    fn redirect_record_wins_with_its_ttl() {
        let records = vec![record("REDIRECT", "https://example.net/landing")];
        assert_eq!(
            action_for(&records, &suffixes()),
            Some(RecordAction::Redirect {
                location: "https://example.net/landing".to_string(),
                ttl: 300,
            })
        );
    }

    #[test]
    fn platform_cname_is_not_forwarded() {
        let records = vec![record("CNAME", "my-app.pages.dev")];
        assert_eq!(
            action_for(&records, &suffixes()),
            Some(RecordAction::PlatformBound {
                target: "my-app.pages.dev".to_string(),
            })
        );
    }

    #[test]
    fn ordinary_cname_forwards() {
        let records = vec![record("CNAME", "origin.example.net")];
        assert_eq!(
            action_for(&records, &suffixes()),
            Some(RecordAction::ForwardCname {
                target: "origin.example.net".to_string(),
            })
        );
    }

    #[test]
    fn txt_serves_its_value() {
        let records = vec![record("TXT", "v=spf1 -all")];
        assert_eq!(
            action_for(&records, &suffixes()),
            Some(RecordAction::TxtValue {
                value: "v=spf1 -all".to_string(),
            })
        );
    }

    #[test]
    fn address_and_mail_records_get_the_info_page() {
        for record_type in ["A", "AAAA", "MX", "NS", "SRV", "CAA"] {
            let records = vec![record(record_type, "203.0.113.9")];
            assert_eq!(
                action_for(&records, &suffixes()),
                Some(RecordAction::InfoPage),
                "type {record_type}"
            );
        }
    }

    #[test]
    fn unknown_stored_type_degrades_to_the_info_page() {
        let records = vec![record("FOO", "whatever")];
        assert_eq!(action_for(&records, &suffixes()), Some(RecordAction::InfoPage));
    }

    #[test]
    fn only_the_first_record_decides() {
        let records = vec![
            record("REDIRECT", "https://example.net/"),
            record("A", "203.0.113.9"),
        ];
        assert_eq!(
            action_for(&records, &suffixes()),
            Some(RecordAction::Redirect {
                location: "https://example.net/".to_string(),
                ttl: 300,
            })
        );
    }
}
