//! Pure request classification: host and path to a routing target.

/// Routing decision for one inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    /// Subdomain of a served zone; behavior comes from its DNS records.
    ZoneRecord { subdomain: String, zone: String },
    /// Passthrough to the REST API backend.
    Api,
    /// Landing documentation page.
    Docs,
    /// Remote file fetch proxy.
    FileProxy,
    /// Short link redirect.
    ShortLink { code: String },
    /// Container registry mirror.
    Docker,
    /// GitHub acceleration catch-all.
    GitHub,
    /// JSON listing of the services this host exposes.
    ServiceIndex,
}

/// Classifies a request. Zone subdomains win over path dispatch, and the
/// GitHub catch-all takes any path no earlier rule claimed.
pub fn classify(host: &str, path: &str, zones: &[String]) -> RouteTarget {
    let host = normalize_host(host);

    for zone in zones {
        if let Some(label) = subdomain_label(&host, zone) {
            return RouteTarget::ZoneRecord {
                subdomain: label.to_string(),
                zone: zone.to_ascii_lowercase(),
            };
        }
    }

    if path == "/api" || path.starts_with("/api/") || path == "/health" || path.starts_with("/health/")
    {
        return RouteTarget::Api;
    }

    if path == "/" {
        return RouteTarget::Docs;
    }

    if path == "/proxy" || path.starts_with("/proxy/") {
        return RouteTarget::FileProxy;
    }

    if let Some(rest) = path.strip_prefix("/s/") {
        let code = rest.split('/').next().unwrap_or("");
        if !code.is_empty() {
            return RouteTarget::ShortLink {
                code: code.to_string(),
            };
        }
    }

    if path == "/v2" || path.starts_with("/v2/") {
        return RouteTarget::Docker;
    }

    if path.len() > 1 {
        return RouteTarget::GitHub;
    }

    RouteTarget::ServiceIndex
}

/// Lowercases the host and strips any port suffix.
fn normalize_host(host: &str) -> String {
    let host = host.trim();

    let without_port = if let Some(rest) = host.strip_prefix('[') {
        // Bracketed IPv6 literal, possibly followed by a port.
        match rest.find(']') {
            Some(end) => &rest[..end],
            None => host,
        }
    } else {
        host.split(':').next().unwrap_or(host)
    };

    without_port.to_ascii_lowercase()
}

/// Returns the single-level subdomain label when `host` is `label.zone`.
/// The apex itself, `www`, and multi-level names are not zone routes.
fn subdomain_label<'a>(host: &'a str, zone: &str) -> Option<&'a str> {
    let zone = zone.to_ascii_lowercase();
    let label = host.strip_suffix(zone.as_str())?.strip_suffix('.')?;

    if label == "www" || !valid_label(label) {
        return None;
    }

    Some(label)
}

fn valid_label(label: &str) -> bool {
    if label.is_empty() || label.len() > 63 {
        return false;
    }

    let bytes = label.as_bytes();
    let alnum = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();

    alnum(bytes[0])
        && alnum(bytes[bytes.len() - 1])
        && bytes.iter().all(|&b| alnum(b) || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn zones() -> Vec<String> {
        vec!["example.site".to_string(), "example.dev".to_string()]
    }

    #[test]
    fn subdomain_of_a_zone_is_a_record_route() {
        assert_eq!(
            classify("app.example.site", "/anything", &zones()),
            RouteTarget::ZoneRecord {
                subdomain: "app".to_string(),
                zone: "example.site".to_string(),
            }
        );
    }

    #[test]
    fn second_zone_matches_too() {
        assert_eq!(
            classify("demo.example.dev", "/", &zones()),
            RouteTarget::ZoneRecord {
                subdomain: "demo".to_string(),
                zone: "example.dev".to_string(),
            }
        );
    }

    #[test]
    fn host_matching_ignores_case_and_port() {
        assert_eq!(
            classify("App.Example.SITE:8080", "/", &zones()),
            RouteTarget::ZoneRecord {
                subdomain: "app".to_string(),
                zone: "example.site".to_string(),
            }
        );
    }

    #[test]
    fn www_and_apex_fall_through_to_path_dispatch() {
        assert_eq!(classify("www.example.site", "/", &zones()), RouteTarget::Docs);
        assert_eq!(classify("example.site", "/", &zones()), RouteTarget::Docs);
    }

    #[test]
    fn multi_level_names_are_not_zone_routes() {
        assert_eq!(classify("a.b.example.site", "/", &zones()), RouteTarget::Docs);
    }

    #[test]
    fn lookalike_host_is_not_a_zone_route() {
        assert_eq!(
            classify("notexample.site", "/owner/repo", &zones()),
            RouteTarget::GitHub
        );
    }

    #[test]
    fn api_and_health_paths_go_to_the_backend() {
        assert_eq!(classify("example.site", "/api/domains", &zones()), RouteTarget::Api);
        assert_eq!(classify("example.site", "/api", &zones()), RouteTarget::Api);
        assert_eq!(classify("example.site", "/health", &zones()), RouteTarget::Api);
        assert_eq!(classify("example.site", "/health/ready", &zones()), RouteTarget::Api);
    }

    #[test]
    fn path_dispatch_covers_every_surface() {
        assert_eq!(classify("example.site", "/proxy/", &zones()), RouteTarget::FileProxy);
        assert_eq!(
            classify("example.site", "/s/abc123", &zones()),
            RouteTarget::ShortLink {
                code: "abc123".to_string(),
            }
        );
        assert_eq!(classify("example.site", "/v2/", &zones()), RouteTarget::Docker);
        assert_eq!(
            classify("example.site", "/torvalds/linux.git", &zones()),
            RouteTarget::GitHub
        );
    }

    #[test]
    fn short_link_code_stops_at_the_next_slash() {
        assert_eq!(
            classify("example.site", "/s/abc/extra", &zones()),
            RouteTarget::ShortLink {
                code: "abc".to_string(),
            }
        );
    }

    #[test]
    fn empty_short_link_code_falls_to_the_catch_all() {
        assert_eq!(classify("example.site", "/s/", &zones()), RouteTarget::GitHub);
    }

    #[test]
    fn labels_must_be_hostname_shaped() {
        // Leading or trailing hyphens are not valid labels.
        assert_eq!(classify("-bad.example.site", "/", &zones()), RouteTarget::Docs);
        assert_eq!(classify("bad-.example.site", "/", &zones()), RouteTarget::Docs);
        assert_eq!(
            classify("ok-name.example.site", "/", &zones()),
            RouteTarget::ZoneRecord {
                subdomain: "ok-name".to_string(),
                zone: "example.site".to_string(),
            }
        );
    }
}
