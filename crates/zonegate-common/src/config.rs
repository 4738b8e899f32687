//! Configuration for Zonegate

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Gateway (edge listener) configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Backend API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Mailbox configuration
    #[serde(default)]
    pub mail: MailConfig,

    /// DNS record management configuration
    #[serde(default)]
    pub dns: DnsConfig,

    /// Short link configuration
    #[serde(default)]
    pub links: LinksConfig,

    /// External DNS mirror configuration
    #[serde(default)]
    pub mirror: MirrorConfig,

    /// Background cleanup configuration
    #[serde(default)]
    pub cleanup: CleanupConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Hostname
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            bind_address: default_bind_address(),
        }
    }
}

fn default_hostname() -> String {
    "localhost".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: Option<String>,

    /// Maximum connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Listen port for the edge listener
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Zones whose subdomains are served from the record store
    #[serde(default)]
    pub zones: Vec<String>,

    /// Scheme clients use to reach the gateway, used when rewriting
    /// upstream redirects back to our own origin
    #[serde(default = "default_public_scheme")]
    pub public_scheme: String,

    /// CNAME targets ending in one of these suffixes are considered
    /// platform-bound and get a landing page instead of a proxied fetch
    #[serde(default = "default_platform_suffixes")]
    pub platform_suffixes: Vec<String>,

    /// Timeout for proxied CNAME fetches in seconds
    #[serde(default = "default_forward_timeout")]
    pub forward_timeout_secs: u64,

    /// Base URL of the backend API that `/api/*` is relayed to
    #[serde(default = "default_api_upstream")]
    pub api_upstream: String,

    /// GitHub proxy configuration
    #[serde(default)]
    pub github: GithubProxyConfig,

    /// File proxy configuration
    #[serde(default)]
    pub file_proxy: FileProxyConfig,

    /// Docker registry proxy configuration
    #[serde(default)]
    pub docker: DockerProxyConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            zones: Vec::new(),
            public_scheme: default_public_scheme(),
            platform_suffixes: default_platform_suffixes(),
            forward_timeout_secs: default_forward_timeout(),
            api_upstream: default_api_upstream(),
            github: GithubProxyConfig::default(),
            file_proxy: FileProxyConfig::default(),
            docker: DockerProxyConfig::default(),
        }
    }
}

fn default_gateway_port() -> u16 {
    8080
}

fn default_public_scheme() -> String {
    "https".to_string()
}

fn default_platform_suffixes() -> Vec<String> {
    vec!["workers.dev".to_string(), "pages.dev".to_string()]
}

fn default_forward_timeout() -> u64 {
    15
}

fn default_api_upstream() -> String {
    "http://127.0.0.1:8081".to_string()
}

/// GitHub proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubProxyConfig {
    /// Upstream base URL
    #[serde(default = "default_github_upstream")]
    pub upstream: String,

    /// Requests allowed per window per client
    #[serde(default = "default_github_rate_limit")]
    pub rate_limit: u32,

    /// Window length in seconds
    #[serde(default = "default_github_window")]
    pub rate_limit_window_secs: u64,
}

impl Default for GithubProxyConfig {
    fn default() -> Self {
        Self {
            upstream: default_github_upstream(),
            rate_limit: default_github_rate_limit(),
            rate_limit_window_secs: default_github_window(),
        }
    }
}

fn default_github_upstream() -> String {
    "https://github.com".to_string()
}

fn default_github_rate_limit() -> u32 {
    60
}

fn default_github_window() -> u64 {
    60
}

/// File proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileProxyConfig {
    /// Timeout for the whole transfer in seconds
    #[serde(default = "default_file_proxy_timeout")]
    pub timeout_secs: u64,

    /// Hostnames that may never be fetched
    #[serde(default = "default_blocked_hosts")]
    pub blocked_hosts: Vec<String>,
}

impl Default for FileProxyConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_file_proxy_timeout(),
            blocked_hosts: default_blocked_hosts(),
        }
    }
}

fn default_file_proxy_timeout() -> u64 {
    300
}

fn default_blocked_hosts() -> Vec<String> {
    ["localhost", "127.0.0.1", "0.0.0.0", "::1"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Docker registry proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerProxyConfig {
    /// Enable the `/v2/*` registry passthrough
    #[serde(default = "default_docker_enabled")]
    pub enabled: bool,

    /// Registry mirror base URL
    #[serde(default = "default_docker_mirror")]
    pub mirror: String,
}

impl Default for DockerProxyConfig {
    fn default() -> Self {
        Self {
            enabled: default_docker_enabled(),
            mirror: default_docker_mirror(),
        }
    }
}

fn default_docker_enabled() -> bool {
    true
}

fn default_docker_mirror() -> String {
    "https://registry-1.docker.io".to_string()
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Listen port for the API listener
    #[serde(default = "default_api_port")]
    pub port: u16,

    /// Admin key for privileged endpoints; admin endpoints answer 503
    /// while this is unset
    pub admin_key: Option<String>,

    /// Requests allowed per window per client across the whole API
    #[serde(default = "default_api_rate_limit")]
    pub rate_limit: u32,

    /// Window length in seconds
    #[serde(default = "default_api_window")]
    pub rate_limit_window_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
            admin_key: None,
            rate_limit: default_api_rate_limit(),
            rate_limit_window_secs: default_api_window(),
        }
    }
}

fn default_api_port() -> u16 {
    8081
}

fn default_api_rate_limit() -> u32 {
    100
}

fn default_api_window() -> u64 {
    60
}

/// Mailbox configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Hours a stored message stays readable before the sweeper removes it
    #[serde(default = "default_retention_hours")]
    pub retention_hours: i64,

    /// Maximum number of messages returned per mailbox listing
    #[serde(default = "default_list_limit")]
    pub list_limit: i64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            retention_hours: default_retention_hours(),
            list_limit: default_list_limit(),
        }
    }
}

fn default_retention_hours() -> i64 {
    24
}

fn default_list_limit() -> i64 {
    50
}

/// DNS record management configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Subdomains that can never be registered
    #[serde(default = "default_reserved_subdomains")]
    pub reserved_subdomains: Vec<String>,

    /// Minimum record TTL in seconds
    #[serde(default = "default_min_ttl")]
    pub min_ttl: i32,

    /// Maximum record TTL in seconds
    #[serde(default = "default_max_ttl")]
    pub max_ttl: i32,

    /// Minimum length of the per-record management key
    #[serde(default = "default_min_key_len")]
    pub min_key_len: usize,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            reserved_subdomains: default_reserved_subdomains(),
            min_ttl: default_min_ttl(),
            max_ttl: default_max_ttl(),
            min_key_len: default_min_key_len(),
        }
    }
}

fn default_reserved_subdomains() -> Vec<String> {
    [
        "www", "mail", "api", "admin", "ns1", "ns2", "mx", "smtp", "imap", "pop", "webmail",
        "autoconfig", "autodiscover", "ftp", "cdn", "static", "test", "dev", "staging",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_min_ttl() -> i32 {
    60
}

fn default_max_ttl() -> i32 {
    86400
}

fn default_min_key_len() -> usize {
    6
}

/// Short link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksConfig {
    /// Length of generated codes
    #[serde(default = "default_code_length")]
    pub code_length: usize,

    /// Attempts at generating an unused code before giving up
    #[serde(default = "default_generate_attempts")]
    pub max_generate_attempts: u32,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            code_length: default_code_length(),
            max_generate_attempts: default_generate_attempts(),
        }
    }
}

fn default_code_length() -> usize {
    6
}

fn default_generate_attempts() -> u32 {
    10
}

/// External DNS mirror configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Enable mirroring records to the external provider
    #[serde(default)]
    pub enabled: bool,

    /// Provider API base URL
    #[serde(default = "default_mirror_api_base")]
    pub api_base: String,

    /// Provider API token
    #[serde(default)]
    pub api_token: String,

    /// Provider zone id per configured zone name
    #[serde(default)]
    pub zone_ids: HashMap<String, String>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_base: default_mirror_api_base(),
            api_token: String::new(),
            zone_ids: HashMap::new(),
        }
    }
}

fn default_mirror_api_base() -> String {
    "https://api.cloudflare.com/client/v4".to_string()
}

/// Background cleanup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Seconds between sweeps of expired rows
    #[serde(default = "default_cleanup_interval")]
    pub interval_secs: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_cleanup_interval(),
        }
    }
}

fn default_cleanup_interval() -> u64 {
    3600
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Load configuration from file locations, then apply environment
    /// overrides for secrets
    pub fn load() -> crate::Result<Self> {
        let paths = [
            std::path::PathBuf::from("./config.toml"),
            std::path::PathBuf::from("/etc/zonegate/config.toml"),
        ];

        for path in paths {
            if path.exists() {
                let mut config = Self::from_file(&path)?;
                config.apply_env_overrides();
                return Ok(config);
            }
        }

        Err(crate::Error::Config(
            "No configuration file found".to_string(),
        ))
    }

    /// Secrets may come from the environment instead of the config file
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Ok(key) = std::env::var("ZONEGATE_ADMIN_KEY") {
            if !key.is_empty() {
                self.api.admin_key = Some(key);
            }
        }
        if let Ok(token) = std::env::var("ZONEGATE_MIRROR_TOKEN") {
            if !token.is_empty() {
                self.mirror.api_token = token;
            }
        }
    }
}
