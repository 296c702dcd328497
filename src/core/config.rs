//! # Configuration Module
//!
//! Configuration for the identity gateway, loaded once at process start.
//!
//! ## Key Features
//! - YAML configuration parsing with serde
//! - Environment variable override support (`GATEWAY_*` pattern)
//! - Human-readable durations (`15m`, `30s`) via humantime-serde
//! - Validation with detailed error messages

use crate::core::error::{IdentityError, IdentityResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Complete configuration for the identity gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// HTTP server configuration (bind address, port).
    #[serde(default)]
    pub server: ServerConfig,

    /// LDAP directory connection parameters.
    #[serde(default)]
    pub ldap: LdapConfig,

    /// Cache TTLs and housekeeping.
    #[serde(default)]
    pub cache: CacheSettings,

    /// Access-token verification settings.
    #[serde(default)]
    pub token: TokenConfig,
}

impl GatewayConfig {
    /// Load configuration from a YAML file, apply environment overrides,
    /// and validate.
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> IdentityResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| IdentityError::config(format!("Failed to read config file: {}", e)))?;

        let mut config: GatewayConfig = serde_yaml::from_str(&content)
            .map_err(|e| IdentityError::config(format!("Failed to parse config: {}", e)))?;

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from defaults plus environment overrides only.
    ///
    /// Used when no config file is supplied; validation is left to the
    /// caller because a default config has no LDAP parameters yet.
    pub fn from_env() -> IdentityResult<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration.
    ///
    /// Variables follow the pattern `GATEWAY_<SECTION>_<FIELD>`, for example
    /// `GATEWAY_LDAP_HOST=dc01.example.com`.
    pub fn apply_env_overrides(&mut self) -> IdentityResult<()> {
        use std::env;

        if let Ok(addr) = env::var("GATEWAY_SERVER_BIND_ADDRESS") {
            self.server.bind_address = addr;
        }
        if let Ok(port) = env::var("GATEWAY_SERVER_HTTP_PORT") {
            self.server.http_port = port
                .parse()
                .map_err(|e| IdentityError::config(format!("Invalid GATEWAY_SERVER_HTTP_PORT: {}", e)))?;
        }

        if let Ok(host) = env::var("GATEWAY_LDAP_HOST") {
            self.ldap.host = host;
        }
        if let Ok(port) = env::var("GATEWAY_LDAP_PORT") {
            self.ldap.port = port
                .parse()
                .map_err(|e| IdentityError::config(format!("Invalid GATEWAY_LDAP_PORT: {}", e)))?;
        }
        if let Ok(domain) = env::var("GATEWAY_LDAP_DOMAIN") {
            self.ldap.domain = domain;
        }
        if let Ok(domain_fullname) = env::var("GATEWAY_LDAP_DOMAIN_FULLNAME") {
            self.ldap.domain_fullname = domain_fullname;
        }
        if let Ok(base_dn) = env::var("GATEWAY_LDAP_BASE_DN") {
            self.ldap.base_dn = base_dn;
        }

        if let Ok(ttl) = env::var("GATEWAY_CACHE_AUTH_TTL") {
            self.cache.auth_ttl = humantime::parse_duration(&ttl)
                .map_err(|e| IdentityError::config(format!("Invalid GATEWAY_CACHE_AUTH_TTL: {}", e)))?;
        }
        if let Ok(ttl) = env::var("GATEWAY_CACHE_NOT_FOUND_TTL") {
            self.cache.not_found_ttl = humantime::parse_duration(&ttl).map_err(|e| {
                IdentityError::config(format!("Invalid GATEWAY_CACHE_NOT_FOUND_TTL: {}", e))
            })?;
        }
        if let Ok(ttl) = env::var("GATEWAY_CACHE_GROUPS_TTL") {
            self.cache.groups_ttl = humantime::parse_duration(&ttl)
                .map_err(|e| IdentityError::config(format!("Invalid GATEWAY_CACHE_GROUPS_TTL: {}", e)))?;
        }

        if let Ok(secret) = env::var("GATEWAY_TOKEN_SECRET") {
            self.token.secret = secret;
        }
        if let Ok(issuer) = env::var("GATEWAY_TOKEN_ISSUER") {
            self.token.issuer = Some(issuer);
        }

        Ok(())
    }

    /// Validate the configuration, collecting every problem found.
    pub fn validate(&self) -> IdentityResult<()> {
        let mut errors = Vec::new();

        if self.server.http_port == 0 {
            errors.push("server.http_port must be specified".to_string());
        }
        if self.server.bind_address.is_empty() {
            errors.push("server.bind_address cannot be empty".to_string());
        }

        if self.ldap.host.is_empty() {
            errors.push("ldap.host cannot be empty".to_string());
        }
        if self.ldap.domain.is_empty() {
            errors.push("ldap.domain cannot be empty".to_string());
        }
        if self.ldap.domain_fullname.is_empty() {
            errors.push("ldap.domain_fullname cannot be empty".to_string());
        }

        if self.cache.auth_ttl.is_zero() {
            errors.push("cache.auth_ttl must be greater than zero".to_string());
        }
        if self.cache.not_found_ttl.is_zero() {
            errors.push("cache.not_found_ttl must be greater than zero".to_string());
        }
        if self.cache.groups_ttl.is_zero() {
            errors.push("cache.groups_ttl must be greater than zero".to_string());
        }

        if self.token.secret.is_empty() {
            errors.push("token.secret cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(IdentityError::config(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP port.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            http_port: default_http_port(),
        }
    }
}

/// LDAP directory connection parameters.
///
/// `host`, `domain` and `domain_fullname` are all required: the
/// authenticator treats their absence as a fatal configuration error
/// rather than a retryable failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    /// Directory server host name.
    #[serde(default)]
    pub host: String,

    /// Directory server port.
    #[serde(default = "default_ldap_port")]
    pub port: u16,

    /// NetBIOS-style domain, e.g. `EXAMPLE`.
    #[serde(default)]
    pub domain: String,

    /// Fully qualified domain name, e.g. `example.com`.
    #[serde(default)]
    pub domain_fullname: String,

    /// Search base DN, e.g. `DC=example,DC=com`.
    #[serde(default)]
    pub base_dn: String,
}

impl Default for LdapConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_ldap_port(),
            domain: String::new(),
            domain_fullname: String::new(),
            base_dn: String::new(),
        }
    }
}

/// Cache TTLs and housekeeping intervals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// TTL for successful authentication results.
    #[serde(with = "humantime_serde", default = "default_auth_ttl")]
    pub auth_ttl: Duration,

    /// TTL for negative-existence entries; kept short so a freshly created
    /// account becomes visible quickly.
    #[serde(with = "humantime_serde", default = "default_not_found_ttl")]
    pub not_found_ttl: Duration,

    /// TTL for group-membership entries. Independent of the auth TTL since
    /// membership can change without a password change.
    #[serde(with = "humantime_serde", default = "default_groups_ttl")]
    pub groups_ttl: Duration,

    /// How often the caches sweep expired entries.
    #[serde(with = "humantime_serde", default = "default_cleanup_interval")]
    pub cleanup_interval: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            auth_ttl: default_auth_ttl(),
            not_found_ttl: default_not_found_ttl(),
            groups_ttl: default_groups_ttl(),
            cleanup_interval: default_cleanup_interval(),
        }
    }
}

/// Access-token verification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// HMAC secret for token verification.
    #[serde(default)]
    pub secret: String,

    /// Expected issuer; unchecked when absent.
    #[serde(default)]
    pub issuer: Option<String>,

    /// Header carrying the token.
    #[serde(default = "default_token_header")]
    pub header: String,

    /// Scheme prefix stripped from the header value.
    #[serde(default = "default_token_prefix")]
    pub prefix: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: None,
            header: default_token_header(),
            prefix: default_token_prefix(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_ldap_port() -> u16 {
    389
}

fn default_auth_ttl() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_not_found_ttl() -> Duration {
    Duration::from_secs(30)
}

fn default_groups_ttl() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_cleanup_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_token_header() -> String {
    "authorization".to_string()
}

fn default_token_prefix() -> String {
    "Bearer ".to_string()
}
