//! Gateway configuration with TOML file support.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::GatewayError;

/// Configuration for the gateway process.
///
/// Can be loaded from a TOML file via [`GatewayConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every field has a default except
/// `auth.secret`, which [`GatewayConfig::validate`] requires to be set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Interface the HTTP server binds to.
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port serving both the API and the real-time endpoint.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request timeout; the only cancellation applied to ledger calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to serve Prometheus metrics on `metrics_port`.
    #[serde(default)]
    pub enable_metrics: bool,

    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Explicit path of the organization topology file. When unset the file
    /// is looked up next to the main config, named after `target_network`.
    #[serde(default)]
    pub network_config: Option<PathBuf>,

    /// Selects `network-config-<target>.toml` instead of `network-config.toml`.
    #[serde(default)]
    pub target_network: Option<String>,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub events: EventsConfig,
}

/// Token signing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for identity tokens. Required.
    #[serde(default)]
    pub secret: String,

    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

/// The out-of-process ledger adapter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_url")]
    pub url: String,

    #[serde(default = "default_ledger_timeout_secs")]
    pub timeout_secs: u64,
}

/// Upstream event subscriptions and real-time fan-out.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventsConfig {
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    /// Events buffered per real-time client before deliveries are dropped.
    #[serde(default = "default_client_queue")]
    pub client_queue: usize,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_request_timeout_secs() -> u64 {
    240
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_port() -> u16 {
    9464
}

fn default_token_ttl_secs() -> u64 {
    ledgerway_identity::DEFAULT_TOKEN_TTL_SECS
}

fn default_ledger_url() -> String {
    "http://127.0.0.1:4001".to_string()
}

fn default_ledger_timeout_secs() -> u64 {
    120
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

fn default_client_queue() -> usize {
    ledgerway_events::DEFAULT_CLIENT_QUEUE
}

// ── Impl ───────────────────────────────────────────────────────────────

impl GatewayConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, GatewayError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, GatewayError> {
        toml::from_str(s).map_err(|e| GatewayError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, GatewayError> {
        toml::to_string_pretty(self).map_err(|e| GatewayError::Config(e.to_string()))
    }

    /// Reject configurations the gateway cannot start with.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.auth.secret.is_empty() {
            return Err(GatewayError::Config("auth.secret must be set".into()));
        }
        if self.auth.token_ttl_secs == 0 {
            return Err(GatewayError::Config("auth.token_ttl_secs must be positive".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(GatewayError::Config("request_timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl LedgerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl EventsConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout_secs(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
            metrics_port: default_metrics_port(),
            network_config: None,
            target_network: None,
            auth: AuthConfig::default(),
            ledger: LedgerConfig::default(),
            events: EventsConfig::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            token_ttl_secs: default_token_ttl_secs(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            url: default_ledger_url(),
            timeout_secs: default_ledger_timeout_secs(),
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_secs: default_reconnect_delay_secs(),
            client_queue: default_client_queue(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = GatewayConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = GatewayConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.port, config.port);
        assert_eq!(parsed.events.client_queue, config.events.client_queue);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = GatewayConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.port, 4000);
        assert_eq!(config.request_timeout_secs, 240);
        assert_eq!(config.auth.token_ttl_secs, 36_000);
        assert_eq!(config.log_format, "human");
        assert!(!config.enable_metrics);
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            port = 8080

            [auth]
            secret = "thisismysecret"

            [events]
            client_queue = 8
        "#;
        let config = GatewayConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.port, 8080);
        assert_eq!(config.auth.secret, "thisismysecret");
        assert_eq!(config.auth.token_ttl_secs, 36_000); // default
        assert_eq!(config.events.client_queue, 8);
        assert_eq!(config.events.reconnect_delay_secs, 5); // default
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_secret_fails_validation() {
        let config = GatewayConfig::default();
        assert!(matches!(config.validate(), Err(GatewayError::Config(_))));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host = \"127.0.0.1\"\n[ledger]\nurl = \"http://adapter:9000\"").unwrap();
        let config = GatewayConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.ledger.url, "http://adapter:9000");
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = GatewayConfig::from_toml_file("/nonexistent/ledgerway.toml");
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }
}
