//! Ledgerway daemon: entry point for running the gateway.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use ledgerway_events::PeerEventListener;
use ledgerway_ledger::HttpLedgerClient;
use ledgerway_node::{
    resolve_network_config_path, Gateway, GatewayConfig, NetworkConfig, ShutdownController,
};
use ledgerway_utils::{init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "ledgerway", about = "HTTP and WebSocket gateway for a permissioned ledger")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base; CLI
    /// flags and env vars override them.
    #[arg(long, env = "LEDGERWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Interface to bind.
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// HTTP port.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Selects network-config-<target>.toml.
    #[arg(long, env = "TARGET_NETWORK")]
    target_network: Option<String>,

    /// Explicit organization topology file.
    #[arg(long, env = "LEDGERWAY_NETWORK_CONFIG")]
    network_config: Option<PathBuf>,

    /// Token signing secret.
    #[arg(long, env = "LEDGERWAY_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Base URL of the ledger adapter.
    #[arg(long, env = "LEDGERWAY_LEDGER_URL")]
    ledger_url: Option<String>,

    /// Enable the Prometheus metrics endpoint.
    #[arg(long, env = "LEDGERWAY_ENABLE_METRICS")]
    metrics: bool,

    /// Metrics port.
    #[arg(long, env = "LEDGERWAY_METRICS_PORT")]
    metrics_port: Option<u16>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "LEDGERWAY_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "LEDGERWAY_LOG_FORMAT")]
    log_format: Option<String>,
}

impl Cli {
    /// Layer CLI/env values over the file (or default) configuration.
    fn apply(self, mut config: GatewayConfig) -> GatewayConfig {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.target_network.is_some() {
            config.target_network = self.target_network;
        }
        if self.network_config.is_some() {
            config.network_config = self.network_config;
        }
        if let Some(secret) = self.jwt_secret {
            config.auth.secret = secret;
        }
        if let Some(url) = self.ledger_url {
            config.ledger.url = url;
        }
        config.enable_metrics |= self.metrics;
        if let Some(port) = self.metrics_port {
            config.metrics_port = port;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let file_config = match &cli.config {
        Some(path) => Some(
            GatewayConfig::from_toml_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
        ),
        None => None,
    };
    let config_dir = cli
        .config
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let config = cli.apply(file_config.unwrap_or_default());

    let format: LogFormat = config.log_format.parse()?;
    init_logging(format, &config.log_level);

    let network_path = resolve_network_config_path(
        &config_dir,
        config.network_config.as_deref(),
        config.target_network.as_deref(),
    );
    let network = NetworkConfig::from_toml_file(&network_path)
        .with_context(|| format!("loading {}", network_path.display()))?;
    tracing::info!(
        path = %network_path.display(),
        organizations = network.organizations.len(),
        "loaded network topology"
    );

    let ledger = HttpLedgerClient::new(&config.ledger.url, config.ledger.timeout())?;
    let source = PeerEventListener::new(config.events.reconnect_delay());

    tracing::info!(
        host = %config.host,
        port = config.port,
        ledger = %config.ledger.url,
        metrics = config.enable_metrics,
        "starting ledgerway gateway"
    );

    let shutdown = ShutdownController::new();
    let running = Gateway::new(config, network, Arc::new(ledger), Arc::new(source))?
        .start(&shutdown)
        .await?;

    let reason = shutdown.wait_for_signal().await;
    tracing::info!(%reason, "stopping gateway");
    running.wait().await?;

    tracing::info!("ledgerway daemon exited cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_values_override_file_values() {
        let cli = Cli::parse_from([
            "ledgerway",
            "--port",
            "8080",
            "--jwt-secret",
            "s3cret",
            "--target-network",
            "aws",
        ]);
        let mut file = GatewayConfig::default();
        file.port = 4000;
        file.request_timeout_secs = 60;

        let config = cli.apply(file);
        assert_eq!(config.port, 8080);
        assert_eq!(config.request_timeout_secs, 60);
        assert_eq!(config.auth.secret, "s3cret");
        assert_eq!(config.target_network.as_deref(), Some("aws"));
    }
}
