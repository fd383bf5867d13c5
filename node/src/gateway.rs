//! The gateway process: relays, HTTP server and optional metrics endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use ledgerway_events::{spawn_relay, EventSource, RelayRegistry};
use ledgerway_identity::TokenService;
use ledgerway_ledger::LedgerClient;
use ledgerway_rpc::{build_app, RpcServer, RpcState};
use ledgerway_types::{Clock, SystemClock};
use tokio::net::{lookup_host, TcpListener};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::metrics::{metrics_router, serve_metrics};
use crate::{
    GatewayConfig, GatewayError, GatewayMetrics, MeteredLedger, NetworkConfig,
    ShutdownController,
};

/// A configured, not yet started gateway.
pub struct Gateway {
    config: GatewayConfig,
    network: NetworkConfig,
    ledger: Arc<dyn LedgerClient>,
    source: Arc<dyn EventSource>,
    clock: Arc<dyn Clock>,
}

/// A started gateway. Dropping it does not stop anything; trigger the
/// [`ShutdownController`] and [`wait`](Self::wait).
pub struct RunningGateway {
    local_addr: SocketAddr,
    metrics_addr: Option<SocketAddr>,
    relays: Arc<RelayRegistry>,
    metrics: Arc<GatewayMetrics>,
    server: JoinHandle<std::io::Result<()>>,
    metrics_server: Option<JoinHandle<std::io::Result<()>>>,
    relay_tasks: Vec<JoinHandle<()>>,
}

impl Gateway {
    pub fn new(
        config: GatewayConfig,
        network: NetworkConfig,
        ledger: Arc<dyn LedgerClient>,
        source: Arc<dyn EventSource>,
    ) -> Result<Self, GatewayError> {
        config.validate()?;
        Ok(Self {
            config,
            network,
            ledger,
            source,
            clock: Arc::new(SystemClock),
        })
    }

    /// Use `clock` for token issuance and expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Start everything and serve until `shutdown` is triggered.
    pub async fn run(self, shutdown: &ShutdownController) -> Result<(), GatewayError> {
        self.start(shutdown).await?.wait().await
    }

    /// Subscribe once per organization, spawn the relays, and bind the
    /// servers. Returns as soon as the listeners are bound.
    pub async fn start(self, shutdown: &ShutdownController) -> Result<RunningGateway, GatewayError> {
        let relays = Arc::new(RelayRegistry::new(
            self.network.organization_names(),
            self.config.events.client_queue,
        ));

        let mut relay_tasks = Vec::with_capacity(relays.len());
        for (org, relay) in relays.iter() {
            let endpoints = self.network.event_endpoints(org);
            if endpoints.is_empty() {
                warn!(%org, "organization has no peer event endpoints");
            }
            info!(%org, peers = endpoints.len(), "subscribing to block events");
            let upstream = self.source.subscribe(org, &endpoints);
            relay_tasks.push(spawn_relay(relay.clone(), upstream, shutdown.signalled()));
        }

        let metrics = Arc::new(GatewayMetrics::new()?);
        let ledger: Arc<dyn LedgerClient> =
            Arc::new(MeteredLedger::new(self.ledger, metrics.clone()));
        let tokens = Arc::new(TokenService::new(
            self.config.auth.secret.as_bytes(),
            self.config.auth.token_ttl_secs,
            self.clock,
        ));

        let app = build_app(
            ledgerway_rpc::router(Arc::new(RpcState::new(ledger, tokens.clone()))),
            ledgerway_websocket::router(relays.clone()),
            tokens,
            self.config.request_timeout(),
        );

        let server = RpcServer::bind(resolve(&self.config.host, self.config.port).await?).await?;
        let local_addr = server.local_addr()?;
        let server = tokio::spawn(server.serve(app, shutdown.signalled()));

        let (metrics_addr, metrics_server) = if self.config.enable_metrics {
            let addr = resolve(&self.config.host, self.config.metrics_port).await?;
            let listener = TcpListener::bind(addr).await?;
            let bound = listener.local_addr()?;
            let router = metrics_router(metrics.clone(), relays.clone());
            let task = tokio::spawn(serve_metrics(listener, router, shutdown.signalled()));
            (Some(bound), Some(task))
        } else {
            (None, None)
        };

        info!(
            addr = %local_addr,
            organizations = relays.len(),
            metrics = ?metrics_addr,
            "gateway started"
        );

        Ok(RunningGateway {
            local_addr,
            metrics_addr,
            relays,
            metrics,
            server,
            metrics_server,
            relay_tasks,
        })
    }
}

impl RunningGateway {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_addr
    }

    pub fn relays(&self) -> &Arc<RelayRegistry> {
        &self.relays
    }

    pub fn metrics(&self) -> &Arc<GatewayMetrics> {
        &self.metrics
    }

    /// Wait for the servers and relay tasks to finish after shutdown.
    pub async fn wait(self) -> Result<(), GatewayError> {
        join(self.server).await?;
        if let Some(task) = self.metrics_server {
            join(task).await?;
        }
        for task in self.relay_tasks {
            task.await.map_err(|e| GatewayError::Task(e.to_string()))?;
        }
        info!("gateway stopped");
        Ok(())
    }
}

async fn join(task: JoinHandle<std::io::Result<()>>) -> Result<(), GatewayError> {
    task.await
        .map_err(|e| GatewayError::Task(e.to_string()))?
        .map_err(GatewayError::from)
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr, GatewayError> {
    lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| GatewayError::Config(format!("cannot resolve {host}:{port}")))
}
