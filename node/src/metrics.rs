//! Prometheus metrics for the gateway.
//!
//! [`GatewayMetrics`] owns a dedicated [`Registry`]. Ledger counters are fed
//! by [`MeteredLedger`](crate::MeteredLedger) as requests complete; relay
//! figures are sampled from the [`RelayRegistry`] at scrape time.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use ledgerway_events::RelayRegistry;
use prometheus::{
    register_int_counter_vec_with_registry, register_int_gauge_vec_with_registry, Encoder,
    IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::GatewayError;

/// Central collection of gateway metrics.
pub struct GatewayMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Ledger operations dispatched, by operation name.
    pub ledger_requests: IntCounterVec,
    /// Ledger operations that failed, by operation name.
    pub ledger_failures: IntCounterVec,

    // ── Sampled gauges ──────────────────────────────────────────────────
    pub blocks_relayed: IntGaugeVec,
    pub status_transitions: IntGaugeVec,
    pub realtime_clients: IntGaugeVec,
}

impl GatewayMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Result<Self, GatewayError> {
        let registry = Registry::new();

        let ledger_requests = register_int_counter_vec_with_registry!(
            Opts::new(
                "ledgerway_ledger_requests_total",
                "Ledger operations dispatched to the collaborator"
            ),
            &["operation"],
            registry
        )?;

        let ledger_failures = register_int_counter_vec_with_registry!(
            Opts::new(
                "ledgerway_ledger_failures_total",
                "Ledger operations that returned an error"
            ),
            &["operation"],
            registry
        )?;

        let blocks_relayed = register_int_gauge_vec_with_registry!(
            Opts::new(
                "ledgerway_blocks_relayed",
                "Upstream blocks fanned out since startup"
            ),
            &["org"],
            registry
        )?;

        let status_transitions = register_int_gauge_vec_with_registry!(
            Opts::new(
                "ledgerway_status_transitions",
                "Upstream connection status notifications since startup"
            ),
            &["org"],
            registry
        )?;

        let realtime_clients = register_int_gauge_vec_with_registry!(
            Opts::new("ledgerway_realtime_clients", "Attached real-time clients"),
            &["org"],
            registry
        )?;

        Ok(Self {
            registry,
            ledger_requests,
            ledger_failures,
            blocks_relayed,
            status_transitions,
            realtime_clients,
        })
    }

    /// Copy the current relay figures into the gauges.
    pub fn sample(&self, relays: &RelayRegistry) {
        for (org, relay) in relays.iter() {
            self.blocks_relayed
                .with_label_values(&[org])
                .set(saturating_i64(relay.blocks_relayed()));
            self.status_transitions
                .with_label_values(&[org])
                .set(saturating_i64(relay.status_transitions()));
            self.realtime_clients
                .with_label_values(&[org])
                .set(saturating_i64(relay.client_count() as u64));
        }
    }

    /// Encode every metric in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, GatewayError> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()).into())
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[derive(Clone)]
struct MetricsState {
    metrics: Arc<GatewayMetrics>,
    relays: Arc<RelayRegistry>,
}

/// Router exposing `GET /metrics`.
pub fn metrics_router(metrics: Arc<GatewayMetrics>, relays: Arc<RelayRegistry>) -> Router {
    Router::new()
        .route("/metrics", get(scrape))
        .with_state(MetricsState { metrics, relays })
}

async fn scrape(State(state): State<MetricsState>) -> Response {
    state.metrics.sample(&state.relays);
    match state.metrics.encode() {
        Ok(body) => ([(header::CONTENT_TYPE, TextEncoder::new().format_type().to_string())], body)
            .into_response(),
        Err(e) => {
            warn!("failed to encode metrics: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Serve the metrics router on `listener` until `shutdown` resolves.
pub async fn serve_metrics<F>(
    listener: TcpListener,
    router: Router,
    shutdown: F,
) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = listener.local_addr()?;
    info!(%addr, "metrics endpoint listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}
