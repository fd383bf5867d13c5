//! Axum-based RPC server.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{middleware, Router};
use ledgerway_identity::TokenService;
use ledgerway_ledger::LedgerClient;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

use crate::handlers;
use crate::middleware::{require_identity, timeout_envelope};

/// Shared state for the ledger operation handlers.
pub struct RpcState {
    pub ledger: Arc<dyn LedgerClient>,
    pub tokens: Arc<TokenService>,
}

impl RpcState {
    pub fn new(ledger: Arc<dyn LedgerClient>, tokens: Arc<TokenService>) -> Self {
        Self { ledger, tokens }
    }
}

/// Routes for identity issuance and every ledger operation.
///
/// The router carries no authentication of its own; [`build_app`] wraps it.
pub fn router(state: Arc<RpcState>) -> Router {
    Router::new()
        .route("/identity", post(handlers::issue_identity))
        .route(
            "/channels",
            post(handlers::create_channel).get(handlers::list_channels),
        )
        .route("/channels/:channel_name", get(handlers::chain_info))
        .route("/channels/:channel_name/peers", post(handlers::join_channel))
        .route(
            "/channels/:channel_name/chaincodes",
            post(handlers::instantiate_chaincode),
        )
        .route(
            "/channels/:channel_name/chaincodes/:chaincode_name",
            post(handlers::invoke_chaincode).get(handlers::query_chaincode),
        )
        .route("/channels/:channel_name/blocks", get(handlers::block_by_hash))
        .route(
            "/channels/:channel_name/blocks/:block_id",
            get(handlers::block_by_number),
        )
        .route(
            "/channels/:channel_name/transactions/:trxn_id",
            get(handlers::transaction_by_id),
        )
        .route(
            "/chaincodes",
            post(handlers::install_chaincode).get(handlers::list_chaincodes),
        )
        .with_state(state)
}

/// Merge the HTTP and real-time routers behind the token gate.
///
/// Layer order, outermost first: CORS, timeout envelope, request timeout,
/// token gate. CORS is outermost so that preflight requests are answered
/// without a token.
pub fn build_app(
    rpc: Router,
    realtime: Router,
    tokens: Arc<TokenService>,
    request_timeout: Duration,
) -> Router {
    rpc.merge(realtime)
        .layer(middleware::from_fn_with_state(tokens, require_identity))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(middleware::map_response_with_state(
            request_timeout,
            timeout_envelope,
        ))
        .layer(CorsLayer::permissive())
}

/// A bound listener serving the gateway application.
pub struct RpcServer {
    listener: TcpListener,
}

impl RpcServer {
    /// Bind to `addr`. Port 0 picks a free port; see [`local_addr`](Self::local_addr).
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve `app` until `shutdown` resolves, then drain in-flight requests.
    pub async fn serve<F>(self, app: Router, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(addr = %self.listener.local_addr()?, "gateway listening");
        axum::serve(self.listener, app)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
