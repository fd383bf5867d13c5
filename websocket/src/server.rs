//! WebSocket server implementation.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Router};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use ledgerway_events::{ClientId, OrgRelay, RelayEvent, RelayRegistry};
use ledgerway_rpc::RpcError;
use ledgerway_types::Identity;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info_span, warn, Instrument};

/// Path of the real-time endpoint.
pub const EVENTS_PATH: &str = "/events";

type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Router serving the real-time endpoint. Expects an upstream layer to have
/// placed the caller's [`Identity`] in the request extensions.
pub fn router(registry: Arc<RelayRegistry>) -> Router {
    Router::new()
        .route(EVENTS_PATH, get(ws_handler))
        .with_state(registry)
}

/// Upgrade to a WebSocket attached to the caller's organization relay.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(registry): State<Arc<RelayRegistry>>,
    Extension(identity): Extension<Identity>,
) -> Response {
    let Some(relay) = registry.get(&identity.organization) else {
        warn!(org = %identity.organization, "real-time client for unknown organization");
        return RpcError::UnknownOrganization(identity.organization).into_response();
    };
    ws.on_upgrade(move |socket| handle_socket(socket, relay, identity))
}

/// Handle a single WebSocket connection.
///
/// The client is attached before the first frame is sent, so the status
/// snapshot always leads. A forwarder task drains the client's relay queue
/// into the socket while this task reads client frames; when either side
/// ends, the client is detached.
async fn handle_socket(socket: WebSocket, relay: Arc<OrgRelay>, identity: Identity) {
    let client = relay.next_client_id();
    let span = info_span!(
        "realtime_client",
        %client,
        username = %identity.username,
        org = %identity.organization,
    );
    serve_client(socket, relay, client).instrument(span).await
}

async fn serve_client(socket: WebSocket, relay: Arc<OrgRelay>, client: ClientId) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(ws_sender));

    let events = relay.attach(client);
    let mut forwarder = tokio::spawn(forward_events(events, ws_sender.clone()).in_current_span());

    loop {
        tokio::select! {
            _ = &mut forwarder => {
                debug!("client stopped accepting events");
                break;
            }
            frame = ws_receiver.next() => match frame {
                Some(Ok(Message::Ping(data))) => {
                    let _ = ws_sender.lock().await.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | None => {
                    debug!("client closed connection");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket receive error: {e}");
                    break;
                }
            },
        }
    }

    forwarder.abort();
    relay.detach(client);
}

/// Forwarder task: serializes relay events into text frames.
async fn forward_events(mut events: mpsc::Receiver<RelayEvent>, ws_sender: WsSender) {
    while let Some(event) = events.recv().await {
        let text = match serde_json::to_string(&event) {
            Ok(text) => text,
            Err(e) => {
                warn!("failed to encode relay event: {e}");
                continue;
            }
        };
        if ws_sender.lock().await.send(Message::Text(text)).await.is_err() {
            return;
        }
    }
    // The relay evicted this client.
    let _ = ws_sender.lock().await.send(Message::Close(None)).await;
}
