//! WebSocket block-event listener for an organization's peers.
//!
//! Connects to the peers' event endpoints one at a time. Each attempt is
//! announced as `connecting`; a successful handshake as `connected`; a failed
//! attempt or a dropped stream as `disconnected`. After a disconnect the
//! listener waits the reconnect delay and tries the next endpoint in turn.

use std::time::Duration;

use futures_util::StreamExt;
use ledgerway_types::ConnectionStatus;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::{EventError, EventSource, UpstreamEvent};

/// Default delay between reconnection attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Default depth of the queue between the listener and its relay.
const DEFAULT_UPSTREAM_QUEUE: usize = 1024;

/// [`EventSource`] that listens to peer event endpoints over WebSocket.
#[derive(Clone, Debug)]
pub struct PeerEventListener {
    reconnect_delay: Duration,
    queue_capacity: usize,
}

impl PeerEventListener {
    pub fn new(reconnect_delay: Duration) -> Self {
        Self {
            reconnect_delay,
            queue_capacity: DEFAULT_UPSTREAM_QUEUE,
        }
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }
}

impl Default for PeerEventListener {
    fn default() -> Self {
        Self::new(DEFAULT_RECONNECT_DELAY)
    }
}

impl EventSource for PeerEventListener {
    fn subscribe(
        &self,
        organization: &str,
        endpoints: &[String],
    ) -> mpsc::Receiver<UpstreamEvent> {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let span = info_span!("peer_listener", org = %organization);
        tokio::spawn(listen(endpoints.to_vec(), tx, self.reconnect_delay).instrument(span));
        rx
    }
}

type PeerStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn listen(endpoints: Vec<String>, tx: mpsc::Sender<UpstreamEvent>, delay: Duration) {
    if endpoints.is_empty() {
        warn!("no peer event endpoints configured");
        let _ = tx.send(UpstreamEvent::Status(ConnectionStatus::Disconnected)).await;
        return;
    }

    for endpoint in endpoints.iter().cycle() {
        match session(endpoint, &tx).await {
            Ok(()) => info!(%endpoint, "event stream ended"),
            Err(EventError::RelayClosed) => break,
            Err(e) => warn!("{e}"),
        }
        if announce(&tx, ConnectionStatus::Disconnected).await.is_err() {
            break;
        }
        tokio::time::sleep(delay).await;
        if tx.is_closed() {
            break;
        }
    }
    debug!("relay dropped, listener exiting");
}

/// One connect-and-stream attempt against `endpoint`.
async fn session(endpoint: &str, tx: &mpsc::Sender<UpstreamEvent>) -> Result<(), EventError> {
    announce(tx, ConnectionStatus::Connecting).await?;
    let (stream, _) = connect_async(endpoint)
        .await
        .map_err(|e| EventError::Connect {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
    info!(%endpoint, "connected to peer event endpoint");
    announce(tx, ConnectionStatus::Connected).await?;
    pump(endpoint, stream, tx).await
}

async fn pump(
    endpoint: &str,
    mut stream: PeerStream,
    tx: &mpsc::Sender<UpstreamEvent>,
) -> Result<(), EventError> {
    while let Some(frame) = stream.next().await {
        let payload = match frame {
            Ok(Message::Text(text)) => text.into_bytes(),
            Ok(Message::Binary(bytes)) => bytes,
            Ok(Message::Close(_)) => return Ok(()),
            Ok(_) => continue,
            Err(e) => {
                return Err(EventError::Stream {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                })
            }
        };
        match decode_block(&payload) {
            Some(block) => tx
                .send(UpstreamEvent::Block(block))
                .await
                .map_err(|_| EventError::RelayClosed)?,
            None => warn!(%endpoint, len = payload.len(), "ignoring non-JSON event frame"),
        }
    }
    Ok(())
}

async fn announce(
    tx: &mpsc::Sender<UpstreamEvent>,
    status: ConnectionStatus,
) -> Result<(), EventError> {
    tx.send(UpstreamEvent::Status(status))
        .await
        .map_err(|_| EventError::RelayClosed)
}

fn decode_block(payload: &[u8]) -> Option<Value> {
    serde_json::from_slice(payload).ok()
}
