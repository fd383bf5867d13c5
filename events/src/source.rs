//! Upstream event-source interface.

use ledgerway_types::ConnectionStatus;
use serde_json::Value;
use tokio::sync::mpsc;

/// A notification from the upstream ledger event collaborator.
#[derive(Clone, Debug, PartialEq)]
pub enum UpstreamEvent {
    /// The subscription's connection state changed.
    Status(ConnectionStatus),
    /// A new block was committed. The payload is opaque to the gateway.
    Block(Value),
}

/// Opens block-event subscriptions against the ledger network.
///
/// `subscribe` is called once per organization for the lifetime of the
/// process. Implementations push events into the returned queue and should
/// stop once the receiving side is dropped.
pub trait EventSource: Send + Sync {
    fn subscribe(&self, organization: &str, endpoints: &[String])
        -> mpsc::Receiver<UpstreamEvent>;
}
