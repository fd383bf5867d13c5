//! Nullable event source: push upstream events by hand.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use ledgerway_events::{EventSource, UpstreamEvent};
use ledgerway_types::ConnectionStatus;
use serde_json::Value;
use tokio::sync::mpsc;

const QUEUE: usize = 64;

struct Subscription {
    endpoints: Vec<String>,
    tx: mpsc::Sender<UpstreamEvent>,
}

/// An [`EventSource`] whose events are emitted by the test.
#[derive(Default)]
pub struct NullEventSource {
    subscriptions: Mutex<HashMap<String, Vec<Subscription>>>,
}

impl NullEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a status notification to every subscription of `organization`.
    pub async fn emit_status(&self, organization: &str, status: ConnectionStatus) {
        self.emit(organization, UpstreamEvent::Status(status)).await;
    }

    /// Deliver a block to every subscription of `organization`.
    pub async fn emit_block(&self, organization: &str, block: Value) {
        self.emit(organization, UpstreamEvent::Block(block)).await;
    }

    /// How many times `subscribe` was called for `organization`.
    pub fn subscription_count(&self, organization: &str) -> usize {
        self.lock().get(organization).map_or(0, Vec::len)
    }

    /// Endpoints passed to the most recent subscription of `organization`.
    pub fn endpoints(&self, organization: &str) -> Vec<String> {
        self.lock()
            .get(organization)
            .and_then(|subs| subs.last())
            .map(|sub| sub.endpoints.clone())
            .unwrap_or_default()
    }

    async fn emit(&self, organization: &str, event: UpstreamEvent) {
        let senders: Vec<_> = self
            .lock()
            .get(organization)
            .map(|subs| subs.iter().map(|sub| sub.tx.clone()).collect())
            .unwrap_or_default();
        for tx in senders {
            let _ = tx.send(event.clone()).await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Subscription>>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSource for NullEventSource {
    fn subscribe(
        &self,
        organization: &str,
        endpoints: &[String],
    ) -> mpsc::Receiver<UpstreamEvent> {
        let (tx, rx) = mpsc::channel(QUEUE);
        self.lock()
            .entry(organization.to_string())
            .or_default()
            .push(Subscription {
                endpoints: endpoints.to_vec(),
                tx,
            });
        rx
    }
}
