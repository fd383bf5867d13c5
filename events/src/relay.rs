//! Per-organization subscriber set and fan-out.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use ledgerway_types::ConnectionStatus;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::ConnectionStatusTracker;

/// Default per-client queue depth.
pub const DEFAULT_CLIENT_QUEUE: usize = 256;

/// Opaque id of an attached real-time client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// A message delivered to real-time clients.
///
/// Serialized as `{"type": "status", "data": "connected"}` or
/// `{"type": "chainblock", "data": {...}}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum RelayEvent {
    #[serde(rename = "status")]
    Status(ConnectionStatus),
    #[serde(rename = "chainblock")]
    Block(Value),
}

struct RelayInner {
    tracker: ConnectionStatusTracker,
    subscribers: HashMap<ClientId, mpsc::Sender<RelayEvent>>,
}

/// The subscriber set and connection status for one organization.
///
/// Attach, detach, status updates and fan-out all take the same lock, so a
/// client that attaches between two transitions sees the snapshot first and
/// every later transition after it, in order. Blocks are best-effort: a
/// client whose queue is full misses that block. Status changes are never
/// skipped; a client too slow to take one is evicted instead, which closes
/// its queue once the events already in it are read. Nothing is replayed to
/// late joiners.
pub struct OrgRelay {
    organization: String,
    queue_capacity: usize,
    next_client: AtomicU64,
    blocks_relayed: AtomicU64,
    inner: Mutex<RelayInner>,
}

impl OrgRelay {
    pub fn new(organization: impl Into<String>, queue_capacity: usize) -> Self {
        Self {
            organization: organization.into(),
            queue_capacity: queue_capacity.max(1),
            next_client: AtomicU64::new(1),
            blocks_relayed: AtomicU64::new(0),
            inner: Mutex::new(RelayInner {
                tracker: ConnectionStatusTracker::new(),
                subscribers: HashMap::new(),
            }),
        }
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    /// Allocate an id for a client about to attach.
    pub fn next_client_id(&self) -> ClientId {
        ClientId(self.next_client.fetch_add(1, Ordering::Relaxed))
    }

    /// Add a client to the subscriber set. The returned queue already holds
    /// the current status snapshot as its first event.
    ///
    /// Re-attaching an id replaces its previous queue.
    pub fn attach(&self, client: ClientId) -> mpsc::Receiver<RelayEvent> {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let mut inner = self.lock();
        let snapshot = inner.tracker.current();
        // Fresh queue with capacity >= 1, cannot be full.
        let _ = tx.try_send(RelayEvent::Status(snapshot));
        inner.subscribers.insert(client, tx);
        debug!(org = %self.organization, %client, status = %snapshot, "client attached");
        rx
    }

    /// Remove a client. Returns whether it was attached.
    pub fn detach(&self, client: ClientId) -> bool {
        let removed = self.lock().subscribers.remove(&client).is_some();
        if removed {
            debug!(org = %self.organization, %client, "client detached");
        }
        removed
    }

    pub fn current_status(&self) -> ConnectionStatus {
        self.lock().tracker.current()
    }

    pub fn client_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Number of status notifications applied so far.
    pub fn status_transitions(&self) -> u64 {
        self.lock().tracker.transitions()
    }

    /// Number of upstream blocks fanned out so far.
    pub fn blocks_relayed(&self) -> u64 {
        self.blocks_relayed.load(Ordering::Relaxed)
    }

    /// Record an upstream status notification and broadcast it.
    pub fn set_status(&self, status: ConnectionStatus) -> usize {
        let mut inner = self.lock();
        inner.tracker.apply(status);
        self.fan_out(&mut inner, RelayEvent::Status(status))
    }

    /// Broadcast a new block to every attached client.
    pub fn publish_block(&self, block: Value) -> usize {
        self.blocks_relayed.fetch_add(1, Ordering::Relaxed);
        self.broadcast(RelayEvent::Block(block))
    }

    /// Deliver `event` to every attached client. Returns the number of
    /// clients it was queued for.
    pub fn broadcast(&self, event: RelayEvent) -> usize {
        let mut inner = self.lock();
        self.fan_out(&mut inner, event)
    }

    fn fan_out(&self, inner: &mut RelayInner, event: RelayEvent) -> usize {
        let mut delivered = 0;
        let mut gone = Vec::new();
        let mut evicted = Vec::new();
        for (client, tx) in &inner.subscribers {
            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(RelayEvent::Status(status))) => {
                    warn!(org = %self.organization, %client, %status, "client queue full on status change, evicting");
                    evicted.push(*client);
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(org = %self.organization, %client, "client queue full, dropping block");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => gone.push(*client),
            }
        }
        for client in gone {
            inner.subscribers.remove(&client);
            debug!(org = %self.organization, %client, "pruned closed client");
        }
        for client in evicted {
            inner.subscribers.remove(&client);
        }
        delivered
    }

    fn lock(&self) -> MutexGuard<'_, RelayInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use ConnectionStatus::*;

    fn drain(rx: &mut mpsc::Receiver<RelayEvent>) -> Vec<RelayEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn attach_delivers_current_status_first() {
        let relay = OrgRelay::new("org1", 8);
        relay.set_status(Connected);
        let mut rx = relay.attach(relay.next_client_id());
        assert_eq!(drain(&mut rx), vec![RelayEvent::Status(Connected)]);
    }

    #[test]
    fn block_reaches_each_client_exactly_once() {
        let relay = OrgRelay::new("org1", 8);
        let mut receivers: Vec<_> = (0..5).map(|_| relay.attach(relay.next_client_id())).collect();
        for rx in &mut receivers {
            drain(rx);
        }

        let delivered = relay.publish_block(json!({ "number": 3 }));
        assert_eq!(delivered, 5);
        for rx in &mut receivers {
            assert_eq!(drain(rx), vec![RelayEvent::Block(json!({ "number": 3 }))]);
        }
        assert_eq!(relay.blocks_relayed(), 1);
    }

    #[test]
    fn status_transitions_arrive_in_order_and_late_joiner_sees_snapshot() {
        let relay = OrgRelay::new("org1", 8);
        let mut early = relay.attach(relay.next_client_id());
        drain(&mut early);

        relay.set_status(Connecting);
        relay.set_status(Connected);
        let mut late = relay.attach(relay.next_client_id());
        relay.set_status(Disconnected);
        relay.set_status(Connecting);

        assert_eq!(
            drain(&mut early),
            vec![
                RelayEvent::Status(Connecting),
                RelayEvent::Status(Connected),
                RelayEvent::Status(Disconnected),
                RelayEvent::Status(Connecting),
            ]
        );
        assert_eq!(
            drain(&mut late),
            vec![
                RelayEvent::Status(Connected),
                RelayEvent::Status(Disconnected),
                RelayEvent::Status(Connecting),
            ]
        );
    }

    #[test]
    fn late_joiner_gets_no_replay_of_earlier_blocks() {
        let relay = OrgRelay::new("org1", 8);
        relay.publish_block(json!({ "number": 1 }));
        let mut rx = relay.attach(relay.next_client_id());
        assert_eq!(drain(&mut rx), vec![RelayEvent::Status(Disconnected)]);
    }

    #[test]
    fn detached_client_receives_nothing_further() {
        let relay = OrgRelay::new("org1", 8);
        let client = relay.next_client_id();
        let mut rx = relay.attach(client);
        drain(&mut rx);

        assert!(relay.detach(client));
        assert!(!relay.detach(client));
        assert_eq!(relay.publish_block(json!({})), 0);
        assert_eq!(relay.client_count(), 0);
    }

    #[test]
    fn dropped_receiver_is_pruned_on_next_broadcast() {
        let relay = OrgRelay::new("org1", 8);
        let keep = relay.attach(relay.next_client_id());
        let dropped = relay.attach(relay.next_client_id());
        drop(dropped);

        assert_eq!(relay.set_status(Connected), 1);
        assert_eq!(relay.client_count(), 1);
        drop(keep);
    }

    #[test]
    fn full_queue_drops_only_for_that_client() {
        let relay = OrgRelay::new("org1", 1);
        let mut slow = relay.attach(relay.next_client_id());
        let mut fast = relay.attach(relay.next_client_id());
        drain(&mut fast);

        // `slow` still holds its snapshot, so its single slot is taken.
        assert_eq!(relay.publish_block(json!({ "n": 1 })), 1);
        assert_eq!(drain(&mut fast), vec![RelayEvent::Block(json!({ "n": 1 }))]);
        assert_eq!(drain(&mut slow), vec![RelayEvent::Status(Disconnected)]);
        assert_eq!(relay.client_count(), 2);
    }

    #[test]
    fn slow_client_is_evicted_rather_than_missing_a_status() {
        let relay = OrgRelay::new("org1", 2);
        let mut slow = relay.attach(relay.next_client_id());
        let mut fast = relay.attach(relay.next_client_id());

        relay.set_status(Connecting);
        drain(&mut fast);
        relay.set_status(Connected);
        drain(&mut fast);
        assert_eq!(relay.set_status(Disconnected), 1);

        assert_eq!(relay.client_count(), 1);
        assert_eq!(drain(&mut fast), vec![RelayEvent::Status(Disconnected)]);
        assert_eq!(
            drain(&mut slow),
            vec![RelayEvent::Status(Disconnected), RelayEvent::Status(Connecting)]
        );
        assert!(matches!(
            slow.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn evicted_client_can_reattach_with_the_current_status() {
        let relay = OrgRelay::new("org1", 1);
        let client = relay.next_client_id();
        let _stale = relay.attach(client);
        relay.set_status(Connected);
        assert_eq!(relay.client_count(), 0);

        let mut rx = relay.attach(client);
        assert_eq!(drain(&mut rx), vec![RelayEvent::Status(Connected)]);
    }

    #[test]
    fn events_serialize_to_wire_shape() {
        let status = serde_json::to_value(RelayEvent::Status(Connected)).unwrap();
        assert_eq!(status, json!({ "type": "status", "data": "connected" }));

        let block = serde_json::to_value(RelayEvent::Block(json!({ "number": 9 }))).unwrap();
        assert_eq!(block, json!({ "type": "chainblock", "data": { "number": 9 } }));
    }
}
