//! Nullable ledger: record operations without reaching a ledger network.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use ledgerway_ledger::{LedgerClient, LedgerError, LedgerRequest};
use ledgerway_types::Identity;
use serde_json::{json, Value};

enum Outcome {
    Accept,
    Reject(String),
}

#[derive(Default)]
struct Recorded {
    requests: Vec<(LedgerRequest, Identity)>,
    enrollments: Vec<Identity>,
}

/// A ledger collaborator that records every call.
///
/// An accepting ledger answers each operation with
/// `{"operation": "<name>"}`; a rejecting one fails every operation and
/// enrollment with the configured message.
pub struct NullLedger {
    outcome: Outcome,
    enroll_response: Value,
    recorded: Mutex<Recorded>,
}

impl NullLedger {
    pub fn new() -> Self {
        Self {
            outcome: Outcome::Accept,
            enroll_response: json!({
                "success": true,
                "secret": "",
                "message": "user enrolled Successfully",
            }),
            recorded: Mutex::new(Recorded::default()),
        }
    }

    pub fn rejecting(message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Reject(message.into()),
            ..Self::new()
        }
    }

    /// Answer enrollments with `response` instead of the default object.
    pub fn with_enroll_response(mut self, response: Value) -> Self {
        self.enroll_response = response;
        self
    }

    /// Number of operations executed (enrollments excluded).
    pub fn call_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Every operation executed so far, with the identity it ran under.
    pub fn requests(&self) -> Vec<(LedgerRequest, Identity)> {
        self.lock().requests.clone()
    }

    pub fn enrollments(&self) -> Vec<Identity> {
        self.lock().enrollments.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for NullLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for NullLedger {
    async fn enroll(&self, username: &str, organization: &str) -> Result<Value, LedgerError> {
        self.lock()
            .enrollments
            .push(Identity::new(username, organization));
        match &self.outcome {
            Outcome::Accept => Ok(self.enroll_response.clone()),
            Outcome::Reject(message) => Err(LedgerError::Rejected(message.clone())),
        }
    }

    async fn execute(
        &self,
        request: LedgerRequest,
        identity: &Identity,
    ) -> Result<Value, LedgerError> {
        let operation = request.operation();
        self.lock().requests.push((request, identity.clone()));
        match &self.outcome {
            Outcome::Accept => Ok(json!({ "operation": operation })),
            Outcome::Reject(message) => Err(LedgerError::Rejected(message.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerway_ledger::ListChannels;

    fn list_channels() -> LedgerRequest {
        LedgerRequest::ListChannels(ListChannels {
            peer: "peer1".into(),
        })
    }

    #[tokio::test]
    async fn records_requests_with_identity() {
        let ledger = NullLedger::new();
        let alice = Identity::new("alice", "org1");
        let result = ledger.execute(list_channels(), &alice).await.unwrap();

        assert_eq!(result, json!({ "operation": "list_channels" }));
        assert_eq!(ledger.call_count(), 1);
        assert_eq!(ledger.requests()[0].1, alice);
    }

    #[tokio::test]
    async fn rejecting_ledger_fails_with_message() {
        let ledger = NullLedger::rejecting("channel not found");
        let err = ledger
            .execute(list_channels(), &Identity::new("bob", "org2"))
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::Rejected("channel not found".into()));
        assert_eq!(ledger.call_count(), 1);
    }

    #[tokio::test]
    async fn enroll_returns_configured_response() {
        let ledger = NullLedger::new().with_enroll_response(json!("already registered"));
        let response = ledger.enroll("carol", "org1").await.unwrap();
        assert_eq!(response, json!("already registered"));
        assert_eq!(ledger.enrollments(), vec![Identity::new("carol", "org1")]);
    }
}
