//! Ledger decorator feeding [`GatewayMetrics`].

use std::sync::Arc;

use async_trait::async_trait;
use ledgerway_ledger::{LedgerClient, LedgerError, LedgerRequest};
use ledgerway_types::Identity;
use serde_json::Value;

use crate::GatewayMetrics;

const ENROLL: &str = "enroll";

/// Wraps any [`LedgerClient`] and counts requests and failures per operation.
pub struct MeteredLedger {
    inner: Arc<dyn LedgerClient>,
    metrics: Arc<GatewayMetrics>,
}

impl MeteredLedger {
    pub fn new(inner: Arc<dyn LedgerClient>, metrics: Arc<GatewayMetrics>) -> Self {
        Self { inner, metrics }
    }

    fn record<T>(&self, operation: &str, result: &Result<T, LedgerError>) {
        self.metrics
            .ledger_requests
            .with_label_values(&[operation])
            .inc();
        if result.is_err() {
            self.metrics
                .ledger_failures
                .with_label_values(&[operation])
                .inc();
        }
    }
}

#[async_trait]
impl LedgerClient for MeteredLedger {
    async fn enroll(&self, username: &str, organization: &str) -> Result<Value, LedgerError> {
        let result = self.inner.enroll(username, organization).await;
        self.record(ENROLL, &result);
        result
    }

    async fn execute(
        &self,
        request: LedgerRequest,
        identity: &Identity,
    ) -> Result<Value, LedgerError> {
        let operation = request.operation();
        let result = self.inner.execute(request, identity).await;
        self.record(operation, &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerway_ledger::ListChannels;
    use ledgerway_nullables::NullLedger;

    fn list_channels() -> LedgerRequest {
        LedgerRequest::ListChannels(ListChannels {
            peer: "peer1".into(),
        })
    }

    #[tokio::test]
    async fn counts_requests_and_failures() {
        let metrics = Arc::new(GatewayMetrics::new().unwrap());
        let ok = MeteredLedger::new(Arc::new(NullLedger::new()), metrics.clone());
        let failing = MeteredLedger::new(Arc::new(NullLedger::rejecting("nope")), metrics.clone());
        let alice = Identity::new("alice", "org1");

        ok.execute(list_channels(), &alice).await.unwrap();
        assert!(failing.execute(list_channels(), &alice).await.is_err());
        ok.enroll("alice", "org1").await.unwrap();

        let requests = &metrics.ledger_requests;
        assert_eq!(requests.with_label_values(&["list_channels"]).get(), 2);
        assert_eq!(requests.with_label_values(&["enroll"]).get(), 1);
        assert_eq!(
            metrics.ledger_failures.with_label_values(&["list_channels"]).get(),
            1
        );
    }
}
