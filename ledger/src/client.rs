//! The ledger collaborator trait.

use async_trait::async_trait;
use ledgerway_types::Identity;
use serde_json::Value;

use crate::{LedgerError, LedgerRequest};

/// An asynchronous ledger collaborator.
///
/// Implementations must be safe to call concurrently: the gateway imposes no
/// serialization or de-duplication across in-flight requests.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Register and enroll `username` with the organization's certificate
    /// authority. The returned value is forwarded to the client; a bare JSON
    /// string is treated by the caller as a failure description.
    async fn enroll(&self, username: &str, organization: &str) -> Result<Value, LedgerError>;

    /// Run a validated ledger operation on behalf of `identity`.
    async fn execute(
        &self,
        request: LedgerRequest,
        identity: &Identity,
    ) -> Result<Value, LedgerError>;
}
