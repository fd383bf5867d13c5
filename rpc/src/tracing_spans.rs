//! Span constructors for gateway requests.

use ledgerway_types::Identity;
use tracing::{info_span, Span};

/// Span covering one dispatched ledger operation.
pub fn ledger_op_span(operation: &str, identity: &Identity) -> Span {
    info_span!(
        "ledger_op",
        operation = %operation,
        username = %identity.username,
        org = %identity.organization,
    )
}

/// Span covering identity issuance.
pub fn identity_span(username: &str, organization: &str) -> Span {
    info_span!("identity", username = %username, org = %organization)
}
