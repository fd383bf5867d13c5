//! HTTP API for the ledgerway gateway.
//!
//! Every route except `POST /identity` passes through the token gate in
//! [`middleware`], which attaches the caller's [`Identity`] to the request.
//! Handlers in [`handlers`] validate their parameters, hand a
//! [`LedgerRequest`] to the ledger collaborator and render the outcome as the
//! uniform `{success, ...}` envelope.
//!
//! [`Identity`]: ledgerway_types::Identity
//! [`LedgerRequest`]: ledgerway_ledger::LedgerRequest

pub mod args;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod params;
pub mod server;
pub mod tracing_spans;

pub use envelope::Envelope;
pub use error::RpcError;
pub use middleware::{require_identity, IDENTITY_PATH};
pub use server::{build_app, router, RpcServer, RpcState};
