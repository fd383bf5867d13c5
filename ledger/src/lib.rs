//! Ledger collaborator interface.
//!
//! The gateway never talks to peers or orderers itself. Every channel,
//! chaincode and query operation is handed to a [`LedgerClient`] as a fully
//! validated [`LedgerRequest`] together with the caller's identity. The
//! collaborator owns retries, endorsement and commit; the gateway only relays
//! its result.

pub mod client;
pub mod error;
pub mod http;
pub mod request;

pub use client::LedgerClient;
pub use error::LedgerError;
pub use http::HttpLedgerClient;
pub use request::{
    BlockByHash, BlockByNumber, ChainInfo, CreateChannel, InstallChaincode, InstallType,
    InstantiateChaincode, InvokeChaincode, JoinChannel, LedgerRequest, ListChaincodes,
    ListChannels, QueryChaincode, TransactionById,
};
