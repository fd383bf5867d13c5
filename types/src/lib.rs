//! Fundamental types for the ledgerway gateway.
//!
//! This crate defines the types shared across every other crate in the
//! workspace: the per-request caller identity, the upstream connection
//! status, and timestamps with an injectable clock.

pub mod identity;
pub mod status;
pub mod time;

pub use identity::Identity;
pub use status::{ConnectionStatus, ParseStatusError};
pub use time::{Clock, SystemClock, Timestamp};
