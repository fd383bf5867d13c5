//! Nullable infrastructure for deterministic testing.
//!
//! Every outside collaborator of the gateway (clock, ledger, event source)
//! sits behind a trait. This crate provides test-friendly implementations
//! that return deterministic values, record what they were asked to do and
//! never touch the network.
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod event_source;
pub mod ledger;

pub use clock::NullClock;
pub use event_source::NullEventSource;
pub use ledger::NullLedger;
