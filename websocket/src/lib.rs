//! WebSocket endpoint for real-time updates.
//!
//! A client connecting to `/events` is attached to the relay of the
//! organization named in its token. It first receives the current upstream
//! connection status, then every status change and new block until it
//! disconnects.

pub mod server;

pub use server::{router, EVENTS_PATH};
