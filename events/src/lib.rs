//! Block-event relay.
//!
//! Each organization gets exactly one upstream subscription, opened through an
//! [`EventSource`] at startup. A relay task consumes that subscription, keeps
//! the organization's [`ConnectionStatusTracker`] current, and fans every
//! block and status change out to the real-time clients attached to its
//! [`OrgRelay`]. The subscription is process-scoped: it stays open while no
//! clients are attached.

pub mod error;
pub mod listener;
pub mod registry;
pub mod relay;
pub mod source;
pub mod task;
pub mod tracker;

pub use error::EventError;
pub use listener::PeerEventListener;
pub use registry::RelayRegistry;
pub use relay::{ClientId, OrgRelay, RelayEvent, DEFAULT_CLIENT_QUEUE};
pub use source::{EventSource, UpstreamEvent};
pub use task::spawn_relay;
pub use tracker::ConnectionStatusTracker;
