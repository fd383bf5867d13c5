use thiserror::Error;

/// Failures of the upstream event connection. These never reach HTTP
/// clients; they surface as a `disconnected` status on the real-time channel.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("event stream from {endpoint} failed: {reason}")]
    Stream { endpoint: String, reason: String },

    #[error("relay for this subscription is gone")]
    RelayClosed,
}
