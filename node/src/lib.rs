//! Gateway process wiring.
//!
//! Loads configuration and the organization topology, opens one upstream
//! block-event subscription per organization, and serves the HTTP API and
//! the real-time endpoint from a single listener. Optional Prometheus
//! metrics are served on their own port.

pub mod config;
pub mod error;
pub mod gateway;
pub mod metered;
pub mod metrics;
pub mod network;
pub mod shutdown;

pub use config::{AuthConfig, EventsConfig, GatewayConfig, LedgerConfig};
pub use error::GatewayError;
pub use gateway::{Gateway, RunningGateway};
pub use metered::MeteredLedger;
pub use metrics::GatewayMetrics;
pub use network::{
    network_config_file_name, resolve_network_config_path, NetworkConfig, OrganizationConfig,
    PeerConfig,
};
pub use shutdown::{ShutdownController, ShutdownReason};
