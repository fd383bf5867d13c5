//! Organization topology: which peers each organization runs.
//!
//! Loaded once at startup from its own TOML file:
//!
//! ```toml
//! [organizations.org1]
//! name = "peerOrg1"
//! mspid = "Org1MSP"
//!
//! [organizations.org1.peers.peer1]
//! requests = "grpcs://localhost:7051"
//! events = "ws://localhost:7053"
//! server_hostname = "peer0.org1.example.com"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::GatewayError;

/// Default topology file name, without a target network.
pub const NETWORK_CONFIG_FILE: &str = "network-config.toml";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Keyed by the organization name clients put in their tokens.
    #[serde(default)]
    pub organizations: BTreeMap<String, OrganizationConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizationConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mspid: String,
    /// Keyed by peer name. Non-peer entries may share the table.
    #[serde(default)]
    pub peers: BTreeMap<String, PeerConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeerConfig {
    pub requests: String,
    pub events: String,
    #[serde(default)]
    pub server_hostname: Option<String>,
}

impl NetworkConfig {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, GatewayError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, GatewayError> {
        toml::from_str(s).map_err(|e| GatewayError::Config(e.to_string()))
    }

    pub fn organization_names(&self) -> impl Iterator<Item = &str> {
        self.organizations.keys().map(String::as_str)
    }

    /// Event endpoints for `organization`, in peer-name order. Only entries
    /// whose key starts with `peer` count.
    pub fn event_endpoints(&self, organization: &str) -> Vec<String> {
        self.organizations
            .get(organization)
            .map(|org| {
                org.peers
                    .iter()
                    .filter(|(key, _)| key.starts_with("peer"))
                    .map(|(_, peer)| peer.events.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// `network-config.toml`, or `network-config-<target>.toml` when a target
/// network is selected.
pub fn network_config_file_name(target: Option<&str>) -> String {
    match target.filter(|t| !t.is_empty()) {
        Some(target) => format!("network-config-{target}.toml"),
        None => NETWORK_CONFIG_FILE.to_string(),
    }
}

/// Where to load the topology from: `explicit` if given, otherwise the
/// target-specific file name inside `config_dir`.
pub fn resolve_network_config_path(
    config_dir: &Path,
    explicit: Option<&Path>,
    target: Option<&str>,
) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => config_dir.join(network_config_file_name(target)),
    }
}
