//! Process-owned map of organization relays.

use std::collections::HashMap;
use std::sync::Arc;

use crate::OrgRelay;

/// One [`OrgRelay`] per configured organization.
///
/// Built once at startup and never mutated afterwards; the relays themselves
/// carry the mutable subscriber state.
pub struct RelayRegistry {
    relays: HashMap<String, Arc<OrgRelay>>,
}

impl RelayRegistry {
    pub fn new<I, S>(organizations: I, queue_capacity: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let relays = organizations
            .into_iter()
            .map(|org| {
                let org = org.into();
                let relay = Arc::new(OrgRelay::new(org.clone(), queue_capacity));
                (org, relay)
            })
            .collect();
        Self { relays }
    }

    pub fn get(&self, organization: &str) -> Option<Arc<OrgRelay>> {
        self.relays.get(organization).cloned()
    }

    pub fn len(&self) -> usize {
        self.relays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relays.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<OrgRelay>)> {
        self.relays.iter().map(|(org, relay)| (org.as_str(), relay))
    }

    /// Attached clients across every organization.
    pub fn total_clients(&self) -> usize {
        self.relays.values().map(|relay| relay.client_count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relays_are_scoped_per_organization() {
        let registry = RelayRegistry::new(["org1", "org2"], 4);
        let org1 = registry.get("org1").unwrap();
        let org2 = registry.get("org2").unwrap();
        let _rx = org1.attach(org1.next_client_id());

        assert_eq!(org1.client_count(), 1);
        assert_eq!(org2.client_count(), 0);
        assert_eq!(registry.total_clients(), 1);
        assert!(registry.get("org3").is_none());
    }
}
