//! Capability index over the registered exchange providers.
//!
//! The registry is built once from a static provider list and is read-only
//! afterwards. It answers two questions:
//! - which providers implement a capability (optionally direct ones only)
//! - which provider serves a capability on a given network
//!
//! Providers are kept in a deterministic order: priority ascending (lower is
//! preferred), then title, then id. Registration order never matters.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, warn};

use crate::models::Network;
use crate::provider::{Capability, NetworkProvider};

/// Read-mostly index of exchange providers.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn NetworkProvider>>,
    by_capability: HashMap<Capability, Vec<usize>>,
}

impl ProviderRegistry {
    /// Build the index.
    ///
    /// Disabled providers are skipped. When two providers share an id, the
    /// first one in preference order wins.
    pub fn new(providers: Vec<Arc<dyn NetworkProvider>>) -> Self {
        let mut providers: Vec<_> = providers
            .into_iter()
            .filter(|p| {
                if p.is_disabled() {
                    debug!("Provider '{}' is disabled, not registering", p.id());
                    false
                } else {
                    true
                }
            })
            .collect();

        providers.sort_by(|a, b| {
            a.priority()
                .cmp(&b.priority())
                .then_with(|| a.title().cmp(b.title()))
                .then_with(|| a.id().cmp(b.id()))
        });

        let mut seen = HashSet::new();
        providers.retain(|p| {
            if seen.insert(p.id().to_string()) {
                true
            } else {
                warn!("Duplicate provider id '{}', keeping the preferred one", p.id());
                false
            }
        });

        let mut by_capability: HashMap<Capability, Vec<usize>> = HashMap::new();
        for (index, provider) in providers.iter().enumerate() {
            let caps = provider.capabilities();
            for capability in Capability::ALL {
                if caps.supports(capability) {
                    by_capability.entry(capability).or_default().push(index);
                }
            }
        }

        Self {
            providers,
            by_capability,
        }
    }

    /// All registered providers in preference order.
    pub fn providers(&self) -> &[Arc<dyn NetworkProvider>] {
        &self.providers
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Look a provider up by id.
    pub fn get(&self, id: &str) -> Option<Arc<dyn NetworkProvider>> {
        self.providers.iter().find(|p| p.id() == id).cloned()
    }

    /// Providers implementing `capability`, in preference order.
    pub fn with_capability(
        &self,
        capability: Capability,
        direct_only: bool,
    ) -> Vec<Arc<dyn NetworkProvider>> {
        self.indexed(capability)
            .filter(|p| !direct_only || p.is_direct())
            .cloned()
            .collect()
    }

    /// Providers on `network` implementing `capability`, in preference order.
    pub fn providers_for_network(
        &self,
        network: &Network,
        capability: Capability,
    ) -> Vec<Arc<dyn NetworkProvider>> {
        self.indexed(capability)
            .filter(|p| p.network() == network)
            .cloned()
            .collect()
    }

    /// The preferred provider on `network` implementing `capability`.
    ///
    /// `None` means the network has no coverage for the capability.
    pub fn for_network(
        &self,
        network: &Network,
        capability: Capability,
    ) -> Option<Arc<dyn NetworkProvider>> {
        self.indexed(capability)
            .find(|p| p.network() == network)
            .cloned()
    }

    /// Distinct networks in preference order of their best provider.
    pub fn networks(&self) -> Vec<Network> {
        let mut seen = HashSet::new();
        self.providers
            .iter()
            .map(|p| p.network().clone())
            .filter(|n| seen.insert(n.clone()))
            .collect()
    }

    fn indexed(&self, capability: Capability) -> impl Iterator<Item = &Arc<dyn NetworkProvider>> {
        self.by_capability
            .get(&capability)
            .into_iter()
            .flatten()
            .map(move |&index| &self.providers[index])
    }
}
