//! Per-provider memo of the "list supported pairs" call.
//!
//! Listing pairs is expensive and rate-limited, and the answer changes rarely,
//! so each provider's list is kept for a fixed TTL (12 hours by default).
//! Failed fetches are not cached: the next lookup tries the provider again.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use log::{debug, error, warn};

use super::CacheDictionary;
use crate::aggregation::invoke;
use crate::errors::MarketDataError;
use crate::models::{AssetPair, AssetPairs, Network};
use crate::provider::{Capability, NetworkProvider};
use crate::registry::ProviderRegistry;

/// Default lifetime of a cached pair list.
pub const DEFAULT_PAIR_CACHE_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// Time-bounded cache of each provider's supported pairs.
pub struct AssetPairCache {
    registry: Arc<ProviderRegistry>,
    cache: CacheDictionary<String, Arc<AssetPairs>>,
    timeout: Duration,
}

impl AssetPairCache {
    pub fn new(registry: Arc<ProviderRegistry>, ttl: Duration, timeout: Duration) -> Self {
        Self {
            registry,
            cache: CacheDictionary::new(ttl),
            timeout,
        }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Pairs listed by `provider`, fetched at most once per TTL.
    ///
    /// Returns the adapter's error when the provider cannot list its pairs.
    pub async fn get_pairs(
        &self,
        provider: &Arc<dyn NetworkProvider>,
    ) -> Result<Arc<AssetPairs>, MarketDataError> {
        let pairs_api = provider
            .as_asset_pairs()
            .ok_or_else(|| MarketDataError::NoProviderForNetwork {
                network: provider.network().to_string(),
                capability: Capability::AssetPairs.to_string(),
            })?;

        self.cache
            .try_get_or_compute(&provider.id().to_string(), || async {
                let pairs = invoke(
                    provider.id(),
                    "get_asset_pairs",
                    self.timeout,
                    pairs_api.get_asset_pairs(),
                )
                .await?;
                debug!(
                    "Cached {} asset pairs for provider '{}'",
                    pairs.len(),
                    provider.id()
                );
                Ok(Arc::new(pairs))
            })
            .await
    }

    /// Pairs listed on `network`.
    ///
    /// A network without a pairs provider, or a provider that fails, yields an
    /// empty list: downstream this means "no coverage", not a failure.
    pub async fn get_pairs_for_network(&self, network: &Network) -> Arc<AssetPairs> {
        let Some(provider) = self.registry.for_network(network, Capability::AssetPairs) else {
            error!(
                "An asset pairs provider cannot be located for {}",
                network
            );
            return Arc::new(AssetPairs::new());
        };

        match self.get_pairs(&provider).await {
            Ok(pairs) => pairs,
            Err(e) => {
                error!("Unable to load asset pairs for {}: {}", network, e);
                Arc::new(AssetPairs::new())
            }
        }
    }

    /// Every pair listed by any direct provider, de-duplicated.
    pub async fn all_pairs(&self) -> AssetPairs {
        let providers = self.registry.with_capability(Capability::AssetPairs, true);
        let listings = join_all(providers.iter().map(|p| self.get_pairs(p))).await;

        let mut all = AssetPairs::new();
        for (provider, listing) in providers.iter().zip(listings) {
            match listing {
                Ok(pairs) => all.extend(pairs.iter().cloned()),
                Err(e) => warn!("Skipping '{}' in pair listing: {}", provider.id(), e),
            }
        }
        all
    }

    /// Direct providers listing `pair` exactly, in preference order.
    pub async fn providers_for_pair(&self, pair: &AssetPair) -> Vec<Arc<dyn NetworkProvider>> {
        let providers = self.registry.with_capability(Capability::AssetPairs, true);
        let listings = join_all(providers.iter().map(|p| self.get_pairs(p))).await;

        providers
            .into_iter()
            .zip(listings)
            .filter_map(|(provider, listing)| match listing {
                Ok(pairs) if pairs.contains(pair) => Some(provider),
                Ok(_) => None,
                Err(e) => {
                    warn!("Skipping '{}' in pair lookup: {}", provider.id(), e);
                    None
                }
            })
            .collect()
    }

    /// The cached list for `provider_id`, if fresh. Never fetches.
    pub fn cached(&self, provider_id: &str) -> Option<Arc<AssetPairs>> {
        self.cache.peek(&provider_id.to_string())
    }
}
