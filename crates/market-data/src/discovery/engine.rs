//! Provider lookup for a requested pair.
//!
//! Discovery walks the candidate providers in registry order (priority, then
//! title) in three passes over their cached pair lists:
//! 1. a provider listing the pair as requested
//! 2. a provider listing the reversed pair, when reversal is enabled
//! 3. a one-hop conversion through each configured intermediary, when
//!    conversion is enabled
//!
//! Each pass is exhausted across every candidate before the next one starts,
//! so a reversed match on a preferred provider never beats a direct match on
//! a less preferred one. Conversion legs are themselves only ever direct or
//! reversed, which bounds the search at one hop.

use std::sync::Arc;

use futures::future::join_all;
use log::{debug, warn};

use super::diagnostics::{DiscoveryDiagnostics, SkipReason};
use super::known::AssetPairKnownProviders;
use super::options::DiscoveryOptions;
use crate::cache::AssetPairCache;
use crate::models::{AssetPair, AssetPairs, Network};
use crate::provider::{Capability, NetworkProvider};

type Candidate = (Arc<dyn NetworkProvider>, Arc<AssetPairs>);

/// Finds which provider can quote a pair.
pub struct PairDiscovery {
    pair_cache: Arc<AssetPairCache>,
    options: DiscoveryOptions,
}

impl PairDiscovery {
    pub fn new(pair_cache: Arc<AssetPairCache>, options: DiscoveryOptions) -> Self {
        Self {
            pair_cache,
            options,
        }
    }

    pub fn options(&self) -> &DiscoveryOptions {
        &self.options
    }

    pub fn pair_cache(&self) -> &Arc<AssetPairCache> {
        &self.pair_cache
    }

    /// Find a provider for `pair`, optionally restricted to `network`.
    ///
    /// `None` means no candidate covers the pair, which is an ordinary outcome.
    pub async fn discover(
        &self,
        pair: &AssetPair,
        network: Option<&Network>,
    ) -> Option<AssetPairKnownProviders> {
        self.discover_with_diagnostics(pair, network).await.0
    }

    /// [`discover`](Self::discover), also returning what happened to each candidate.
    pub async fn discover_with_diagnostics(
        &self,
        pair: &AssetPair,
        network: Option<&Network>,
    ) -> (Option<AssetPairKnownProviders>, DiscoveryDiagnostics) {
        let mut diagnostics = DiscoveryDiagnostics::new();

        if pair.asset1 == pair.asset2 || pair.asset1.is_empty() || pair.asset2.is_empty() {
            debug!("Discovery skipped for degenerate pair {}", pair);
            return (None, diagnostics);
        }

        let candidates = self.load_candidates(network, &mut diagnostics).await;
        let found = self.search(pair, &candidates);

        match &found {
            Some(known) => {
                // Every leg's provider matched. Candidates after a direct or
                // reversed match were never reached.
                let legs: Vec<&str> = std::iter::successors(Some(known), |k| k.via.as_deref())
                    .map(|k| k.provider.id())
                    .collect();
                let converted = legs.len() > 1;
                for (provider, _) in &candidates {
                    if legs.contains(&provider.id()) {
                        diagnostics.record_match(provider.id());
                        if !converted {
                            break;
                        }
                    } else {
                        diagnostics.record_skip(provider.id(), SkipReason::NotListed);
                    }
                }
                debug!(
                    "Discovered {} on '{}' (reversed: {}, via: {:?})",
                    pair,
                    known.provider.id(),
                    known.is_reversed,
                    known.intermediary()
                );
            }
            None => {
                for (provider, _) in &candidates {
                    diagnostics.record_skip(provider.id(), SkipReason::NotListed);
                }
                debug!(
                    "No provider found for {}: {}",
                    pair,
                    diagnostics.summary()
                );
            }
        }

        (found, diagnostics)
    }

    fn search(&self, pair: &AssetPair, candidates: &[Candidate]) -> Option<AssetPairKnownProviders> {
        if let Some(known) = find_direct(pair, candidates) {
            return Some(known);
        }

        if self.options.reversal_enabled {
            if let Some(known) = find_reversed(pair, candidates) {
                return Some(known);
            }
        }

        if self.options.conversion_enabled {
            return self.find_converted(pair, candidates);
        }
        None
    }

    fn find_converted(
        &self,
        pair: &AssetPair,
        candidates: &[Candidate],
    ) -> Option<AssetPairKnownProviders> {
        for intermediary in &self.options.intermediaries {
            if pair.has(intermediary) {
                continue;
            }

            let first = AssetPair::new(pair.asset1.clone(), intermediary.clone());
            let Some(first) = find_leg(&first, candidates) else {
                continue;
            };

            let second = AssetPair::new(intermediary.clone(), pair.asset2.clone());
            let Some(second) = find_leg(&second, candidates) else {
                continue;
            };

            return Some(AssetPairKnownProviders::converted(first, second));
        }
        None
    }

    /// Candidate providers with their pair lists, in preference order.
    ///
    /// Providers whose list cannot be loaded are dropped and recorded.
    async fn load_candidates(
        &self,
        network: Option<&Network>,
        diagnostics: &mut DiscoveryDiagnostics,
    ) -> Vec<Candidate> {
        let registry = self.pair_cache.registry();
        let providers = match network {
            Some(network) => registry.providers_for_network(network, Capability::AssetPairs),
            None => registry.with_capability(Capability::AssetPairs, true),
        };

        let providers: Vec<_> = providers
            .into_iter()
            .filter(|provider| {
                let priced = !self.options.require_pricing
                    || registry
                        .for_network(provider.network(), Capability::Pricing)
                        .is_some();
                if !priced {
                    diagnostics.record_skip(provider.id(), SkipReason::NoPricingProvider);
                }
                priced
            })
            .collect();

        let listings = join_all(providers.iter().map(|p| self.pair_cache.get_pairs(p))).await;

        providers
            .into_iter()
            .zip(listings)
            .filter_map(|(provider, listing)| match listing {
                Ok(pairs) => Some((provider, pairs)),
                Err(e) => {
                    warn!(
                        "Skipping '{}' during discovery, pairs unavailable: {}",
                        provider.id(),
                        e
                    );
                    diagnostics.record_skip(
                        provider.id(),
                        SkipReason::PairsUnavailable {
                            message: e.to_string(),
                        },
                    );
                    None
                }
            })
            .collect()
    }
}

fn find_direct(pair: &AssetPair, candidates: &[Candidate]) -> Option<AssetPairKnownProviders> {
    candidates
        .iter()
        .find(|(_, pairs)| pairs.contains(pair))
        .map(|(provider, _)| AssetPairKnownProviders::direct(provider.clone(), pair.clone()))
}

fn find_reversed(pair: &AssetPair, candidates: &[Candidate]) -> Option<AssetPairKnownProviders> {
    candidates
        .iter()
        .find(|(_, pairs)| pairs.contains_reversed(pair))
        .map(|(provider, _)| AssetPairKnownProviders::reversed(provider.clone(), pair.clone()))
}

/// A conversion leg, listed either way round.
fn find_leg(pair: &AssetPair, candidates: &[Candidate]) -> Option<AssetPairKnownProviders> {
    find_direct(pair, candidates).or_else(|| find_reversed(pair, candidates))
}
