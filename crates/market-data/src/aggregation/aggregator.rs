//! Multi-provider queries.
//!
//! Each query fans out to every provider that covers the pair, runs the calls
//! concurrently through [`invoke`], and keeps whatever succeeded. A failing
//! provider is logged and left out. Only when every candidate failed does the
//! caller see an error.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use log::{debug, warn};

use super::invoke::invoke;
use super::normalize::order_book_depth;
use crate::cache::AssetPairCache;
use crate::errors::MarketDataError;
use crate::models::{
    AssetPair, MarketPrice, MarketPrices, Network, OrderBook, OrderBookContext, PairVolumes,
    PricingContext, RequestedPairs, VolumeContext,
};
use crate::provider::{Capability, NetworkProvider};
use crate::registry::ProviderRegistry;

/// A provider covering a pair, and whether it lists it reversed.
type Coverage = (Arc<dyn NetworkProvider>, bool);

/// Fan-out queries across every provider covering a pair.
pub struct MarketAggregator {
    pair_cache: Arc<AssetPairCache>,
    timeout: Duration,
    order_book_cap: usize,
}

impl MarketAggregator {
    pub fn new(pair_cache: Arc<AssetPairCache>, timeout: Duration, order_book_cap: usize) -> Self {
        Self {
            pair_cache,
            timeout,
            order_book_cap,
        }
    }

    fn registry(&self) -> &Arc<ProviderRegistry> {
        self.pair_cache.registry()
    }

    /// Direct providers with `capability` listing `pair` either way round.
    ///
    /// Fails only when no direct provider has `capability` at all.
    async fn coverage(
        &self,
        pair: &AssetPair,
        capability: Capability,
    ) -> Result<Vec<Coverage>, MarketDataError> {
        let providers = self.registry().with_capability(capability, true);
        if providers.is_empty() {
            return Err(MarketDataError::NoProvidersAvailable);
        }
        let listings = join_all(providers.iter().map(|p| self.pair_cache.get_pairs(p))).await;

        Ok(providers
            .into_iter()
            .zip(listings)
            .filter_map(|(provider, listing)| match listing {
                Ok(pairs) if pairs.contains(pair) => Some((provider, false)),
                Ok(pairs) if pairs.contains_reversed(pair) => Some((provider, true)),
                Ok(_) => None,
                Err(e) => {
                    warn!("Skipping '{}', pairs unavailable: {}", provider.id(), e);
                    None
                }
            })
            .collect())
    }

    /// Quotes for `pair` from every direct provider that covers it, in
    /// preference order and expressed in the requested direction.
    ///
    /// An uncovered pair yields an empty list. A registry without any direct
    /// pricing provider is an error.
    pub async fn prices_for_pair(
        &self,
        pair: &AssetPair,
    ) -> Result<Vec<MarketPrice>, MarketDataError> {
        let coverage = self.coverage(pair, Capability::Pricing).await?;
        if coverage.is_empty() {
            debug!("No pricing provider covers {}", pair);
            return Ok(Vec::new());
        }

        let results = join_all(
            coverage
                .iter()
                .map(|(provider, reversed)| self.price_one(provider, pair, *reversed)),
        )
        .await;

        let attempted = results.len();
        let prices: Vec<_> = coverage
            .iter()
            .zip(results)
            .filter_map(|((provider, _), result)| match result {
                Ok(price) => Some(price),
                Err(e) => {
                    warn!("Excluding '{}' from {} prices: {}", provider.id(), pair, e);
                    None
                }
            })
            .collect();

        if prices.is_empty() {
            warn!("All {} pricing providers failed for {}", attempted, pair);
            return Err(MarketDataError::AllProvidersFailed);
        }
        Ok(prices)
    }

    async fn price_one(
        &self,
        provider: &Arc<dyn NetworkProvider>,
        pair: &AssetPair,
        reversed: bool,
    ) -> Result<MarketPrice, MarketDataError> {
        let pricing = provider
            .as_pricing()
            .ok_or_else(|| no_provider(provider.network(), Capability::Pricing))?;
        let provider_pair = if reversed { pair.reversed() } else { pair.clone() };

        let single = PricingContext::single(provider_pair.clone());
        let context = if pricing.pricing_features().supports(&single) {
            single
        } else {
            PricingContext::all()
        };

        let prices = invoke(
            provider.id(),
            "get_pricing",
            self.timeout,
            pricing.get_pricing(&context),
        )
        .await?;

        let price = prices
            .get(&provider_pair)
            .ok_or_else(|| MarketDataError::PairNotSupported(provider_pair.to_string()))?;
        if reversed {
            price.reversed()
        } else {
            Ok(price.clone())
        }
    }

    /// Prices for several pairs, or every pair, from the pricing provider of
    /// `network`.
    ///
    /// Providers without bulk support are asked one pair at a time. A pair
    /// whose single call fails is reported as missed.
    pub async fn prices_on_network(
        &self,
        network: &Network,
        requested: RequestedPairs,
    ) -> Result<MarketPrices, MarketDataError> {
        let provider = self
            .registry()
            .for_network(network, Capability::Pricing)
            .ok_or_else(|| no_provider(network, Capability::Pricing))?;
        let pricing = provider
            .as_pricing()
            .ok_or_else(|| no_provider(network, Capability::Pricing))?;

        let context = PricingContext { requested };
        if pricing.pricing_features().supports(&context) {
            return invoke(
                provider.id(),
                "get_pricing",
                self.timeout,
                pricing.get_pricing(&context),
            )
            .await;
        }

        let pairs = match context.requested {
            RequestedPairs::All => {
                return Err(MarketDataError::Configuration(format!(
                    "{} cannot return all prices in one call",
                    network
                )))
            }
            RequestedPairs::Pairs(pairs) => pairs,
        };

        debug!(
            "'{}' has no bulk pricing, fetching {} pairs one by one",
            provider.id(),
            pairs.len()
        );
        let contexts: Vec<_> = pairs
            .iter()
            .map(|pair| PricingContext::single(pair.clone()))
            .collect();
        let results = join_all(contexts.iter().map(|context| {
            invoke(
                provider.id(),
                "get_pricing",
                self.timeout,
                pricing.get_pricing(context),
            )
        }))
        .await;

        let mut merged = MarketPrices::new();
        let mut failures = 0;
        for (pair, result) in pairs.into_iter().zip(results) {
            match result.map(|prices| prices.get(&pair).cloned()) {
                Ok(Some(price)) => merged.add(price),
                Ok(None) => merged.add_missed(pair),
                Err(e) => {
                    warn!("'{}' failed for {}: {}", provider.id(), pair, e);
                    failures += 1;
                    merged.add_missed(pair);
                }
            }
        }

        if merged.is_empty() && failures > 0 {
            return Err(MarketDataError::AllProvidersFailed);
        }
        Ok(merged)
    }

    /// Traded volume of `pair` from every direct volume provider covering it.
    pub async fn volumes_for_pair(&self, pair: &AssetPair) -> Result<PairVolumes, MarketDataError> {
        let coverage = self.coverage(pair, Capability::Volume).await?;
        let mut volumes = PairVolumes::new(pair.clone());
        if coverage.is_empty() {
            return Ok(volumes);
        }

        let results = join_all(coverage.iter().map(|(provider, reversed)| async move {
            let api = provider
                .as_volume()
                .ok_or_else(|| no_provider(provider.network(), Capability::Volume))?;
            let provider_pair = if *reversed { pair.reversed() } else { pair.clone() };
            let context = VolumeContext::pairs(vec![provider_pair.clone()]);

            let response = invoke(provider.id(), "get_volume", self.timeout, api.get_volume(&context))
                .await?;
            response
                .get(&provider_pair)
                .cloned()
                .ok_or_else(|| MarketDataError::PairNotSupported(provider_pair.to_string()))
        }))
        .await;

        let mut failures = 0;
        for ((provider, _), result) in coverage.iter().zip(results) {
            match result {
                Ok(volume) => volumes.add(volume)?,
                Err(e) => {
                    warn!("Excluding '{}' from {} volumes: {}", provider.id(), pair, e);
                    failures += 1;
                }
            }
        }

        if volumes.is_empty() && failures > 0 {
            return Err(MarketDataError::AllProvidersFailed);
        }
        Ok(volumes)
    }

    /// Order book for `pair` on `network`, at most `depth` levels per side and
    /// never more than the configured cap.
    pub async fn order_book(
        &self,
        network: &Network,
        pair: &AssetPair,
        depth: usize,
    ) -> Result<OrderBook, MarketDataError> {
        let provider = self
            .registry()
            .for_network(network, Capability::OrderBook)
            .ok_or_else(|| no_provider(network, Capability::OrderBook))?;
        let api = provider
            .as_order_book()
            .ok_or_else(|| no_provider(network, Capability::OrderBook))?;

        let depth = order_book_depth(depth, self.order_book_cap);
        let context = OrderBookContext::new(pair.clone(), depth);
        let mut book = invoke(
            provider.id(),
            "get_order_book",
            self.timeout,
            api.get_order_book(&context),
        )
        .await?;

        book.bids.truncate(depth);
        book.asks.truncate(depth);
        Ok(book)
    }
}

fn no_provider(network: &Network, capability: Capability) -> MarketDataError {
    MarketDataError::NoProviderForNetwork {
        network: network.to_string(),
        capability: capability.to_string(),
    }
}
