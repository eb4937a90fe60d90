//! Latest-price coordinator.
//!
//! The find-or-start step runs under one lock, so two callers can never both
//! conclude that no equal request exists. The shared future removes its own
//! entry when it completes; later callers start a fresh request.
//!
//! A converted match is priced as two linked leg requests. Each leg already
//! carries its discovered provider, so pricing a leg never runs discovery
//! again.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use futures::future::{join, join_all, BoxFuture, FutureExt, Shared};
use log::{debug, warn};
use tokio::sync::broadcast;

use super::request::{LatestPriceResult, RequestKey};
use crate::aggregation::invoke;
use crate::discovery::{AssetPairKnownProviders, PairDiscovery};
use crate::errors::{MarketDataError, RetryClass};
use crate::models::{AssetPair, LatestPrice, Network, PricingContext};
use crate::provider::{Capability, NetworkProvider};
use crate::registry::ProviderRegistry;

/// Buffered results per subscriber before the slowest one starts lagging.
pub const RESULT_CHANNEL_CAPACITY: usize = 256;

/// Request keys whose latest result is kept for [`PriceCoordinator::last_result`].
pub const LAST_RESULTS_CAPACITY: usize = 1024;

type SharedPrice = Shared<BoxFuture<'static, Result<LatestPrice, MarketDataError>>>;

enum Work {
    Discover,
    Known(AssetPairKnownProviders),
}

/// Latest result per key, dropping the least recently completed key once
/// `capacity` is exceeded.
struct LastResults {
    capacity: usize,
    entries: HashMap<RequestKey, LatestPriceResult>,
    order: VecDeque<RequestKey>,
}

impl LastResults {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, key: &RequestKey) -> Option<&LatestPriceResult> {
        self.entries.get(key)
    }

    fn insert(&mut self, result: LatestPriceResult) {
        if self.entries.contains_key(&result.key) {
            self.order.retain(|k| k != &result.key);
        }
        self.order.push_back(result.key.clone());
        self.entries.insert(result.key.clone(), result);

        while self.entries.len() > self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }
}

struct Inner {
    registry: Arc<ProviderRegistry>,
    discovery: Arc<PairDiscovery>,
    timeout: Duration,
    in_flight: Mutex<HashMap<RequestKey, SharedPrice>>,
    last_results: Mutex<LastResults>,
    results: broadcast::Sender<LatestPriceResult>,
}

/// Deduplicating front door for latest-price requests.
#[derive(Clone)]
pub struct PriceCoordinator {
    inner: Arc<Inner>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        warn!("Coordinator {} mutex was poisoned, recovering", name);
        poisoned.into_inner()
    })
}

impl PriceCoordinator {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        discovery: Arc<PairDiscovery>,
        timeout: Duration,
    ) -> Self {
        let (results, _) = broadcast::channel(RESULT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                registry,
                discovery,
                timeout,
                in_flight: Mutex::new(HashMap::new()),
                last_results: Mutex::new(LastResults::new(LAST_RESULTS_CAPACITY)),
                results,
            }),
        }
    }

    /// Latest price of `pair`, discovering a provider first.
    ///
    /// Equal concurrent requests share one discovery and one provider call.
    pub async fn get_latest_price(
        &self,
        pair: &AssetPair,
        network: Option<&Network>,
    ) -> Result<LatestPrice, MarketDataError> {
        let key = RequestKey::new(pair.clone(), network.cloned());
        self.inner.join_or_start(key, Work::Discover).await
    }

    /// Latest prices for several pairs, one result per pair in input order.
    pub async fn get_latest_prices(
        &self,
        pairs: &[AssetPair],
        network: Option<&Network>,
    ) -> Vec<Result<LatestPrice, MarketDataError>> {
        join_all(pairs.iter().map(|pair| self.get_latest_price(pair, network))).await
    }

    /// Receive every completed result, including conversion legs.
    pub fn subscribe(&self) -> broadcast::Receiver<LatestPriceResult> {
        self.inner.results.subscribe()
    }

    /// The most recent completed result for `key`.
    ///
    /// One entry is kept per distinct request key and replaced on every
    /// completion. Once more than [`LAST_RESULTS_CAPACITY`] keys are held,
    /// the entries completed longest ago are dropped.
    pub fn last_result(&self, key: &RequestKey) -> Option<LatestPriceResult> {
        lock(&self.inner.last_results, "last results").get(key).cloned()
    }

    pub fn in_flight_count(&self) -> usize {
        lock(&self.inner.in_flight, "in-flight").len()
    }
}

impl Inner {
    fn join_or_start(self: &Arc<Self>, key: RequestKey, work: Work) -> SharedPrice {
        let mut in_flight = lock(&self.in_flight, "in-flight");
        if let Some(existing) = in_flight.get(&key) {
            debug!("Joining in-flight request for {:?}", key);
            return existing.clone();
        }

        let inner = Arc::clone(self);
        let task_key = key.clone();
        let request = async move {
            let result = inner.run(&task_key, work).await;
            inner.complete(task_key, result.clone());
            result
        }
        .boxed()
        .shared();

        in_flight.insert(key, request.clone());
        request
    }

    fn complete(&self, key: RequestKey, result: Result<LatestPrice, MarketDataError>) {
        lock(&self.in_flight, "in-flight").remove(&key);

        let published = LatestPriceResult { key, result };
        lock(&self.last_results, "last results").insert(published.clone());

        // No subscribers is fine.
        let _ = self.results.send(published);
    }

    async fn run(
        self: &Arc<Self>,
        key: &RequestKey,
        work: Work,
    ) -> Result<LatestPrice, MarketDataError> {
        let mut known = match work {
            Work::Known(known) => known,
            Work::Discover => self
                .discovery
                .discover(&key.pair, key.network_suggested.as_ref())
                .await
                .ok_or_else(|| self.not_found(&key.pair))?,
        };

        match known.via.take() {
            None => self.fetch_leg(&known).await,
            Some(second) => self.fetch_converted(key, known, *second).await,
        }
    }

    /// Discovery came back empty: either nothing can price at all, or nothing
    /// covers this pair.
    fn not_found(&self, pair: &AssetPair) -> MarketDataError {
        if self
            .registry
            .with_capability(Capability::Pricing, false)
            .is_empty()
        {
            MarketDataError::NoProvidersAvailable
        } else {
            MarketDataError::PairNotSupported(pair.to_string())
        }
    }

    async fn fetch_converted(
        self: &Arc<Self>,
        key: &RequestKey,
        first: AssetPairKnownProviders,
        second: AssetPairKnownProviders,
    ) -> Result<LatestPrice, MarketDataError> {
        let via = first.pair.asset2.clone();
        let first_key = RequestKey::part1(first.pair.clone(), key.network_suggested.clone());
        let second_key = RequestKey::part2(second.pair.clone(), second.network().clone());

        let (first, second) = join(
            self.join_or_start(first_key, Work::Known(first)),
            self.join_or_start(second_key, Work::Known(second)),
        )
        .await;
        let (first, second) = (first?, second?);

        let price = first.price.checked_mul(second.price).ok_or_else(|| {
            MarketDataError::InvalidPrice {
                pair: key.pair.to_string(),
                message: format!("overflow combining legs via {}", via),
            }
        })?;

        debug!(
            "Converted {} via {}: {} x {} = {}",
            key.pair, via, first.price, second.price, price
        );

        Ok(LatestPrice {
            pair: key.pair.clone(),
            price,
            network: first.network,
            is_reversed: first.is_reversed,
            via: Some(via),
            via_network: Some(second.network),
            utc_created: Utc::now(),
        })
    }

    /// Price one discovered leg on its network, in the requested direction.
    ///
    /// The network's pricing providers are tried in preference order, the
    /// discovered provider first. An error that retrying cannot fix ends the
    /// leg; any other error moves on to the next provider.
    async fn fetch_leg(
        &self,
        known: &AssetPairKnownProviders,
    ) -> Result<LatestPrice, MarketDataError> {
        let network = known.network();
        let mut providers = self
            .registry
            .providers_for_network(network, Capability::Pricing);
        if let Some(index) = providers.iter().position(|p| p.id() == known.provider.id()) {
            let discovered = providers.remove(index);
            providers.insert(0, discovered);
        }

        let mut last_error = None;
        for provider in providers {
            let error = match self.price_on(provider.as_ref(), known).await {
                Ok(price) => return Ok(price),
                Err(e) => e,
            };
            if error.retry_class() == RetryClass::Never {
                return Err(error);
            }
            warn!(
                "Pricing {} on '{}' failed, trying the next provider: {}",
                known.pair,
                provider.id(),
                error
            );
            last_error = Some(error);
        }

        Err(last_error.unwrap_or_else(|| MarketDataError::NoProviderForNetwork {
            network: network.to_string(),
            capability: Capability::Pricing.to_string(),
        }))
    }

    async fn price_on(
        &self,
        provider: &dyn NetworkProvider,
        known: &AssetPairKnownProviders,
    ) -> Result<LatestPrice, MarketDataError> {
        let pricing = provider
            .as_pricing()
            .ok_or_else(|| MarketDataError::NoProviderForNetwork {
                network: provider.network().to_string(),
                capability: Capability::Pricing.to_string(),
            })?;

        let provider_pair = known.pair_for_provider();
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

        let quote = prices.get(&provider_pair).ok_or_else(|| {
            MarketDataError::response(
                provider.id(),
                "get_pricing",
                format!("{} missing from response", provider_pair),
            )
        })?;
        let quote = if known.is_reversed {
            quote.reversed()?
        } else {
            quote.clone()
        };

        Ok(LatestPrice {
            pair: known.pair.clone(),
            price: quote.price,
            network: known.network().clone(),
            is_reversed: known.is_reversed,
            via: None,
            via_network: None,
            utc_created: quote.utc_created,
        })
    }
}
