//! In-memory exchange for tests.
//!
//! [`MockExchange`] implements every capability trait from static data and
//! counts the calls it receives, so tests can assert on deduplication and
//! caching without any network access.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::aggregation::{
    build_order_book, normalize_prices, normalize_volumes, order_book_depth,
    DEFAULT_ORDER_BOOK_CAP,
};
use crate::errors::MarketDataError;
use crate::models::{
    AssetPair, AssetPairs, MarketPrice, MarketPrices, Network, NetworkPairVolume, OrderBook,
    OrderBookContext, PriceStatistics, PricingContext, PublicVolumeResponse, VolumeContext,
};
use crate::provider::{
    AssetPairsProvider, NetworkProvider, OrderBookProvider, PricingFeatures,
    PublicPricingProvider, PublicVolumeProvider, VolumeFeatures,
};
use crate::registry::{NoRateLimits, RateLimiter};

fn parse(pair: &str) -> AssetPair {
    pair.parse()
        .unwrap_or_else(|_| panic!("invalid test pair '{}'", pair))
}

/// Configurable fake exchange.
pub struct MockExchange {
    id: String,
    network: Network,
    priority: i32,
    direct: bool,
    disabled: bool,
    limiter: Box<dyn RateLimiter>,

    pairs: Vec<AssetPair>,
    tickers: HashMap<AssetPair, (Decimal, PriceStatistics, Option<Decimal>)>,
    bids: Vec<(Decimal, Decimal)>,
    asks: Vec<(Decimal, Decimal)>,
    features: PricingFeatures,

    has_pairs: bool,
    has_pricing: bool,
    has_order_book: bool,
    has_volume: bool,
    fail_pairs: bool,
    fail_pricing: bool,
    latency: Duration,

    pairs_calls: AtomicUsize,
    pricing_calls: AtomicUsize,
    order_book_calls: AtomicUsize,
}

impl MockExchange {
    pub fn new(id: &str, network: &str) -> Self {
        Self {
            id: id.to_string(),
            network: Network::new(network),
            priority: 100,
            direct: true,
            disabled: false,
            limiter: Box::new(NoRateLimits),
            pairs: Vec::new(),
            tickers: HashMap::new(),
            bids: Vec::new(),
            asks: Vec::new(),
            features: PricingFeatures {
                single: true,
                bulk: true,
                can_return_all: true,
                can_statistics: true,
                can_volume: true,
            },
            has_pairs: true,
            has_pricing: true,
            has_order_book: true,
            has_volume: true,
            fail_pairs: false,
            fail_pricing: false,
            latency: Duration::ZERO,
            pairs_calls: AtomicUsize::new(0),
            pricing_calls: AtomicUsize::new(0),
            order_book_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_direct(mut self, direct: bool) -> Self {
        self.direct = direct;
        self
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn with_rate_limiter(mut self, limiter: impl RateLimiter + 'static) -> Self {
        self.limiter = Box::new(limiter);
        self
    }

    /// List pairs without quoting them.
    pub fn with_pairs(mut self, pairs: &[&str]) -> Self {
        for pair in pairs {
            let pair = parse(pair);
            if !self.pairs.contains(&pair) {
                self.pairs.push(pair);
            }
        }
        self
    }

    /// List and quote a pair.
    pub fn with_price(self, pair: &str, price: Decimal) -> Self {
        self.with_quote(pair, price, PriceStatistics::default(), None)
    }

    /// List and quote a pair with statistics and base volume.
    pub fn with_quote(
        mut self,
        pair: &str,
        price: Decimal,
        statistics: PriceStatistics,
        volume: Option<Decimal>,
    ) -> Self {
        self = self.with_pairs(&[pair]);
        self.tickers.insert(parse(pair), (price, statistics, volume));
        self
    }

    pub fn with_order_book(
        mut self,
        bids: Vec<(Decimal, Decimal)>,
        asks: Vec<(Decimal, Decimal)>,
    ) -> Self {
        self.bids = bids;
        self.asks = asks;
        self
    }

    pub fn with_pricing_features(mut self, features: PricingFeatures) -> Self {
        self.features = features;
        self
    }

    pub fn without_pairs(mut self) -> Self {
        self.has_pairs = false;
        self
    }

    pub fn without_pricing(mut self) -> Self {
        self.has_pricing = false;
        self
    }

    pub fn without_order_book(mut self) -> Self {
        self.has_order_book = false;
        self
    }

    pub fn without_volume(mut self) -> Self {
        self.has_volume = false;
        self
    }

    pub fn failing_pairs(mut self) -> Self {
        self.fail_pairs = true;
        self
    }

    pub fn failing_pricing(mut self) -> Self {
        self.fail_pricing = true;
        self
    }

    /// Delay every call, to widen race windows in concurrency tests.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn pairs_calls(&self) -> usize {
        self.pairs_calls.load(Ordering::SeqCst)
    }

    pub fn pricing_calls(&self) -> usize {
        self.pricing_calls.load(Ordering::SeqCst)
    }

    pub fn order_book_calls(&self) -> usize {
        self.order_book_calls.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        if self.latency > Duration::ZERO {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn market_price(&self, pair: &AssetPair) -> Option<MarketPrice> {
        let (price, statistics, volume) = self.tickers.get(pair)?;
        Some(
            MarketPrice::new(self.network.clone(), pair.clone(), *price)
                .with_statistics(statistics.clone())
                .with_volume(NetworkPairVolume::new(
                    self.network.clone(),
                    pair.clone(),
                    *volume,
                )),
        )
    }
}

impl NetworkProvider for MockExchange {
    fn id(&self) -> &str {
        &self.id
    }

    fn network(&self) -> &Network {
        &self.network
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn is_direct(&self) -> bool {
        self.direct
    }

    fn is_disabled(&self) -> bool {
        self.disabled
    }

    fn rate_limiter(&self) -> &dyn RateLimiter {
        self.limiter.as_ref()
    }

    fn as_asset_pairs(&self) -> Option<&dyn AssetPairsProvider> {
        self.has_pairs.then_some(self as &dyn AssetPairsProvider)
    }

    fn as_pricing(&self) -> Option<&dyn PublicPricingProvider> {
        self.has_pricing.then_some(self as &dyn PublicPricingProvider)
    }

    fn as_order_book(&self) -> Option<&dyn OrderBookProvider> {
        self.has_order_book.then_some(self as &dyn OrderBookProvider)
    }

    fn as_volume(&self) -> Option<&dyn PublicVolumeProvider> {
        self.has_volume.then_some(self as &dyn PublicVolumeProvider)
    }
}

#[async_trait]
impl AssetPairsProvider for MockExchange {
    async fn get_asset_pairs(&self) -> Result<AssetPairs, MarketDataError> {
        self.pairs_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;

        if self.fail_pairs || self.pairs.is_empty() {
            return Err(MarketDataError::response(
                &self.id,
                "get_asset_pairs",
                "No asset pairs returned",
            ));
        }
        Ok(self.pairs.iter().cloned().collect())
    }
}

#[async_trait]
impl PublicPricingProvider for MockExchange {
    fn pricing_features(&self) -> PricingFeatures {
        self.features
    }

    async fn get_pricing(&self, context: &PricingContext) -> Result<MarketPrices, MarketDataError> {
        self.pricing_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;

        if self.fail_pricing {
            return Err(MarketDataError::Transport {
                provider: self.id.clone(),
                message: "connection reset".to_string(),
            });
        }

        let tickers = self
            .tickers
            .keys()
            .filter_map(|pair| self.market_price(pair).map(|p| (pair.clone(), p)))
            .collect();
        normalize_prices(&self.id, &context.requested, tickers)
    }
}

#[async_trait]
impl OrderBookProvider for MockExchange {
    async fn get_order_book(
        &self,
        context: &OrderBookContext,
    ) -> Result<OrderBook, MarketDataError> {
        self.order_book_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;

        if !self.pairs.contains(&context.pair) {
            return Err(MarketDataError::response(
                &self.id,
                "get_order_book",
                format!("Specified currency pair {} is not supported by provider", context.pair),
            ));
        }

        Ok(build_order_book(
            self.network.clone(),
            context.pair.clone(),
            self.bids.iter().copied(),
            self.asks.iter().copied(),
            order_book_depth(context.max_records_count, DEFAULT_ORDER_BOOK_CAP),
        ))
    }
}

#[async_trait]
impl PublicVolumeProvider for MockExchange {
    fn volume_features(&self) -> VolumeFeatures {
        VolumeFeatures {
            single: true,
            bulk: true,
            can_return_all: true,
        }
    }

    async fn get_volume(
        &self,
        context: &VolumeContext,
    ) -> Result<PublicVolumeResponse, MarketDataError> {
        self.delay().await;

        let volumes = self
            .tickers
            .iter()
            .filter_map(|(pair, (_, _, volume))| {
                volume.map(|v| {
                    (
                        pair.clone(),
                        NetworkPairVolume::new(self.network.clone(), pair.clone(), Some(v)),
                    )
                })
            })
            .collect();

        normalize_volumes(&self.id, &context.requested, volumes)
    }
}
