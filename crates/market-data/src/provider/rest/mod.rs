//! Generic REST exchange adapter.
//!
//! Exchanges with public JSON endpoints differ mostly in URLs and field names.
//! [`RestExchangeProvider`] reads both from an [`ExchangeConfig`] and
//! implements the pairs, pricing, order book and volume capabilities for
//! whichever endpoints the description provides.
//!
//! Every request waits on the exchange's rate limiter first.

mod config;
mod mapping;

pub use config::{
    ExchangeConfig, OrderBookEndpoint, PairsEndpoint, PayloadShape, RateLimitConfig,
    TickerFields, TickersEndpoint,
};
pub use mapping::{AssetCodeConverter, ParsedTicker};

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::aggregation::{
    build_order_book, normalize_prices, normalize_volumes, order_book_depth,
    DEFAULT_ORDER_BOOK_CAP,
};
use crate::errors::MarketDataError;
use crate::models::{
    AssetPair, AssetPairs, MarketPrice, MarketPrices, Network, OrderBook, OrderBookContext,
    PricingContext, PublicVolumeResponse, RequestedPairs, VolumeContext,
};
use crate::provider::{
    AssetPairsProvider, NetworkProvider, OrderBookProvider, PricingFeatures,
    PublicPricingProvider, PublicVolumeProvider, VolumeFeatures,
};
use crate::registry::{throttle, RateLimitContext, RateLimiter};

const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// Adapter for one exchange described by an [`ExchangeConfig`].
pub struct RestExchangeProvider {
    client: Client,
    config: ExchangeConfig,
    network: Network,
    limiter: Box<dyn RateLimiter>,
    converter: AssetCodeConverter,
}

impl RestExchangeProvider {
    /// Build the adapter. `timeout` bounds each HTTP request.
    pub fn new(config: ExchangeConfig, timeout: Duration) -> Result<Self, MarketDataError> {
        config.validate()?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MarketDataError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            network: Network::new(&config.network),
            limiter: config.rate_limit.build(),
            converter: AssetCodeConverter::new(
                &config.asset_aliases,
                config.pair_separator,
                &config.quote_assets,
                config.lowercase_tickers,
            ),
            config,
        })
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    fn rate_context(&self) -> RateLimitContext {
        if self.config.api_key.is_some() {
            RateLimitContext::authenticated()
        } else {
            RateLimitContext::anonymous()
        }
    }

    fn url(&self, template: &str, pair: Option<&AssetPair>, limit: Option<usize>) -> String {
        let mut path = template.to_string();
        if let Some(pair) = pair {
            let ticker = self.converter.ticker(pair);
            path = path.replace("{pair}", &urlencoding::encode(&ticker));
        }
        if let Some(limit) = limit {
            path = path.replace("{limit}", &limit.to_string());
        }
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// A payload pointer with `{pair}` replaced by the exchange ticker.
    fn pointer(&self, template: Option<&str>, pair: &AssetPair) -> Option<String> {
        template.map(|t| t.replace("{pair}", &self.converter.ticker(pair)))
    }

    /// GET `url` as JSON, after the rate limiter admits the request.
    async fn fetch(&self, method: &str, url: &str) -> Result<Value, MarketDataError> {
        throttle(self.limiter.as_ref(), &self.rate_context()).await;

        let mut request = self.client.get(url);
        if let Some(key) = &self.config.api_key {
            let header = self
                .config
                .api_key_header
                .as_deref()
                .unwrap_or(DEFAULT_API_KEY_HEADER);
            request = request.header(header, key);
        }

        debug!("{} request: {} {}", self.config.id, method, url);

        let response = request
            .send()
            .await
            .map_err(|e| MarketDataError::from_reqwest(&self.config.id, method, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("{} rate limited the request to {}", self.config.id, url);
            return Err(MarketDataError::RateLimited {
                provider: self.config.id.clone(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MarketDataError::response(
                &self.config.id,
                method,
                format!("HTTP {} - {}", status, body),
            ));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| MarketDataError::from_reqwest(&self.config.id, method, e))
    }

    fn market_price(&self, pair: AssetPair, ticker: ParsedTicker) -> MarketPrice {
        let volume = ticker.volume(&self.network, &pair);
        MarketPrice::new(self.network.clone(), pair, ticker.last)
            .with_statistics(ticker.statistics)
            .with_volume(volume)
    }

    /// Tickers for `requested`, keyed by canonical pair.
    async fn fetch_tickers(
        &self,
        endpoint: &TickersEndpoint,
        requested: &RequestedPairs,
        method: &str,
    ) -> Result<HashMap<AssetPair, ParsedTicker>, MarketDataError> {
        if !endpoint.is_single_pair() {
            let payload = self.fetch(method, &self.url(&endpoint.path, None, None)).await?;
            let payload = mapping::select(&payload, endpoint.pointer.as_deref())
                .ok_or_else(|| {
                    MarketDataError::response(&self.config.id, method, "Ticker pointer not found")
                })?;
            return Ok(mapping::parse_tickers(
                payload,
                endpoint.shape,
                &endpoint.symbol_field,
                &endpoint.fields,
                &self.converter,
            ));
        }

        let RequestedPairs::Pairs(pairs) = requested else {
            return Err(MarketDataError::Configuration(format!(
                "{} cannot return all tickers in one call",
                self.config.id
            )));
        };

        // A failed pair ends up missed; the call fails only if every pair did.
        let mut tickers = HashMap::new();
        let mut last_error = None;
        for pair in pairs {
            let payload = match self
                .fetch(method, &self.url(&endpoint.path, Some(pair), None))
                .await
            {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("{} failed to return {}: {}", self.config.id, pair, e);
                    last_error = Some(e);
                    continue;
                }
            };
            let pointer = self.pointer(endpoint.pointer.as_deref(), pair);
            let parsed = mapping::select(&payload, pointer.as_deref())
                .and_then(|entry| mapping::parse_ticker(entry, &endpoint.fields));
            match parsed {
                Some(parsed) => {
                    tickers.insert(pair.clone(), parsed);
                }
                None => debug!("{} returned no ticker for {}", self.config.id, pair),
            }
        }

        match last_error {
            Some(e) if tickers.is_empty() => Err(e),
            _ => Ok(tickers),
        }
    }
}

impl NetworkProvider for RestExchangeProvider {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn network(&self) -> &Network {
        &self.network
    }

    fn title(&self) -> &str {
        self.config
            .title
            .as_deref()
            .unwrap_or_else(|| self.network.name())
    }

    fn priority(&self) -> i32 {
        self.config.priority
    }

    fn is_direct(&self) -> bool {
        self.config.direct
    }

    fn is_disabled(&self) -> bool {
        self.config.disabled
    }

    fn rate_limiter(&self) -> &dyn RateLimiter {
        self.limiter.as_ref()
    }

    fn as_asset_pairs(&self) -> Option<&dyn AssetPairsProvider> {
        self.config
            .pairs
            .as_ref()
            .map(|_| self as &dyn AssetPairsProvider)
    }

    fn as_pricing(&self) -> Option<&dyn PublicPricingProvider> {
        self.config
            .tickers
            .as_ref()
            .map(|_| self as &dyn PublicPricingProvider)
    }

    fn as_order_book(&self) -> Option<&dyn OrderBookProvider> {
        self.config
            .order_book
            .as_ref()
            .map(|_| self as &dyn OrderBookProvider)
    }

    fn as_volume(&self) -> Option<&dyn PublicVolumeProvider> {
        self.config
            .tickers
            .as_ref()
            .filter(|t| t.fields.has_volume())
            .map(|_| self as &dyn PublicVolumeProvider)
    }
}

#[async_trait]
impl AssetPairsProvider for RestExchangeProvider {
    async fn get_asset_pairs(&self) -> Result<AssetPairs, MarketDataError> {
        let endpoint = self.config.pairs.as_ref().ok_or_else(|| {
            MarketDataError::Configuration(format!("{} has no pairs endpoint", self.config.id))
        })?;

        let payload = self
            .fetch("get_asset_pairs", &self.url(&endpoint.path, None, None))
            .await?;
        let pairs = mapping::parse_pairs(&payload, endpoint, &self.converter);

        if pairs.is_empty() {
            return Err(MarketDataError::response(
                &self.config.id,
                "get_asset_pairs",
                "No asset pairs returned",
            ));
        }
        Ok(pairs)
    }
}

#[async_trait]
impl PublicPricingProvider for RestExchangeProvider {
    fn pricing_features(&self) -> PricingFeatures {
        let Some(endpoint) = &self.config.tickers else {
            return PricingFeatures::default();
        };
        let bulk = !endpoint.is_single_pair();
        PricingFeatures {
            single: true,
            bulk,
            can_return_all: bulk,
            can_statistics: endpoint.fields.has_statistics(),
            can_volume: endpoint.fields.has_volume(),
        }
    }

    async fn get_pricing(&self, context: &PricingContext) -> Result<MarketPrices, MarketDataError> {
        let endpoint = self.config.tickers.as_ref().ok_or_else(|| {
            MarketDataError::Configuration(format!("{} has no tickers endpoint", self.config.id))
        })?;

        let tickers = self
            .fetch_tickers(endpoint, &context.requested, "get_pricing")
            .await?
            .into_iter()
            .map(|(pair, ticker)| (pair.clone(), self.market_price(pair, ticker)))
            .collect();

        normalize_prices(&self.config.id, &context.requested, tickers)
    }
}

#[async_trait]
impl OrderBookProvider for RestExchangeProvider {
    async fn get_order_book(
        &self,
        context: &OrderBookContext,
    ) -> Result<OrderBook, MarketDataError> {
        let endpoint = self.config.order_book.as_ref().ok_or_else(|| {
            MarketDataError::Configuration(format!("{} has no order book endpoint", self.config.id))
        })?;

        let cap = endpoint.max_depth.unwrap_or(DEFAULT_ORDER_BOOK_CAP);
        let depth = order_book_depth(context.max_records_count, cap);
        let payload = self
            .fetch(
                "get_order_book",
                &self.url(&endpoint.path, Some(&context.pair), Some(depth)),
            )
            .await?;
        let pointer = self.pointer(endpoint.pointer.as_deref(), &context.pair);
        let payload = mapping::select(&payload, pointer.as_deref()).ok_or_else(|| {
            MarketDataError::response(&self.config.id, "get_order_book", "Order book not found")
        })?;

        let bids = mapping::parse_levels(payload, &endpoint.bids, endpoint);
        let asks = mapping::parse_levels(payload, &endpoint.asks, endpoint);
        if bids.is_empty() && asks.is_empty() {
            return Err(MarketDataError::response(
                &self.config.id,
                "get_order_book",
                format!("Empty order book for {}", context.pair),
            ));
        }

        Ok(build_order_book(
            self.network.clone(),
            context.pair.clone(),
            bids,
            asks,
            depth,
        ))
    }
}

#[async_trait]
impl PublicVolumeProvider for RestExchangeProvider {
    fn volume_features(&self) -> VolumeFeatures {
        let bulk = self
            .config
            .tickers
            .as_ref()
            .map(|t| !t.is_single_pair())
            .unwrap_or(false);
        VolumeFeatures {
            single: true,
            bulk,
            can_return_all: bulk,
        }
    }

    async fn get_volume(
        &self,
        context: &VolumeContext,
    ) -> Result<PublicVolumeResponse, MarketDataError> {
        let endpoint = self.config.tickers.as_ref().ok_or_else(|| {
            MarketDataError::Configuration(format!("{} has no tickers endpoint", self.config.id))
        })?;

        let volumes = self
            .fetch_tickers(endpoint, &context.requested, "get_volume")
            .await?
            .into_iter()
            .map(|(pair, ticker)| (pair.clone(), ticker.volume(&self.network, &pair)))
            .filter(|(_, volume)| volume.has_volume())
            .collect();

        normalize_volumes(&self.config.id, &context.requested, volumes)
    }
}
