//! Explicitly constructed context holding the whole aggregation core.

use std::sync::Arc;

use log::info;

use crate::aggregation::MarketAggregator;
use crate::cache::AssetPairCache;
use crate::config::{AggregatorConfig, MarketDataConfig};
use crate::coordinator::PriceCoordinator;
use crate::discovery::PairDiscovery;
use crate::errors::MarketDataError;
use crate::provider::rest::RestExchangeProvider;
use crate::provider::NetworkProvider;
use crate::registry::ProviderRegistry;

/// Registry, caches, discovery, coordinator and aggregator wired together.
///
/// Cloning is cheap; clones share every cache.
#[derive(Clone)]
pub struct MarketDataService {
    pub registry: Arc<ProviderRegistry>,
    pub pair_cache: Arc<AssetPairCache>,
    pub discovery: Arc<PairDiscovery>,
    pub coordinator: PriceCoordinator,
    pub aggregator: Arc<MarketAggregator>,
}

impl MarketDataService {
    /// Wire the core around an explicit provider list.
    pub fn new(providers: Vec<Arc<dyn NetworkProvider>>, config: &AggregatorConfig) -> Self {
        let timeout = config.request_timeout();
        let registry = Arc::new(ProviderRegistry::new(providers));
        let pair_cache = Arc::new(AssetPairCache::new(
            registry.clone(),
            config.pair_cache_ttl(),
            timeout,
        ));
        let discovery = Arc::new(PairDiscovery::new(
            pair_cache.clone(),
            config.discovery_options(),
        ));
        let coordinator = PriceCoordinator::new(registry.clone(), discovery.clone(), timeout);
        let aggregator = Arc::new(MarketAggregator::new(
            pair_cache.clone(),
            timeout,
            config.order_book_cap,
        ));

        info!(
            "Market data service ready with {} providers on {} networks",
            registry.providers().len(),
            registry.networks().len()
        );

        Self {
            registry,
            pair_cache,
            discovery,
            coordinator,
            aggregator,
        }
    }

    /// Build REST adapters for every configured exchange and wire the core.
    pub fn from_config(config: &MarketDataConfig) -> Result<Self, MarketDataError> {
        config.aggregator.validate()?;

        let providers = config
            .exchanges
            .iter()
            .map(|exchange| {
                RestExchangeProvider::new(exchange.clone(), config.aggregator.request_timeout())
                    .map(|p| Arc::new(p) as Arc<dyn NetworkProvider>)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(providers, &config.aggregator))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::AssetPair;
    use crate::testkit::MockExchange;

    #[tokio::test]
    async fn test_components_share_one_pair_cache() {
        let kraken = Arc::new(MockExchange::new("kraken", "Kraken").with_price("BTC_USD", dec!(20000)));
        let service = MarketDataService::new(
            vec![kraken.clone() as Arc<dyn NetworkProvider>],
            &AggregatorConfig::default(),
        );

        let pair = AssetPair::new("BTC", "USD");
        service.coordinator.get_latest_price(&pair, None).await.unwrap();
        service.aggregator.prices_for_pair(&pair).await.unwrap();
        service.discovery.discover(&pair, None).await.unwrap();

        assert_eq!(kraken.pairs_calls(), 1);
    }

    #[test]
    fn test_from_config_builds_rest_adapters() {
        let config = MarketDataConfig::from_json(
            r#"{
                "exchanges": [
                    {
                        "id": "exmo",
                        "network": "Exmo",
                        "base_url": "https://api.exmo.com/v1.1",
                        "pair_separator": "_",
                        "pairs": { "path": "/pair_settings" }
                    },
                    {
                        "id": "old",
                        "network": "Old",
                        "disabled": true,
                        "base_url": "https://example.com"
                    }
                ]
            }"#,
        )
        .unwrap();

        let service = MarketDataService::from_config(&config).unwrap();
        assert_eq!(service.registry.providers().len(), 1);
        assert_eq!(service.registry.providers()[0].id(), "exmo");
    }

    #[test]
    fn test_bad_exchange_config_fails_construction() {
        let config = MarketDataConfig::from_json(
            r#"{ "exchanges": [ { "id": "x", "network": "X", "base_url": "nope" } ] }"#,
        )
        .unwrap();
        assert!(matches!(
            MarketDataService::from_config(&config),
            Err(MarketDataError::Configuration(_))
        ));
    }
}
