//! End-to-end behaviour of the aggregation core over in-memory exchanges.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use prime_market_data::testkit::MockExchange;
use prime_market_data::{
    AggregatorConfig, Asset, AssetPair, MarketDataError, MarketDataService, Network,
    NetworkProvider, RequestedPairs,
};
use rust_decimal_macros::dec;

// =============================================================================
// Helpers
// =============================================================================

fn service(exchanges: &[Arc<MockExchange>]) -> MarketDataService {
    service_with(exchanges, AggregatorConfig::default())
}

fn service_with(exchanges: &[Arc<MockExchange>], config: AggregatorConfig) -> MarketDataService {
    let providers = exchanges
        .iter()
        .map(|e| e.clone() as Arc<dyn NetworkProvider>)
        .collect();
    MarketDataService::new(providers, &config)
}

fn pair(s: &str) -> AssetPair {
    s.parse().unwrap()
}

fn alpha_and_bravo() -> (Arc<MockExchange>, Arc<MockExchange>) {
    let alpha = Arc::new(
        MockExchange::new("alpha", "Alpha")
            .with_priority(50)
            .with_price("LTC_BTC", dec!(0.002)),
    );
    let bravo = Arc::new(
        MockExchange::new("bravo", "Bravo")
            .with_priority(100)
            .with_price("LTC_BTC", dec!(0.0021)),
    );
    (alpha, bravo)
}

// =============================================================================
// Discovery
// =============================================================================

#[tokio::test]
async fn test_preferred_exchange_serves_both_directions() {
    let (alpha, bravo) = alpha_and_bravo();
    let service = service(&[bravo, alpha]);

    let direct = service
        .discovery
        .discover(&pair("LTC_BTC"), None)
        .await
        .unwrap();
    assert_eq!(direct.provider.id(), "alpha");
    assert!(!direct.is_reversed);
    assert!(direct.via.is_none());

    let reversed = service
        .discovery
        .discover(&pair("BTC_LTC"), None)
        .await
        .unwrap();
    assert_eq!(reversed.provider.id(), "alpha");
    assert!(reversed.is_reversed);
    assert_eq!(reversed.pair_for_provider(), pair("LTC_BTC"));

    let price = service
        .coordinator
        .get_latest_price(&pair("BTC_LTC"), None)
        .await
        .unwrap();
    assert_eq!(price.network, Network::new("Alpha"));
    assert_eq!(price.price, dec!(500));
    assert!(price.is_reversed);
}

#[tokio::test]
async fn test_discovery_ignores_registration_order() {
    let (alpha, bravo) = alpha_and_bravo();
    let forward = service(&[alpha.clone(), bravo.clone()]);
    let backward = service(&[bravo, alpha]);

    for _ in 0..10 {
        let a = forward.discovery.discover(&pair("BTC_LTC"), None).await.unwrap();
        let b = backward.discovery.discover(&pair("BTC_LTC"), None).await.unwrap();
        assert_eq!(a, b);
    }
}

#[tokio::test]
async fn test_conversion_uses_at_most_one_intermediary() {
    let alpha = Arc::new(MockExchange::new("alpha", "Alpha").with_price("XRP_BTC", dec!(0.00002)));
    let bravo = Arc::new(MockExchange::new("bravo", "Bravo").with_price("BTC_USD", dec!(30000)));
    let charlie = Arc::new(MockExchange::new("charlie", "Charlie").with_price("USD_EUR", dec!(0.9)));
    let service = service(&[alpha, bravo, charlie]);

    let known = service
        .discovery
        .discover(&pair("XRP_USD"), None)
        .await
        .unwrap();
    assert_eq!(known.intermediary(), Some(&Asset::new("BTC")));
    assert_eq!(known.provider.id(), "alpha");
    assert_eq!(known.via.as_ref().unwrap().provider.id(), "bravo");

    // XRP -> BTC -> USD -> EUR would need two intermediaries.
    assert!(service
        .discovery
        .discover(&pair("XRP_EUR"), None)
        .await
        .is_none());
}

#[tokio::test]
async fn test_no_bridge_outside_configured_intermediaries() {
    let alpha = Arc::new(MockExchange::new("alpha", "Alpha").with_price("ABC_XYZ", dec!(2)));
    let bravo = Arc::new(MockExchange::new("bravo", "Bravo").with_price("XYZ_DEF", dec!(3)));

    let default = service(&[alpha.clone(), bravo.clone()]);
    assert!(default
        .discovery
        .discover(&pair("ABC_DEF"), None)
        .await
        .is_none());

    let config = AggregatorConfig {
        intermediaries: vec!["XYZ".to_string()],
        ..AggregatorConfig::default()
    };
    let bridged = service_with(&[alpha, bravo], config);
    let price = bridged
        .coordinator
        .get_latest_price(&pair("ABC_DEF"), None)
        .await
        .unwrap();
    assert_eq!(price.price, dec!(6));
    assert_eq!(price.via, Some(Asset::new("XYZ")));
}

// =============================================================================
// Coordination
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_from_many_tasks_share_one_call() {
    let kraken = Arc::new(
        MockExchange::new("kraken", "Kraken")
            .with_price("BTC_USD", dec!(20000))
            .with_latency(Duration::from_millis(100)),
    );
    let service = service(&[kraken.clone()]);

    // Warm the pair cache so every task races on the price call only.
    service.discovery.discover(&pair("BTC_USD"), None).await.unwrap();

    let tasks = (0..16).map(|_| {
        let coordinator = service.coordinator.clone();
        tokio::spawn(async move { coordinator.get_latest_price(&pair("BTC_USD"), None).await })
    });
    let results = join_all(tasks).await;

    assert_eq!(kraken.pricing_calls(), 1);
    for result in results {
        assert_eq!(result.unwrap().unwrap().price, dec!(20000));
    }
    assert_eq!(service.coordinator.in_flight_count(), 0);
}

#[tokio::test]
async fn test_converted_price_with_reversed_second_leg() {
    let alpha = Arc::new(MockExchange::new("alpha", "Alpha").with_price("XRP_BTC", dec!(0.00002)));
    let bravo = Arc::new(MockExchange::new("bravo", "Bravo").with_price("USD_BTC", dec!(0.00005)));
    let service = service(&[alpha.clone(), bravo.clone()]);

    let price = service
        .coordinator
        .get_latest_price(&pair("XRP_USD"), None)
        .await
        .unwrap();

    // 0.00002 BTC per XRP, 20000 USD per BTC.
    assert_eq!(price.price, dec!(0.4));
    assert_eq!(price.via_network, Some(Network::new("Bravo")));
    assert_eq!(alpha.pricing_calls(), 1);
    assert_eq!(bravo.pricing_calls(), 1);
}

#[tokio::test]
async fn test_batch_reports_each_pair_independently() {
    let (alpha, bravo) = alpha_and_bravo();
    let service = service(&[alpha, bravo]);

    let results = service
        .coordinator
        .get_latest_prices(&[pair("LTC_BTC"), pair("DOGE_EUR")], None)
        .await;

    assert_eq!(results[0].as_ref().unwrap().price, dec!(0.002));
    assert_eq!(
        results[1],
        Err(MarketDataError::PairNotSupported("DOGE_EUR".to_string()))
    );
}

// =============================================================================
// Aggregation
// =============================================================================

#[tokio::test]
async fn test_quotes_from_every_exchange_in_preference_order() {
    let (alpha, bravo) = alpha_and_bravo();
    let service = service(&[bravo, alpha]);

    let prices = service
        .aggregator
        .prices_for_pair(&pair("LTC_BTC"))
        .await
        .unwrap();
    let networks: Vec<_> = prices.iter().map(|p| p.network.name().to_string()).collect();
    assert_eq!(networks, vec!["Alpha", "Bravo"]);

    let missing = service
        .aggregator
        .prices_for_pair(&pair("DOGE_EUR"))
        .await
        .unwrap();
    assert!(missing.is_empty());
}

#[tokio::test]
async fn test_unlisted_pairs_are_missed_not_failed() {
    let (alpha, _) = alpha_and_bravo();
    let service = service(&[alpha]);

    let prices = service
        .aggregator
        .prices_on_network(
            &Network::new("Alpha"),
            RequestedPairs::Pairs(vec![pair("LTC_BTC"), pair("DOGE_EUR")]),
        )
        .await
        .unwrap();

    assert_eq!(prices.get(&pair("LTC_BTC")).unwrap().price, dec!(0.002));
    assert!(prices.is_missed(&pair("DOGE_EUR")));
}
