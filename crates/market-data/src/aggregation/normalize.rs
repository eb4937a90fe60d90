//! Normalization of adapter responses into the uniform result shape.
//!
//! Adapters parse their exchange's payload into a map keyed by pair and hand
//! it to these helpers together with what the caller asked for. The helpers
//! guarantee:
//! - every explicitly requested pair lands exactly once, either as a result
//!   or in `missed_pairs`
//! - "return all" requests yield every quoted pair, in pair order
//! - an entirely empty payload is a provider error, a single gap is not

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;

use crate::errors::MarketDataError;
use crate::models::{
    AssetPair, MarketPrice, MarketPrices, Network, NetworkPairVolume, OrderBook,
    PublicVolumeResponse, RequestedPairs,
};

/// Upper bound on order-book levels per side, whatever the caller asks for.
pub const DEFAULT_ORDER_BOOK_CAP: usize = 1000;

/// Split `entries` into (found, missed) according to `requested`.
fn partition<T>(
    requested: &RequestedPairs,
    mut entries: HashMap<AssetPair, T>,
) -> (Vec<T>, Vec<AssetPair>) {
    match requested {
        RequestedPairs::All => {
            let mut all: Vec<_> = entries.into_iter().collect();
            all.sort_by(|a, b| a.0.cmp(&b.0));
            (all.into_iter().map(|(_, value)| value).collect(), Vec::new())
        }
        RequestedPairs::Pairs(pairs) => {
            let mut seen = HashSet::new();
            let mut found = Vec::new();
            let mut missed = Vec::new();

            for pair in pairs {
                if !seen.insert(pair) {
                    continue;
                }
                match entries.remove(pair) {
                    Some(value) => found.push(value),
                    None => missed.push(pair.clone()),
                }
            }
            (found, missed)
        }
    }
}

/// Build [`MarketPrices`] from a provider's ticker map.
pub fn normalize_prices(
    provider: &str,
    requested: &RequestedPairs,
    tickers: HashMap<AssetPair, MarketPrice>,
) -> Result<MarketPrices, MarketDataError> {
    if tickers.is_empty() {
        return Err(MarketDataError::response(
            provider,
            "get_pricing",
            "No tickers returned",
        ));
    }

    let (prices, missed_pairs) = partition(requested, tickers);
    Ok(MarketPrices {
        prices,
        missed_pairs,
    })
}

/// Build a [`PublicVolumeResponse`] from a provider's volume map.
pub fn normalize_volumes(
    provider: &str,
    requested: &RequestedPairs,
    volumes: HashMap<AssetPair, NetworkPairVolume>,
) -> Result<PublicVolumeResponse, MarketDataError> {
    if volumes.is_empty() {
        return Err(MarketDataError::response(
            provider,
            "get_volume",
            "No volume data returned",
        ));
    }

    let (volumes, missed_pairs) = partition(requested, volumes);
    Ok(PublicVolumeResponse {
        volumes,
        missed_pairs,
    })
}

/// Levels per side to keep: `min(cap, requested)`.
pub fn order_book_depth(max_records_count: usize, cap: usize) -> usize {
    max_records_count.min(cap)
}

/// Build an [`OrderBook`] keeping the first `depth` levels of each side.
///
/// Levels are `(price, amount)` in the provider's order, best price first.
pub fn build_order_book<B, A>(
    network: Network,
    pair: AssetPair,
    bids: B,
    asks: A,
    depth: usize,
) -> OrderBook
where
    B: IntoIterator<Item = (Decimal, Decimal)>,
    A: IntoIterator<Item = (Decimal, Decimal)>,
{
    let mut book = OrderBook::new(network, pair);
    for (price, amount) in bids.into_iter().take(depth) {
        book.add_bid(price, amount);
    }
    for (price, amount) in asks.into_iter().take(depth) {
        book.add_ask(price, amount);
    }
    book
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn price(pair: &str, value: Decimal) -> (AssetPair, MarketPrice) {
        let pair: AssetPair = pair.parse().unwrap();
        (
            pair.clone(),
            MarketPrice::new(Network::new("Exmo"), pair, value),
        )
    }

    #[test]
    fn test_missed_pairs_are_complete() {
        let tickers: HashMap<_, _> = [price("P1_USD", dec!(1)), price("P3_USD", dec!(3))]
            .into_iter()
            .collect();
        let requested = RequestedPairs::Pairs(vec![
            "P1_USD".parse().unwrap(),
            "P2_USD".parse().unwrap(),
            "P3_USD".parse().unwrap(),
        ]);

        let result = normalize_prices("exmo", &requested, tickers).unwrap();

        let found: Vec<_> = result.prices.iter().map(|p| p.pair.to_string()).collect();
        assert_eq!(found, vec!["P1_USD", "P3_USD"]);
        assert_eq!(result.missed_pairs, vec!["P2_USD".parse().unwrap()]);

        for pair in requested.pairs() {
            assert!(result.get(pair).is_some() ^ result.is_missed(pair));
        }
    }

    #[test]
    fn test_duplicate_requests_appear_once() {
        let tickers: HashMap<_, _> = [price("BTC_USD", dec!(20000))].into_iter().collect();
        let btc_usd: AssetPair = "BTC_USD".parse().unwrap();
        let requested = RequestedPairs::Pairs(vec![btc_usd.clone(), btc_usd.clone()]);

        let result = normalize_prices("exmo", &requested, tickers).unwrap();
        assert_eq!(result.len(), 1);
        assert!(result.missed_pairs.is_empty());
    }

    #[test]
    fn test_request_all_returns_every_ticker_in_order() {
        let tickers: HashMap<_, _> = [
            price("LTC_BTC", dec!(0.003)),
            price("BTC_USD", dec!(20000)),
            price("ETH_BTC", dec!(0.06)),
        ]
        .into_iter()
        .collect();

        let result = normalize_prices("exmo", &RequestedPairs::All, tickers).unwrap();
        let pairs: Vec<_> = result.prices.iter().map(|p| p.pair.to_string()).collect();
        assert_eq!(pairs, vec!["BTC_USD", "ETH_BTC", "LTC_BTC"]);
        assert!(result.missed_pairs.is_empty());
    }

    #[test]
    fn test_empty_payload_is_a_provider_error() {
        let result = normalize_prices("exmo", &RequestedPairs::All, HashMap::new());
        assert_eq!(
            result.unwrap_err(),
            MarketDataError::response("exmo", "get_pricing", "No tickers returned")
        );
    }

    #[test]
    fn test_volume_normalization() {
        let btc_usd: AssetPair = "BTC_USD".parse().unwrap();
        let eth_usd: AssetPair = "ETH_USD".parse().unwrap();
        let volumes: HashMap<_, _> = [(
            btc_usd.clone(),
            NetworkPairVolume::new(Network::new("Exmo"), btc_usd.clone(), Some(dec!(12.5))),
        )]
        .into_iter()
        .collect();

        let result = normalize_volumes(
            "exmo",
            &RequestedPairs::Pairs(vec![btc_usd.clone(), eth_usd.clone()]),
            volumes,
        )
        .unwrap();
        assert_eq!(result.get(&btc_usd).unwrap().volume_24h, Some(dec!(12.5)));
        assert_eq!(result.missed_pairs, vec![eth_usd]);
    }

    #[test]
    fn test_order_book_truncation_keeps_best_first() {
        let bids: Vec<_> = (0..1500)
            .map(|i| (Decimal::from(5000 - i), Decimal::ONE))
            .collect();
        let asks: Vec<_> = (0..20)
            .map(|i| (Decimal::from(5001 + i), Decimal::ONE))
            .collect();

        let depth = order_book_depth(5000, DEFAULT_ORDER_BOOK_CAP);
        assert_eq!(depth, 1000);

        let book = build_order_book(
            Network::new("Exmo"),
            "BTC_USD".parse().unwrap(),
            bids,
            asks,
            depth,
        );
        assert_eq!(book.bids.len(), 1000);
        assert_eq!(book.asks.len(), 20);
        assert_eq!(book.best_bid().unwrap().price, dec!(5000));
        assert_eq!(book.bids[999].price, dec!(4001));
        assert_eq!(book.best_ask().unwrap().price, dec!(5001));
    }
}
