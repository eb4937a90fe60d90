//! Mapping of exchange payloads onto the shared models.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

use super::config::{OrderBookEndpoint, PairsEndpoint, PayloadShape, TickerFields};
use crate::models::{Asset, AssetPair, AssetPairs, Network, NetworkPairVolume, PriceStatistics};

/// Translation between an exchange's asset codes and canonical ones.
#[derive(Clone, Debug, Default)]
pub struct AssetCodeConverter {
    to_local: HashMap<String, Asset>,
    to_remote: HashMap<Asset, String>,
    separator: Option<char>,
    quote_assets: Vec<String>,
    lowercase: bool,
}

impl AssetCodeConverter {
    pub fn new(
        aliases: &HashMap<String, String>,
        separator: Option<char>,
        quote_assets: &[String],
        lowercase: bool,
    ) -> Self {
        let mut to_local = HashMap::new();
        let mut to_remote = HashMap::new();
        for (remote, local) in aliases {
            let remote = remote.trim().to_uppercase();
            let local = Asset::new(local);
            to_local.insert(remote.clone(), local.clone());
            to_remote.insert(local, remote);
        }

        let mut quote_assets: Vec<String> =
            quote_assets.iter().map(|q| q.trim().to_uppercase()).collect();
        quote_assets.sort_by_key(|q| std::cmp::Reverse(q.len()));

        Self {
            to_local,
            to_remote,
            separator,
            quote_assets,
            lowercase,
        }
    }

    /// Canonical asset for a remote code.
    pub fn local(&self, code: &str) -> Asset {
        let code = code.trim().to_uppercase();
        self.to_local
            .get(&code)
            .cloned()
            .unwrap_or_else(|| Asset::new(code))
    }

    /// Remote code for a canonical asset.
    pub fn remote(&self, asset: &Asset) -> String {
        self.to_remote
            .get(asset)
            .cloned()
            .unwrap_or_else(|| asset.code().to_string())
    }

    pub fn pair(&self, base: &str, quote: &str) -> Option<AssetPair> {
        let pair = AssetPair::new(self.local(base), self.local(quote));
        if pair.asset1.is_empty() || pair.asset2.is_empty() {
            None
        } else {
            Some(pair)
        }
    }

    /// Render a canonical pair as the exchange's ticker.
    pub fn ticker(&self, pair: &AssetPair) -> String {
        let (base, quote) = (self.remote(&pair.asset1), self.remote(&pair.asset2));
        let ticker = match self.separator {
            Some(sep) => format!("{}{}{}", base, sep, quote),
            None => format!("{}{}", base, quote),
        };
        if self.lowercase {
            ticker.to_lowercase()
        } else {
            ticker
        }
    }

    /// Parse one of the exchange's tickers into a canonical pair.
    pub fn parse_ticker(&self, ticker: &str) -> Option<AssetPair> {
        let ticker = ticker.trim().to_uppercase();
        if let Some(sep) = self.separator {
            let (base, quote) = ticker.split_once(sep)?;
            return self.pair(base, quote);
        }

        self.quote_assets
            .iter()
            .filter(|quote| ticker.len() > quote.len())
            .find_map(|quote| ticker.strip_suffix(quote.as_str()).map(|base| (base, quote)))
            .and_then(|(base, quote)| self.pair(base, quote))
    }
}

/// The value at `pointer`, or the whole document.
pub fn select<'a>(value: &'a Value, pointer: Option<&str>) -> Option<&'a Value> {
    match pointer {
        Some(pointer) if !pointer.is_empty() => value.pointer(pointer),
        _ => Some(value),
    }
}

/// A field given as a plain key or a JSON pointer.
fn field<'a>(value: &'a Value, location: &str) -> Option<&'a Value> {
    if location.starts_with('/') {
        value.pointer(location)
    } else {
        value.get(location)
    }
}

/// A decimal from a JSON number or numeric string. Absent and unparsable
/// values are `None`; a real zero stays zero.
pub fn to_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn decimal_field(value: &Value, location: Option<&String>) -> Option<Decimal> {
    location.and_then(|l| field(value, l)).and_then(to_decimal)
}

/// `(ticker, entry)` pairs of a shaped payload.
fn entries<'a>(
    payload: &'a Value,
    shape: PayloadShape,
    symbol_field: &str,
) -> Vec<(String, &'a Value)> {
    match (shape, payload) {
        (PayloadShape::Object, Value::Object(map)) => {
            map.iter().map(|(k, v)| (k.clone(), v)).collect()
        }
        (PayloadShape::Array, Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some((s.clone(), item)),
                _ => field(item, symbol_field)
                    .and_then(Value::as_str)
                    .map(|s| (s.to_string(), item)),
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Every pair listed in a "list pairs" payload.
pub fn parse_pairs(
    payload: &Value,
    endpoint: &PairsEndpoint,
    converter: &AssetCodeConverter,
) -> AssetPairs {
    let Some(payload) = select(payload, endpoint.pointer.as_deref()) else {
        return AssetPairs::new();
    };

    if let (PayloadShape::Array, Some(base_field), Some(quote_field), Value::Array(items)) = (
        endpoint.shape,
        &endpoint.base_field,
        &endpoint.quote_field,
        payload,
    ) {
        return items
            .iter()
            .filter_map(|item| {
                let base = field(item, base_field)?.as_str()?;
                let quote = field(item, quote_field)?.as_str()?;
                converter.pair(base, quote)
            })
            .collect();
    }

    entries(payload, endpoint.shape, &endpoint.symbol_field)
        .into_iter()
        .filter_map(|(ticker, _)| converter.parse_ticker(&ticker))
        .collect()
}

/// One parsed ticker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedTicker {
    pub last: Decimal,
    pub statistics: PriceStatistics,
    pub volume: Option<Decimal>,
    pub quote_volume: Option<Decimal>,
}

impl ParsedTicker {
    pub fn volume(&self, network: &Network, pair: &AssetPair) -> NetworkPairVolume {
        NetworkPairVolume::new(network.clone(), pair.clone(), self.volume)
            .with_quote_volume(self.quote_volume)
    }
}

/// Read one ticker object. `None` when the last price is missing.
pub fn parse_ticker(entry: &Value, fields: &TickerFields) -> Option<ParsedTicker> {
    let last = field(entry, &fields.last).and_then(to_decimal)?;
    Some(ParsedTicker {
        last,
        statistics: PriceStatistics {
            highest_bid: decimal_field(entry, fields.bid.as_ref()),
            lowest_ask: decimal_field(entry, fields.ask.as_ref()),
            price_24h_low: decimal_field(entry, fields.low.as_ref()),
            price_24h_high: decimal_field(entry, fields.high.as_ref()),
        },
        volume: decimal_field(entry, fields.volume.as_ref()),
        quote_volume: decimal_field(entry, fields.quote_volume.as_ref()),
    })
}

/// Every ticker in a bulk payload, keyed by canonical pair.
///
/// Entries whose ticker cannot be parsed or whose last price is missing are
/// left out.
pub fn parse_tickers(
    payload: &Value,
    shape: PayloadShape,
    symbol_field: &str,
    fields: &TickerFields,
    converter: &AssetCodeConverter,
) -> HashMap<AssetPair, ParsedTicker> {
    entries(payload, shape, symbol_field)
        .into_iter()
        .filter_map(|(ticker, entry)| {
            let pair = converter.parse_ticker(&ticker)?;
            let parsed = parse_ticker(entry, fields)?;
            Some((pair, parsed))
        })
        .collect()
}

/// `(price, amount)` levels of one order-book side, in payload order.
pub fn parse_levels(payload: &Value, pointer: &str, endpoint: &OrderBookEndpoint) -> Vec<(Decimal, Decimal)> {
    let Some(Value::Array(levels)) = select(payload, Some(pointer)) else {
        return Vec::new();
    };

    levels
        .iter()
        .filter_map(|level| {
            let (price, amount) = match level {
                Value::Array(items) => (
                    items.get(endpoint.price_index)?,
                    items.get(endpoint.amount_index)?,
                ),
                Value::Object(_) => (
                    level.get(&endpoint.price_field)?,
                    level.get(&endpoint.amount_field)?,
                ),
                _ => return None,
            };
            Some((to_decimal(price)?, to_decimal(amount)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn kraken_converter() -> AssetCodeConverter {
        let aliases = HashMap::from([
            ("XBT".to_string(), "BTC".to_string()),
            ("XDG".to_string(), "DOGE".to_string()),
        ]);
        AssetCodeConverter::new(
            &aliases,
            None,
            &["USD".to_string(), "EUR".to_string(), "XBT".to_string()],
            false,
        )
    }

    fn fields() -> TickerFields {
        serde_json::from_value(json!({
            "last": "last",
            "bid": "buy_price",
            "ask": "sell_price",
            "low": "low",
            "high": "high",
            "volume": "vol",
            "quote_volume": "vol_curr"
        }))
        .unwrap()
    }

    #[test]
    fn test_aliases_apply_both_ways() {
        let converter = kraken_converter();
        let pair = converter.parse_ticker("XBTUSD").unwrap();
        assert_eq!(pair, AssetPair::new("BTC", "USD"));
        assert_eq!(converter.ticker(&pair), "XBTUSD");

        let pair = converter.parse_ticker("XDGXBT").unwrap();
        assert_eq!(pair, AssetPair::new("DOGE", "BTC"));
        assert!(converter.parse_ticker("USD").is_none());
    }

    #[test]
    fn test_separator_and_lowercase_tickers() {
        let converter = AssetCodeConverter::new(&HashMap::new(), Some('_'), &[], true);
        let pair = AssetPair::new("BTC", "USD");
        assert_eq!(converter.ticker(&pair), "btc_usd");
        assert_eq!(converter.parse_ticker("btc_usd"), Some(pair));
        assert_eq!(converter.parse_ticker("btcusd"), None);
    }

    #[test]
    fn test_decimals_from_numbers_and_strings() {
        assert_eq!(to_decimal(&json!("20000.5")), Some(dec!(20000.5)));
        assert_eq!(to_decimal(&json!(0.25)), Some(dec!(0.25)));
        assert_eq!(to_decimal(&json!("1e-5")), Some(dec!(0.00001)));
        assert_eq!(to_decimal(&json!("0")), Some(Decimal::ZERO));
        assert_eq!(to_decimal(&json!("")), None);
        assert_eq!(to_decimal(&json!(null)), None);
        assert_eq!(to_decimal(&json!("n/a")), None);
    }

    #[test]
    fn test_object_shaped_tickers() {
        let converter = AssetCodeConverter::new(&HashMap::new(), Some('_'), &[], false);
        let payload = json!({
            "BTC_USD": {
                "last": "20000",
                "buy_price": "19990",
                "sell_price": "20010",
                "high": "21000",
                "vol": "12.5",
                "vol_curr": "250000"
            },
            "ETH_USD": { "buy_price": "1500" },
            "garbage": { "last": "1" }
        });

        let tickers = parse_tickers(&payload, PayloadShape::Object, "symbol", &fields(), &converter);
        assert_eq!(tickers.len(), 1);

        let btc = &tickers[&AssetPair::new("BTC", "USD")];
        assert_eq!(btc.last, dec!(20000));
        assert_eq!(btc.statistics.highest_bid, Some(dec!(19990)));
        assert_eq!(btc.statistics.price_24h_high, Some(dec!(21000)));
        assert_eq!(btc.statistics.price_24h_low, None);
        assert_eq!(btc.volume, Some(dec!(12.5)));
        assert_eq!(btc.quote_volume, Some(dec!(250000)));
    }

    #[test]
    fn test_array_shaped_tickers_with_pointer_fields() {
        let converter = kraken_converter();
        let fields: TickerFields = serde_json::from_value(json!({
            "last": "/c/0",
            "bid": "/b/0",
            "volume": "/v/1"
        }))
        .unwrap();
        let payload = json!([
            { "symbol": "XBTEUR", "c": ["18000.1", "0.1"], "b": ["17999", "1"], "v": ["10", "20"] }
        ]);

        let tickers = parse_tickers(&payload, PayloadShape::Array, "symbol", &fields, &converter);
        let btc = &tickers[&AssetPair::new("BTC", "EUR")];
        assert_eq!(btc.last, dec!(18000.1));
        assert_eq!(btc.statistics.highest_bid, Some(dec!(17999)));
        assert_eq!(btc.volume, Some(dec!(20)));
    }

    #[test]
    fn test_pairs_payloads() {
        let converter = AssetCodeConverter::new(&HashMap::new(), Some('-'), &[], false);

        let endpoint: PairsEndpoint = serde_json::from_value(json!({
            "path": "/products",
            "shape": "array",
            "base_field": "base_currency",
            "quote_field": "quote_currency"
        }))
        .unwrap();
        let payload = json!([
            { "id": "BTC-USD", "base_currency": "BTC", "quote_currency": "USD" },
            { "id": "broken" }
        ]);
        let pairs = parse_pairs(&payload, &endpoint, &converter);
        assert_eq!(pairs.len(), 1);
        assert!(pairs.contains(&AssetPair::new("BTC", "USD")));

        let endpoint: PairsEndpoint = serde_json::from_value(json!({
            "path": "/pairs",
            "pointer": "/result",
            "shape": "array"
        }))
        .unwrap();
        let payload = json!({ "result": ["ETH-BTC", "LTC-BTC", "LTC-BTC"] });
        assert_eq!(parse_pairs(&payload, &endpoint, &converter).len(), 2);
    }

    #[test]
    fn test_order_book_levels() {
        let endpoint: OrderBookEndpoint =
            serde_json::from_value(json!({ "path": "/depth/{pair}" })).unwrap();
        let payload = json!({
            "bids": [["100.5", "2"], ["100.0", "1"], ["bad"]],
            "asks": [{ "price": "101", "amount": "3" }]
        });

        let bids = parse_levels(&payload, &endpoint.bids, &endpoint);
        assert_eq!(bids, vec![(dec!(100.5), dec!(2)), (dec!(100.0), dec!(1))]);
        let asks = parse_levels(&payload, &endpoint.asks, &endpoint);
        assert_eq!(asks, vec![(dec!(101), dec!(3))]);
    }
}
