//! Exchange descriptions consumed by [`RestExchangeProvider`](super::RestExchangeProvider).
//!
//! One [`ExchangeConfig`] describes where an exchange's public endpoints live
//! and where each field sits in their JSON payloads. Field locations are
//! either a plain key of the ticker object (`"last"`) or a JSON pointer
//! (`"/c/0"`).

use std::collections::HashMap;

use serde::Deserialize;

use crate::errors::MarketDataError;
use crate::registry::{NoRateLimits, RateLimiter, SlidingWindowRateLimiter};

fn default_priority() -> i32 {
    100
}

fn default_true() -> bool {
    true
}

fn default_symbol_field() -> String {
    "symbol".to_string()
}

fn default_bids() -> String {
    "/bids".to_string()
}

fn default_asks() -> String {
    "/asks".to_string()
}

fn default_amount_index() -> usize {
    1
}

fn default_price_field() -> String {
    "price".to_string()
}

fn default_amount_field() -> String {
    "amount".to_string()
}

/// One exchange, described as data.
#[derive(Clone, Debug, Deserialize)]
pub struct ExchangeConfig {
    /// Provider id, unique across the registry.
    pub id: String,

    /// Network (venue) name.
    pub network: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default = "default_priority")]
    pub priority: i32,

    #[serde(default = "default_true")]
    pub direct: bool,

    #[serde(default)]
    pub disabled: bool,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Endpoint paths are appended to this.
    pub base_url: String,

    /// Optional API key sent with every request. Requests carrying it use the
    /// authenticated rate-limit tier.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub api_key_header: Option<String>,

    /// Separator between base and quote in the exchange's tickers. `None`
    /// means tickers are concatenated (`BTCUSD`).
    #[serde(default)]
    pub pair_separator: Option<char>,

    /// Quote assets used to split concatenated tickers, longest match first.
    #[serde(default)]
    pub quote_assets: Vec<String>,

    /// Remote asset code to canonical code, e.g. `XBT` to `BTC`.
    #[serde(default)]
    pub asset_aliases: HashMap<String, String>,

    /// Render tickers in lowercase when building request paths.
    #[serde(default)]
    pub lowercase_tickers: bool,

    #[serde(default)]
    pub pairs: Option<PairsEndpoint>,

    #[serde(default)]
    pub tickers: Option<TickersEndpoint>,

    #[serde(default)]
    pub order_book: Option<OrderBookEndpoint>,
}

impl ExchangeConfig {
    /// Reject descriptions the adapter cannot work with.
    pub fn validate(&self) -> Result<(), MarketDataError> {
        if self.id.trim().is_empty() {
            return Err(MarketDataError::Configuration(
                "exchange id must not be empty".to_string(),
            ));
        }
        if self.network.trim().is_empty() {
            return Err(MarketDataError::Configuration(format!(
                "exchange '{}' has no network name",
                self.id
            )));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(MarketDataError::Configuration(format!(
                "exchange '{}' base_url must be an http(s) URL",
                self.id
            )));
        }
        if self.pair_separator.is_none() && self.quote_assets.is_empty() {
            let pairs_need_split = self
                .pairs
                .as_ref()
                .map(|p| p.base_field.is_none() || p.quote_field.is_none())
                .unwrap_or(false);
            if pairs_need_split {
                return Err(MarketDataError::Configuration(format!(
                    "exchange '{}' needs pair_separator, quote_assets or base/quote fields",
                    self.id
                )));
            }
        }
        self.rate_limit.validate(&self.id)
    }
}

/// Request throttling policy of an exchange.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RateLimitConfig {
    #[default]
    None,
    PerSecond {
        requests: usize,
        #[serde(default = "default_one")]
        seconds: u64,
    },
    PerMinute {
        requests: usize,
        #[serde(default = "default_one")]
        minutes: u64,
        #[serde(default)]
        anonymous_requests: Option<usize>,
        #[serde(default)]
        anonymous_minutes: Option<u64>,
    },
}

fn default_one() -> u64 {
    1
}

impl RateLimitConfig {
    fn validate(&self, id: &str) -> Result<(), MarketDataError> {
        let invalid = match self {
            Self::None => false,
            Self::PerSecond { requests, seconds } => *requests == 0 || *seconds == 0,
            Self::PerMinute {
                requests,
                minutes,
                anonymous_requests,
                anonymous_minutes,
            } => {
                *requests == 0
                    || *minutes == 0
                    || *anonymous_requests == Some(0)
                    || *anonymous_minutes == Some(0)
            }
        };
        if invalid {
            return Err(MarketDataError::Configuration(format!(
                "exchange '{}' rate limit must allow at least one request per non-empty window",
                id
            )));
        }
        Ok(())
    }

    pub fn build(&self) -> Box<dyn RateLimiter> {
        match *self {
            Self::None => Box::new(NoRateLimits),
            Self::PerSecond { requests, seconds } => {
                Box::new(SlidingWindowRateLimiter::per_second(requests, seconds))
            }
            Self::PerMinute {
                requests,
                minutes,
                anonymous_requests: None,
                anonymous_minutes: None,
            } => Box::new(SlidingWindowRateLimiter::per_minute(requests, minutes)),
            Self::PerMinute {
                requests,
                minutes,
                anonymous_requests,
                anonymous_minutes,
            } => Box::new(SlidingWindowRateLimiter::per_minute_tiered(
                anonymous_requests.unwrap_or(requests),
                anonymous_minutes.unwrap_or(minutes),
                requests,
                minutes,
            )),
        }
    }
}

/// How entries are laid out in a payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadShape {
    /// An object keyed by ticker.
    #[default]
    Object,
    /// An array of entries, each naming its ticker in a field.
    Array,
}

/// The "list supported pairs" endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct PairsEndpoint {
    pub path: String,

    /// JSON pointer to the pair collection inside the response.
    #[serde(default)]
    pub pointer: Option<String>,

    #[serde(default)]
    pub shape: PayloadShape,

    /// Ticker field of array entries. Plain strings are accepted as tickers.
    #[serde(default = "default_symbol_field")]
    pub symbol_field: String,

    /// Base asset field of array entries, used with `quote_field` instead of
    /// splitting the ticker.
    #[serde(default)]
    pub base_field: Option<String>,

    #[serde(default)]
    pub quote_field: Option<String>,
}

/// The ticker endpoint.
///
/// A path containing `{pair}` is a single-pair endpoint whose payload is one
/// ticker object. Any other path is a bulk endpoint returning every ticker.
#[derive(Clone, Debug, Deserialize)]
pub struct TickersEndpoint {
    pub path: String,

    #[serde(default)]
    pub pointer: Option<String>,

    #[serde(default)]
    pub shape: PayloadShape,

    #[serde(default = "default_symbol_field")]
    pub symbol_field: String,

    pub fields: TickerFields,
}

impl TickersEndpoint {
    pub fn is_single_pair(&self) -> bool {
        self.path.contains("{pair}")
    }
}

/// Locations of ticker values inside one ticker object.
///
/// Only `last` is required. Numbers and numeric strings are both accepted.
#[derive(Clone, Debug, Deserialize)]
pub struct TickerFields {
    pub last: String,
    #[serde(default)]
    pub bid: Option<String>,
    #[serde(default)]
    pub ask: Option<String>,
    #[serde(default)]
    pub low: Option<String>,
    #[serde(default)]
    pub high: Option<String>,
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(default)]
    pub quote_volume: Option<String>,
}

impl TickerFields {
    pub fn has_statistics(&self) -> bool {
        self.bid.is_some() || self.ask.is_some() || self.low.is_some() || self.high.is_some()
    }

    pub fn has_volume(&self) -> bool {
        self.volume.is_some() || self.quote_volume.is_some()
    }
}

/// The order book endpoint. The path may use `{pair}` and `{limit}`.
#[derive(Clone, Debug, Deserialize)]
pub struct OrderBookEndpoint {
    pub path: String,

    #[serde(default)]
    pub pointer: Option<String>,

    /// JSON pointers to the bid and ask level arrays.
    #[serde(default = "default_bids")]
    pub bids: String,

    #[serde(default = "default_asks")]
    pub asks: String,

    /// Positions of price and amount in array-shaped levels.
    #[serde(default)]
    pub price_index: usize,

    #[serde(default = "default_amount_index")]
    pub amount_index: usize,

    /// Keys of price and amount in object-shaped levels.
    #[serde(default = "default_price_field")]
    pub price_field: String,

    #[serde(default = "default_amount_field")]
    pub amount_field: String,

    /// Most levels the exchange will return per side.
    #[serde(default)]
    pub max_depth: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_config_takes_defaults() {
        let config: ExchangeConfig = serde_json::from_value(json!({
            "id": "exmo",
            "network": "Exmo",
            "base_url": "https://api.exmo.com/v1",
            "pair_separator": "_"
        }))
        .unwrap();

        assert_eq!(config.priority, 100);
        assert!(config.direct);
        assert!(!config.disabled);
        assert_eq!(config.rate_limit, RateLimitConfig::None);
        assert_eq!(config.pair_separator, Some('_'));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rate_limit_variants() {
        let limit: RateLimitConfig = serde_json::from_value(json!({
            "kind": "per_minute",
            "requests": 60,
            "anonymous_requests": 20
        }))
        .unwrap();
        assert_eq!(
            limit,
            RateLimitConfig::PerMinute {
                requests: 60,
                minutes: 1,
                anonymous_requests: Some(20),
                anonymous_minutes: None,
            }
        );

        let limit: RateLimitConfig =
            serde_json::from_value(json!({ "kind": "per_second", "requests": 10 })).unwrap();
        assert_eq!(
            limit,
            RateLimitConfig::PerSecond {
                requests: 10,
                seconds: 1
            }
        );
        assert!(limit.validate("x").is_ok());
        assert!(RateLimitConfig::PerSecond {
            requests: 0,
            seconds: 1
        }
        .validate("x")
        .is_err());
    }

    #[test]
    fn test_concatenated_tickers_need_a_way_to_split() {
        let config: ExchangeConfig = serde_json::from_value(json!({
            "id": "binance",
            "network": "Binance",
            "base_url": "https://api.binance.com",
            "pairs": { "path": "/api/v3/exchangeInfo", "pointer": "/symbols", "shape": "array" }
        }))
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(MarketDataError::Configuration(_))
        ));
    }

    #[test]
    fn test_ticker_endpoint_kind() {
        let endpoint: TickersEndpoint = serde_json::from_value(json!({
            "path": "/ticker/{pair}",
            "fields": { "last": "last", "bid": "bid" }
        }))
        .unwrap();
        assert!(endpoint.is_single_pair());
        assert!(endpoint.fields.has_statistics());
        assert!(!endpoint.fields.has_volume());
    }
}
