//! Aggregator and exchange configuration.
//!
//! The whole setup is one JSON document:
//!
//! ```json
//! {
//!   "aggregator": { "pair_cache_ttl_secs": 43200, "intermediaries": ["BTC", "USD", "USDT"] },
//!   "exchanges": [ { "id": "exmo", "network": "Exmo", "base_url": "https://api.exmo.com/v1.1" } ]
//! }
//! ```
//!
//! Every aggregator field has a default, so `{}` is a valid document.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::aggregation::DEFAULT_ORDER_BOOK_CAP;
use crate::cache::DEFAULT_PAIR_CACHE_TTL;
use crate::discovery::{DiscoveryOptions, DEFAULT_INTERMEDIARIES};
use crate::errors::MarketDataError;
use crate::models::Asset;
use crate::provider::rest::ExchangeConfig;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn default_pair_cache_ttl_secs() -> u64 {
    DEFAULT_PAIR_CACHE_TTL.as_secs()
}

fn default_intermediaries() -> Vec<String> {
    DEFAULT_INTERMEDIARIES.iter().map(|a| a.to_string()).collect()
}

fn default_order_book_cap() -> usize {
    DEFAULT_ORDER_BOOK_CAP
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

fn default_true() -> bool {
    true
}

/// Tuning of the aggregation core.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AggregatorConfig {
    /// Lifetime of cached pair lists.
    #[serde(default = "default_pair_cache_ttl_secs")]
    pub pair_cache_ttl_secs: u64,

    /// Assets tried, in order, to bridge a pair no provider lists.
    #[serde(default = "default_intermediaries")]
    pub intermediaries: Vec<String>,

    /// Most order-book levels per side ever returned.
    #[serde(default = "default_order_book_cap")]
    pub order_book_cap: usize,

    /// Per-call timeout around every adapter invocation.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub reversal_enabled: bool,

    #[serde(default = "default_true")]
    pub conversion_enabled: bool,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            pair_cache_ttl_secs: default_pair_cache_ttl_secs(),
            intermediaries: default_intermediaries(),
            order_book_cap: default_order_book_cap(),
            request_timeout_secs: default_request_timeout_secs(),
            reversal_enabled: true,
            conversion_enabled: true,
        }
    }
}

impl AggregatorConfig {
    pub fn pair_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.pair_cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn discovery_options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            reversal_enabled: self.reversal_enabled,
            conversion_enabled: self.conversion_enabled,
            intermediaries: self.intermediaries.iter().map(Asset::new).collect(),
            require_pricing: true,
        }
    }

    pub fn validate(&self) -> Result<(), MarketDataError> {
        if self.request_timeout_secs == 0 {
            return Err(MarketDataError::Configuration(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.order_book_cap == 0 {
            return Err(MarketDataError::Configuration(
                "order_book_cap must be greater than zero".to_string(),
            ));
        }
        if let Some(empty) = self.intermediaries.iter().find(|a| a.trim().is_empty()) {
            return Err(MarketDataError::Configuration(format!(
                "invalid intermediary asset '{}'",
                empty
            )));
        }
        Ok(())
    }
}

/// The complete configuration document.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MarketDataConfig {
    #[serde(default)]
    pub aggregator: AggregatorConfig,

    #[serde(default)]
    pub exchanges: Vec<ExchangeConfig>,
}

impl MarketDataConfig {
    pub fn from_json(json: &str) -> Result<Self, MarketDataError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| MarketDataError::Configuration(format!("invalid config: {}", e)))?;
        config.aggregator.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MarketDataError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            MarketDataError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }
}
